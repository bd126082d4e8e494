use std::time::Duration;

use super::{Claimed, Job, Prepared, WorkerContext, labels};
use crate::error::TransportError;
use crate::gateway::{Item, ItemKind};
use crate::tasks::Outcome;
use crate::template::{self, PromptContext};

/// Revises an issue according to its latest comment and replies to the
/// commenter.
pub struct UpdateIssue;

impl Job for UpdateIssue {
    fn name(&self) -> &'static str {
        "update-issue"
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Issue
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[labels::UPDATE_ISSUE]
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn default_prompt(&self) -> &'static str {
        template::UPDATE_ISSUE_PROMPT
    }

    fn prepare(&self, ctx: &WorkerContext, item: &Item) -> Result<Prepared, TransportError> {
        let Some(comment) = ctx.gateway.last_comment(item.number)? else {
            return Ok(Prepared::Discard);
        };
        Ok(Prepared::Launch(PromptContext {
            number: item.number,
            title: item.title.clone(),
            comment: Some(comment.body),
            comment_author: Some(comment.author),
            ..PromptContext::default()
        }))
    }

    fn finish(
        &self,
        ctx: &WorkerContext,
        claimed: &Claimed,
        _outcome: &Outcome,
    ) -> Result<(), TransportError> {
        let Some(author) = &claimed.context.comment_author else {
            return Ok(());
        };
        ctx.gateway
            .post_comment(claimed.number, &format!("@{author} Updated"))
    }
}
