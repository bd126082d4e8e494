use std::time::Duration;

use super::{Claimed, Job, Prepared, WorkerContext, labels};
use crate::error::TransportError;
use crate::gateway::{Item, ItemKind};
use crate::tasks::Outcome;
use crate::template::{self, PromptContext};

/// Turns the body of a `create-issue` request into new issues, then closes
/// the request.
pub struct CreateIssue;

impl Job for CreateIssue {
    fn name(&self) -> &'static str {
        "create-issue"
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Issue
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[labels::CREATE_ISSUE]
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn default_prompt(&self) -> &'static str {
        template::CREATE_ISSUE_PROMPT
    }

    fn prepare(&self, ctx: &WorkerContext, item: &Item) -> Result<Prepared, TransportError> {
        let body = ctx.gateway.issue_body(item.number)?;
        Ok(Prepared::Launch(PromptContext {
            number: item.number,
            title: item.title.clone(),
            body: Some(body),
            ..PromptContext::default()
        }))
    }

    fn finish(
        &self,
        ctx: &WorkerContext,
        claimed: &Claimed,
        _outcome: &Outcome,
    ) -> Result<(), TransportError> {
        ctx.gateway.close_issue(claimed.number)
    }
}
