use std::time::Duration;

use super::{Job, Prepared, WorkerContext, labels};
use crate::error::TransportError;
use crate::gateway::{Item, ItemKind};
use crate::template::{self, PromptContext};

/// Implements issues labelled `dev-ready` in a fresh worktree.
pub struct ExecIssue;

impl Job for ExecIssue {
    fn name(&self) -> &'static str {
        "exec-issue"
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Issue
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[labels::DEV_READY]
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn default_prompt(&self) -> &'static str {
        template::EXEC_ISSUE_PROMPT
    }

    fn extra_args(&self) -> &'static [&'static str] {
        &["--worktree"]
    }

    fn prepare(&self, _ctx: &WorkerContext, item: &Item) -> Result<Prepared, TransportError> {
        Ok(Prepared::Launch(PromptContext {
            number: item.number,
            title: item.title.clone(),
            ..PromptContext::default()
        }))
    }
}
