use std::time::Duration;

use tracing::debug;

use super::{Claimed, Job, Prepared, WorkerContext, labels};
use crate::error::TransportError;
use crate::gateway::{Item, ItemKind};
use crate::review;
use crate::tasks::Outcome;
use crate::template::{self, PromptContext};

/// Addresses open review threads on pull requests labelled `fix-onetime` or
/// `fix-repeat`.
///
/// The trigger stays on the pull request while the agent runs. `fix-onetime`
/// is dropped when the run ends; `fix-repeat` keeps the pull request in
/// rotation for the next round of review.
pub struct FixReviewPoint;

impl Job for FixReviewPoint {
    fn name(&self) -> &'static str {
        "fix-review-point"
    }

    fn kind(&self) -> ItemKind {
        ItemKind::PullRequest
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[labels::FIX_ONETIME, labels::FIX_REPEAT]
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn default_prompt(&self) -> &'static str {
        template::FIX_REVIEW_POINT_PROMPT
    }

    fn consumes_triggers(&self) -> bool {
        false
    }

    fn display_title(&self, item: &Item) -> String {
        match &item.head_ref {
            Some(branch) => format!("PR #{} ({branch})", item.number),
            None => format!("PR #{}", item.number),
        }
    }

    fn prepare(&self, ctx: &WorkerContext, item: &Item) -> Result<Prepared, TransportError> {
        let report = review::collect_unresolved(
            ctx.gateway.as_ref(),
            &ctx.repo.owner,
            &ctx.repo.name,
            item.number,
        )?;
        if !report.has_unresolved() {
            debug!(worker = self.name(), number = item.number, "no unresolved review threads");
            return Ok(Prepared::Skip);
        }
        Ok(Prepared::Launch(PromptContext {
            number: item.number,
            title: item.title.clone(),
            branch: item.head_ref.clone(),
            ..PromptContext::default()
        }))
    }

    fn finish(
        &self,
        ctx: &WorkerContext,
        claimed: &Claimed,
        _outcome: &Outcome,
    ) -> Result<(), TransportError> {
        if claimed.had_label(labels::FIX_ONETIME) {
            ctx.gateway
                .remove_label(claimed.kind, claimed.number, labels::FIX_ONETIME)?;
        }
        Ok(())
    }
}
