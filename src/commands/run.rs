use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};

use crate::gateway::GhCli;
use crate::orchestrator;
use crate::workers::{CreateIssue, ExecIssue, FixReviewPoint, Job, UpdateIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkerType {
    /// Implement issues labelled dev-ready
    ExecIssue,
    /// Draft new issues from issues labelled create-issue
    CreateIssue,
    /// Revise issues labelled update-issue from their latest comment
    UpdateIssue,
    /// Address open review threads on PRs labelled fix-onetime or fix-repeat
    FixReviewPoint,
    /// Every worker in one process
    All,
}

impl WorkerType {
    pub fn jobs(self) -> Vec<Arc<dyn Job>> {
        match self {
            WorkerType::ExecIssue => vec![job(ExecIssue)],
            WorkerType::CreateIssue => vec![job(CreateIssue)],
            WorkerType::UpdateIssue => vec![job(UpdateIssue)],
            WorkerType::FixReviewPoint => vec![job(FixReviewPoint)],
            WorkerType::All => vec![
                job(ExecIssue),
                job(CreateIssue),
                job(UpdateIssue),
                job(FixReviewPoint),
            ],
        }
    }
}

fn job(job: impl Job + 'static) -> Arc<dyn Job> {
    Arc::new(job)
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Worker to run
    #[arg(value_enum)]
    pub worker: WorkerType,
    /// Config file (defaults to .label-worker.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// GitHub CLI executable
    #[arg(long, default_value = "gh")]
    pub gh: String,
}

impl RunArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = super::load_config(self.config.as_deref())?;
        orchestrator::run(&config, Arc::new(GhCli::new(&self.gh)), self.worker.jobs())
    }
}
