//! Process lifetime: resolve identity, start the workers, handle shutdown.

use std::io::IsTerminal;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use crate::config::{Config, StatusMode};
use crate::error::ExitError;
use crate::gateway::{Gateway, RepoInfo};
use crate::notify::Notifier;
use crate::tasks::{StatusBoard, TaskRegistry};
use crate::workers::{Job, PollingWorker, WorkerContext};

/// Resolve the repository and the polling assignee. Either failing is fatal.
pub fn resolve_identity(gateway: &dyn Gateway) -> Result<(RepoInfo, String), ExitError> {
    let repo = gateway.repo_info()?;
    let user = gateway.current_user()?;
    Ok((repo, user))
}

pub fn board_enabled(mode: StatusMode, stderr_is_tty: bool) -> bool {
    match mode {
        StatusMode::Auto => stderr_is_tty,
        StatusMode::Always => true,
        StatusMode::Never => false,
    }
}

/// Run `jobs` concurrently until the process is signalled.
///
/// SIGINT/SIGTERM stop the status board, restore the cursor and exit 0
/// without waiting for running agents. A panic on any thread logs and exits 1.
pub fn run(
    config: &Config,
    gateway: Arc<dyn Gateway>,
    jobs: Vec<Arc<dyn Job>>,
) -> anyhow::Result<()> {
    install_panic_hook();

    let (repo, user) = resolve_identity(gateway.as_ref())?;
    let registry = TaskRegistry::new();

    let board = if board_enabled(config.status.mode, std::io::stderr().is_terminal()) {
        let refresh = Duration::from_secs(config.status.refresh);
        Some(StatusBoard::start(&registry, refresh).context("starting status board")?)
    } else {
        None
    };
    let board = Arc::new(Mutex::new(board));

    let on_signal = Arc::clone(&board);
    let running = Arc::clone(&registry);
    ctrlc::set_handler(move || {
        if let Some(board) = on_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            board.stop();
        }
        info!(
            running = running.running_count(),
            "shutting down; running agents are left to finish on their own"
        );
        std::process::exit(0);
    })
    .context("installing signal handler")?;

    let ctx = Arc::new(WorkerContext {
        gateway,
        registry,
        notifier: Notifier::from_config(config),
        agent: config.agent.clone(),
        repo,
        user,
    });

    let mut stops = Vec::new();
    let mut handles = Vec::new();
    for job in jobs {
        let worker_config = config.workers.get(job.name()).cloned().unwrap_or_default();
        let worker = PollingWorker::new(job, Arc::clone(&ctx), &worker_config);
        let (tx, rx) = mpsc::channel();
        stops.push(tx);
        let handle = thread::Builder::new()
            .name(worker.name().to_string())
            .spawn(move || worker.run(&rx))
            .context("starting worker thread")?;
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.join();
    }
    drop(stops);
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let thread = thread::current();
        let name = thread.name().unwrap_or("unnamed");
        error!(thread = name, "fatal: {info}");
        std::process::exit(1);
    }));
}
