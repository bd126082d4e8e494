//! Label-driven polling workers.
//!
//! A [`PollingWorker`] runs one [`Job`] on a fixed interval. Each tick lists
//! the items carrying the job's trigger labels, skips anything already
//! `in-progress` or running locally, claims the rest in listing order and
//! hands the agent process to the [`TaskRegistry`]. A completion thread per
//! claimed item waits for the process and reconciles labels afterwards.

pub mod create_issue;
pub mod exec_issue;
pub mod fix_review_point;
pub mod labels;
pub mod update_issue;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context as _;
use tracing::{debug, error, info, warn};

pub use create_issue::CreateIssue;
pub use exec_issue::ExecIssue;
pub use fix_review_point::FixReviewPoint;
pub use update_issue::UpdateIssue;

use crate::config::{AgentConfig, WorkerConfig};
use crate::error::TransportError;
use crate::gateway::{Gateway, Item, ItemKind, RepoInfo};
use crate::notify::Notifier;
use crate::subprocess::Launch;
use crate::tasks::{Outcome, TaskHandle, TaskRegistry};
use crate::template::{self, PromptContext};

/// Everything a worker needs from the rest of the process.
pub struct WorkerContext {
    pub gateway: Arc<dyn Gateway>,
    pub registry: Arc<TaskRegistry>,
    pub notifier: Notifier,
    pub agent: AgentConfig,
    pub repo: RepoInfo,
    /// Login whose assigned items are polled.
    pub user: String,
}

/// What to do with a candidate after looking at it more closely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Claim the item and launch the agent with this prompt context.
    Launch(PromptContext),
    /// Leave the item alone for now; labels are not touched.
    Skip,
    /// Nothing to do: consume the trigger labels without launching.
    Discard,
}

/// An item this worker has claimed, as seen at claim time.
#[derive(Debug, Clone)]
pub struct Claimed {
    pub kind: ItemKind,
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
    pub context: PromptContext,
}

impl Claimed {
    pub fn had_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// The per-worker parts of the claim/launch/complete cycle.
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> ItemKind;

    /// Labels that make an item a candidate. Items carrying any of them are
    /// listed.
    fn triggers(&self) -> &'static [&'static str];

    fn default_interval(&self) -> Duration;

    fn default_prompt(&self) -> &'static str;

    /// Arguments appended after the prompt.
    fn extra_args(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether the trigger labels are removed when the item is claimed.
    fn consumes_triggers(&self) -> bool {
        true
    }

    /// Title shown in the task table and notifications.
    fn display_title(&self, item: &Item) -> String {
        item.title.clone()
    }

    /// Inspect a candidate before claiming it.
    fn prepare(&self, ctx: &WorkerContext, item: &Item) -> Result<Prepared, TransportError>;

    /// Worker-specific cleanup after `in-progress` has been removed.
    fn finish(
        &self,
        _ctx: &WorkerContext,
        _claimed: &Claimed,
        _outcome: &Outcome,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Result of one tick.
#[derive(Debug, Default)]
pub struct Tick {
    pub claimed: Vec<u64>,
    /// One completion thread per claimed item.
    pub completions: Vec<JoinHandle<()>>,
}

impl Tick {
    /// Block until every completion of this tick has run.
    pub fn join(self) {
        for handle in self.completions {
            let _ = handle.join();
        }
    }
}

pub struct PollingWorker {
    job: Arc<dyn Job>,
    ctx: Arc<WorkerContext>,
    interval: Duration,
    prompt: String,
}

impl PollingWorker {
    pub fn new(job: Arc<dyn Job>, ctx: Arc<WorkerContext>, config: &WorkerConfig) -> Self {
        let interval = config
            .interval
            .map_or_else(|| job.default_interval(), Duration::from_secs);
        let prompt = config
            .prompt
            .clone()
            .unwrap_or_else(|| job.default_prompt().to_string());
        Self {
            job,
            ctx,
            interval,
            prompt,
        }
    }

    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick immediately, then every interval until `stop` fires or its
    /// sender is dropped. Tick errors are logged and never end the loop.
    pub fn run(&self, stop: &Receiver<()>) {
        let worker = self.name();
        info!(
            worker,
            repo = %self.ctx.repo,
            assignee = %self.ctx.user,
            interval_secs = self.interval.as_secs(),
            "polling every {}s for {} (assignee: {})",
            self.interval.as_secs(),
            self.ctx.repo,
            self.ctx.user,
        );
        loop {
            match self.tick() {
                Ok(tick) if !tick.claimed.is_empty() => {
                    debug!(worker, claimed = ?tick.claimed, "tick claimed items");
                }
                Ok(_) => {}
                Err(e) => error!(worker, error = %format!("{e:#}"), "tick error"),
            }
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    info!(worker, "stopped");
                    return;
                }
            }
        }
    }

    /// One poll-and-claim pass. Fails only when listing fails; a failure on
    /// one item is logged and the pass moves on to the next.
    pub fn tick(&self) -> anyhow::Result<Tick> {
        let worker = self.name();
        let mut tick = Tick::default();

        for item in self.candidates()? {
            if item.has_label(labels::IN_PROGRESS) {
                debug!(worker, number = item.number, "already in progress; skipping");
                continue;
            }
            if self.ctx.registry.is_running(item.number) {
                debug!(worker, number = item.number, "already running locally; skipping");
                continue;
            }
            match self.process(&item) {
                Ok(Some(handle)) => {
                    tick.claimed.push(item.number);
                    tick.completions.push(handle);
                }
                Ok(None) => {}
                Err(e) => error!(
                    worker,
                    number = item.number,
                    error = %format!("{e:#}"),
                    "failed to process #{}",
                    item.number
                ),
            }
        }
        Ok(tick)
    }

    /// Items carrying any trigger label, deduplicated, in listing order.
    fn candidates(&self) -> anyhow::Result<Vec<Item>> {
        let mut items: Vec<Item> = Vec::new();
        for label in self.job.triggers() {
            let listed = self
                .ctx
                .gateway
                .list_items(self.job.kind(), &self.ctx.user, label)
                .with_context(|| format!("listing items labelled {label}"))?;
            for item in listed {
                if !items.iter().any(|i| i.number == item.number) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    fn process(&self, item: &Item) -> anyhow::Result<Option<JoinHandle<()>>> {
        let worker = self.name();
        let context = match self.job.prepare(&self.ctx, item)? {
            Prepared::Launch(context) => context,
            Prepared::Skip => return Ok(None),
            Prepared::Discard => {
                info!(
                    worker,
                    number = item.number,
                    "nothing to do for #{}; consuming trigger",
                    item.number
                );
                self.remove_triggers(item)?;
                return Ok(None);
            }
        };

        let prompt = template::render_prompt(&self.prompt, &context)
            .with_context(|| format!("rendering prompt for #{}", item.number))?;
        let launch = self.launch(prompt);
        let title = self.job.display_title(item);

        // Started before the claim; exits without doing anything if the
        // hand-off sender is dropped.
        let (hand_off, pending) = mpsc::channel::<(TaskHandle, Claimed)>();
        let job = Arc::clone(&self.job);
        let ctx = Arc::clone(&self.ctx);
        let completion = thread::Builder::new()
            .name(format!("{worker}-{}", item.number))
            .spawn(move || {
                if let Ok((handle, claimed)) = pending.recv() {
                    let outcome = handle.wait();
                    complete(job.as_ref(), &ctx, &claimed, &outcome);
                }
            })
            .context("starting completion thread")?;

        info!(worker, number = item.number, "processing #{}: {title}", item.number);
        if self.job.consumes_triggers() {
            self.remove_triggers(item)?;
        }
        self.ctx
            .gateway
            .add_label(item.kind, item.number, labels::IN_PROGRESS)?;

        let Some(handle) = self.ctx.registry.run(&launch, item.number, &title) else {
            warn!(
                worker,
                number = item.number,
                "#{} started elsewhere in the meantime",
                item.number
            );
            return Ok(None);
        };

        let claimed = Claimed {
            kind: item.kind,
            number: item.number,
            title,
            labels: item.labels.clone(),
            context,
        };
        if hand_off.send((handle, claimed)).is_err() {
            anyhow::bail!("completion thread for #{} exited early", item.number);
        }
        Ok(Some(completion))
    }

    fn remove_triggers(&self, item: &Item) -> Result<(), TransportError> {
        for label in self.job.triggers() {
            if item.has_label(label) {
                self.ctx.gateway.remove_label(item.kind, item.number, label)?;
            }
        }
        Ok(())
    }

    fn launch(&self, prompt: String) -> Launch {
        let agent = &self.ctx.agent;
        let mut args = agent.args.clone();
        args.push(agent.prompt_flag.clone());
        args.push(prompt);
        args.extend(self.job.extra_args().iter().map(|a| (*a).to_string()));
        Launch::new(agent.command.clone(), args)
    }
}

/// Reconcile labels after the agent process has exited.
fn complete(job: &dyn Job, ctx: &WorkerContext, claimed: &Claimed, outcome: &Outcome) {
    let worker = job.name();
    let number = claimed.number;
    info!(worker, number, status = %outcome.status, "#{number} finished");

    if let Err(e) = ctx.gateway.remove_label(claimed.kind, number, labels::IN_PROGRESS) {
        error!(
            worker,
            number,
            error = %e,
            "failed to remove {} from #{number}",
            labels::IN_PROGRESS
        );
    }
    if let Err(e) = job.finish(ctx, claimed, outcome) {
        error!(worker, number, error = %e, "failed to finalize #{number}");
    }

    let url = ctx.repo.item_url(claimed.kind, number);
    ctx.notifier
        .task_finished(worker, outcome.status, number, &claimed.title, &url);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::gateway::fake::FakeGateway;

    /// A context whose agent is `sh -c <script>`; the prompt lands in `$2`.
    pub fn context(gateway: &Arc<FakeGateway>, script: &str) -> Arc<WorkerContext> {
        notifying_context(gateway, script, Notifier::disabled())
    }

    pub fn notifying_context(
        gateway: &Arc<FakeGateway>,
        script: &str,
        notifier: Notifier,
    ) -> Arc<WorkerContext> {
        let gateway: Arc<dyn Gateway> = gateway.clone();
        Arc::new(WorkerContext {
            gateway,
            registry: TaskRegistry::new(),
            notifier,
            agent: AgentConfig {
                command: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string(), "agent".to_string()],
                prompt_flag: "-p".to_string(),
            },
            repo: RepoInfo {
                owner: "acme".to_string(),
                name: "widgets".to_string(),
            },
            user: "octocat".to_string(),
        })
    }

    pub fn worker(job: impl Job + 'static, ctx: &Arc<WorkerContext>) -> PollingWorker {
        PollingWorker::new(Arc::new(job), Arc::clone(ctx), &WorkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    use super::testing::{context, notifying_context, worker};
    use super::*;
    use crate::gateway::fake::{FakeGateway, issue};

    /// A one-route HTTP server that hands every request body to the receiver.
    fn webhook() -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut body = vec![0; length];
                reader.read_exact(&mut body).unwrap();
                stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .unwrap();
                if tx.send(String::from_utf8(body).unwrap()).is_err() {
                    return;
                }
            }
        });
        (url, rx)
    }

    fn posted_text(rx: &Receiver<String>) -> String {
        let body = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        json["text"].as_str().unwrap().to_string()
    }

    #[test]
    fn listing_failure_claims_nothing() {
        let gw = Arc::new(FakeGateway::with_items(vec![issue(1, "a", &["dev-ready"])]));
        gw.state().fail_listing = true;
        let ctx = context(&gw, "exit 0");
        let w = worker(ExecIssue, &ctx);

        assert!(w.tick().is_err());
        assert!(gw.ops().is_empty());
        assert!(ctx.registry.snapshot().is_empty());

        gw.state().fail_listing = false;
        let tick = w.tick().unwrap();
        assert_eq!(tick.claimed, vec![1]);
        tick.join();
    }

    #[test]
    fn one_failing_item_does_not_stop_the_tick() {
        let gw = Arc::new(FakeGateway::with_items(vec![
            issue(1, "a", &["dev-ready"]),
            issue(2, "b", &["dev-ready"]),
        ]));
        gw.state().fail_labels_for.insert(1);
        let ctx = context(&gw, "exit 0");

        let tick = worker(ExecIssue, &ctx).tick().unwrap();
        assert_eq!(tick.claimed, vec![2]);
        tick.join();
        assert!(!ctx.registry.is_running(1));
        assert!(gw.labels(1).contains(&"dev-ready".to_string()));
    }

    #[test]
    fn claims_in_listing_order() {
        let gw = Arc::new(FakeGateway::with_items(vec![
            issue(3, "c", &["dev-ready"]),
            issue(1, "a", &["dev-ready"]),
            issue(2, "b", &["dev-ready"]),
        ]));
        let ctx = context(&gw, "exit 0");
        let tick = worker(ExecIssue, &ctx).tick().unwrap();
        assert_eq!(tick.claimed, vec![3, 1, 2]);
        tick.join();
    }

    #[test]
    fn running_item_is_not_claimed_twice() {
        let gw = Arc::new(FakeGateway::with_items(vec![issue(5, "e", &["dev-ready"])]));
        let ctx = context(&gw, "sleep 0.5");
        let w = worker(ExecIssue, &ctx);

        let first = w.tick().unwrap();
        assert_eq!(first.claimed, vec![5]);

        // Someone puts the trigger back while the agent is still running.
        gw.state().items[0].labels = vec!["dev-ready".to_string()];
        let second = w.tick().unwrap();
        assert!(second.claimed.is_empty());
        first.join();
    }

    #[test]
    fn config_overrides_interval_and_prompt() {
        let gw = Arc::new(FakeGateway::with_items(vec![issue(9, "i", &["dev-ready"])]));
        let ctx = context(&gw, r#"[ "$2" = "do 9" ] || exit 1"#);
        let config = WorkerConfig {
            interval: Some(5),
            prompt: Some("do {{ number }}".to_string()),
        };
        let w = PollingWorker::new(Arc::new(ExecIssue), Arc::clone(&ctx), &config);
        assert_eq!(w.interval(), Duration::from_secs(5));

        w.tick().unwrap().join();
        assert_eq!(
            ctx.registry.get(9).unwrap().status,
            crate::tasks::TaskStatus::Completed
        );
    }

    #[test]
    fn bad_prompt_fails_item_before_claim() {
        let gw = Arc::new(FakeGateway::with_items(vec![issue(4, "d", &["dev-ready"])]));
        let ctx = context(&gw, "exit 0");
        let config = WorkerConfig {
            interval: None,
            prompt: Some("{{ branch }}".to_string()),
        };
        let w = PollingWorker::new(Arc::new(ExecIssue), Arc::clone(&ctx), &config);

        let tick = w.tick().unwrap();
        assert!(tick.claimed.is_empty());
        assert!(gw.ops().is_empty());
        assert_eq!(gw.labels(4), vec!["dev-ready"]);
    }

    #[test]
    fn run_ticks_immediately_and_stops() {
        let gw = Arc::new(FakeGateway::with_items(vec![issue(6, "f", &["dev-ready"])]));
        let ctx = context(&gw, "exit 0");
        let w = worker(ExecIssue, &ctx);
        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();

        w.run(&rx);
        assert!(ctx.registry.get(6).is_some());
    }

    #[test]
    fn completion_notifies_with_outcome() {
        let (url, rx) = webhook();
        let gw = Arc::new(FakeGateway::with_items(vec![issue(42, "Add retries", &["dev-ready"])]));
        let ctx = notifying_context(&gw, "exit 0", Notifier::new(Some(url)));

        worker(ExecIssue, &ctx).tick().unwrap().join();

        assert_eq!(
            posted_text(&rx),
            "✅ [exec-issue] Task completed: <https://github.com/acme/widgets/issues/42|#42 Add retries>"
        );
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert!(gw.labels(42).is_empty());
    }

    #[test]
    fn failed_agent_notifies_failure() {
        let (url, rx) = webhook();
        let gw = Arc::new(FakeGateway::with_items(vec![issue(43, "Flaky", &["dev-ready"])]));
        let ctx = notifying_context(&gw, "exit 1", Notifier::new(Some(url)));

        worker(ExecIssue, &ctx).tick().unwrap().join();

        assert_eq!(
            posted_text(&rx),
            "❌ [exec-issue] Task failed: <https://github.com/acme/widgets/issues/43|#43 Flaky>"
        );
        assert!(gw.labels(43).is_empty());
    }

    #[test]
    fn rejected_launch_releases_the_completion_thread() {
        let (url, rx) = webhook();
        let gw = Arc::new(FakeGateway::with_items(vec![issue(8, "h", &["dev-ready"])]));
        let ctx = notifying_context(&gw, "exit 0", Notifier::new(Some(url)));
        let other = Launch::new("sh", vec!["-c".to_string(), "sleep 0.5".to_string()]);
        let running = ctx.registry.run(&other, 8, "elsewhere").unwrap();

        let item = gw.state().items[0].clone();
        assert!(worker(ExecIssue, &ctx).process(&item).unwrap().is_none());

        running.wait();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(gw.ops(), vec!["remove 8 dev-ready", "add 8 in-progress"]);
    }
}
