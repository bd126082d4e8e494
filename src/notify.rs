//! Completion notifications to a Slack-compatible incoming webhook.

use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::tasks::TaskStatus;

/// Fire-and-forget webhook client. Without a URL every call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self { webhook_url }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.notify.webhook_url.clone())
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Post the outcome of a task. Delivery errors are logged, never returned.
    pub fn task_finished(&self, worker: &str, status: TaskStatus, id: u64, title: &str, url: &str) {
        let Some(webhook) = &self.webhook_url else {
            return;
        };
        let text = message(worker, status, id, title, url);
        let body = json!({ "text": text }).to_string();
        match ureq::post(webhook.as_str())
            .header("Content-Type", "application/json")
            .send(body)
        {
            Ok(_) => debug!(worker, id, "notification sent"),
            Err(e) => warn!(worker, id, error = %e, "failed to send notification"),
        }
    }
}

/// Slack mrkdwn text for a finished task; the link shows `#id title`.
pub fn message(worker: &str, status: TaskStatus, id: u64, title: &str, url: &str) -> String {
    let (mark, verb) = match status {
        TaskStatus::Completed => ("✅", "completed"),
        TaskStatus::Failed | TaskStatus::Running => ("❌", "failed"),
    };
    format!("{mark} [{worker}] Task {verb}: <{url}|#{id} {title}>")
}
