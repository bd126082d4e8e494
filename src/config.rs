use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;
use crate::template;

/// Project-local config file name.
pub const CONFIG_TOML: &str = ".label-worker.toml";

/// Environment variable that overrides `[notify] webhook_url`.
pub const WEBHOOK_ENV: &str = "LABEL_WORKER_SLACK_WEBHOOK_URL";

/// Find the config file: `.label-worker.toml` in `dir`, then
/// `<config dir>/label-worker/config.toml`. Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let local = dir.join(CONFIG_TOML);
    if local.exists() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("label-worker").join("config.toml");
    user.exists().then_some(user)
}

/// Top-level `.label-worker.toml` config. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// The coding-agent executable launched for every claimed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AgentConfig {
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments placed before the prompt flag.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Flag that introduces the rendered prompt.
    #[serde(default = "default_prompt_flag")]
    pub prompt_flag: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            prompt_flag: default_prompt_flag(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct WorkersConfig {
    #[serde(default)]
    pub exec_issue: WorkerConfig,
    #[serde(default)]
    pub create_issue: WorkerConfig,
    #[serde(default)]
    pub update_issue: WorkerConfig,
    #[serde(default)]
    pub fix_review_point: WorkerConfig,
}

/// Per-worker overrides. Unset fields use the worker's built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerConfig {
    /// Seconds between ticks.
    pub interval: Option<u64>,
    /// Prompt template (minijinja).
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotifyConfig {
    /// Slack-compatible incoming webhook. Notifications are off when unset.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusConfig {
    #[serde(default)]
    pub mode: StatusMode,
    /// Seconds between redraws of the task table.
    #[serde(default = "default_refresh")]
    pub refresh: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            mode: StatusMode::default(),
            refresh: default_refresh(),
        }
    }
}

/// When to draw the live task table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    /// Only when stderr is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

fn default_command() -> String { "claude".into() }
fn default_args() -> Vec<String> { vec!["--dangerously-skip-permissions".into()] }
fn default_prompt_flag() -> String { "-p".into() }
fn default_refresh() -> u64 { 1 }

impl Config {
    /// Load the config for `dir`, or defaults if no file exists, then apply
    /// environment overrides.
    pub fn discover(dir: &Path) -> anyhow::Result<Self> {
        let config = match find_config(dir) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse_toml(&contents)
    }

    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(WEBHOOK_ENV).filter(|u| !u.trim().is_empty()) {
            self.notify.webhook_url = Some(url);
        }
        self
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.agent.command.trim().is_empty() {
            return Err(ExitError::Config("[agent] command must not be empty".into()).into());
        }
        if self.status.refresh == 0 {
            return Err(ExitError::Config("[status] refresh must be at least 1".into()).into());
        }
        for (name, worker) in self.workers.iter() {
            if worker.interval == Some(0) {
                return Err(ExitError::Config(format!(
                    "[workers.{name}] interval must be at least 1"
                ))
                .into());
            }
            if let Some(prompt) = &worker.prompt {
                template::validate(name, prompt)?;
            }
        }
        Ok(())
    }
}

impl WorkersConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &WorkerConfig)> {
        [
            ("exec-issue", &self.exec_issue),
            ("create-issue", &self.create_issue),
            ("update-issue", &self.update_issue),
            ("fix-review-point", &self.fix_review_point),
        ]
        .into_iter()
    }

    pub fn get(&self, name: &str) -> Option<&WorkerConfig> {
        self.iter().find(|(n, _)| *n == name).map(|(_, w)| w)
    }
}
