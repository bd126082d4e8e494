//! Remote state gateway.
//!
//! Everything the daemon knows about GitHub comes through the [`Gateway`]
//! trait. The production implementation shells out to the `gh` CLI
//! ([`GhCli`]); tests substitute an in-memory fake.

pub mod adapters;
mod gh;

pub use gh::GhCli;

use crate::error::TransportError;

/// Whether a remote item is an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    /// The `gh` subcommand for this kind (`gh issue ...` / `gh pr ...`).
    pub fn as_cli(self) -> &'static str {
        match self {
            ItemKind::Issue => "issue",
            ItemKind::PullRequest => "pr",
        }
    }

    /// Path segment used in github.com URLs.
    pub fn url_segment(self) -> &'static str {
        match self {
            ItemKind::Issue => "issues",
            ItemKind::PullRequest => "pull",
        }
    }
}

/// Owner and name of the repository the daemon operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub owner: String,
    pub name: String,
}

impl RepoInfo {
    pub fn item_url(&self, kind: ItemKind, number: u64) -> String {
        format!(
            "https://github.com/{}/{}/{}/{number}",
            self.owner,
            self.name,
            kind.url_segment()
        )
    }
}

impl std::fmt::Display for RepoInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Snapshot of an issue or pull request taken during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub number: u64,
    pub title: String,
    /// Head branch; only set for pull requests.
    pub head_ref: Option<String>,
    pub labels: Vec<String>,
}

impl Item {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A plain issue comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub body: String,
}

/// One page of a pull request's review threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewThreadsPage {
    pub pull_request: PullRequestMeta,
    pub threads: Vec<ReviewThread>,
    pub page_info: PageInfo,
}

/// Pull request metadata; identical on every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestMeta {
    pub title: String,
    pub url: String,
    pub state: String,
    pub author: Option<String>,
    pub requested_reviewers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewThread {
    pub id: String,
    pub is_resolved: bool,
    pub is_outdated: bool,
    pub path: String,
    pub line: Option<u32>,
    pub comments: Vec<ThreadComment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadComment {
    pub author: String,
    pub body: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A label to create during bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct LabelSpec {
    pub name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

/// Remote operations the core depends on.
///
/// Every call either returns parsed data or a [`TransportError`]; nothing is
/// retried here. Label mutations are idempotent on the remote side.
pub trait Gateway: Send + Sync {
    fn current_user(&self) -> Result<String, TransportError>;

    fn repo_info(&self) -> Result<RepoInfo, TransportError>;

    /// Items of `kind` assigned to `assignee` carrying `label` (at most 100).
    fn list_items(
        &self,
        kind: ItemKind,
        assignee: &str,
        label: &str,
    ) -> Result<Vec<Item>, TransportError>;

    fn add_label(&self, kind: ItemKind, number: u64, label: &str) -> Result<(), TransportError>;

    fn remove_label(&self, kind: ItemKind, number: u64, label: &str)
    -> Result<(), TransportError>;

    fn fetch_review_threads_page(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        cursor: Option<&str>,
    ) -> Result<ReviewThreadsPage, TransportError>;

    fn issue_body(&self, number: u64) -> Result<String, TransportError>;

    fn last_comment(&self, number: u64) -> Result<Option<Comment>, TransportError>;

    fn post_comment(&self, number: u64, body: &str) -> Result<(), TransportError>;

    fn close_issue(&self, number: u64) -> Result<(), TransportError>;

    /// Create a repository label. Returns `false` if it already exists.
    fn create_label(&self, label: &LabelSpec) -> Result<bool, TransportError>;
}

#[cfg(test)]
pub(crate) mod fake;
