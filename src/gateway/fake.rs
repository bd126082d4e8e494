//! In-memory gateway used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{
    Comment, Gateway, Item, ItemKind, LabelSpec, PageInfo, PullRequestMeta, RepoInfo,
    ReviewThread, ReviewThreadsPage, ThreadComment,
};
use crate::error::TransportError;

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub items: Vec<Item>,
    pub review_pages: HashMap<u64, Vec<ReviewThreadsPage>>,
    pub page_fetches: Vec<(u64, Option<String>)>,
    pub fail_listing: bool,
    pub fail_labels_for: HashSet<u64>,
    pub fail_reviews_for: HashSet<u64>,
    pub bodies: HashMap<u64, String>,
    pub comments: HashMap<u64, Vec<Comment>>,
    pub posted: Vec<(u64, String)>,
    pub closed: Vec<u64>,
    pub ops: Vec<String>,
    pub existing_labels: HashSet<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn with_items(items: Vec<Item>) -> Self {
        let gw = Self::default();
        gw.state().items = items;
        gw
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn labels(&self, number: u64) -> Vec<String> {
        self.state()
            .items
            .iter()
            .find(|i| i.number == number)
            .map(|i| i.labels.clone())
            .unwrap_or_default()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state().ops.clone()
    }

    fn failure(command: &str) -> TransportError {
        TransportError::Failed {
            command: command.to_string(),
            code: 1,
            message: "simulated failure".to_string(),
        }
    }
}

impl Gateway for FakeGateway {
    fn current_user(&self) -> Result<String, TransportError> {
        Ok("octocat".to_string())
    }

    fn repo_info(&self) -> Result<RepoInfo, TransportError> {
        Ok(RepoInfo {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
        })
    }

    fn list_items(
        &self,
        kind: ItemKind,
        _assignee: &str,
        label: &str,
    ) -> Result<Vec<Item>, TransportError> {
        let state = self.state();
        if state.fail_listing {
            return Err(Self::failure("gh list"));
        }
        Ok(state
            .items
            .iter()
            .filter(|i| i.kind == kind && i.has_label(label))
            .cloned()
            .collect())
    }

    fn add_label(&self, _kind: ItemKind, number: u64, label: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.fail_labels_for.contains(&number) {
            return Err(Self::failure("gh edit"));
        }
        state.ops.push(format!("add {number} {label}"));
        if let Some(item) = state.items.iter_mut().find(|i| i.number == number)
            && !item.has_label(label)
        {
            item.labels.push(label.to_string());
        }
        Ok(())
    }

    fn remove_label(
        &self,
        _kind: ItemKind,
        number: u64,
        label: &str,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.fail_labels_for.contains(&number) {
            return Err(Self::failure("gh edit"));
        }
        state.ops.push(format!("remove {number} {label}"));
        if let Some(item) = state.items.iter_mut().find(|i| i.number == number) {
            item.labels.retain(|l| l != label);
        }
        Ok(())
    }

    fn fetch_review_threads_page(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        cursor: Option<&str>,
    ) -> Result<ReviewThreadsPage, TransportError> {
        let mut state = self.state();
        state
            .page_fetches
            .push((number, cursor.map(str::to_string)));
        if state.fail_reviews_for.contains(&number) {
            return Err(Self::failure("gh api graphql"));
        }
        let pages = state.review_pages.get(&number).cloned().unwrap_or_default();
        let index = match cursor {
            None => 0,
            Some(c) => {
                pages
                    .iter()
                    .position(|p| p.page_info.end_cursor.as_deref() == Some(c))
                    .map_or(pages.len(), |i| i + 1)
            }
        };
        Ok(pages
            .get(index)
            .cloned()
            .unwrap_or_else(|| page(Vec::new(), None)))
    }

    fn issue_body(&self, number: u64) -> Result<String, TransportError> {
        Ok(self.state().bodies.get(&number).cloned().unwrap_or_default())
    }

    fn last_comment(&self, number: u64) -> Result<Option<Comment>, TransportError> {
        Ok(self
            .state()
            .comments
            .get(&number)
            .and_then(|c| c.last().cloned()))
    }

    fn post_comment(&self, number: u64, body: &str) -> Result<(), TransportError> {
        self.state().posted.push((number, body.to_string()));
        Ok(())
    }

    fn close_issue(&self, number: u64) -> Result<(), TransportError> {
        self.state().closed.push(number);
        Ok(())
    }

    fn create_label(&self, label: &LabelSpec) -> Result<bool, TransportError> {
        Ok(self.state().existing_labels.insert(label.name.to_string()))
    }
}

pub(crate) fn issue(number: u64, title: &str, labels: &[&str]) -> Item {
    Item {
        kind: ItemKind::Issue,
        number,
        title: title.to_string(),
        head_ref: None,
        labels: labels.iter().map(|l| (*l).to_string()).collect(),
    }
}

pub(crate) fn pr(number: u64, branch: &str, labels: &[&str]) -> Item {
    Item {
        kind: ItemKind::PullRequest,
        number,
        title: format!("Update {branch}"),
        head_ref: Some(branch.to_string()),
        labels: labels.iter().map(|l| (*l).to_string()).collect(),
    }
}

pub(crate) fn thread(id: &str, resolved: bool) -> ReviewThread {
    ReviewThread {
        id: id.to_string(),
        is_resolved: resolved,
        is_outdated: false,
        path: "src/lib.rs".to_string(),
        line: Some(10),
        comments: vec![ThreadComment {
            author: "reviewer".to_string(),
            body: format!("comment on {id}"),
            url: format!("https://github.com/acme/widgets/pull/1#{id}"),
            created_at: "2024-05-01T10:00:00Z".to_string(),
        }],
    }
}

pub(crate) fn page(threads: Vec<ReviewThread>, next_cursor: Option<&str>) -> ReviewThreadsPage {
    ReviewThreadsPage {
        pull_request: PullRequestMeta {
            title: "Fix parser".to_string(),
            url: "https://github.com/acme/widgets/pull/1".to_string(),
            state: "OPEN".to_string(),
            author: Some("carol".to_string()),
            requested_reviewers: vec!["dave".to_string()],
        },
        threads,
        page_info: PageInfo {
            has_next_page: next_cursor.is_some(),
            end_cursor: next_cursor.map(str::to_string),
        },
    }
}
