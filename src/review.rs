//! Unresolved review-thread aggregation.
//!
//! Review threads come back from GitHub in cursor-paginated pages. The pages
//! are produced lazily by [`ReviewThreadPages`] and folded into a single
//! ordered list before anything is filtered, so the resolution state always
//! reflects the full thread set.

use tracing::warn;

use crate::error::TransportError;
use crate::gateway::{Gateway, PullRequestMeta, ReviewThread, ReviewThreadsPage, ThreadComment};

/// A review thread that still needs attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedThread {
    pub thread_id: String,
    pub path: String,
    pub line: Option<u32>,
    pub is_outdated: bool,
    pub comments: Vec<ThreadComment>,
}

impl From<ReviewThread> for UnresolvedThread {
    fn from(thread: ReviewThread) -> Self {
        Self {
            thread_id: thread.id,
            path: thread.path,
            line: thread.line,
            is_outdated: thread.is_outdated,
            comments: thread.comments,
        }
    }
}

/// All unresolved threads of one pull request, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReport {
    pub pull_request: PullRequestMeta,
    pub threads: Vec<UnresolvedThread>,
}

impl UnresolvedReport {
    pub fn has_unresolved(&self) -> bool {
        !self.threads.is_empty()
    }
}

/// Lazy sequence of review-thread pages for one pull request.
///
/// Yields pages until the server reports no further page. A failed fetch is
/// yielded once and ends the sequence.
pub struct ReviewThreadPages<'a> {
    gateway: &'a dyn Gateway,
    owner: &'a str,
    repo: &'a str,
    number: u64,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'a> ReviewThreadPages<'a> {
    pub fn new(gateway: &'a dyn Gateway, owner: &'a str, repo: &'a str, number: u64) -> Self {
        Self {
            gateway,
            owner,
            repo,
            number,
            cursor: None,
            exhausted: false,
        }
    }
}

impl Iterator for ReviewThreadPages<'_> {
    type Item = Result<ReviewThreadsPage, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let page = match self.gateway.fetch_review_threads_page(
            self.owner,
            self.repo,
            self.number,
            self.cursor.as_deref(),
        ) {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Some(Err(e));
            }
        };

        match (&page.page_info.end_cursor, page.page_info.has_next_page) {
            (Some(next), true) => self.cursor = Some(next.clone()),
            (None, true) => {
                warn!(
                    number = self.number,
                    "review threads report another page without a cursor; stopping"
                );
                self.exhausted = true;
            }
            (_, false) => self.exhausted = true,
        }

        Some(Ok(page))
    }
}

/// Fetch every review-thread page of a pull request and keep the unresolved
/// threads.
///
/// Metadata comes from the first page. Any page failure aborts the whole
/// aggregation; no partial report is returned.
pub fn collect_unresolved(
    gateway: &dyn Gateway,
    owner: &str,
    repo: &str,
    number: u64,
) -> Result<UnresolvedReport, TransportError> {
    let merged = ReviewThreadPages::new(gateway, owner, repo, number).try_fold(
        None::<(PullRequestMeta, Vec<ReviewThread>)>,
        |acc, page| -> Result<Option<(PullRequestMeta, Vec<ReviewThread>)>, TransportError> {
            let page = page?;
            Ok(Some(match acc {
                None => (page.pull_request, page.threads),
                Some((meta, mut threads)) => {
                    threads.extend(page.threads);
                    (meta, threads)
                }
            }))
        },
    )?;

    let (pull_request, threads) = merged.unwrap_or_default();
    Ok(UnresolvedReport {
        pull_request,
        threads: threads
            .into_iter()
            .filter(|t| !t.is_resolved)
            .map(UnresolvedThread::from)
            .collect(),
    })
}
