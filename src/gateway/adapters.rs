//! JSON adapters for `gh` output.
//!
//! Tolerant parsing for `gh issue list`, `gh pr list`, `gh repo view`,
//! `gh issue view` and the review-thread GraphQL query. Wire structs mirror
//! GitHub's camelCase field names and are converted into the gateway's own
//! types so nothing outside this module sees the wire shape.

use serde::Deserialize;

use super::{
    Comment, Item, ItemKind, PageInfo, PullRequestMeta, RepoInfo, ReviewThread, ReviewThreadsPage,
    ThreadComment,
};

/// GraphQL query for one page of review threads plus pull request metadata.
pub const REVIEW_THREADS_QUERY: &str = r"
query($owner: String!, $repo: String!, $number: Int!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $number) {
      title
      url
      state
      author { login }
      reviewRequests(first: 100) {
        nodes {
          requestedReviewer {
            ... on User { login }
            ... on Team { name }
          }
        }
      }
      reviewThreads(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        edges {
          node {
            id
            isResolved
            isOutdated
            path
            line
            comments(first: 100) {
              nodes {
                author { login }
                body
                url
                createdAt
              }
            }
          }
        }
      }
    }
  }
}
";

/// Parse failure; the gateway wraps it into a transport error.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct AdapterError {
    pub detail: String,
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            detail: e.to_string(),
        }
    }
}

// --- Issue / PR listings ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedItem {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    head_ref_name: Option<String>,
    #[serde(default)]
    labels: Vec<LabelNode>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

/// Parse `gh issue list` / `gh pr list --json number,title,headRefName,labels`.
pub fn parse_items(kind: ItemKind, json: &str) -> Result<Vec<Item>, AdapterError> {
    let listed: Vec<ListedItem> = serde_json::from_str(json)?;
    Ok(listed
        .into_iter()
        .map(|i| Item {
            kind,
            number: i.number,
            title: i.title,
            head_ref: i.head_ref_name,
            labels: i.labels.into_iter().map(|l| l.name).collect(),
        })
        .collect())
}

// --- Repo view ---

#[derive(Debug, Deserialize)]
struct RepoView {
    owner: Login,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

/// Parse `gh repo view --json owner,name`.
pub fn parse_repo_view(json: &str) -> Result<RepoInfo, AdapterError> {
    let view: RepoView = serde_json::from_str(json)?;
    Ok(RepoInfo {
        owner: view.owner.login,
        name: view.name,
    })
}

// --- Issue view ---

#[derive(Debug, Deserialize)]
struct IssueBody {
    #[serde(default)]
    body: String,
}

/// Parse `gh issue view --json body`.
pub fn parse_issue_body(json: &str) -> Result<String, AdapterError> {
    let issue: IssueBody = serde_json::from_str(json)?;
    Ok(issue.body)
}

#[derive(Debug, Deserialize)]
struct IssueComments {
    #[serde(default)]
    comments: Vec<IssueComment>,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    #[serde(default)]
    author: Option<Login>,
    #[serde(default)]
    body: String,
}

/// Parse `gh issue view --json comments` and keep only the newest comment.
pub fn parse_last_comment(json: &str) -> Result<Option<Comment>, AdapterError> {
    let issue: IssueComments = serde_json::from_str(json)?;
    Ok(issue.comments.into_iter().last().map(|c| Comment {
        author: c.author.map(|a| a.login).unwrap_or_default(),
        body: c.body,
    }))
}

// --- Review threads (GraphQL) ---

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Repository {
    pull_request: Option<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    author: Option<Login>,
    #[serde(default)]
    review_requests: Option<Nodes<ReviewRequestNode>>,
    review_threads: ReviewThreadsConnection,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequestNode {
    #[serde(default)]
    requested_reviewer: Option<RequestedReviewer>,
}

#[derive(Debug, Deserialize)]
struct RequestedReviewer {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewThreadsConnection {
    page_info: PageInfoNode,
    #[serde(default)]
    edges: Vec<ThreadEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfoNode {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreadEdge {
    node: ThreadNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadNode {
    id: String,
    is_resolved: bool,
    #[serde(default)]
    is_outdated: bool,
    #[serde(default)]
    path: String,
    #[serde(default)]
    line: Option<u32>,
    comments: Nodes<CommentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    #[serde(default)]
    author: Option<Login>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    created_at: String,
}

/// Parse one page of the [`REVIEW_THREADS_QUERY`] response.
pub fn parse_review_threads_page(json: &str) -> Result<ReviewThreadsPage, AdapterError> {
    let response: GraphQlResponse = serde_json::from_str(json)?;
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(AdapterError {
            detail: format!("GraphQL errors: {}", messages.join("; ")),
        });
    }

    let pr = response
        .data
        .and_then(|d| d.repository)
        .and_then(|r| r.pull_request)
        .ok_or_else(|| AdapterError {
            detail: "response has no repository.pullRequest".to_string(),
        })?;

    let requested_reviewers = pr
        .review_requests
        .map(|r| r.nodes)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|n| n.requested_reviewer)
        .filter_map(|r| r.login.or(r.name))
        .collect();

    let threads = pr
        .review_threads
        .edges
        .into_iter()
        .map(|edge| {
            let node = edge.node;
            ReviewThread {
                id: node.id,
                is_resolved: node.is_resolved,
                is_outdated: node.is_outdated,
                path: node.path,
                line: node.line,
                comments: node
                    .comments
                    .nodes
                    .into_iter()
                    .map(|c| ThreadComment {
                        author: c.author.map(|a| a.login).unwrap_or_default(),
                        body: c.body,
                        url: c.url,
                        created_at: c.created_at,
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(ReviewThreadsPage {
        pull_request: PullRequestMeta {
            title: pr.title,
            url: pr.url,
            state: pr.state,
            author: pr.author.map(|a| a.login),
            requested_reviewers,
        },
        threads,
        page_info: PageInfo {
            has_next_page: pr.review_threads.page_info.has_next_page,
            end_cursor: pr.review_threads.page_info.end_cursor,
        },
    })
}
