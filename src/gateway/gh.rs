use tracing::debug;

use super::adapters::{self, AdapterError};
use super::{Comment, Gateway, Item, ItemKind, LabelSpec, RepoInfo, ReviewThreadsPage};
use crate::error::TransportError;
use crate::subprocess::Tool;

const LIST_LIMIT: &str = "100";

/// [`Gateway`] backed by the GitHub CLI.
///
/// Runs in the current working directory, so `gh` resolves the repository
/// from the local git remote exactly as it would for an interactive user.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: String,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl GhCli {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn tool(&self) -> Tool {
        Tool::new(&self.program)
    }

    fn parsed<T>(
        tool: &Tool,
        parse: impl FnOnce(&str) -> Result<T, AdapterError>,
    ) -> Result<T, TransportError> {
        let output = tool.run_ok()?;
        parse(&output.stdout).map_err(|e| TransportError::Malformed {
            command: tool.describe(),
            detail: e.detail,
        })
    }
}

impl Gateway for GhCli {
    fn current_user(&self) -> Result<String, TransportError> {
        let output = self
            .tool()
            .args(&["api", "user", "--jq", ".login"])
            .run_ok()?;
        Ok(output.stdout.trim().to_string())
    }

    fn repo_info(&self) -> Result<RepoInfo, TransportError> {
        let tool = self.tool().args(&["repo", "view", "--json", "owner,name"]);
        Self::parsed(&tool, adapters::parse_repo_view)
    }

    fn list_items(
        &self,
        kind: ItemKind,
        assignee: &str,
        label: &str,
    ) -> Result<Vec<Item>, TransportError> {
        let fields = match kind {
            ItemKind::Issue => "number,title,labels",
            ItemKind::PullRequest => "number,title,headRefName,labels",
        };
        let tool = self.tool().args(&[
            kind.as_cli(),
            "list",
            "--assignee",
            assignee,
            "--label",
            label,
            "--json",
            fields,
            "--limit",
            LIST_LIMIT,
        ]);
        Self::parsed(&tool, |json| adapters::parse_items(kind, json))
    }

    fn add_label(&self, kind: ItemKind, number: u64, label: &str) -> Result<(), TransportError> {
        debug!(number, label, "adding label");
        self.tool()
            .args(&[kind.as_cli(), "edit", &number.to_string(), "--add-label", label])
            .run_ok()?;
        Ok(())
    }

    fn remove_label(
        &self,
        kind: ItemKind,
        number: u64,
        label: &str,
    ) -> Result<(), TransportError> {
        debug!(number, label, "removing label");
        self.tool()
            .args(&[kind.as_cli(), "edit", &number.to_string(), "--remove-label", label])
            .run_ok()?;
        Ok(())
    }

    fn fetch_review_threads_page(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        cursor: Option<&str>,
    ) -> Result<ReviewThreadsPage, TransportError> {
        let mut tool = self.tool().args(&[
            "api",
            "graphql",
            "-F",
            &format!("owner={owner}"),
            "-F",
            &format!("repo={repo}"),
            "-F",
            &format!("number={number}"),
        ]);
        if let Some(cursor) = cursor {
            tool = tool.args(&["-f", &format!("cursor={cursor}")]);
        }
        let tool = tool.args(&["-f", &format!("query={}", adapters::REVIEW_THREADS_QUERY)]);
        Self::parsed(&tool, adapters::parse_review_threads_page)
    }

    fn issue_body(&self, number: u64) -> Result<String, TransportError> {
        let tool = self
            .tool()
            .args(&["issue", "view", &number.to_string(), "--json", "body"]);
        Self::parsed(&tool, adapters::parse_issue_body)
    }

    fn last_comment(&self, number: u64) -> Result<Option<Comment>, TransportError> {
        let tool = self
            .tool()
            .args(&["issue", "view", &number.to_string(), "--json", "comments"]);
        Self::parsed(&tool, adapters::parse_last_comment)
    }

    fn post_comment(&self, number: u64, body: &str) -> Result<(), TransportError> {
        self.tool()
            .args(&["issue", "comment", &number.to_string(), "--body", body])
            .run_ok()?;
        Ok(())
    }

    fn close_issue(&self, number: u64) -> Result<(), TransportError> {
        self.tool()
            .args(&["issue", "close", &number.to_string()])
            .run_ok()?;
        Ok(())
    }

    fn create_label(&self, label: &LabelSpec) -> Result<bool, TransportError> {
        let result = self
            .tool()
            .args(&[
                "label",
                "create",
                label.name,
                "--color",
                label.color,
                "--description",
                label.description,
            ])
            .run_ok();
        match result {
            Ok(_) => Ok(true),
            Err(TransportError::Failed { ref message, .. })
                if message.contains("already exists") =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
