//! Agent prompt rendering.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::ExitError;

pub const EXEC_ISSUE_PROMPT: &str = "/exec-issue {{ number }}";
pub const CREATE_ISSUE_PROMPT: &str = "/create-issue {{ body }}";
pub const UPDATE_ISSUE_PROMPT: &str =
    "/update-issue\nIssue番号: {{ number }}\n依頼内容: \n{{ comment }}";
pub const FIX_REVIEW_POINT_PROMPT: &str = "/fix-review-point {{ branch }}";

/// Values a prompt template can reference.
///
/// Fields that are `None` are left out of the context entirely, so a
/// template that references them fails to render instead of printing an
/// empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    pub number: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_author: Option<String>,
}

fn environment<'s>() -> Environment<'s> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env
}

/// Render a prompt template against `ctx`.
pub fn render_prompt(source: &str, ctx: &PromptContext) -> anyhow::Result<String> {
    let env = environment();
    let rendered = env.render_str(source, ctx)?;
    Ok(rendered)
}

/// Check that a template parses, without rendering it.
pub fn validate(name: &str, source: &str) -> anyhow::Result<()> {
    let mut env = environment();
    env.add_template(name, source)
        .map_err(|e| ExitError::Config(format!("invalid prompt template for {name}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(number: u64) -> PromptContext {
        PromptContext {
            number,
            title: "Add retries".to_string(),
            ..PromptContext::default()
        }
    }

    #[test]
    fn exec_issue_prompt() {
        assert_eq!(render_prompt(EXEC_ISSUE_PROMPT, &ctx(42)).unwrap(), "/exec-issue 42");
    }

    #[test]
    fn update_issue_prompt_keeps_layout() {
        let c = PromptContext {
            comment: Some("Please split the\nsecond step".to_string()),
            comment_author: Some("alice".to_string()),
            ..ctx(12)
        };
        assert_eq!(
            render_prompt(UPDATE_ISSUE_PROMPT, &c).unwrap(),
            "/update-issue\nIssue番号: 12\n依頼内容: \nPlease split the\nsecond step"
        );
    }

    #[test]
    fn values_are_not_html_escaped() {
        let c = PromptContext {
            body: Some("use <T> & \"quotes\"".to_string()),
            ..ctx(1)
        };
        assert_eq!(
            render_prompt(CREATE_ISSUE_PROMPT, &c).unwrap(),
            "/create-issue use <T> & \"quotes\""
        );
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = render_prompt(FIX_REVIEW_POINT_PROMPT, &ctx(3));
        assert!(err.is_err());
    }

    #[test]
    fn validate_rejects_broken_syntax() {
        assert!(validate("exec-issue", "/exec-issue {{ number").is_err());
        assert!(validate("exec-issue", EXEC_ISSUE_PROMPT).is_ok());
    }
}
