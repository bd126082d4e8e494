use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{Task, TaskStatus};

const INDENT: &str = "  ";
const GAP: &str = "  ";
const STATUS_WIDTH: usize = 9;
const DURATION_WIDTH: usize = 8;
const MIN_TITLE_WIDTH: usize = 10;

/// Render the task table for a terminal `width` columns wide.
///
/// Running tasks come first, then finished ones, each in registration order.
/// Titles are truncated by display width, so double-width glyphs count as two
/// columns.
pub fn render_table(tasks: &[Task], now: DateTime<Utc>, width: usize) -> String {
    if tasks.is_empty() {
        return "No tasks yet\n".to_string();
    }

    let id_width = tasks
        .iter()
        .map(|t| format!("#{}", t.id).len())
        .max()
        .unwrap_or(2);
    let fixed = INDENT.len() + id_width + GAP.len() * 3 + STATUS_WIDTH + DURATION_WIDTH;
    let title_width = width.saturating_sub(fixed).max(MIN_TITLE_WIDTH);

    let (running, finished): (Vec<&Task>, Vec<&Task>) = tasks
        .iter()
        .partition(|t| t.status == TaskStatus::Running);

    let mut out = String::new();
    for (heading, group) in [("Running", &running), ("Finished", &finished)] {
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{heading} ({})", group.len());
        for task in group {
            let id = format!("#{}", task.id);
            let title = fit(&task.title, title_width);
            let elapsed = format_duration(elapsed(task, now));
            let status = task.status.as_str();
            let _ = write!(out, "{INDENT}{id:<id_width$}{GAP}{title}{GAP}");
            let _ = writeln!(out, "{status:<STATUS_WIDTH$}{GAP}{elapsed:>DURATION_WIDTH$}");
        }
    }
    out
}

fn elapsed(task: &Task, now: DateTime<Utc>) -> Duration {
    let end = task.finished_at.unwrap_or(now);
    (end - task.started_at).to_std().unwrap_or_default()
}

/// Truncate `text` to at most `width` display columns and pad it to exactly
/// `width`. Truncated text ends with an ellipsis.
fn fit(text: &str, width: usize) -> String {
    let text = text.replace(['\n', '\r', '\t'], " ");
    let mut out = if text.width() <= width {
        text
    } else {
        let mut used = 0;
        let mut cut = String::new();
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > width.saturating_sub(1) {
                break;
            }
            used += w;
            cut.push(ch);
        }
        cut.push('…');
        cut
    };
    let pad = width.saturating_sub(out.width());
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

/// Short human form: `42s`, `3m 07s`, `1h 02m`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}
