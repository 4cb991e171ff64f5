pub mod types;

pub use types::{Annotation, ReviewOutcome};

use colored::Colorize;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::source::ItemDetail;

/// Most recent comments shown when displaying an item.
pub const MAX_COMMENTS_SHOWN: usize = 10;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("standard input closed during review")]
    InputTerminated,

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Print an item so the user can decide whether they worked on it.
///
/// Shows identifier, title, URL, state, priority, timestamps, assignee,
/// labels and description when present, then the last
/// `MAX_COMMENTS_SHOWN` comments oldest first.
pub fn display_detail<W: Write>(detail: &ItemDetail, out: &mut W) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "═".repeat(RULE_WIDTH))?;
    writeln!(out, "{}", format!("{}: {}", detail.identifier, detail.title).bold())?;
    writeln!(out, "{}", "═".repeat(RULE_WIDTH))?;
    writeln!(out)?;

    writeln!(out, "{} {}", "URL:".bold(), detail.url)?;
    if detail.state.category.is_empty() {
        writeln!(out, "{} {}", "State:".bold(), detail.state.name)?;
    } else {
        writeln!(out, "{} {} ({})", "State:".bold(), detail.state.name, detail.state.category)?;
    }
    writeln!(out, "{} {}", "Priority:".bold(), detail.priority_label)?;
    if let Some(created) = detail.created_at {
        writeln!(out, "{} {}", "Created:".bold(), created.format("%Y-%m-%d %H:%M"))?;
    }
    if let Some(updated) = detail.updated_at {
        writeln!(out, "{} {}", "Updated:".bold(), updated.format("%Y-%m-%d %H:%M"))?;
    }
    if let Some(assignee) = &detail.assignee {
        writeln!(out, "{} {}", "Assignee:".bold(), assignee)?;
    }

    if !detail.labels.is_empty() {
        let names: Vec<&str> = detail.labels.iter().map(|l| l.name.as_str()).collect();
        writeln!(out, "{} {}", "Labels:".bold(), names.join(", "))?;
    }

    if !detail.description.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Description:".bold())?;
        writeln!(out, "{}", "─".repeat(RULE_WIDTH))?;
        writeln!(out, "{}", detail.description.trim_end())?;
        writeln!(out, "{}", "─".repeat(RULE_WIDTH))?;
    }

    if !detail.comments.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} ({} total)", "Comments".bold(), detail.comments.len())?;
        let start = detail.comments.len().saturating_sub(MAX_COMMENTS_SHOWN);
        if start > 0 {
            writeln!(out, "   (showing last {})", MAX_COMMENTS_SHOWN)?;
        }
        for comment in &detail.comments[start..] {
            let when = comment
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            writeln!(out)?;
            writeln!(out, "  {} {}", format!("{}:", comment.author).cyan(), when.dimmed())?;
            for line in comment.body.trim_end().lines() {
                writeln!(out, "     {}", line)?;
            }
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Ask whether the user worked on `detail` and collect their notes.
///
/// "n"/"no" yields `NotWorked`, "s"/"skip" yields `Skipped`, any other
/// answer (a blank one included) moves on to note collection, which ends at
/// the first empty line. End of input in either state is
/// `ReviewError::InputTerminated`.
#[instrument(skip_all, fields(id = %detail.id, identifier = %detail.identifier))]
pub fn review_item<R: BufRead, W: Write>(
    detail: ItemDetail,
    input: &mut R,
    out: &mut W,
) -> Result<ReviewOutcome, ReviewError> {
    writeln!(out, "\n{}", "Did you work on this issue? (y/n/skip)".yellow().bold())?;
    write!(out, "> ")?;
    out.flush()?;

    let answer = read_line(input)?.trim().to_lowercase();
    match answer.as_str() {
        "n" | "no" => {
            debug!("not worked");
            return Ok(ReviewOutcome::NotWorked);
        }
        "s" | "skip" => {
            debug!("skipped");
            return Ok(ReviewOutcome::Skipped);
        }
        _ => {}
    }

    writeln!(out, "\n{}", "Describe what you did:".bold())?;
    writeln!(out, "   (press Enter on an empty line to finish)")?;

    let mut lines: Vec<String> = Vec::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let line = read_line(input)?;
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            break;
        }
        lines.push(line.to_string());
    }

    debug!(note_lines = lines.len(), "collected notes");
    Ok(ReviewOutcome::Worked(Annotation {
        detail,
        notes: lines.join("\n"),
    }))
}

/// Read one raw line, terminator included. End of input is an error.
fn read_line<R: BufRead>(input: &mut R) -> Result<String, ReviewError> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Err(ReviewError::InputTerminated);
    }
    Ok(buf)
}
