pub mod types;

pub use types::ReportFormat;

use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::review::Annotation;
use crate::session::ReviewSession;
use crate::source::{ActivityRecord, AggregatedActivity};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// `daily-summary-<YYYY-MM-DD>.md` for the given generation date.
pub fn file_name(date: NaiveDate) -> String {
    format!("daily-summary-{}.md", date.format("%Y-%m-%d"))
}

/// Render the session in `format` and write it to `dir` in one call.
/// Returns the path of the written file.
#[instrument(skip(session), fields(annotations = session.annotations.len()))]
pub fn write(
    session: &ReviewSession,
    format: ReportFormat,
    dir: &Path,
    generated_at: NaiveDateTime,
) -> Result<PathBuf, ReportError> {
    let markdown = render(session, format, generated_at);
    let path = dir.join(file_name(generated_at.date()));
    debug!(path = %path.display(), bytes = markdown.len(), "writing report to file");
    std::fs::write(&path, markdown)?;
    Ok(path)
}

pub fn render(session: &ReviewSession, format: ReportFormat, generated_at: NaiveDateTime) -> String {
    match format {
        ReportFormat::Detailed => render_detailed(&session.annotations, generated_at),
        ReportFormat::Simplified => render_simplified(&session.annotations, &session.activity, generated_at),
    }
}

fn header(generated_at: NaiveDateTime) -> String {
    format!("# Daily Work Summary - {}\n\n", generated_at.format("%A, %B %-d, %Y"))
}

/// One numbered section per annotation, then a generation footer.
///
/// ```text
/// # Daily Work Summary - Friday, March 14, 2025
/// ## Summary
/// Worked on **2 issue(s)** today.
/// ## 1. [ENG-101] Add daily summary command
/// **Status:** In Progress | **Priority:** High
/// ```
pub fn render_detailed(annotations: &[Annotation], generated_at: NaiveDateTime) -> String {
    let mut md = header(generated_at);

    if annotations.is_empty() {
        md.push_str("No work recorded for today.\n");
        return md;
    }

    md.push_str("## Summary\n\n");
    md.push_str(&format!("Worked on **{} issue(s)** today.\n\n", annotations.len()));

    for (i, annotation) in annotations.iter().enumerate() {
        let issue = &annotation.detail;
        md.push_str(&format!("## {}. [{}] {}\n\n", i + 1, issue.identifier, issue.title));
        md.push_str(&format!(
            "**Status:** {} | **Priority:** {}\n\n",
            issue.state.name, issue.priority_label
        ));
        md.push_str(&format!("[View in Linear]({})\n\n", issue.url));

        if !issue.labels.is_empty() {
            let labels: Vec<String> = issue.labels.iter().map(|l| format!("`{}`", l.name)).collect();
            md.push_str(&format!("**Labels:** {}\n\n", labels.join(", ")));
        }

        if !annotation.notes.is_empty() {
            md.push_str("### Work Completed\n\n");
            md.push_str(&format!("{}\n\n", annotation.notes));
        }

        md.push_str("---\n\n");
    }

    md.push_str(&format!("\n*Generated at {}*\n", generated_at.format("%Y-%m-%d %H:%M:%S")));
    md
}

/// GitHub activity bullets followed by tracked issues with their notes
/// as nested bullets. Sections without content are left out.
pub fn render_simplified(
    annotations: &[Annotation],
    activity: &AggregatedActivity,
    generated_at: NaiveDateTime,
) -> String {
    let mut md = header(generated_at);

    if !activity.is_empty() {
        md.push_str("## GitHub Activity\n\n");
        push_records(&mut md, &activity.pull_requests_created, "");
        push_records(&mut md, &activity.issues_created, "");
        push_records(&mut md, &activity.pull_requests_reviewed, " - Reviewed");

        if !activity.commits_by_repo.is_empty() {
            for (repo, count) in &activity.commits_by_repo {
                md.push_str(&format!("- {}: {} commit(s)\n", repo, count));
            }
            md.push('\n');
        }
    }

    if !annotations.is_empty() {
        md.push_str("## Linear Issues\n\n");
        for annotation in annotations {
            let issue = &annotation.detail;
            md.push_str(&format!("- [{}: {}]({})\n", issue.identifier, issue.title, issue.url));
            for line in annotation.notes.lines().map(str::trim).filter(|l| !l.is_empty()) {
                md.push_str(&format!("  - {}\n", line));
            }
        }
        md.push('\n');
    }

    if annotations.is_empty() && activity.is_empty() {
        md.push_str("No activity recorded for this period.\n");
    }

    md
}

fn push_records(md: &mut String, records: &[ActivityRecord], suffix: &str) {
    if records.is_empty() {
        return;
    }
    for record in records {
        md.push_str(&format!(
            "- [{}/{}#{}: {}]({}){}\n",
            record.repo_owner, record.repo_name, record.number, record.title, record.url, suffix
        ));
    }
    md.push('\n');
}
