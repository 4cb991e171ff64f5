pub mod types;

pub use types::{ReviewSession, ReviewTally, RunOutcome, RunSummary};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::report::{self, ReportError, ReportFormat};
use crate::review::{self, ReviewError, ReviewOutcome};
use crate::source::{CandidateItem, ItemDetail, SourceError, SourceRegistration, TimeWindow};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("lookback must be at least one hour")]
    InvalidWindow,

    #[error("{source_name} fetch failed: {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("failed to write to terminal: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Lookback duration in hours
    pub hours: u32,
    pub format: ReportFormat,
    /// Directory the report file is written to
    pub output_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            hours: 24,
            format: ReportFormat::Simplified,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Drives one run: fetch from every registered source, review each
/// candidate interactively, then write the report.
pub struct Orchestrator {
    sources: Vec<SourceRegistration>,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(sources: Vec<SourceRegistration>, options: RunOptions) -> Self {
        Self { sources, options }
    }

    /// Run the whole pipeline once, reading answers from `input` and
    /// narrating to `out`. `now` sets both the window end and the report date.
    #[instrument(skip_all, fields(hours = self.options.hours, format = %self.options.format))]
    pub async fn run<R: BufRead, W: Write>(
        &self,
        now: DateTime<Local>,
        input: &mut R,
        out: &mut W,
    ) -> Result<RunSummary, SessionError> {
        let window = TimeWindow::lookback(now.with_timezone(&Utc), self.options.hours)
            .ok_or(SessionError::InvalidWindow)?;
        let mut session = ReviewSession::new(window);
        let mut tally = ReviewTally::default();

        self.check_required()?;
        self.collect_aggregates(&mut session, out).await?;
        let queue = self.collect_candidates(&mut session, out).await?;

        if !session.has_activity() {
            info!("no activity in window");
            writeln!(out, "No activity found in the last {} hour(s).", self.options.hours)?;
            return Ok(RunSummary {
                outcome: RunOutcome::NoActivity,
                tally,
            });
        }

        writeln!(out, "Found {} issue(s) to review.", queue.len())?;

        for (index, candidate) in queue {
            let registration = &self.sources[index];
            let source = registration.source.as_ref();

            let detail = if source.capabilities().detail {
                match source.fetch_detail(&candidate.id).await {
                    Ok(detail) => detail,
                    Err(e) => {
                        warn!(source = source.name(), id = %candidate.id, error = %e, "detail fetch failed, skipping item");
                        writeln!(
                            out,
                            "{} could not load \"{}\": {}",
                            "warning:".yellow().bold(),
                            candidate.title,
                            e
                        )?;
                        tally.failed_details += 1;
                        continue;
                    }
                }
            } else {
                ItemDetail::from_candidate(&candidate)
            };

            review::display_detail(&detail, out)?;
            match review::review_item(detail, input, out)? {
                ReviewOutcome::Worked(annotation) => {
                    tally.worked += 1;
                    writeln!(out, "{} recorded {}", "✓".green(), annotation.detail.identifier)?;
                    session.annotations.push(annotation);
                }
                ReviewOutcome::NotWorked => {
                    tally.not_worked += 1;
                }
                ReviewOutcome::Skipped => {
                    tally.skipped += 1;
                    writeln!(out, "Skipped.")?;
                }
            }
        }

        info!(
            worked = tally.worked,
            not_worked = tally.not_worked,
            skipped = tally.skipped,
            failed = tally.failed_details,
            "review finished"
        );

        let path = report::write(&session, self.options.format, &self.options.output_dir, now.naive_local())?;
        writeln!(
            out,
            "\n{} {} ({} worked, {} not worked, {} skipped)",
            "Summary written to".green().bold(),
            path.display(),
            tally.worked,
            tally.not_worked,
            tally.skipped
        )?;

        Ok(RunSummary {
            outcome: RunOutcome::Written(path),
            tally,
        })
    }

    /// Every required source must be usable before any source is queried.
    fn check_required(&self) -> Result<(), SessionError> {
        for registration in self.sources.iter().filter(|r| r.required) {
            let source = registration.source.as_ref();
            source.check_config().map_err(|error| SessionError::Source {
                source_name: source.name().to_string(),
                error,
            })?;
        }
        Ok(())
    }

    async fn collect_aggregates<W: Write>(&self, session: &mut ReviewSession, out: &mut W) -> Result<(), SessionError> {
        for registration in self.sources.iter().filter(|r| r.source.capabilities().aggregate) {
            let source = registration.source.as_ref();
            writeln!(out, "Fetching {} activity...", source.name())?;
            match source.fetch_aggregate(&session.window).await {
                Ok(activity) => session.activity.merge(activity),
                Err(e) => self.degrade(registration, e, out)?,
            }
        }
        Ok(())
    }

    /// List candidates from every listing source, remembering which
    /// registration each came from so detail is fetched from the same one.
    async fn collect_candidates<W: Write>(
        &self,
        session: &mut ReviewSession,
        out: &mut W,
    ) -> Result<Vec<(usize, CandidateItem)>, SessionError> {
        let mut queue = Vec::new();
        for (index, registration) in self.sources.iter().enumerate() {
            let source = registration.source.as_ref();
            if !source.capabilities().candidates {
                continue;
            }
            writeln!(out, "Fetching {} issues...", source.name())?;
            match source.list_candidates(&session.window).await {
                Ok(items) => {
                    session.candidates.extend(items.iter().cloned());
                    queue.extend(items.into_iter().map(|item| (index, item)));
                }
                Err(e) => self.degrade(registration, e, out)?,
            }
        }
        Ok(queue)
    }

    /// Abort on a required source, warn and carry on for an optional one.
    fn degrade<W: Write>(
        &self,
        registration: &SourceRegistration,
        error: SourceError,
        out: &mut W,
    ) -> Result<(), SessionError> {
        let name = registration.source.name();
        if registration.required {
            return Err(SessionError::Source {
                source_name: name.to_string(),
                error,
            });
        }
        warn!(source = name, error = %error, "optional source failed, continuing without it");
        writeln!(out, "{} {} unavailable: {}", "warning:".yellow().bold(), name, error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ActivitySource, AggregatedActivity, Capabilities};
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Issue tracker double serving a fixed set of issues.
    struct FakeTracker {
        issues: Vec<ItemDetail>,
        list_fails: bool,
        broken_id: Option<String>,
        unconfigured: bool,
    }

    impl FakeTracker {
        fn with(identifiers: &[&str]) -> Self {
            Self {
                issues: identifiers.iter().map(|id| issue(id)).collect(),
                list_fails: false,
                broken_id: None,
                unconfigured: false,
            }
        }
    }

    #[async_trait]
    impl ActivitySource for FakeTracker {
        fn name(&self) -> &str {
            "Tracker"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                candidates: true,
                detail: true,
                aggregate: false,
            }
        }

        fn check_config(&self) -> Result<(), SourceError> {
            if self.unconfigured {
                return Err(SourceError::Configuration("linear.api_token".to_string()));
            }
            Ok(())
        }

        async fn list_candidates(&self, _window: &TimeWindow) -> Result<Vec<CandidateItem>, SourceError> {
            if self.list_fails {
                return Err(SourceError::Configuration("linear.base_url".to_string()));
            }
            Ok(self
                .issues
                .iter()
                .map(|i| CandidateItem {
                    id: i.id.clone(),
                    title: i.title.clone(),
                    url: i.url.clone(),
                })
                .collect())
        }

        async fn fetch_detail(&self, id: &str) -> Result<ItemDetail, SourceError> {
            if self.broken_id.as_deref() == Some(id) {
                return Err(SourceError::Decode("issue not found".to_string()));
            }
            self.issues
                .iter()
                .find(|i| i.id == id)
                .cloned()
                .ok_or_else(|| SourceError::Decode("issue not found".to_string()))
        }
    }

    /// Code host double; `None` simulates a failed fetch.
    struct FakeCodeHost {
        activity: Option<AggregatedActivity>,
    }

    #[async_trait]
    impl ActivitySource for FakeCodeHost {
        fn name(&self) -> &str {
            "CodeHost"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                aggregate: true,
                ..Capabilities::default()
            }
        }

        async fn fetch_aggregate(&self, _window: &TimeWindow) -> Result<AggregatedActivity, SourceError> {
            self.activity
                .clone()
                .ok_or_else(|| SourceError::Configuration("github.api_token".to_string()))
        }
    }

    /// Code host double that remembers whether it was ever queried.
    struct WatchedCodeHost {
        queried: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ActivitySource for WatchedCodeHost {
        fn name(&self) -> &str {
            "CodeHost"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                aggregate: true,
                ..Capabilities::default()
            }
        }

        async fn fetch_aggregate(&self, _window: &TimeWindow) -> Result<AggregatedActivity, SourceError> {
            self.queried.store(true, Ordering::SeqCst);
            Ok(commits(1))
        }
    }

    fn issue(identifier: &str) -> ItemDetail {
        ItemDetail {
            id: format!("uuid-{}", identifier),
            identifier: identifier.to_string(),
            title: format!("Work on {}", identifier),
            url: format!("https://linear.app/acme/issue/{}", identifier),
            ..ItemDetail::default()
        }
    }

    fn commits(count: u64) -> AggregatedActivity {
        let mut activity = AggregatedActivity {
            total_commits: count,
            ..AggregatedActivity::default()
        };
        activity.commits_by_repo.insert("org/repo".to_string(), count);
        activity
    }

    fn orchestrator(tracker: FakeTracker, host: FakeCodeHost, dir: &std::path::Path) -> Orchestrator {
        Orchestrator::new(
            vec![SourceRegistration::optional(host), SourceRegistration::required(tracker)],
            RunOptions {
                output_dir: dir.to_path_buf(),
                ..RunOptions::default()
            },
        )
    }

    async fn run(orchestrator: &Orchestrator, input: &str) -> (Result<RunSummary, SessionError>, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let result = orchestrator.run(Local::now(), &mut reader, &mut out).await;
        (result, String::from_utf8_lossy(&out).into_owned())
    }

    fn written(summary: &RunSummary) -> String {
        match &summary.outcome {
            RunOutcome::Written(path) => std::fs::read_to_string(path).unwrap(),
            RunOutcome::NoActivity => panic!("expected a written report"),
        }
    }

    #[tokio::test]
    async fn test_no_activity_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let o = orchestrator(
            FakeTracker::with(&[]),
            FakeCodeHost { activity: Some(AggregatedActivity::default()) },
            dir.path(),
        );
        let (result, narration) = run(&o, "").await;
        assert_eq!(result.unwrap().outcome, RunOutcome::NoActivity);
        assert!(narration.contains("No activity found"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_code_host_failure_still_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let o = orchestrator(FakeTracker::with(&["ENG-1"]), FakeCodeHost { activity: None }, dir.path());
        let (result, narration) = run(&o, "y\nfixed it\n\n").await;

        let summary = result.unwrap();
        assert_eq!(summary.tally.worked, 1);
        assert!(narration.contains("CodeHost unavailable"));

        let expected = dir.path().join(report::file_name(Local::now().date_naive()));
        assert_eq!(summary.outcome, RunOutcome::Written(expected));
        let content = written(&summary);
        assert!(!content.contains("## GitHub Activity"));
        assert!(content.contains("## Linear Issues"));
        assert!(content.contains("  - fixed it\n"));
    }

    #[tokio::test]
    async fn test_required_listing_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FakeTracker::with(&["ENG-1"]);
        tracker.list_fails = true;
        let o = orchestrator(tracker, FakeCodeHost { activity: Some(commits(3)) }, dir.path());

        let (result, _) = run(&o, "").await;
        match result {
            Err(SessionError::Source { source_name, error }) => {
                assert_eq!(source_name, "Tracker");
                assert!(matches!(error, SourceError::Configuration(_)));
            }
            other => panic!("expected source error, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_required_source_aborts_before_any_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let queried = Arc::new(AtomicBool::new(false));
        let mut tracker = FakeTracker::with(&["ENG-1"]);
        tracker.unconfigured = true;
        let o = Orchestrator::new(
            vec![
                SourceRegistration::optional(WatchedCodeHost { queried: Arc::clone(&queried) }),
                SourceRegistration::required(tracker),
            ],
            RunOptions {
                output_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );

        let (result, narration) = run(&o, "").await;
        match result {
            Err(SessionError::Source { source_name, error }) => {
                assert_eq!(source_name, "Tracker");
                assert!(matches!(error, SourceError::Configuration(ref key) if key == "linear.api_token"));
            }
            other => panic!("expected source error, got {:?}", other),
        }
        assert!(!queried.load(Ordering::SeqCst));
        assert!(!narration.contains("Fetching"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_optional_listing_failure_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FakeTracker::with(&["ENG-1"]);
        tracker.list_fails = true;
        let o = Orchestrator::new(
            vec![
                SourceRegistration::optional(FakeCodeHost { activity: Some(commits(2)) }),
                SourceRegistration::optional(tracker),
            ],
            RunOptions {
                output_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );
        let (result, _) = run(&o, "").await;
        let content = written(&result.unwrap());
        assert!(content.contains("- org/repo: 2 commit(s)"));
    }

    #[tokio::test]
    async fn test_detail_failure_skips_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FakeTracker::with(&["ENG-1", "ENG-2"]);
        tracker.broken_id = Some("uuid-ENG-1".to_string());
        let o = orchestrator(tracker, FakeCodeHost { activity: None }, dir.path());

        let (result, narration) = run(&o, "y\nsecond item\n\n").await;
        let summary = result.unwrap();
        assert_eq!(summary.tally.failed_details, 1);
        assert_eq!(summary.tally.worked, 1);
        assert!(narration.contains("could not load \"Work on ENG-1\""));

        let content = written(&summary);
        assert!(!content.contains("ENG-1:"));
        assert!(content.contains("[ENG-2: Work on ENG-2]"));
    }

    #[tokio::test]
    async fn test_annotations_follow_listing_order() {
        let dir = tempfile::tempdir().unwrap();
        let o = orchestrator(
            FakeTracker::with(&["ENG-1", "ENG-2", "ENG-3"]),
            FakeCodeHost { activity: None },
            dir.path(),
        );
        let (result, _) = run(&o, "y\ndid x\ndid y\n\nskip\nyes\n\n").await;
        let summary = result.unwrap();
        assert_eq!(
            summary.tally,
            ReviewTally { worked: 2, not_worked: 0, skipped: 1, failed_details: 0 }
        );

        let content = written(&summary);
        let first = content.find("[ENG-1: Work on ENG-1]").unwrap();
        let did_x = content.find("  - did x\n  - did y\n").unwrap();
        let third = content.find("[ENG-3: Work on ENG-3]").unwrap();
        assert!(first < did_x && did_x < third);
        assert!(!content.contains("ENG-2"));
    }

    #[tokio::test]
    async fn test_nothing_worked_still_reports_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let o = orchestrator(
            FakeTracker::with(&["ENG-1"]),
            FakeCodeHost { activity: Some(commits(5)) },
            dir.path(),
        );
        let (result, _) = run(&o, "n\n").await;
        let summary = result.unwrap();
        assert_eq!(summary.tally.not_worked, 1);

        let content = written(&summary);
        assert!(content.contains("- org/repo: 5 commit(s)"));
        assert!(!content.contains("## Linear Issues"));
    }

    #[tokio::test]
    async fn test_input_closed_aborts_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let o = orchestrator(
            FakeTracker::with(&["ENG-1", "ENG-2"]),
            FakeCodeHost { activity: None },
            dir.path(),
        );
        let (result, _) = run(&o, "n\n").await;
        assert!(matches!(result, Err(SessionError::Review(ReviewError::InputTerminated))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_zero_hours_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let o = Orchestrator::new(
            vec![SourceRegistration::required(FakeTracker::with(&["ENG-1"]))],
            RunOptions {
                hours: 0,
                output_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );
        let (result, _) = run(&o, "").await;
        assert!(matches!(result, Err(SessionError::InvalidWindow)));
    }

    #[tokio::test]
    async fn test_detailed_format_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let o = Orchestrator::new(
            vec![SourceRegistration::required(FakeTracker::with(&["ENG-1"]))],
            RunOptions {
                format: ReportFormat::Detailed,
                output_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );
        let (result, _) = run(&o, "y\nshipped\n\n").await;
        let content = written(&result.unwrap());
        assert!(content.contains("## 1. [ENG-1] Work on ENG-1"));
        assert!(content.contains("### Work Completed\n\nshipped\n"));
    }
}
