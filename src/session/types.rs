use std::path::PathBuf;

use crate::review::Annotation;
use crate::source::{AggregatedActivity, CandidateItem, TimeWindow};

/// In-memory state of one run. Discarded once the report is written.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub window: TimeWindow,
    /// Candidates in listing order
    pub candidates: Vec<CandidateItem>,
    /// Confirmed annotations in review order
    pub annotations: Vec<Annotation>,
    pub activity: AggregatedActivity,
}

impl ReviewSession {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            candidates: Vec::new(),
            annotations: Vec::new(),
            activity: AggregatedActivity::default(),
        }
    }

    /// False when there is nothing to review and nothing to summarize.
    pub fn has_activity(&self) -> bool {
        !self.candidates.is_empty() || !self.activity.is_empty()
    }
}

/// Per-run counts narrated at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewTally {
    pub worked: usize,
    pub not_worked: usize,
    pub skipped: usize,
    pub failed_details: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing to review or summarize; no file was written
    NoActivity,
    /// Report written to this path
    Written(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub tally: ReviewTally,
}
