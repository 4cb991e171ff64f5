use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// The period a run reports on. `since` is always strictly before `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the `hours` leading up to `until`.
    /// Returns None for a zero-length lookback.
    pub fn lookback(until: DateTime<Utc>, hours: u32) -> Option<TimeWindow> {
        if hours == 0 {
            return None;
        }
        Some(TimeWindow {
            since: until - Duration::hours(i64::from(hours)),
            until,
        })
    }

    /// Length of the window in whole hours.
    pub fn hours(&self) -> i64 {
        (self.until - self.since).num_hours()
    }
}

/// Lightweight reference returned by a bulk listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    /// Opaque identifier used for the detail fetch
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Workflow state of an issue, e.g. "In Progress" in the "started" category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    #[allow(dead_code)] // Decoded for completeness, not rendered
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Full record for one candidate, fetched right before it is reviewed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetail {
    pub id: String,
    /// Human-facing key, e.g. "ENG-123"
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub state: WorkflowState,
    pub priority_label: String,
    /// Labels in server order
    pub labels: Vec<Label>,
    /// Comments in server order
    pub comments: Vec<Comment>,
    pub assignee: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemDetail {
    /// Minimal detail for sources that cannot fetch more than the listing gave us.
    pub fn from_candidate(candidate: &CandidateItem) -> ItemDetail {
        ItemDetail {
            id: candidate.id.clone(),
            identifier: candidate.id.clone(),
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            ..ItemDetail::default()
        }
    }
}

/// An issue or pull request the viewer touched on the code host.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)] // state and occurred_at are decoded but not rendered
pub struct ActivityRecord {
    pub repo_owner: String,
    pub repo_name: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Pre-summarized code-host activity over a window.
/// The default value is the zero snapshot used when the fetch fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedActivity {
    pub username: String,
    pub total_commits: u64,
    pub total_issues: u64,
    pub total_pull_requests: u64,
    pub total_reviews: u64,
    /// Commit count keyed by "owner/name", iterated lexicographically
    pub commits_by_repo: BTreeMap<String, u64>,
    pub issues_created: Vec<ActivityRecord>,
    pub pull_requests_created: Vec<ActivityRecord>,
    pub pull_requests_reviewed: Vec<ActivityRecord>,
}

impl AggregatedActivity {
    /// True when every total is zero.
    pub fn is_empty(&self) -> bool {
        self.total_commits == 0
            && self.total_issues == 0
            && self.total_pull_requests == 0
            && self.total_reviews == 0
    }

    /// Fold another snapshot into this one.
    pub fn merge(&mut self, other: AggregatedActivity) {
        if self.username.is_empty() {
            self.username = other.username;
        }
        self.total_commits += other.total_commits;
        self.total_issues += other.total_issues;
        self.total_pull_requests += other.total_pull_requests;
        self.total_reviews += other.total_reviews;
        for (repo, count) in other.commits_by_repo {
            *self.commits_by_repo.entry(repo).or_insert(0) += count;
        }
        self.issues_created.extend(other.issues_created);
        self.pull_requests_created.extend(other.pull_requests_created);
        self.pull_requests_reviewed.extend(other.pull_requests_reviewed);
    }
}
