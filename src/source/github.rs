use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{ActivityRecord, AggregatedActivity, TimeWindow};
use super::{decode_graphql, post_graphql, ActivitySource, Capabilities, SourceError};
use crate::config::GitHubConfig;

pub const GRAPHQL_URL: &str = "https://api.github.com/graphql";

const CONTRIBUTIONS_QUERY: &str = r#"
query($from: DateTime!, $to: DateTime!) {
  viewer {
    login
    contributionsCollection(from: $from, to: $to) {
      totalCommitContributions
      totalIssueContributions
      totalPullRequestContributions
      totalPullRequestReviewContributions
      commitContributionsByRepository {
        repository { name owner { login } }
        contributions(first: 100) {
          nodes { commitCount occurredAt }
        }
      }
      issueContributions(first: 100) {
        nodes {
          issue { title url number repository { name owner { login } } }
          occurredAt
        }
      }
      pullRequestContributions(first: 100) {
        nodes {
          pullRequest { title url number state repository { name owner { login } } }
          occurredAt
        }
      }
      pullRequestReviewContributions(first: 100) {
        nodes {
          pullRequest { title url number repository { name owner { login } } }
          occurredAt
        }
      }
    }
  }
}
"#;

/// GitHub contributions for the authenticated viewer. Only reports an
/// aggregated snapshot; there is no per-item review step.
pub struct GitHubSource {
    client: reqwest::Client,
    api_token: Option<String>,
}

impl GitHubSource {
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
        }
    }

    fn token(&self) -> Result<&str, SourceError> {
        self.api_token
            .as_deref()
            .ok_or_else(|| SourceError::Configuration("github.api_token".to_string()))
    }
}

#[async_trait]
impl ActivitySource for GitHubSource {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            candidates: false,
            detail: false,
            aggregate: true,
        }
    }

    fn check_config(&self) -> Result<(), SourceError> {
        self.token().map(|_| ())
    }

    #[instrument(skip(self), fields(since = %window.since, until = %window.until))]
    async fn fetch_aggregate(&self, window: &TimeWindow) -> Result<AggregatedActivity, SourceError> {
        let token = self.token()?;
        let authorization = format!("Bearer {}", token);
        let body = post_graphql(&self.client, GRAPHQL_URL, &authorization, &contributions_payload(window)).await?;
        let activity = parse_contributions(&body)?;
        debug!(
            user = %activity.username,
            commits = activity.total_commits,
            pull_requests = activity.total_pull_requests,
            reviews = activity.total_reviews,
            "decoded contributions"
        );
        Ok(activity)
    }
}

pub fn contributions_payload(window: &TimeWindow) -> serde_json::Value {
    json!({
        "query": CONTRIBUTIONS_QUERY,
        "variables": {
            "from": window.since.to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": window.until.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    })
}

#[derive(Deserialize)]
struct Data {
    viewer: Viewer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Viewer {
    login: String,
    contributions_collection: Contributions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contributions {
    total_commit_contributions: u64,
    total_issue_contributions: u64,
    total_pull_request_contributions: u64,
    total_pull_request_review_contributions: u64,
    #[serde(default)]
    commit_contributions_by_repository: Vec<RepoCommits>,
    issue_contributions: Nodes<IssueContribution>,
    pull_request_contributions: Nodes<PullRequestContribution>,
    pull_request_review_contributions: Nodes<PullRequestContribution>,
}

#[derive(Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct RepoCommits {
    repository: Repository,
    contributions: Nodes<CommitCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitCount {
    commit_count: u64,
}

#[derive(Deserialize)]
struct Repository {
    name: String,
    owner: Owner,
}

#[derive(Deserialize)]
struct Owner {
    login: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueContribution {
    issue: Subject,
    occurred_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestContribution {
    pull_request: Subject,
    occurred_at: Option<DateTime<Utc>>,
}

/// An issue or pull request as GitHub reports it inside a contribution.
#[derive(Deserialize)]
struct Subject {
    title: String,
    url: String,
    number: u64,
    #[serde(default)]
    state: Option<String>,
    repository: Repository,
}

impl Subject {
    fn into_record(self, occurred_at: Option<DateTime<Utc>>) -> ActivityRecord {
        ActivityRecord {
            repo_owner: self.repository.owner.login,
            repo_name: self.repository.name,
            number: self.number,
            title: self.title,
            url: self.url,
            state: self.state,
            occurred_at,
        }
    }
}

pub fn parse_contributions(body: &str) -> Result<AggregatedActivity, SourceError> {
    let data: Data = decode_graphql(body)?;
    let viewer = data.viewer;
    let collection = viewer.contributions_collection;

    let mut activity = AggregatedActivity {
        username: viewer.login,
        total_commits: collection.total_commit_contributions,
        total_issues: collection.total_issue_contributions,
        total_pull_requests: collection.total_pull_request_contributions,
        total_reviews: collection.total_pull_request_review_contributions,
        ..AggregatedActivity::default()
    };

    for repo in collection.commit_contributions_by_repository {
        let key = format!("{}/{}", repo.repository.owner.login, repo.repository.name);
        let commits: u64 = repo.contributions.nodes.iter().map(|n| n.commit_count).sum();
        *activity.commits_by_repo.entry(key).or_insert(0) += commits;
    }

    activity.issues_created = collection
        .issue_contributions
        .nodes
        .into_iter()
        .map(|c| c.issue.into_record(c.occurred_at))
        .collect();
    activity.pull_requests_created = collection
        .pull_request_contributions
        .nodes
        .into_iter()
        .map(|c| c.pull_request.into_record(c.occurred_at))
        .collect();
    activity.pull_requests_reviewed = collection
        .pull_request_review_contributions
        .nodes
        .into_iter()
        .map(|c| c.pull_request.into_record(c.occurred_at))
        .collect();

    Ok(activity)
}
