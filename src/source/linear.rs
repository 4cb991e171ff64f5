use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{CandidateItem, Comment, ItemDetail, Label, TimeWindow, WorkflowState};
use super::{decode_graphql, post_graphql, ActivitySource, Capabilities, SourceError};
use crate::config::LinearConfig;

const ASSIGNED_ISSUES_OPERATION: &str = "MyAssignedIssues";
const ISSUE_DETAILS_OPERATION: &str = "GetIssueDetails";

const ASSIGNED_ISSUES_QUERY: &str = r#"
query MyAssignedIssues($updatedSince: DateTimeOrDuration!) {
  viewer {
    assignedIssues(filter: { updatedAt: { gte: $updatedSince } }) {
      edges {
        node {
          id title url
        }
      }
    }
  }
}
"#;

const ISSUE_DETAILS_QUERY: &str = r#"
query GetIssueDetails($id: String!) {
  issue(id: $id) {
    id
    identifier
    title
    description
    url
    state { name type }
    priorityLabel
    labels { nodes { name color } }
    comments { nodes { body createdAt updatedAt user { name } } }
    assignee { name }
    createdAt
    updatedAt
  }
}
"#;

/// Linear issue tracker. Lists the viewer's recently updated assigned
/// issues and fetches full detail for one issue at a time.
pub struct LinearSource {
    client: reqwest::Client,
    api_token: Option<String>,
    base_url: Option<String>,
}

impl LinearSource {
    pub fn new(config: &LinearConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            base_url: config.base_url.clone().filter(|u| !u.is_empty()),
        }
    }

    /// Endpoint and token, checked before any request goes out.
    fn credentials(&self) -> Result<(&str, &str), SourceError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| SourceError::Configuration("linear.base_url".to_string()))?;
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| SourceError::Configuration("linear.api_token".to_string()))?;
        Ok((base_url, token))
    }
}

#[async_trait]
impl ActivitySource for LinearSource {
    fn name(&self) -> &str {
        "Linear"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            candidates: true,
            detail: true,
            aggregate: false,
        }
    }

    fn check_config(&self) -> Result<(), SourceError> {
        self.credentials().map(|_| ())
    }

    #[instrument(skip(self), fields(hours = window.hours()))]
    async fn list_candidates(&self, window: &TimeWindow) -> Result<Vec<CandidateItem>, SourceError> {
        let (base_url, token) = self.credentials()?;
        let filter = updated_since_filter(window);
        debug!(filter = %filter, "listing assigned issues");

        let body = post_graphql(&self.client, base_url, token, &assigned_issues_payload(&filter)).await?;
        let candidates = parse_assigned_issues(&body)?;
        debug!(candidates = candidates.len(), "decoded assigned issues");
        Ok(candidates)
    }

    #[instrument(skip(self))]
    async fn fetch_detail(&self, id: &str) -> Result<ItemDetail, SourceError> {
        let (base_url, token) = self.credentials()?;
        if id.is_empty() {
            return Err(SourceError::InvalidArgument("issue id is required".to_string()));
        }

        let body = post_graphql(&self.client, base_url, token, &issue_details_payload(id)).await?;
        let detail = parse_issue_details(&body)?;
        debug!(identifier = %detail.identifier, comments = detail.comments.len(), "decoded issue detail");
        Ok(detail)
    }
}

/// Relative `updatedAt` filter for the listing query. Linear filters on whole
/// days, so any window shorter than a day is pinned to `-P1D`.
pub fn updated_since_filter(window: &TimeWindow) -> String {
    let days = (window.hours() / 24).max(1);
    format!("-P{}D", days)
}

pub fn assigned_issues_payload(filter: &str) -> serde_json::Value {
    json!({
        "query": ASSIGNED_ISSUES_QUERY,
        "operationName": ASSIGNED_ISSUES_OPERATION,
        "variables": { "updatedSince": filter },
    })
}

pub fn issue_details_payload(id: &str) -> serde_json::Value {
    json!({
        "query": ISSUE_DETAILS_QUERY,
        "operationName": ISSUE_DETAILS_OPERATION,
        "variables": { "id": id },
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Viewer {
    assigned_issues: Connection<Edge>,
}

#[derive(Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<T>,
}

#[derive(Deserialize)]
struct Edge {
    node: IssueNode,
}

#[derive(Deserialize)]
struct IssueNode {
    id: String,
    title: String,
    url: String,
}

#[derive(Deserialize)]
struct IssueData {
    issue: Option<IssueDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueDto {
    id: String,
    #[serde(default)]
    identifier: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    url: String,
    #[serde(default)]
    state: Option<StateDto>,
    #[serde(default)]
    priority_label: Option<String>,
    #[serde(default)]
    labels: Option<Nodes<LabelDto>>,
    #[serde(default)]
    comments: Option<Nodes<CommentDto>>,
    #[serde(default)]
    assignee: Option<UserDto>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct StateDto {
    name: String,
    #[serde(rename = "type")]
    category: String,
}

#[derive(Deserialize)]
struct LabelDto {
    name: String,
    #[serde(default)]
    color: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentDto {
    #[serde(default)]
    body: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user: Option<UserDto>,
}

#[derive(Deserialize)]
struct UserDto {
    name: String,
}

pub fn parse_assigned_issues(body: &str) -> Result<Vec<CandidateItem>, SourceError> {
    let data: ViewerData = decode_graphql(body)?;
    Ok(data
        .viewer
        .assigned_issues
        .edges
        .into_iter()
        .map(|edge| CandidateItem {
            id: edge.node.id,
            title: edge.node.title,
            url: edge.node.url,
        })
        .collect())
}

pub fn parse_issue_details(body: &str) -> Result<ItemDetail, SourceError> {
    let data: IssueData = decode_graphql(body)?;
    let issue = data
        .issue
        .ok_or_else(|| SourceError::Decode("issue not found".to_string()))?;

    let state = issue
        .state
        .map(|s| WorkflowState {
            name: s.name,
            category: s.category,
        })
        .unwrap_or_default();

    let labels = issue
        .labels
        .map(|l| l.nodes)
        .unwrap_or_default()
        .into_iter()
        .map(|l| Label {
            name: l.name,
            color: l.color,
        })
        .collect();

    let comments = issue
        .comments
        .map(|c| c.nodes)
        .unwrap_or_default()
        .into_iter()
        .map(|c| Comment {
            author: c.user.map(|u| u.name).unwrap_or_else(|| "Unknown".to_string()),
            body: c.body,
            timestamp: c.updated_at.or(c.created_at),
        })
        .collect();

    Ok(ItemDetail {
        id: issue.id,
        identifier: issue.identifier,
        title: issue.title,
        description: issue.description.unwrap_or_default(),
        url: issue.url,
        state,
        priority_label: issue.priority_label.unwrap_or_default(),
        labels,
        comments,
        assignee: issue.assignee.map(|a| a.name).filter(|n| !n.is_empty()),
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    })
}
