//! Redmine REST client implementing [`domain::Tracker`]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::config::TrackerConfig;
use domain::{Collaborator, DomainError, DomainResult, Item, ItemId, ItemPage, Journal, Tracker};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "X-Redmine-API-Key";

#[derive(Debug, Clone)]
pub struct RedmineClient {
    base_url: String,
    api_key: String,
    page_size: usize,
    client: Client,
    timeout: Duration,
}

impl RedmineClient {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(anyhow!("Redmine URL cannot be empty"));
        }

        let timeout = config.request_timeout();
        let mut builder = Client::builder().timeout(timeout);
        if config.disable_proxy {
            builder = builder.no_proxy();
            info!("Proxy disabled for Redmine requests");
        }
        let client = builder
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_size: config.page_size.max(1) as usize,
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
    }

    fn transport_error(&self, operation: &str, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            DomainError::Timeout {
                collaborator: Collaborator::Tracker,
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            DomainError::unavailable(Collaborator::Tracker, format!("{operation}: {e}"))
        }
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> DomainResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DomainError::unavailable(
            Collaborator::Tracker,
            format!("{operation}: HTTP {status}: {}", body.trim()),
        ))
    }

    async fn fetch_list(&self, operation: &str, query: &[(&str, String)]) -> DomainResult<IssueList> {
        let response = self.send(operation, self.get("/issues.json").query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| self.transport_error(operation, e))
    }
}

#[async_trait]
impl Tracker for RedmineClient {
    // `/issues.json` never returns journals; only `/issues/{id}.json` does
    async fn items_since(&self, since: DateTime<Utc>) -> DomainResult<Vec<Item>> {
        let since_str = since.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .fetch_list(
                    "items_since",
                    &[
                        ("created_on", format!(">={since_str}")),
                        ("sort", "created_on:asc".to_string()),
                        ("limit", self.page_size.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;

            let fetched = page.issues.len();
            items.extend(page.issues.into_iter().map(Item::from));
            offset += fetched;
            if fetched < self.page_size || page.total_count.is_some_and(|total| offset >= total) {
                break;
            }
        }

        items.sort_by_key(|item| item.created_on);
        info!(count = items.len(), since = %since_str, "Fetched items created since boundary");
        Ok(items)
    }

    async fn item(&self, id: ItemId) -> DomainResult<Item> {
        let request = self
            .get(&format!("/issues/{id}.json"))
            .query(&[("include", "journals")]);
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error("item", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DomainError::not_found("item", id));
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(DomainError::unavailable(
                Collaborator::Tracker,
                format!("item {id}: HTTP {status}"),
            ));
        }

        let envelope: IssueEnvelope = response
            .json()
            .await
            .map_err(|e| self.transport_error("item", e))?;
        Ok(envelope.issue.into())
    }

    async fn post_comment(&self, id: ItemId, text: &str) -> DomainResult<()> {
        let request = self
            .client
            .put(format!("{}/issues/{id}.json", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&NotesUpdate {
                issue: NotesBody { notes: text },
            });

        self.send("post_comment", request).await?;
        info!(item_id = id, "Comment posted to Redmine");
        Ok(())
    }

    async fn items_page(&self, offset: usize, limit: usize) -> DomainResult<ItemPage> {
        let page = self
            .fetch_list(
                "items_page",
                &[
                    ("status_id", "*".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;

        let items: Vec<Item> = page.issues.into_iter().map(Item::from).collect();
        let total_count = page.total_count.unwrap_or(offset + items.len());
        debug!(offset, fetched = items.len(), total_count, "Fetched item page");
        Ok(ItemPage { items, total_count })
    }
}

// Redmine wire types
#[derive(Debug, Deserialize)]
struct IssueList {
    issues: Vec<RedmineIssue>,
    total_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct IssueEnvelope {
    issue: RedmineIssue,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RedmineIssue {
    id: ItemId,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    description: Option<String>,
    project: Option<NamedRef>,
    tracker: Option<NamedRef>,
    status: Option<NamedRef>,
    priority: Option<NamedRef>,
    author: Option<NamedRef>,
    created_on: DateTime<Utc>,
    updated_on: DateTime<Utc>,
    #[serde(default)]
    journals: Vec<RedmineJournal>,
}

#[derive(Debug, Deserialize)]
struct RedmineJournal {
    id: u64,
    user: Option<NamedRef>,
    notes: Option<String>,
    created_on: Option<DateTime<Utc>>,
}

fn name_of(reference: Option<NamedRef>) -> String {
    reference.map(|r| r.name).unwrap_or_default()
}

impl From<RedmineIssue> for Item {
    fn from(issue: RedmineIssue) -> Self {
        Item {
            id: issue.id,
            subject: issue.subject,
            description: issue.description.unwrap_or_default(),
            status: name_of(issue.status),
            priority: name_of(issue.priority),
            project: name_of(issue.project),
            tracker: name_of(issue.tracker),
            author: issue.author.map(|a| a.name),
            created_on: issue.created_on,
            updated_on: issue.updated_on,
            journals: issue
                .journals
                .into_iter()
                .map(|j| Journal {
                    id: j.id,
                    author: j.user.map(|u| u.name),
                    notes: j.notes,
                    created_on: j.created_on,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct NotesUpdate<'a> {
    issue: NotesBody<'a>,
}

#[derive(Debug, Serialize)]
struct NotesBody<'a> {
    notes: &'a str,
}
