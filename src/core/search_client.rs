use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::errors::CoreError;
use super::models::CandidateRecord;

const SEARCH_ROUTE: &str = "/api/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<Value>>,
}

/// Client for the candidate keyword-search endpoint.
pub struct CandidateSearchClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl CandidateSearchClient {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: format!("{}{SEARCH_ROUTE}", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<CandidateRecord>> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&json!({ "query": query }))
            .send()
            .await
            .with_context(|| format!("search request for '{query}' failed"))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::SearchApi {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read search response for '{query}'"))?;

        let payload = serde_json::from_str::<SearchResponse>(&body)
            .map_err(|err| CoreError::MalformedResponse(format!("search response: {err}")))?;
        let raw = payload.results.ok_or_else(|| {
            CoreError::MalformedResponse("search response has no results field".to_string())
        })?;

        Ok(parse_records(raw))
    }
}

/// Converts raw result entries, skipping any that are not candidate objects.
pub fn parse_records(raw: Vec<Value>) -> Vec<CandidateRecord> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<CandidateRecord>(value) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!("skipping unreadable result entry: {err}");
                None
            }
        })
        .collect()
}
