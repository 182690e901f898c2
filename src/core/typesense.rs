use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::errors::CoreError;
use super::models::CandidateRecord;
use super::search_client::parse_records;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

#[derive(Debug, Deserialize)]
struct CollectionItem {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    hits: Option<Vec<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    document: Option<Value>,
}

/// Direct document access to the Typesense instance behind the search API.
pub struct TypesenseClient {
    client: Client,
    base_url: String,
    api_key: String,
    per_page: u32,
    timeout: Duration,
}

impl TypesenseClient {
    pub fn new(client: Client, base_url: &str, api_key: &str, per_page: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            per_page: per_page.max(1),
            timeout: Duration::from_secs(30),
        }
    }

    pub async fn list_collections(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/collections", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .context("failed to reach Typesense")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Typesense {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .text()
            .await
            .context("failed to read Typesense collections response")?;
        let items = serde_json::from_str::<Vec<CollectionItem>>(&body)
            .context("failed to parse Typesense collections response")?;
        Ok(items.into_iter().filter_map(|item| item.name).collect())
    }

    /// Pages through every document in `collection`.
    ///
    /// A failing page ends pagination; whatever was gathered before it is
    /// still returned. Repeated identifiers keep their first document, and
    /// documents without an identifier are all kept.
    pub async fn fetch_all_documents(&self, collection: &str) -> Vec<CandidateRecord> {
        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        let mut page = 1_u32;

        loop {
            info!("Fetching Typesense page {page} from '{collection}'");
            let hits = match self.fetch_page(collection, page).await {
                Ok(hits) => hits,
                Err(err) => {
                    warn!("Typesense page {page} failed: {err:#}");
                    break;
                }
            };

            if hits.is_empty() {
                break;
            }

            let returned = hits.len();
            let mut new = 0;
            for record in parse_records(hits) {
                if let Some(id) = record.identifier() {
                    if !seen.insert(id.to_string()) {
                        continue;
                    }
                }
                documents.push(record);
                new += 1;
            }
            info!("Got {returned} documents, {new} new (total: {})", documents.len());

            if returned < self.per_page as usize {
                break;
            }
            page += 1;
        }

        documents
    }

    async fn fetch_page(&self, collection: &str, page: u32) -> anyhow::Result<Vec<Value>> {
        let per_page = self.per_page.to_string();
        let page = page.to_string();
        let response = self
            .client
            .get(format!(
                "{}/collections/{collection}/documents/search",
                self.base_url
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("q", "*"),
                ("query_by", "full_name"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Typesense {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .text()
            .await
            .context("failed to read Typesense page")?;
        let payload = serde_json::from_str::<SearchPage>(&body)
            .map_err(|err| CoreError::MalformedResponse(format!("Typesense page: {err}")))?;

        Ok(payload
            .hits
            .unwrap_or_default()
            .into_iter()
            .filter_map(|hit| hit.document)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn hits(ids: std::ops::Range<u32>) -> Value {
        let hits: Vec<Value> = ids
            .map(|id| json!({ "document": { "id": id.to_string(), "full_name": format!("P{id}") } }))
            .collect();
        json!({ "hits": hits })
    }

    #[tokio::test]
    async fn list_collections_returns_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections"))
            .and(header("X-TYPESENSE-API-KEY", "k"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "name": "candidates" }, { "name": "jobs" }])),
            )
            .mount(&server)
            .await;

        let client = TypesenseClient::new(Client::new(), &server.uri(), "k", 250);
        let names = client.list_collections().await.unwrap();
        assert_eq!(names, vec!["candidates".to_string(), "jobs".to_string()]);
    }

    #[tokio::test]
    async fn pagination_stops_on_short_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/candidates/documents/search"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "2"))
            .and(query_param("q", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits(0..2)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/collections/candidates/documents/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits(2..3)))
            .expect(1)
            .mount(&server)
            .await;

        let client = TypesenseClient::new(Client::new(), &server.uri(), "k", 2);
        let docs = client.fetch_all_documents("candidates").await;
        let ids: Vec<&str> = docs.iter().filter_map(|d| d.identifier()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn pagination_stops_on_empty_page_and_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/candidates/documents/search"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits(0..1)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/collections/candidates/documents/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = TypesenseClient::new(Client::new(), &server.uri(), "k", 1);
        let docs = client.fetch_all_documents("candidates").await;
        assert_eq!(docs.len(), 1);

        let empty = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/candidates/documents/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": [] })))
            .expect(1)
            .mount(&empty)
            .await;
        let client = TypesenseClient::new(Client::new(), &empty.uri(), "k", 1);
        assert!(client.fetch_all_documents("candidates").await.is_empty());
    }

    #[tokio::test]
    async fn documents_without_identifier_are_kept_and_repeats_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/candidates/documents/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [
                    { "document": { "id": "1", "full_name": "Ada" } },
                    { "document": { "full_name": "No Id", "cv_url": "https://x/b.pdf" } },
                    { "document": { "id": "1", "full_name": "Ada again" } },
                    { "document": { "full_name": "Also No Id" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TypesenseClient::new(Client::new(), &server.uri(), "k", 250);
        let docs = client.fetch_all_documents("candidates").await;
        let names: Vec<&str> = docs.iter().filter_map(|d| d.full_name.as_deref()).collect();
        assert_eq!(names, vec!["Ada", "No Id", "Also No Id"]);
    }
}
