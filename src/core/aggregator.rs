//! Multi-query result aggregation.
//!
//! Runs a battery of keyword searches one after another and merges the
//! results into a set keyed by candidate identifier. The first sighting of an
//! identifier wins; later sightings are ignored rather than merged.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use super::models::CandidateRecord;
use super::search_client::CandidateSearchClient;

/// Insertion-ordered set of candidates keyed by identifier.
#[derive(Debug, Default)]
pub struct CandidateSet {
    seen: HashSet<String>,
    records: Vec<CandidateRecord>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the record unless it lacks an identifier or the identifier is
    /// already present. Returns whether it was added.
    pub fn insert(&mut self, record: CandidateRecord) -> bool {
        let Some(id) = record.identifier() else {
            return false;
        };

        if !self.seen.insert(id.to_string()) {
            return false;
        }

        self.records.push(record);
        true
    }

    /// Inserts every record, returning how many were new.
    pub fn extend(&mut self, records: Vec<CandidateRecord>) -> usize {
        records
            .into_iter()
            .map(|record| self.insert(record))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_candidates(self) -> Vec<CandidateRecord> {
        self.records
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Completed { returned: usize, new: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query: String,
    pub status: QueryStatus,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatedCandidates {
    pub candidates: Vec<CandidateRecord>,
    pub outcomes: Vec<QueryOutcome>,
}

impl AggregatedCandidates {
    pub fn searches_run(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_searches(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, QueryStatus::Failed { .. }))
            .count()
    }
}

pub struct ResultAggregator<'a> {
    client: &'a CandidateSearchClient,
    delay: Duration,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(client: &'a CandidateSearchClient, delay: Duration) -> Self {
        Self { client, delay }
    }

    pub async fn aggregate(&self, queries: &[String]) -> AggregatedCandidates {
        let client = self.client;
        info!(
            "Running {} searches against {}",
            queries.len(),
            client.endpoint()
        );
        aggregate_with(queries, self.delay, move |query| async move {
            client.search(&query).await
        })
        .await
    }
}

/// Core accumulation loop. `search` performs one query; its failures are
/// logged and recorded, never propagated.
pub async fn aggregate_with<F, Fut>(
    queries: &[String],
    delay: Duration,
    mut search: F,
) -> AggregatedCandidates
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<CandidateRecord>>>,
{
    let mut set = CandidateSet::new();
    let mut outcomes = Vec::with_capacity(queries.len());
    let total = queries.len();

    for (index, query) in queries.iter().enumerate() {
        info!("Search {}/{}: '{}'", index + 1, total, query);

        let status = match search(query.clone()).await {
            Ok(records) => {
                let returned = records.len();
                let new = set.extend(records);
                info!(
                    "Found {returned} results, {new} new (total unique: {})",
                    set.len()
                );
                QueryStatus::Completed { returned, new }
            }
            Err(err) => {
                warn!("Search '{query}' failed: {err:#}");
                QueryStatus::Failed {
                    reason: format!("{err:#}"),
                }
            }
        };

        outcomes.push(QueryOutcome {
            query: query.clone(),
            status,
        });

        if index + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        "Ran {} searches, {} unique candidates",
        outcomes.len(),
        set.len()
    );

    AggregatedCandidates {
        candidates: set.into_candidates(),
        outcomes,
    }
}
