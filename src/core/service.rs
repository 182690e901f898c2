use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::aggregator::{AggregatedCandidates, ResultAggregator};
use super::auth::ServiceAccountAuth;
use super::cv_text::{format_timestamp, render_index, render_text_cv, IndexEntry};
use super::errors::CoreError;
use super::export_sink::{ExportSink, PDF_MIME, TEXT_MIME};
use super::field_extractor::{cv_file_name, extract_cv_url};
use super::google_drive::GoogleDriveClient;
use super::models::{
    non_blank, CandidateRecord, CvUrlEntry, DownloadSummary, DriveFileRef, ExportDestination,
    ExportFormat, ExportRequest, ExportSettings, ExportSummary,
};
use super::pdf::render_pdf_cv;
use super::pdf_downloader::PdfDownloader;
use super::search_client::CandidateSearchClient;
use super::typesense::TypesenseClient;

pub const INDEX_FILE_NAME: &str = "0000_INDEX.txt";
const USER_AGENT: &str = concat!("CvExport/", env!("CARGO_PKG_VERSION"));
const INSPECT_TRUNCATE_CHARS: usize = 200;

/// Counts produced by writing one aggregate through a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub files_written: usize,
    pub files_failed: usize,
    pub index_file: Option<String>,
}

pub struct CvExportService {
    client: Client,
    settings: ExportSettings,
}

impl CvExportService {
    pub fn new(settings: ExportSettings) -> anyhow::Result<Self> {
        validate_base_url("search URL", &settings.search_url)?;
        validate_base_url("Typesense URL", &settings.typesense_url)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: Client, settings: ExportSettings) -> Self {
        Self {
            client,
            settings: settings.sanitized(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    fn search_client(&self) -> CandidateSearchClient {
        CandidateSearchClient::new(
            self.client.clone(),
            &self.settings.search_url,
            Duration::from_secs(self.settings.search_timeout_seconds),
        )
    }

    fn typesense(&self) -> TypesenseClient {
        TypesenseClient::new(
            self.client.clone(),
            &self.settings.typesense_url,
            &self.settings.typesense_api_key,
            self.settings.typesense_per_page,
        )
    }

    fn drive_client(&self) -> GoogleDriveClient {
        GoogleDriveClient::new(self.client.clone())
            .with_upload_endpoint(&self.settings.drive_upload_url)
    }

    pub async fn aggregate(&self, queries: &[String]) -> AggregatedCandidates {
        let search = self.search_client();
        let delay = Duration::from_millis(self.settings.request_delay_ms);
        ResultAggregator::new(&search, delay).aggregate(queries).await
    }

    async fn drive_sink(&self, folder_id: &str) -> anyhow::Result<ExportSink> {
        if folder_id.trim().is_empty() {
            return Err(CoreError::MissingDriveFolder.into());
        }

        let auth = ServiceAccountAuth::from_file(
            self.client.clone(),
            &self.settings.credentials_path,
            self.settings.delegated_subject.clone(),
        )
        .await?;
        info!("Using service account {}", auth.client_email());

        Ok(ExportSink::drive(
            self.drive_client(),
            auth,
            folder_id.trim(),
            Duration::from_millis(self.settings.upload_delay_ms),
        ))
    }

    pub async fn open_sink(&self, destination: &ExportDestination) -> anyhow::Result<ExportSink> {
        match destination {
            ExportDestination::LocalDirectory(dir) => ExportSink::local(dir).await,
            ExportDestination::DriveFolder(folder_id) => self.drive_sink(folder_id).await,
        }
    }

    /// Aggregates candidates for the request's queries and writes one CV per
    /// candidate plus an index through the requested destination.
    pub async fn export(&self, request: &ExportRequest) -> anyhow::Result<ExportSummary> {
        let sink = self.open_sink(&request.destination).await?;
        let destination = request.destination.describe();

        let aggregated = self.aggregate(&request.queries).await;
        if aggregated.candidates.is_empty() {
            return Err(CoreError::NoCandidates.into());
        }

        let report = write_candidates(
            &aggregated.candidates,
            &sink,
            request.format,
            &destination,
            &Local::now().naive_local(),
        )
        .await;

        info!(
            "Exported {} files for {} candidates to {destination} ({} failed)",
            report.files_written,
            aggregated.candidates.len(),
            report.files_failed
        );

        Ok(ExportSummary {
            candidates_found: aggregated.candidates.len(),
            searches_run: aggregated.searches_run(),
            failed_searches: aggregated.failed_searches(),
            files_written: report.files_written,
            files_failed: report.files_failed,
            index_file: report.index_file,
            destination,
        })
    }

    /// Pulls every Typesense document and saves those carrying a CV link.
    pub async fn fetch_cv_urls(&self, output: &Path) -> anyhow::Result<Vec<CvUrlEntry>> {
        let typesense = self.typesense();
        let collections = typesense.list_collections().await?;
        info!("Available collections: {}", collections.join(", "));

        let documents = typesense
            .fetch_all_documents(&self.settings.typesense_collection)
            .await;
        info!("Fetched {} documents from Typesense", documents.len());

        let entries = cv_url_entries(&documents);
        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(output, json)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;

        info!(
            "Saved {} candidates with CV URLs to {}",
            entries.len(),
            output.display()
        );
        Ok(entries)
    }

    pub async fn download_pdfs(
        &self,
        queries: &[String],
        out_dir: &Path,
    ) -> anyhow::Result<DownloadSummary> {
        let aggregated = self.aggregate(queries).await;
        if aggregated.candidates.is_empty() {
            return Err(CoreError::NoCandidates.into());
        }

        let downloader = PdfDownloader::new(
            self.client.clone(),
            Duration::from_secs(self.settings.download_timeout_seconds),
            Duration::from_millis(self.settings.request_delay_ms),
        );
        downloader
            .download_all(&aggregated.candidates, out_dir, &Local::now().naive_local())
            .await
    }

    /// Runs one query and returns the first `limit` records as-is.
    pub async fn inspect(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CandidateRecord>> {
        let mut records = self.search_client().search(query).await?;
        info!("Query '{query}' returned {} records", records.len());
        records.truncate(limit);
        Ok(records)
    }

    /// Uploads a small timestamped text file to prove the Drive setup works.
    pub async fn drive_check(&self, folder_id: &str) -> anyhow::Result<DriveFileRef> {
        if folder_id.trim().is_empty() {
            return Err(CoreError::MissingDriveFolder.into());
        }

        let auth = ServiceAccountAuth::from_file(
            self.client.clone(),
            &self.settings.credentials_path,
            self.settings.delegated_subject.clone(),
        )
        .await?;
        let token = auth.access_token().await?;
        let content = format!(
            "Test file created at {}",
            format_timestamp(&Local::now().naive_local())
        );

        self.drive_client()
            .upload_file(
                &token,
                folder_id.trim(),
                "test_upload.txt",
                TEXT_MIME,
                content.as_bytes(),
            )
            .await
            .map_err(|err| {
                let denied = err
                    .downcast_ref::<CoreError>()
                    .is_some_and(CoreError::is_permission_denied);
                if denied {
                    err.context(format!(
                        "share folder {folder_id} with {} as an editor",
                        auth.client_email()
                    ))
                } else {
                    err
                }
            })
    }
}

fn validate_base_url(label: &str, value: &str) -> anyhow::Result<()> {
    let parsed = Url::parse(value)
        .map_err(|err| CoreError::InvalidRequest(format!("{label} '{value}' is invalid: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidRequest(format!("{label} '{value}' must be http(s)")).into());
    }

    Ok(())
}

/// Renders and stores each candidate, then the index. Failures are logged
/// and counted; nothing here aborts the run.
pub async fn write_candidates(
    candidates: &[CandidateRecord],
    sink: &ExportSink,
    format: ExportFormat,
    destination: &str,
    exported_at: &NaiveDateTime,
) -> WriteReport {
    let mut report = WriteReport::default();
    let mut entries = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        let position = index + 1;
        let mut written = Vec::new();

        if format.includes_txt() {
            let name = cv_file_name(position, candidate, "txt");
            let body = render_text_cv(candidate, exported_at);
            match sink.write(&name, TEXT_MIME, body.as_bytes()).await {
                Ok(_) => written.push(name),
                Err(err) => {
                    warn!("Failed to write {name}: {err:#}");
                    report.files_failed += 1;
                }
            }
        }

        if format.includes_pdf() {
            let name = cv_file_name(position, candidate, "pdf");
            let stored = match render_pdf_cv(candidate) {
                Ok(bytes) => sink.write(&name, PDF_MIME, &bytes).await,
                Err(err) => Err(err),
            };
            match stored {
                Ok(_) => written.push(name),
                Err(err) => {
                    warn!("Failed to produce {name}: {err:#}");
                    report.files_failed += 1;
                }
            }
        }

        if position % 50 == 0 {
            info!("Progress: {position}/{} candidates", candidates.len());
        }

        report.files_written += written.len();
        entries.push(IndexEntry::for_candidate(position, candidate, written));
    }

    let index = render_index(&entries, candidates.len(), destination, exported_at);
    match sink.write(INDEX_FILE_NAME, TEXT_MIME, index.as_bytes()).await {
        Ok(location) => report.index_file = Some(location),
        Err(err) => warn!("Failed to write index: {err:#}"),
    }

    report
}

pub fn cv_url_entries(documents: &[CandidateRecord]) -> Vec<CvUrlEntry> {
    documents
        .iter()
        .filter_map(|doc| {
            let cv_url = extract_cv_url(doc)?;
            Some(CvUrlEntry {
                id: doc.identifier().map(str::to_string),
                full_name: doc.composed_name(),
                email: non_blank(&doc.email).map(str::to_string),
                cv_url,
            })
        })
        .collect()
}

/// Human-readable dump of records for the `inspect` command.
pub fn render_inspection(records: &[CandidateRecord]) -> String {
    let mut lines = Vec::new();
    let rule = "=".repeat(60);

    for (index, record) in records.iter().enumerate() {
        let fields = record.to_fields();
        lines.push(rule.clone());
        lines.push(format!(
            "CANDIDATE {}: {}",
            index + 1,
            non_blank(&record.full_name).unwrap_or("Unknown")
        ));
        lines.push(rule.clone());

        for (key, value) in &fields {
            lines.push(format!("{key}: {}", inspect_value(value)));
        }

        lines.push(String::new());
        lines.push("Fields containing 'http' or '.pdf':".to_string());
        for (key, value) in &fields {
            if let Value::String(text) = value {
                let lower = text.to_lowercase();
                if lower.contains("http") || lower.contains(".pdf") {
                    lines.push(format!("   {key}: {text}"));
                }
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn inspect_value(value: &Value) -> String {
    match value {
        Value::String(text) if text.chars().count() > INSPECT_TRUNCATE_CHARS => {
            let head: String = text.chars().take(INSPECT_TRUNCATE_CHARS).collect();
            format!("{head}...")
        }
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
