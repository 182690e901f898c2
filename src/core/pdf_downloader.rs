use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDateTime;
use reqwest::Client;
use tracing::{info, warn};

use super::cv_text::format_timestamp;
use super::errors::CoreError;
use super::field_extractor::{download_file_name, extract_pdf_url};
use super::models::{CandidateRecord, DownloadSummary};

pub const SUMMARY_FILE_NAME: &str = "000_DOWNLOAD_SUMMARY.txt";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["application/pdf", "application/octet-stream"];
const MIN_PDF_BYTES: usize = 1000;

/// Fetches externally hosted CV PDFs referenced by candidate records.
pub struct PdfDownloader {
    client: Client,
    timeout: Duration,
    delay: Duration,
}

impl PdfDownloader {
    pub fn new(client: Client, timeout: Duration, delay: Duration) -> Self {
        Self {
            client,
            timeout,
            delay,
        }
    }

    /// Downloads one PDF, rejecting non-PDF content types and tiny bodies.
    pub async fn fetch_pdf(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("failed to download {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "download returned status {}: {body}",
                status.as_u16()
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !ACCEPTED_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(CoreError::RejectedDownload(format!("not a PDF file: {content_type}")).into());
        }

        let bytes = response.bytes().await?;
        if bytes.len() < MIN_PDF_BYTES {
            return Err(CoreError::RejectedDownload(format!(
                "file too small ({} bytes)",
                bytes.len()
            ))
            .into());
        }

        Ok(bytes.to_vec())
    }

    /// Downloads every candidate's PDF into `out_dir` and writes the
    /// summary file next to them.
    pub async fn download_all(
        &self,
        candidates: &[CandidateRecord],
        out_dir: &Path,
        started_at: &NaiveDateTime,
    ) -> anyhow::Result<DownloadSummary> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        let mut summary = DownloadSummary {
            candidates: candidates.len(),
            ..DownloadSummary::default()
        };
        let mut lines = vec![
            "AIM PDF CV DOWNLOAD SUMMARY".to_string(),
            "=".repeat(50),
            format!("Download Date: {}", format_timestamp(started_at)),
            format!("Total Candidates: {}", candidates.len()),
            String::new(),
            "DOWNLOAD RESULTS:".to_string(),
            "-".repeat(30),
        ];

        for (index, candidate) in candidates.iter().enumerate() {
            let position = index + 1;
            let name = candidate.display_name(position);
            info!("PDF {position}/{}: {name}", candidates.len());

            let Some(url) = extract_pdf_url(candidate) else {
                summary.no_pdf_url += 1;
                lines.push(format!("{position:3}. {name} - NO PDF URL"));
                continue;
            };

            let file_name = download_file_name(position, candidate);
            match self.save_pdf(&url, &out_dir.join(&file_name)).await {
                Ok(size) => {
                    info!("Downloaded {file_name} ({size} bytes)");
                    summary.downloaded += 1;
                    lines.push(format!("{position:3}. {name} - DOWNLOADED - {file_name}"));
                }
                Err(err) => {
                    warn!("Download for {name} failed: {err:#}");
                    summary.failed += 1;
                    lines.push(format!("{position:3}. {name} - FAILED - {url}"));
                }
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        let absolute = std::path::absolute(out_dir).unwrap_or_else(|_| out_dir.to_path_buf());
        lines.extend([
            String::new(),
            "FINAL STATS:".to_string(),
            format!("Successful downloads: {}", summary.downloaded),
            format!("Failed downloads: {}", summary.failed),
            format!("No PDF URL: {}", summary.no_pdf_url),
            format!("Files saved to: {}", absolute.display()),
        ]);

        let summary_path = out_dir.join(SUMMARY_FILE_NAME);
        match tokio::fs::write(&summary_path, lines.join("\n")).await {
            Ok(()) => summary.summary_file = Some(summary_path.display().to_string()),
            Err(err) => warn!("Failed to write download summary: {err}"),
        }

        Ok(summary)
    }

    async fn save_pdf(&self, url: &str, path: &Path) -> anyhow::Result<usize> {
        let bytes = self.fetch_pdf(url).await?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn pdf_body(len: usize) -> Vec<u8> {
        let mut body = b"%PDF-1.4\n".to_vec();
        body.resize(len, b'0');
        body
    }

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn downloader() -> PdfDownloader {
        PdfDownloader::new(Client::new(), Duration::from_secs(5), Duration::ZERO)
    }

    #[tokio::test]
    async fn fetch_accepts_pdf_with_charset_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cv.pdf"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf; charset=binary")
                    .set_body_bytes(pdf_body(2048)),
            )
            .mount(&server)
            .await;

        let bytes = downloader()
            .fetch_pdf(&format!("{}/cv.pdf", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes.len(), 2048);
    }

    #[tokio::test]
    async fn fetch_rejects_html_and_tiny_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(pdf_body(4096)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tiny.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(pdf_body(999)),
            )
            .mount(&server)
            .await;

        let err = downloader()
            .fetch_pdf(&format!("{}/page.pdf", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a PDF file: text/html"));

        let err = downloader()
            .fetch_pdf(&format!("{}/tiny.pdf", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("999 bytes"));
    }

    #[tokio::test]
    async fn download_all_counts_each_outcome_and_writes_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(pdf_body(1500)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let candidates = vec![
            CandidateRecord {
                id: Some("a1".to_string()),
                full_name: Some("Ada Lovelace".to_string()),
                pdf_url: Some(format!("{}/ok.pdf", server.uri())),
                ..Default::default()
            },
            CandidateRecord {
                id: Some("b2".to_string()),
                full_name: Some("Bob".to_string()),
                cv_url: Some(format!("{}/missing.pdf", server.uri())),
                ..Default::default()
            },
            CandidateRecord {
                id: Some("c3".to_string()),
                full_name: Some("Cy".to_string()),
                ..Default::default()
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let summary = downloader()
            .download_all(&candidates, dir.path(), &started())
            .await
            .unwrap();

        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.no_pdf_url, 1);
        assert!(dir.path().join("001_Ada_Lovelace_a1.pdf").exists());
        assert!(!dir.path().join("002_Bob_b2.pdf").exists());

        let text = std::fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap();
        assert!(text.starts_with("AIM PDF CV DOWNLOAD SUMMARY\n"));
        assert!(text.contains("Download Date: 2024-01-02 03:04:05"));
        assert!(text.contains("  1. Ada Lovelace - DOWNLOADED - 001_Ada_Lovelace_a1.pdf"));
        assert!(text.contains("  2. Bob - FAILED - "));
        assert!(text.contains("  3. Cy - NO PDF URL"));
        assert!(text.contains("Successful downloads: 1"));
    }
}
