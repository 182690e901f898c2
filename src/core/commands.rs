use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use super::errors::CoreError;
use super::models::{ExportDestination, ExportFormat, ExportRequest, ExportSettings};
use super::queries::QueryPreset;
use super::service::{render_inspection, CvExportService};
use super::settings_store::SettingsStore;

/// Export candidate CVs from the search backend to disk or Google Drive.
#[derive(Debug, Parser)]
#[command(name = "cv-export", version, about)]
pub struct Cli {
    /// Settings file; defaults to the per-user data directory.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the search service.
    #[arg(long, global = true)]
    pub search_url: Option<String>,

    /// Pause between consecutive search queries, in milliseconds.
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate candidates over many queries and write one CV per candidate.
    Export(ExportArgs),

    /// Save every Typesense candidate that has a CV link to a JSON file.
    FetchCvUrls {
        #[arg(short, long, default_value = "candidates_with_cv_urls.json")]
        output: PathBuf,
    },

    /// Download externally hosted CV PDFs for aggregated candidates.
    DownloadPdfs {
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        queries: QueryArgs,
    },

    /// Print the raw fields of the first few results of one query.
    Inspect {
        #[arg(default_value = "founder")]
        query: String,

        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },

    /// Upload a small test file to check Drive credentials and folder access.
    DriveCheck {
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Txt)]
    pub format: ExportFormat,

    /// Local output directory.
    #[arg(short, long, conflicts_with_all = ["drive", "drive_folder"])]
    pub output_dir: Option<PathBuf>,

    /// Upload to the Drive folder from the settings file.
    #[arg(long)]
    pub drive: bool,

    /// Upload to this Drive folder id.
    #[arg(long)]
    pub drive_folder: Option<String>,

    #[command(flatten)]
    pub queries: QueryArgs,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Built-in query battery.
    #[arg(long, value_enum)]
    pub preset: Option<QueryPreset>,

    /// Explicit query; repeat for several. Overrides the preset.
    #[arg(short = 'q', long = "query")]
    pub queries: Vec<String>,
}

impl QueryArgs {
    pub fn resolve(&self, settings: &ExportSettings) -> Vec<String> {
        if !self.queries.is_empty() {
            return self.queries.clone();
        }

        match self.preset {
            Some(preset) => preset.queries(),
            None => settings.query_list(),
        }
    }
}

impl ExportArgs {
    pub fn destination(&self, settings: &ExportSettings) -> anyhow::Result<ExportDestination> {
        if let Some(folder) = self.drive_folder.as_deref() {
            return Ok(ExportDestination::DriveFolder(folder.to_string()));
        }

        if self.drive {
            return settings
                .drive_folder_id
                .clone()
                .map(ExportDestination::DriveFolder)
                .ok_or_else(|| CoreError::MissingDriveFolder.into());
        }

        Ok(ExportDestination::LocalDirectory(
            self.output_dir
                .clone()
                .unwrap_or_else(|| settings.output_dir.clone()),
        ))
    }
}

pub async fn load_settings(cli: &Cli) -> anyhow::Result<ExportSettings> {
    let store = match &cli.config {
        Some(path) => SettingsStore::at(path),
        None => SettingsStore::new(),
    };
    info!("Loading settings from {}", store.path().display());

    let mut settings = store.load().await?;
    if let Some(url) = &cli.search_url {
        settings.search_url = url.clone();
    }
    if let Some(delay) = cli.delay_ms {
        settings.request_delay_ms = delay;
    }

    Ok(settings.sanitized())
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli).await?;
    let service = CvExportService::new(settings)?;

    match cli.command {
        Command::Export(args) => {
            let request = ExportRequest {
                queries: args.queries.resolve(service.settings()),
                format: args.format,
                destination: args.destination(service.settings())?,
            };
            let summary = service.export(&request).await?;

            println!("Export finished");
            println!("  Candidates:     {}", summary.candidates_found);
            println!(
                "  Searches:       {} ({} failed)",
                summary.searches_run, summary.failed_searches
            );
            println!(
                "  Files written:  {} ({} failed)",
                summary.files_written, summary.files_failed
            );
            if let Some(index) = &summary.index_file {
                println!("  Index:          {index}");
            }
            println!("  Destination:    {}", summary.destination);
        }
        Command::FetchCvUrls { output } => {
            let entries = service.fetch_cv_urls(&output).await?;
            println!(
                "Saved {} candidates with CV URLs to {}",
                entries.len(),
                output.display()
            );
            for entry in entries.iter().take(5) {
                println!(
                    "  {}: {}",
                    entry.full_name.as_deref().unwrap_or("Unknown"),
                    entry.cv_url
                );
            }
        }
        Command::DownloadPdfs {
            output_dir,
            queries,
        } => {
            let out_dir = output_dir.unwrap_or_else(|| service.settings().pdf_output_dir.clone());
            let queries = queries.resolve(service.settings());
            let summary = service.download_pdfs(&queries, &out_dir).await?;

            println!("PDF download finished");
            println!("  Downloaded:  {}", summary.downloaded);
            println!("  Failed:      {}", summary.failed);
            println!("  No PDF URL:  {}", summary.no_pdf_url);
            if let Some(path) = &summary.summary_file {
                println!("  Summary:     {path}");
            }
        }
        Command::Inspect { query, limit } => {
            let records = service.inspect(&query, limit).await?;
            if records.is_empty() {
                println!("No candidates found");
            } else {
                println!("{}", render_inspection(&records));
            }
        }
        Command::DriveCheck { folder } => {
            let folder = folder
                .or_else(|| service.settings().drive_folder_id.clone())
                .ok_or(CoreError::MissingDriveFolder)?;
            let file = service.drive_check(&folder).await?;
            println!("Test upload successful: {} (ID: {})", file.name, file.id);
        }
    }

    Ok(())
}
