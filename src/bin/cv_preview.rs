use std::path::Path;

use chrono::Local;

use cv_export_lib::core::cv_text::render_text_cv;
use cv_export_lib::core::field_extractor::{cv_file_name, extract_pdf_url};
use cv_export_lib::core::models::CandidateRecord;
use cv_export_lib::core::pdf::render_pdf_cv;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cv_preview <candidate.json> [--pdf <out-dir>]");
        std::process::exit(1);
    }

    let path = &args[1];
    if !Path::new(path).exists() {
        eprintln!("File not found: {path}");
        std::process::exit(2);
    }

    let raw = tokio::fs::read_to_string(path).await?;
    let candidate: CandidateRecord = serde_json::from_str(&raw)?;

    match args.get(2).map(String::as_str) {
        Some("--pdf") => {
            let out_dir = args.get(3).map(String::as_str).unwrap_or(".");
            tokio::fs::create_dir_all(out_dir).await?;
            let target = Path::new(out_dir).join(cv_file_name(1, &candidate, "pdf"));
            tokio::fs::write(&target, render_pdf_cv(&candidate)?).await?;
            println!("{}", target.display());
        }
        _ => {
            println!("{}", render_text_cv(&candidate, &Local::now().naive_local()));
            if let Some(url) = extract_pdf_url(&candidate) {
                println!("\nPDF link: {url}");
            }
        }
    }

    Ok(())
}
