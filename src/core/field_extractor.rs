use once_cell::sync::Lazy;
use regex::Regex;

use super::models::{non_blank, CandidateRecord};

static JOTFORM_PDF_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)https://www\.jotform\.com/uploads/[^/]+/[^/]+/[^/]+/\S+\.pdf").unwrap(),
        Regex::new(r"(?i)https://jotform\.com/uploads/[^/]+/[^/]+/[^/]+/\S+\.pdf").unwrap(),
    ]
});

static RESERVED_FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

const MAX_DOWNLOAD_STEM_CHARS: usize = 100;
const PROFILE_MARKERS: [&str; 2] = ["CURRICULUM VITAE", "CANDIDATE PROFILE"];

/// Finds a downloadable CV PDF for the candidate: a JotForm upload link in
/// the profile text first, then any of the direct URL fields.
pub fn extract_pdf_url(candidate: &CandidateRecord) -> Option<String> {
    if let Some(text) = candidate.combined_text.as_deref() {
        for regex in &*JOTFORM_PDF_RES {
            if let Some(m) = regex.find(text) {
                return Some(m.as_str().to_string());
            }
        }
    }

    [
        &candidate.pdf_url,
        &candidate.resume_url,
        &candidate.cv_url,
        &candidate.file_url,
    ]
    .into_iter()
    .filter_map(non_blank)
    .find(|url| url.ends_with(".pdf") || url.contains("jotform.com"))
    .map(str::to_string)
}

/// A `cv_url` that looks like a link.
pub fn extract_cv_url(candidate: &CandidateRecord) -> Option<String> {
    non_blank(&candidate.cv_url)
        .filter(|url| url.starts_with("http") || url.starts_with("www"))
        .map(str::to_string)
}

/// Keeps alphanumerics, spaces, `-` and `_`, then turns spaces into `_`.
pub fn safe_file_stem(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim().replace(' ', "_")
}

pub fn cv_file_name(position: usize, candidate: &CandidateRecord, extension: &str) -> String {
    let mut stem = safe_file_stem(&candidate.display_name(position));
    if stem.is_empty() {
        stem = safe_file_stem(&match candidate.identifier() {
            Some(id) => format!("Candidate_{id}"),
            None => format!("Candidate_{position}"),
        });
    }

    format!("{position:04}_{stem}_CV.{extension}")
}

/// Strips characters filesystems reject and caps the length.
pub fn sanitize_download_stem(name: &str) -> String {
    let cleaned = RESERVED_FILENAME_RE.replace_all(name, "").replace(' ', "_");
    cleaned.chars().take(MAX_DOWNLOAD_STEM_CHARS).collect()
}

pub fn download_file_name(position: usize, candidate: &CandidateRecord) -> String {
    let stem = sanitize_download_stem(&candidate.display_name(position));
    let id = candidate
        .identifier()
        .map(sanitize_download_stem)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| position.to_string());
    format!("{position:03}_{stem}_{id}.pdf")
}

/// The CV body of a combined profile: the part after a CV/profile marker if
/// one is present, otherwise the whole text.
pub fn profile_body(combined_text: &str) -> &str {
    for marker in PROFILE_MARKERS {
        if let Some((_, rest)) = combined_text.split_once(marker) {
            return rest;
        }
    }

    combined_text
}

/// Splits a profile body into paragraphs on blank lines, folding newlines.
pub fn profile_paragraphs(combined_text: &str) -> Vec<String> {
    profile_body(combined_text)
        .trim()
        .split("\n\n")
        .map(|para| para.trim().replace('\n', " "))
        .filter(|para| !para.is_empty())
        .collect()
}
