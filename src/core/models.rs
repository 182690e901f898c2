use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::queries::QueryPreset;

/// A candidate as returned by the search backend.
///
/// Every known field is optional; anything the backend sends that is not
/// modelled here is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub full_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub headline: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub linkedin_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub skills: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub years_experience: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub regions: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub fundraising_stage: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub tech_cofounder: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub combined_text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub cv_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pdf_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub resume_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CandidateRecord {
    /// The deduplication key, if the record carries a non-blank one.
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Name used in listings and filenames; `position` is the 1-based export index.
    pub fn display_name(&self, position: usize) -> String {
        if let Some(name) = non_blank(&self.full_name) {
            return name.to_string();
        }

        match self.identifier() {
            Some(id) => format!("Candidate_{id}"),
            None => format!("Candidate_{position}"),
        }
    }

    /// `full_name`, falling back to the first/last name pair.
    pub fn composed_name(&self) -> Option<String> {
        if let Some(name) = non_blank(&self.full_name) {
            return Some(name.to_string());
        }

        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// The record as a flat JSON object, known and unknown fields alike.
    pub fn to_fields(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn non_empty_list(value: &Option<Vec<String>>) -> Option<&[String]> {
    value.as_deref().filter(|items| !items.is_empty())
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(scalar_to_string)
                .filter(|item| !item.trim().is_empty())
                .collect(),
        ),
        Some(Value::String(single)) if !single.trim().is_empty() => Some(vec![single]),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Txt,
    Pdf,
    Both,
}

impl ExportFormat {
    pub fn includes_txt(self) -> bool {
        matches!(self, ExportFormat::Txt | ExportFormat::Both)
    }

    pub fn includes_pdf(self) -> bool {
        matches!(self, ExportFormat::Pdf | ExportFormat::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDestination {
    LocalDirectory(PathBuf),
    DriveFolder(String),
}

impl ExportDestination {
    pub fn describe(&self) -> String {
        match self {
            ExportDestination::LocalDirectory(path) => {
                let absolute = std::path::absolute(path).unwrap_or_else(|_| path.clone());
                absolute.display().to_string()
            }
            ExportDestination::DriveFolder(folder_id) => {
                format!("https://drive.google.com/drive/folders/{folder_id}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub queries: Vec<String>,
    pub format: ExportFormat,
    pub destination: ExportDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub candidates_found: usize,
    pub searches_run: usize,
    pub failed_searches: usize,
    pub files_written: usize,
    pub files_failed: usize,
    pub index_file: Option<String>,
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSummary {
    pub candidates: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub no_pdf_url: usize,
    pub summary_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvUrlEntry {
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub cv_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub search_url: String,
    pub search_timeout_seconds: u64,
    pub request_delay_ms: u64,
    pub upload_delay_ms: u64,
    pub query_preset: QueryPreset,
    pub queries: Option<Vec<String>>,
    pub typesense_url: String,
    pub typesense_api_key: String,
    pub typesense_collection: String,
    pub typesense_per_page: u32,
    pub credentials_path: PathBuf,
    pub delegated_subject: Option<String>,
    pub drive_folder_id: Option<String>,
    pub drive_upload_url: String,
    pub output_dir: PathBuf,
    pub pdf_output_dir: PathBuf,
    pub download_timeout_seconds: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            search_url: "http://localhost:3000".to_string(),
            search_timeout_seconds: 15,
            request_delay_ms: 500,
            upload_delay_ms: 200,
            query_preset: QueryPreset::Comprehensive,
            queries: None,
            typesense_url: "http://localhost:8108".to_string(),
            typesense_api_key: "development-key".to_string(),
            typesense_collection: "candidates".to_string(),
            typesense_per_page: 250,
            credentials_path: PathBuf::from("google-service-account.json"),
            delegated_subject: None,
            drive_folder_id: None,
            drive_upload_url: "https://www.googleapis.com/upload/drive/v3/files".to_string(),
            output_dir: PathBuf::from("aim_cvs_complete"),
            pdf_output_dir: PathBuf::from("aim_pdf_cvs"),
            download_timeout_seconds: 30,
        }
    }
}

impl ExportSettings {
    pub fn sanitized(mut self) -> Self {
        self.search_timeout_seconds = self.search_timeout_seconds.clamp(10, 30);
        self.download_timeout_seconds = self.download_timeout_seconds.clamp(1, 300);
        self.typesense_per_page = self.typesense_per_page.clamp(1, 250);
        self.search_url = self.search_url.trim_end_matches('/').to_string();
        self.typesense_url = self.typesense_url.trim_end_matches('/').to_string();
        self.drive_folder_id = self
            .drive_folder_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        self
    }

    /// The configured custom query list, or the preset's battery.
    pub fn query_list(&self) -> Vec<String> {
        match &self.queries {
            Some(custom) => custom.clone(),
            None => self.query_preset.queries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_accepts_numeric_ids_and_mixed_field_types() {
        let record: CandidateRecord = serde_json::from_value(json!({
            "id": 42,
            "full_name": "Ada Lovelace",
            "years_experience": 12,
            "skills": ["math", 7, null],
            "tech_cofounder": "yes",
            "favourite_colour": "green"
        }))
        .unwrap();

        assert_eq!(record.identifier(), Some("42"));
        assert_eq!(record.years_experience.as_deref(), Some("12"));
        assert_eq!(
            record.skills,
            Some(vec!["math".to_string(), "7".to_string()])
        );
        assert_eq!(record.tech_cofounder, Some(true));
        assert_eq!(record.extra.get("favourite_colour"), Some(&json!("green")));
    }

    #[test]
    fn absent_fields_stay_absent() {
        let record: CandidateRecord = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert!(record.full_name.is_none());
        assert!(record.skills.is_none());
        assert!(record.tech_cofounder.is_none());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn blank_identifier_is_treated_as_missing() {
        let record: CandidateRecord = serde_json::from_value(json!({ "id": "  " })).unwrap();
        assert_eq!(record.identifier(), None);

        let record: CandidateRecord = serde_json::from_value(json!({ "id": null })).unwrap();
        assert_eq!(record.identifier(), None);
    }

    #[test]
    fn display_name_falls_back_to_identifier_then_position() {
        let named = CandidateRecord {
            full_name: Some("Grace Hopper".to_string()),
            ..Default::default()
        };
        assert_eq!(named.display_name(3), "Grace Hopper");

        let with_id = CandidateRecord {
            id: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(with_id.display_name(3), "Candidate_abc");

        assert_eq!(CandidateRecord::default().display_name(3), "Candidate_3");
    }

    #[test]
    fn composed_name_joins_first_and_last() {
        let record = CandidateRecord {
            first_name: Some("Alan".to_string()),
            last_name: Some("Turing".to_string()),
            ..Default::default()
        };
        assert_eq!(record.composed_name().as_deref(), Some("Alan Turing"));
        assert_eq!(CandidateRecord::default().composed_name(), None);
    }

    #[test]
    fn to_fields_includes_known_and_extra_fields() {
        let record: CandidateRecord =
            serde_json::from_value(json!({ "id": "1", "email": "a@b.co", "notes": "hi" }))
                .unwrap();
        let fields = record.to_fields();
        assert_eq!(fields.get("email"), Some(&json!("a@b.co")));
        assert_eq!(fields.get("notes"), Some(&json!("hi")));
        assert!(!fields.contains_key("headline"));
    }

    #[test]
    fn settings_deserialize_with_defaults_for_missing_keys() {
        let settings: ExportSettings =
            serde_json::from_str(r#"{"searchUrl":"http://search:9000/","requestDelayMs":0}"#)
                .unwrap();
        let settings = settings.sanitized();
        assert_eq!(settings.search_url, "http://search:9000");
        assert_eq!(settings.request_delay_ms, 0);
        assert_eq!(settings.search_timeout_seconds, 15);
        assert_eq!(settings.typesense_per_page, 250);
    }

    #[test]
    fn search_timeout_is_held_between_ten_and_thirty_seconds() {
        let clamp = |secs| {
            ExportSettings {
                search_timeout_seconds: secs,
                ..Default::default()
            }
            .sanitized()
            .search_timeout_seconds
        };
        assert_eq!(clamp(1), 10);
        assert_eq!(clamp(20), 20);
        assert_eq!(clamp(120), 30);
    }

    #[test]
    fn custom_queries_take_precedence_over_preset() {
        let settings = ExportSettings {
            queries: Some(vec!["founder".to_string()]),
            ..Default::default()
        };
        assert_eq!(settings.query_list(), vec!["founder".to_string()]);
        assert!(ExportSettings::default().query_list().len() > 50);
    }
}
