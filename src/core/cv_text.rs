use chrono::NaiveDateTime;

use super::models::{non_blank, non_empty_list, CandidateRecord};

const WIDE_RULE: usize = 80;
const SECTION_RULE: usize = 30;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Plain-text CV for one candidate.
pub fn render_text_cv(candidate: &CandidateRecord, exported_at: &NaiveDateTime) -> String {
    let mut lines: Vec<String> = Vec::new();
    let wide = "=".repeat(WIDE_RULE);
    let section = "-".repeat(SECTION_RULE);

    let name = non_blank(&candidate.full_name).unwrap_or("Unknown Candidate");
    lines.push(wide.clone());
    lines.push(name.to_uppercase());
    if let Some(headline) = non_blank(&candidate.headline) {
        lines.push(headline.to_string());
    }
    if let Some(id) = candidate.identifier() {
        lines.push(format!("ID: {id}"));
    }
    lines.push(wide.clone());
    lines.push(String::new());

    let email = non_blank(&candidate.email);
    let linkedin = non_blank(&candidate.linkedin_url);
    if email.is_some() || linkedin.is_some() {
        lines.push("CONTACT INFORMATION".to_string());
        lines.push(section.clone());
        if let Some(email) = email {
            lines.push(format!("📧 Email: {email}"));
        }
        if let Some(linkedin) = linkedin {
            lines.push(format!("🔗 LinkedIn: {linkedin}"));
        }
        lines.push(String::new());
    }

    lines.push("PROFESSIONAL SUMMARY".to_string());
    lines.push(section.clone());
    if let Some(years) = non_blank(&candidate.years_experience).filter(|v| *v != "0") {
        lines.push(format!("🎯 Years of Experience: {years}"));
    }
    if candidate.tech_cofounder == Some(true) {
        lines.push("💻 Technical Co-founder: Yes".to_string());
    }
    if let Some(stage) = non_blank(&candidate.fundraising_stage).filter(|v| *v != "None") {
        lines.push(format!("💰 Fundraising Experience: {stage}"));
    }
    if let Some(regions) = non_empty_list(&candidate.regions) {
        lines.push(format!("🌍 Regional Experience: {}", regions.join(", ")));
    }
    if let Some(skills) = non_empty_list(&candidate.skills) {
        lines.push(format!("🛠️ Skills: {}", skills.join(" • ")));
    }
    lines.push(String::new());

    if let Some(text) = non_blank(&candidate.combined_text) {
        lines.push("COMPLETE PROFILE".to_string());
        lines.push(section);
        lines.push(text.replace('|', "\n"));
        lines.push(String::new());
    }

    if let Some(tags) = non_empty_list(&candidate.tags) {
        lines.push("TAGS".to_string());
        lines.push("-".repeat(10));
        lines.push(format!("🏷️ {}", tags.join(" • ")));
        lines.push(String::new());
    }

    lines.push(wide.clone());
    lines.push("Exported from AIM Founding to Give Database".to_string());
    lines.push(format!("Export Date: {}", format_timestamp(exported_at)));
    lines.push(wide);

    lines.join("\n")
}

/// One line group in the export index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub position: usize,
    pub name: String,
    pub files: Vec<String>,
    pub email: Option<String>,
    pub headline: Option<String>,
}

impl IndexEntry {
    pub fn for_candidate(position: usize, candidate: &CandidateRecord, files: Vec<String>) -> Self {
        Self {
            position,
            name: candidate.display_name(position),
            files,
            email: non_blank(&candidate.email).map(str::to_string),
            headline: non_blank(&candidate.headline).map(str::to_string),
        }
    }
}

pub fn render_index(
    entries: &[IndexEntry],
    total_candidates: usize,
    destination: &str,
    exported_at: &NaiveDateTime,
) -> String {
    let mut lines = vec![
        "AIM FOUNDING TO GIVE - COMPREHENSIVE CV EXPORT".to_string(),
        "=".repeat(60),
        format!("Export Date: {}", format_timestamp(exported_at)),
        format!("Total Candidates: {total_candidates}"),
        format!("Output: {destination}"),
        String::new(),
        "COMPLETE CANDIDATE LIST:".to_string(),
        "-".repeat(40),
    ];

    for entry in entries {
        lines.push(format!("{:4}. {}", entry.position, entry.name));
        let files = if entry.files.is_empty() {
            "(not written)".to_string()
        } else {
            entry.files.join(", ")
        };
        lines.push(format!("      File: {files}"));
        lines.push(format!(
            "      Email: {}",
            entry.email.as_deref().unwrap_or("No email")
        ));
        lines.push(format!(
            "      Role: {}",
            entry.headline.as_deref().unwrap_or("No headline")
        ));
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 6)
            .unwrap()
    }

    fn full_candidate() -> CandidateRecord {
        CandidateRecord {
            id: Some("42".to_string()),
            full_name: Some("Ada Lovelace".to_string()),
            headline: Some("Analyst".to_string()),
            email: Some("ada@example.com".to_string()),
            linkedin_url: Some("https://linkedin.com/in/ada".to_string()),
            skills: Some(vec!["Math".to_string(), "Engines".to_string()]),
            years_experience: Some("12".to_string()),
            regions: Some(vec!["Europe".to_string(), "Africa".to_string()]),
            fundraising_stage: Some("Seed".to_string()),
            tech_cofounder: Some(true),
            combined_text: Some("Intro|Experience|Education".to_string()),
            tags: Some(vec!["pioneer".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn text_cv_renders_every_section_for_full_record() {
        let cv = render_text_cv(&full_candidate(), &at());
        let lines: Vec<&str> = cv.lines().collect();

        assert_eq!(lines[0], "=".repeat(80));
        assert_eq!(lines[1], "ADA LOVELACE");
        assert_eq!(lines[2], "Analyst");
        assert_eq!(lines[3], "ID: 42");
        assert!(cv.contains("CONTACT INFORMATION"));
        assert!(cv.contains("📧 Email: ada@example.com"));
        assert!(cv.contains("🔗 LinkedIn: https://linkedin.com/in/ada"));
        assert!(cv.contains("🎯 Years of Experience: 12"));
        assert!(cv.contains("💻 Technical Co-founder: Yes"));
        assert!(cv.contains("💰 Fundraising Experience: Seed"));
        assert!(cv.contains("🌍 Regional Experience: Europe, Africa"));
        assert!(cv.contains("🛠️ Skills: Math • Engines"));
        assert!(cv.contains(&format!(
            "COMPLETE PROFILE\n{}\nIntro\nExperience\nEducation",
            "-".repeat(30)
        )));
        assert!(cv.contains("🏷️ pioneer"));
        assert!(cv.ends_with(&format!(
            "Export Date: 2024-03-09 14:05:06\n{}",
            "=".repeat(80)
        )));
    }

    #[test]
    fn text_cv_omits_absent_sections() {
        let cv = render_text_cv(&CandidateRecord::default(), &at());

        assert!(cv.contains("UNKNOWN CANDIDATE"));
        assert!(!cv.contains("ID:"));
        assert!(!cv.contains("CONTACT INFORMATION"));
        assert!(cv.contains("PROFESSIONAL SUMMARY"));
        assert!(!cv.contains("Years of Experience"));
        assert!(!cv.contains("COMPLETE PROFILE"));
        assert!(!cv.contains("TAGS"));
    }

    #[test]
    fn placeholder_values_are_not_rendered() {
        let candidate = CandidateRecord {
            fundraising_stage: Some("None".to_string()),
            years_experience: Some("0".to_string()),
            tech_cofounder: Some(false),
            skills: Some(Vec::new()),
            ..Default::default()
        };
        let cv = render_text_cv(&candidate, &at());
        assert!(!cv.contains("Fundraising"));
        assert!(!cv.contains("Years of Experience"));
        assert!(!cv.contains("Technical Co-founder"));
        assert!(!cv.contains("Skills"));
    }

    #[test]
    fn index_lists_entries_with_fallbacks() {
        let entries = vec![
            IndexEntry::for_candidate(1, &full_candidate(), vec!["0001_Ada_Lovelace_CV.txt".to_string()]),
            IndexEntry::for_candidate(
                2,
                &CandidateRecord {
                    id: Some("x".to_string()),
                    ..Default::default()
                },
                vec!["0002_Candidate_x_CV.txt".to_string(), "0002_Candidate_x_CV.pdf".to_string()],
            ),
        ];

        let index = render_index(&entries, 2, "/tmp/out", &at());
        assert!(index.starts_with("AIM FOUNDING TO GIVE - COMPREHENSIVE CV EXPORT\n"));
        assert!(index.contains("Total Candidates: 2"));
        assert!(index.contains("   1. Ada Lovelace\n      File: 0001_Ada_Lovelace_CV.txt"));
        assert!(index.contains("      Email: ada@example.com\n      Role: Analyst"));
        assert!(index.contains("   2. Candidate_x"));
        assert!(index.contains("File: 0002_Candidate_x_CV.txt, 0002_Candidate_x_CV.pdf"));
        assert!(index.contains("Email: No email\n      Role: No headline"));
    }
}
