//! Query batteries used to cover the candidate population.
//!
//! The search endpoint caps each response (typically at 50 results), so the
//! only way to see more of the population is to ask many overlapping
//! questions. None of these lists is a partition of the data; coverage is
//! best-effort.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueryPreset {
    /// Every term family: roles, domains, regions, names, schools, employers, letters.
    Comprehensive,
    /// Roles, domains and regions plus single letters and the wildcard.
    Broad,
    /// A short list of role and domain terms.
    Focused,
}

const PROFESSIONAL_TERMS: &[&str] = &[
    "founder",
    "co-founder",
    "cofounder",
    "technical",
    "entrepreneur",
    "startup",
    "experience",
    "engineer",
    "developer",
    "manager",
    "director",
    "CEO",
    "CTO",
];

const INDUSTRY_TERMS: &[&str] = &[
    "healthcare",
    "fintech",
    "AI",
    "machine learning",
    "blockchain",
    "SaaS",
    "B2B",
    "B2C",
    "mobile",
    "web",
    "ecommerce",
    "edtech",
    "biotech",
    "cleantech",
    "food",
    "logistics",
    "marketplace",
];

const REGION_TERMS: &[&str] = &[
    "Africa",
    "Europe",
    "Asia",
    "America",
    "North America",
    "Latin America",
    "Middle East",
    "Asia Pacific",
];

const FUNDRAISING_TERMS: &[&str] = &[
    "Series A",
    "Series B",
    "Series C",
    "seed",
    "pre-seed",
    "fundraising",
    "investment",
    "venture",
];

const SKILL_TERMS: &[&str] = &[
    "Python",
    "JavaScript",
    "React",
    "Node",
    "backend",
    "frontend",
    "fullstack",
    "mobile development",
    "data science",
    "DevOps",
    "AWS",
    "Google Cloud",
];

const FIRST_NAMES: &[&str] = &[
    "John",
    "Sarah",
    "David",
    "Maria",
    "Michael",
    "Jennifer",
    "Robert",
    "Lisa",
    "James",
    "Emma",
    "William",
    "Olivia",
    "Alexander",
    "Sophia",
    "Benjamin",
];

const EDUCATION_TERMS: &[&str] = &[
    "MBA",
    "PhD",
    "Stanford",
    "Harvard",
    "MIT",
    "Berkeley",
    "university",
    "college",
];

const EMPLOYER_TERMS: &[&str] = &[
    "Google",
    "Facebook",
    "Amazon",
    "Microsoft",
    "Apple",
    "Tesla",
    "Uber",
    "Airbnb",
];

const TENURE_TERMS: &[&str] = &["5 years", "10 years", "15 years", "years"];

const FILLER_TERMS: &[&str] = &[
    "a", "e", "i", "o", "u", "the", "and", "with", "for", "at", "in", "to",
];

const BROAD_TERMS: &[&str] = &[
    "founder",
    "technical",
    "entrepreneur",
    "startup",
    "experience",
    "co-founder",
    "cofounder",
    "healthcare",
    "fintech",
    "AI",
    "machine learning",
    "blockchain",
    "SaaS",
    "B2B",
    "mobile",
    "Africa",
    "Europe",
    "Asia",
    "America",
    "Series A",
    "Series B",
    "seed",
    "fundraising",
    "Python",
    "JavaScript",
    "React",
    "backend",
    "frontend",
    "mobile development",
    "data science",
    "John",
    "Sarah",
    "David",
    "Maria",
    "Michael",
    "a",
    "b",
    "c",
    "d",
    "e",
    "*",
    "",
];

const FOCUSED_TERMS: &[&str] = &[
    "founder",
    "technical",
    "entrepreneur",
    "startup",
    "experience",
    "co-founder",
    "healthcare",
    "AI",
    "fintech",
    "Series A",
    "Africa",
    "engineer",
    "developer",
    "CEO",
    "CTO",
    "manager",
];

impl QueryPreset {
    pub fn queries(self) -> Vec<String> {
        let groups: &[&[&str]] = match self {
            QueryPreset::Comprehensive => &[
                PROFESSIONAL_TERMS,
                INDUSTRY_TERMS,
                REGION_TERMS,
                FUNDRAISING_TERMS,
                SKILL_TERMS,
                FIRST_NAMES,
                EDUCATION_TERMS,
                EMPLOYER_TERMS,
                TENURE_TERMS,
                FILLER_TERMS,
            ],
            QueryPreset::Broad => &[BROAD_TERMS],
            QueryPreset::Focused => &[FOCUSED_TERMS],
        };

        groups
            .iter()
            .flat_map(|group| group.iter().map(|term| term.to_string()))
            .collect()
    }
}
