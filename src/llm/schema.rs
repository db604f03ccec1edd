//! Fixed response contract for description parsing
//!
//! The model must answer with one JSON object carrying every field below.
//! Anything else is a malformed response for that record.

use crate::llm::EnrichmentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire shape of the model's answer; every field is required
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEnrichment {
    parsed_description: String,
    deadline_date: String,
    min_degree: String,
    min_years_experience: i64,
    modality: String,
    domain: String,
    languages: Vec<String>,
    frameworks: Vec<String>,
}

/// Engineering area a posting belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobDomain {
    Backend,
    #[serde(rename = "Full-Stack")]
    FullStack,
    #[serde(rename = "AI/ML")]
    AiMl,
    Data,
    #[serde(rename = "QA")]
    Qa,
    #[serde(rename = "Front-End")]
    FrontEnd,
    Security,
    DevOps,
    Mobile,
    #[serde(rename = "Site Reliability")]
    SiteReliability,
    Networking,
    #[serde(rename = "Embedded Systems")]
    EmbeddedSystems,
    Gaming,
    Financial,
    Other,
}

impl JobDomain {
    pub const ALL: [JobDomain; 15] = [
        Self::Backend,
        Self::FullStack,
        Self::AiMl,
        Self::Data,
        Self::Qa,
        Self::FrontEnd,
        Self::Security,
        Self::DevOps,
        Self::Mobile,
        Self::SiteReliability,
        Self::Networking,
        Self::EmbeddedSystems,
        Self::Gaming,
        Self::Financial,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "Backend",
            Self::FullStack => "Full-Stack",
            Self::AiMl => "AI/ML",
            Self::Data => "Data",
            Self::Qa => "QA",
            Self::FrontEnd => "Front-End",
            Self::Security => "Security",
            Self::DevOps => "DevOps",
            Self::Mobile => "Mobile",
            Self::SiteReliability => "Site Reliability",
            Self::Networking => "Networking",
            Self::EmbeddedSystems => "Embedded Systems",
            Self::Gaming => "Gaming",
            Self::Financial => "Financial",
            Self::Other => "Other",
        }
    }

    /// Maps a model label onto the allowed list; unknown labels become `Other`
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(Self::Other)
    }
}

/// Where the work happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    #[serde(rename = "In-Office")]
    InOffice,
    Hybrid,
    Remote,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Self::InOffice, Self::Hybrid, Self::Remote];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InOffice => "In-Office",
            Self::Hybrid => "Hybrid",
            Self::Remote => "Remote",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

/// Minimum degree a posting asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Degree {
    #[serde(rename = "Bachelor's")]
    Bachelors,
    #[serde(rename = "Master's")]
    Masters,
    #[serde(rename = "Ph.D")]
    PhD,
    Unspecified,
}

impl Degree {
    pub const ALL: [Degree; 4] = [Self::Bachelors, Self::Masters, Self::PhD, Self::Unspecified];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bachelors => "Bachelor's",
            Self::Masters => "Master's",
            Self::PhD => "Ph.D",
            Self::Unspecified => "Unspecified",
        }
    }

    /// Unknown or empty labels become `Unspecified`
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(Self::Unspecified)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        })+
    };
}

display_as_str!(JobDomain, Modality, Degree);

/// Structured data derived from a posting description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub parsed_description: String,
    pub deadline_date: String,
    pub min_degree: Degree,
    pub min_years_experience: u32,
    pub modality: Modality,
    pub domain: JobDomain,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
}

/// Parses and normalizes a model answer
///
/// A surrounding Markdown code fence is tolerated.
pub fn parse_enrichment(content: &str) -> Result<Enrichment, EnrichmentError> {
    let json = strip_code_fence(content);
    let raw: RawEnrichment =
        serde_json::from_str(json).map_err(|e| EnrichmentError::Malformed(e.to_string()))?;

    let modality = Modality::from_label(&raw.modality)
        .ok_or_else(|| EnrichmentError::Malformed(format!("unknown modality '{}'", raw.modality)))?;

    let min_years_experience = u32::try_from(raw.min_years_experience).map_err(|_| {
        EnrichmentError::Malformed(format!(
            "invalid years of experience {}",
            raw.min_years_experience
        ))
    })?;

    Ok(Enrichment {
        parsed_description: raw.parsed_description.trim().to_string(),
        deadline_date: raw.deadline_date.trim().to_string(),
        min_degree: Degree::from_label(&raw.min_degree),
        min_years_experience,
        modality,
        domain: JobDomain::from_label(&raw.domain),
        languages: normalize_names(raw.languages),
        frameworks: normalize_names(raw.frameworks),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Trims names and drops blanks and case-insensitive repeats, keeping first spelling
fn normalize_names(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
        .collect()
}
