use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CurateError;

pub type SampleAttributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectAccession(String);

impl ProjectAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectAccession {
    type Err = CurateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let pattern = Regex::new(r"^PRJ[A-Z]{1,2}\d+$")
            .map_err(|err| CurateError::MalformedInput(err.to_string()))?;
        let trimmed = value.trim();
        if !pattern.is_match(trimmed) {
            return Err(CurateError::InvalidProjectAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoSeriesAccession(String);

impl GeoSeriesAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digits(&self) -> &str {
        self.0.trim_start_matches("GSE")
    }
}

impl fmt::Display for GeoSeriesAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeoSeriesAccession {
    type Err = CurateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let digits = normalized.strip_prefix("GSE").unwrap_or_default();
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(CurateError::InvalidSeriesAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRecord {
    #[serde(deserialize_with = "deserialize_text")]
    pub run_accession: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub sample_accession: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub sample_alias: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub sample_title: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub experiment_title: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub library_layout: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub library_strategy: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub library_source: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub library_selection: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub instrument_platform: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub instrument_model: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub read_count: Option<u64>,
    #[serde(deserialize_with = "deserialize_count")]
    pub base_count: Option<u64>,
    #[serde(deserialize_with = "deserialize_text")]
    pub scientific_name: String,
    #[serde(deserialize_with = "deserialize_text")]
    pub tax_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_attributes: Option<SampleAttributes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    #[serde(rename = "combined-API")]
    CombinedApi,
    #[serde(rename = "manual_csv")]
    ManualCsv,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::CombinedApi => write!(f, "combined-API"),
            Provenance::ManualCsv => write!(f, "manual_csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedDocument {
    project: String,
    fetch_date: String,
    source: Provenance,
    run_count: usize,
    runs: Vec<RunRecord>,
}

impl AggregatedDocument {
    pub fn new(project: &ProjectAccession, source: Provenance, runs: Vec<RunRecord>) -> Self {
        Self {
            project: project.as_str().to_string(),
            fetch_date: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            source,
            run_count: runs.len(),
            runs,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn fetch_date(&self) -> &str {
        &self.fetch_date
    }

    pub fn source(&self) -> Provenance {
        self.source
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }
}

pub fn normalize_attribute_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    out
}

pub fn parse_count(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(num)) => num.as_u64(),
        Some(Value::String(text)) => parse_count(&text),
        _ => None,
    })
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text,
        Some(Value::Number(num)) => num.to_string(),
        _ => String::new(),
    })
}
