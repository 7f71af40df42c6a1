use reqwest::blocking::Client;

use crate::domain::{ProjectAccession, RunRecord};
use crate::error::CurateError;
use crate::http::{build_client, failure_message, send_with_retries};

pub const ENA_FIELDS: &[&str] = &[
    "run_accession",
    "sample_accession",
    "sample_alias",
    "sample_title",
    "experiment_title",
    "library_layout",
    "library_strategy",
    "library_source",
    "library_selection",
    "instrument_platform",
    "instrument_model",
    "read_count",
    "base_count",
    "scientific_name",
    "tax_id",
];

pub trait RunSource {
    fn fetch_runs(&self, project: &ProjectAccession) -> Result<Vec<RunRecord>, CurateError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    base_url: String,
}

impl EnaHttpClient {
    pub fn new(base_url: &str) -> Result<Self, CurateError> {
        Ok(Self {
            client: build_client(CurateError::EnaHttp)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl RunSource for EnaHttpClient {
    fn fetch_runs(&self, project: &ProjectAccession) -> Result<Vec<RunRecord>, CurateError> {
        let url = format!("{}/search", self.base_url);
        let query = format!("study_accession={project}");
        let fields = ENA_FIELDS.join(",");
        tracing::info!(%project, "querying ENA portal");

        let response = send_with_retries(
            || {
                self.client.get(&url).query(&[
                    ("result", "read_run"),
                    ("query", query.as_str()),
                    ("fields", fields.as_str()),
                    ("format", "json"),
                ])
            },
            CurateError::EnaHttp,
        )?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = failure_message(response, "ENA request failed");
            return Err(CurateError::EnaStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| CurateError::EnaHttp(err.to_string()))?;

        let runs = parse_runs(project, &body)?;
        tracing::info!(runs = runs.len(), "found ENA runs");
        Ok(runs)
    }
}

pub fn parse_runs(project: &ProjectAccession, body: &str) -> Result<Vec<RunRecord>, CurateError> {
    let runs: Vec<RunRecord> = serde_json::from_str(body.trim()).map_err(|err| {
        tracing::warn!(%project, error = %err, "unreadable ENA response");
        CurateError::NoRunsFound(project.to_string())
    })?;
    if runs.is_empty() {
        return Err(CurateError::NoRunsFound(project.to_string()));
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn project() -> ProjectAccession {
        "PRJNA1018599".parse().unwrap()
    }

    #[test]
    fn parse_portal_rows() {
        let body = r#"[{"run_accession":"SRR1","sample_accession":"SAMN1","read_count":"10","base_count":"1500","tax_id":"10090"}]"#;
        let runs = parse_runs(&project(), body).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].base_count, Some(1500));
        assert_eq!(runs[0].tax_id, "10090");
    }

    #[test]
    fn null_and_numeric_cells_are_tolerated() {
        let body = r#"[
            {"run_accession":"SRR1","sample_accession":"SAMN1","sample_title":null,"instrument_model":null,"read_count":null},
            {"run_accession":"SRR2","sample_accession":"SAMN2","sample_alias":42,"library_layout":"SINGLE"}
        ]"#;
        let runs = parse_runs(&project(), body).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].sample_title, "");
        assert_eq!(runs[0].instrument_model, "");
        assert_eq!(runs[0].read_count, None);
        assert_eq!(runs[1].sample_alias, "42");
        assert_eq!(runs[1].library_layout, "SINGLE");
    }

    #[test]
    fn empty_or_malformed_body_has_no_runs() {
        for body in ["", "[]", "{\"error\":true}", "not json"] {
            assert_matches!(
                parse_runs(&project(), body),
                Err(CurateError::NoRunsFound(_))
            );
        }
    }
}
