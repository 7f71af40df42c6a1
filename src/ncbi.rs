use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;

use crate::biosample::AttributeSource;
use crate::domain::ProjectAccession;
use crate::error::CurateError;
use crate::http::{build_client, failure_message, send_with_retries};

pub trait GdsClient {
    fn search_gds(&self, project: &ProjectAccession) -> Result<Vec<String>, CurateError>;
    fn summarize_gds(&self, ids: &[String]) -> Result<Value, CurateError>;
}

#[derive(Clone)]
pub struct NcbiHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NcbiHttpClient {
    pub fn new(base_url: &str) -> Result<Self, CurateError> {
        let client = build_client(CurateError::NcbiHttp)?;
        let api_key = std::env::var("NCBI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn eutil(&self, endpoint: &str, params: &[(&str, &str)]) -> RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        request
    }

    fn get_text(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, CurateError> {
        let response = send_with_retries(|| self.eutil(endpoint, params), CurateError::NcbiHttp)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = failure_message(response, "NCBI request failed");
            return Err(CurateError::NcbiStatus { status, message });
        }
        response
            .text()
            .map_err(|err| CurateError::NcbiHttp(err.to_string()))
    }

    fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, CurateError> {
        let text = self.get_text(endpoint, params)?;
        serde_json::from_str(&text)
            .map_err(|err| CurateError::MalformedResponse(format!("{endpoint}: {err}")))
    }
}

impl AttributeSource for NcbiHttpClient {
    fn fetch_batch(&self, accessions: &[String]) -> Result<String, CurateError> {
        let ids = accessions.join(",");
        self.get_text(
            "efetch.fcgi",
            &[("db", "biosample"), ("id", ids.as_str()), ("retmode", "xml")],
        )
    }
}

impl GdsClient for NcbiHttpClient {
    fn search_gds(&self, project: &ProjectAccession) -> Result<Vec<String>, CurateError> {
        let term = format!("{project}[BioProject]");
        let payload = self.get_json(
            "esearch.fcgi",
            &[("db", "gds"), ("term", term.as_str()), ("retmode", "json")],
        )?;
        parse_esearch_ids(&payload)
    }

    fn summarize_gds(&self, ids: &[String]) -> Result<Value, CurateError> {
        let ids = ids.join(",");
        self.get_json(
            "esummary.fcgi",
            &[("db", "gds"), ("id", ids.as_str()), ("retmode", "json")],
        )
    }
}

/// Reads `esearchresult.idlist`. A payload without `esearchresult`, or one
/// carrying an `ERROR`, is an error rather than an empty result.
pub fn parse_esearch_ids(payload: &Value) -> Result<Vec<String>, CurateError> {
    let result = payload
        .get("esearchresult")
        .ok_or_else(|| CurateError::MalformedResponse("esearch: missing esearchresult".to_string()))?;
    if let Some(error) = result.get("ERROR").and_then(Value::as_str) {
        return Err(CurateError::MalformedResponse(format!("esearch: {error}")));
    }
    let ids = result
        .get("idlist")
        .and_then(Value::as_array)
        .ok_or_else(|| CurateError::MalformedResponse("esearch: missing idlist".to_string()))?;
    Ok(ids
        .iter()
        .filter_map(|id| match id {
            Value::String(text) => Some(text.clone()),
            Value::Number(num) => Some(num.to_string()),
            _ => None,
        })
        .collect())
}
