use reqwest::blocking::Client;
use serde_json::Value;

use crate::archive;
use crate::domain::{GeoSeriesAccession, ProjectAccession};
use crate::error::CurateError;
use crate::http::{build_client, failure_message, send_with_retries};
use crate::ncbi::GdsClient;

pub const NO_GEO_LINK: &str = "NO_GEO_LINK";

pub trait GeoClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CurateError>;
}

#[derive(Clone)]
pub struct GeoHttpClient {
    client: Client,
}

impl GeoHttpClient {
    pub fn new() -> Result<Self, CurateError> {
        Ok(Self {
            client: build_client(CurateError::GeoHttp)?,
        })
    }
}

impl GeoClient for GeoHttpClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CurateError> {
        let response = send_with_retries(|| self.client.get(url), CurateError::GeoHttp)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = failure_message(response, "GEO request failed");
            return Err(CurateError::GeoStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| CurateError::GeoHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Series directories group accessions by thousands: GSE245678 lives in
/// GSE245nnn, anything up to GSE999 in GSEnnn.
pub fn geo_series_prefix(accession: &GeoSeriesAccession) -> String {
    let digits = accession.digits();
    if digits.len() <= 3 {
        return "GSEnnn".to_string();
    }
    let head = &digits[..digits.len() - 3];
    format!("GSE{}nnn", head)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimlUrls {
    pub compressed: String,
    pub plain: String,
}

impl MinimlUrls {
    pub fn for_series(base_url: &str, accession: &GeoSeriesAccession) -> Self {
        let plain = format!(
            "{}/geo/series/{prefix}/{acc}/miniml/{acc}_family.xml",
            base_url.trim_end_matches('/'),
            prefix = geo_series_prefix(accession),
            acc = accession.as_str()
        );
        Self {
            compressed: format!("{plain}.tgz"),
            plain,
        }
    }
}

pub fn resolve_series_accession(ids: &[String], summary: &Value) -> Option<GeoSeriesAccession> {
    let result = summary.get("result")?;

    let by_accession = ids.iter().find_map(|id| {
        result
            .get(id)?
            .get("accession")?
            .as_str()
            .filter(|acc| acc.starts_with("GSE"))?
            .parse::<GeoSeriesAccession>()
            .ok()
    });
    if by_accession.is_some() {
        return by_accession;
    }

    ids.iter().find_map(|id| {
        let entry = result.get(id)?;
        if entry.get("entrytype")?.as_str()? != "GSE" {
            return None;
        }
        let number = match entry.get("gse")? {
            Value::String(text) => text.trim().to_string(),
            Value::Number(num) => num.to_string(),
            _ => return None,
        };
        format!("GSE{number}").parse::<GeoSeriesAccession>().ok()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinimlOutcome {
    Found {
        accession: GeoSeriesAccession,
        xml: String,
    },
    NoLinkedSeries,
}

pub struct MinimlResolver<'a, D: ?Sized, G: ?Sized> {
    gds: &'a D,
    geo: &'a G,
    base_url: String,
    member_suffix: String,
}

impl<'a, D, G> MinimlResolver<'a, D, G>
where
    D: GdsClient + ?Sized,
    G: GeoClient + ?Sized,
{
    pub fn new(gds: &'a D, geo: &'a G, base_url: &str, member_suffix: &str) -> Self {
        Self {
            gds,
            geo,
            base_url: base_url.to_string(),
            member_suffix: member_suffix.to_string(),
        }
    }

    pub fn resolve(&self, project: &ProjectAccession) -> Result<MinimlOutcome, CurateError> {
        tracing::info!(%project, "searching GEO for BioProject");
        let ids = self.gds.search_gds(project)?;
        if ids.is_empty() {
            tracing::info!("no GEO DataSets found for this BioProject");
            return Ok(MinimlOutcome::NoLinkedSeries);
        }
        tracing::info!(count = ids.len(), "found GEO DataSet ids");

        let summary = self.gds.summarize_gds(&ids)?;
        let Some(accession) = resolve_series_accession(&ids, &summary) else {
            tracing::info!("no GSE accession in GDS results");
            return Ok(MinimlOutcome::NoLinkedSeries);
        };
        tracing::info!(%accession, "found GEO series");

        let xml = self.download(&accession)?;
        Ok(MinimlOutcome::Found { accession, xml })
    }

    pub fn download(&self, accession: &GeoSeriesAccession) -> Result<String, CurateError> {
        let urls = MinimlUrls::for_series(&self.base_url, accession);

        tracing::info!(url = %urls.compressed, "downloading MINiML");
        let first = match self.geo.fetch(&urls.compressed) {
            Ok(bytes) => return archive::extract_text(&bytes, &self.member_suffix),
            Err(err) => err,
        };

        tracing::info!(url = %urls.plain, reason = %first, "trying uncompressed MINiML");
        match self.geo.fetch(&urls.plain) {
            Ok(bytes) => String::from_utf8(bytes).map_err(|err| {
                CurateError::MalformedResponse(format!("{}: {err}", urls.plain))
            }),
            Err(second) => Err(CurateError::ArchiveNotFound {
                accession: accession.to_string(),
                message: format!("{first}; {second}"),
            }),
        }
    }
}
