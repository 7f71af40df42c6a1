use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CurateError {
    #[error("invalid BioProject accession: {0} (expected PRJNA123456, PRJEB123456, PRJDA123456, ...)")]
    InvalidProjectAccession(String),

    #[error("invalid GEO series accession: {0}")]
    InvalidSeriesAccession(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("ENA request failed: {0}")]
    EnaHttp(String),

    #[error("ENA returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("GEO request failed: {0}")]
    GeoHttp(String),

    #[error("GEO returned status {status}: {message}")]
    GeoStatus { status: u16, message: String },

    #[error("no runs found in ENA for BioProject {0}")]
    NoRunsFound(String),

    #[error("unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("no member ending in {suffix} found in archive")]
    ArchiveMemberNotFound { suffix: String },

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("MINiML not found for {accession} (tried .tgz and .xml): {message}")]
    ArchiveNotFound { accession: String, message: String },

    #[error(
        "no run metadata available for {project}. To use the manual fallback: \
         download SraRunTable.csv from https://www.ncbi.nlm.nih.gov/Traces/study/?acc={project} \
         (\"Metadata\" button), save it as {expected} and re-run"
    )]
    NoRunData { project: String, expected: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl CurateError {
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            CurateError::EnaHttp(_)
                | CurateError::EnaStatus { .. }
                | CurateError::NcbiHttp(_)
                | CurateError::NcbiStatus { .. }
                | CurateError::GeoHttp(_)
                | CurateError::GeoStatus { .. }
                | CurateError::NoRunsFound(_)
        )
    }
}
