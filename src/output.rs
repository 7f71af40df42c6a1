use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::{AggregatedDocument, GeoSeriesAccession, ProjectAccession};
use crate::error::CurateError;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_document(document: &AggregatedDocument) -> io::Result<()> {
        Self::print_json(document)
    }

    pub fn print_line(line: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(line.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        Self::print_line(&json)
    }
}

pub fn metadata_path(work_dir: &Utf8Path, project: &ProjectAccession) -> Utf8PathBuf {
    work_dir.join(format!("{project}_sra_metadata.json"))
}

pub fn miniml_path(work_dir: &Utf8Path, accession: &GeoSeriesAccession) -> Utf8PathBuf {
    work_dir.join(format!("{accession}_family.xml"))
}

pub fn write_document(path: &Utf8Path, document: &AggregatedDocument) -> Result<(), CurateError> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|err| CurateError::Filesystem(err.to_string()))?;
    write_file_atomic(path, json.as_bytes())
}

pub fn write_file_atomic(dest: &Utf8Path, contents: &[u8]) -> Result<(), CurateError> {
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CurateError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-curate-file")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CurateError::Filesystem(err.to_string()))?;
    temp.write_all(contents)
        .map_err(|err| CurateError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| CurateError::Filesystem(err.to_string()))?;
    tracing::info!(path = %dest, "saved");
    Ok(())
}
