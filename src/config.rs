use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CurateError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-curate.json";
pub const ENA_PORTAL_URL: &str = "https://www.ebi.ac.uk/ena/portal/api";
pub const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const GEO_FTP_URL: &str = "https://ftp.ncbi.nlm.nih.gov";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ena_portal_url: Option<String>,
    #[serde(default)]
    pub eutils_url: Option<String>,
    #[serde(default)]
    pub geo_ftp_url: Option<String>,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub biosample_batch_size: Option<usize>,
    #[serde(default)]
    pub biosample_batch_delay_ms: Option<u64>,
    #[serde(default)]
    pub archive_member_suffix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            delay: Duration::from_millis(350),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub ena_portal_url: String,
    pub eutils_url: String,
    pub geo_ftp_url: String,
    pub work_dir: Utf8PathBuf,
    pub batch: BatchSettings,
    pub archive_member_suffix: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            ena_portal_url: ENA_PORTAL_URL.to_string(),
            eutils_url: EUTILS_URL.to_string(),
            geo_ftp_url: GEO_FTP_URL.to_string(),
            work_dir: Utf8PathBuf::from("tmp"),
            batch: BatchSettings::default(),
            archive_member_suffix: ".xml".to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CurateError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CurateError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CurateError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CurateError> {
        let defaults = ResolvedConfig::default();

        let batch_size = config
            .biosample_batch_size
            .unwrap_or(defaults.batch.batch_size);
        if batch_size == 0 {
            return Err(CurateError::ConfigParse(
                "biosample_batch_size must be at least 1".to_string(),
            ));
        }

        let archive_member_suffix = config
            .archive_member_suffix
            .unwrap_or(defaults.archive_member_suffix);
        if archive_member_suffix.is_empty() {
            return Err(CurateError::ConfigParse(
                "archive_member_suffix must not be empty".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            ena_portal_url: trim_base(config.ena_portal_url, defaults.ena_portal_url),
            eutils_url: trim_base(config.eutils_url, defaults.eutils_url),
            geo_ftp_url: trim_base(config.geo_ftp_url, defaults.geo_ftp_url),
            work_dir: config
                .work_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.work_dir),
            batch: BatchSettings {
                batch_size,
                delay: config
                    .biosample_batch_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.batch.delay),
            },
            archive_member_suffix,
        })
    }
}

fn trim_base(value: Option<String>, default: String) -> String {
    value
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or(default)
}
