use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use kira_curate::config::{Config, ConfigLoader};
use kira_curate::error::CurateError;

#[test]
fn config_file_overrides_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-curate.json");
    fs::write(
        &path,
        r#"{
            "eutils_url": "http://localhost:8080/eutils/",
            "work_dir": "scratch",
            "biosample_batch_size": 50,
            "biosample_batch_delay_ms": 0
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.eutils_url, "http://localhost:8080/eutils");
    assert_eq!(resolved.work_dir.as_str(), "scratch");
    assert_eq!(resolved.batch.batch_size, 50);
    assert_eq!(resolved.batch.delay, Duration::ZERO);
    assert_eq!(resolved.ena_portal_url, "https://www.ebi.ac.uk/ena/portal/api");
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CurateError::ConfigRead(_))
    );
}

#[test]
fn invalid_json_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-curate.json");
    fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CurateError::ConfigParse(_))
    );
}

#[test]
fn empty_member_suffix_rejected() {
    let config = Config {
        archive_member_suffix: Some(String::new()),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(CurateError::ConfigParse(_))
    );
}
