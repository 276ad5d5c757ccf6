/*!
 * Tests for store configuration
 */

use anyhow::Result;
use mythvideo::{Config, LogLevel, MetadataStore, StoreError};
use crate::common;

/// Saving then loading keeps every setting
#[test]
fn test_saveAndLoad_shouldPreserveSettings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.database.path = temp_dir.path().join("catalog.db");
    config.database.busy_timeout_ms = 250;
    config.log_level = LogLevel::Debug;
    config.save(&config_path)?;

    let loaded = Config::load(&config_path)?;
    assert_eq!(loaded, config);
    Ok(())
}

/// A missing file falls back to defaults without writing one
#[test]
fn test_loadOrDefault_withMissingFile_shouldReturnDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("absent.json");

    let config = Config::load_or_default(&config_path)?;

    assert_eq!(config, Config::default());
    assert!(!config_path.exists());
    Ok(())
}

/// Malformed JSON is reported with the file name
#[test]
fn test_load_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("broken.json");
    std::fs::write(&config_path, "{ not json")?;

    let error = Config::load(&config_path).unwrap_err();

    assert!(error.to_string().contains("broken.json"));
    Ok(())
}

/// Invalid settings in the file are rejected on load
#[test]
fn test_load_withZeroBusyTimeout_shouldFailValidation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("conf.json");
    std::fs::write(&config_path, r#"{"database": {"busy_timeout_ms": 0}}"#)?;

    let error = Config::load(&config_path).unwrap_err();

    assert!(matches!(StoreError::find(&error), Some(StoreError::Config(_))));
    Ok(())
}

/// Opening a store from configuration bootstraps an empty database file
#[test]
fn test_metadataStoreOpen_withFreshPath_shouldBootstrapCatalog() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.database.path = temp_dir.path().join("db").join("catalog.db");

    let store = MetadataStore::open(&config)?;

    assert!(config.database.path.exists());
    assert_eq!(store.stats()?.videos, 0);
    Ok(())
}

/// Opening without bootstrap fails on an empty database
#[test]
fn test_metadataStoreOpen_withoutBootstrap_shouldReportMissingTable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.database.path = temp_dir.path().join("empty.db");
    config.database.create_missing_tables = false;

    let error = MetadataStore::open(&config).unwrap_err();

    assert_eq!(
        StoreError::find(&error),
        Some(&StoreError::MissingTable("videometadata".to_string()))
    );
    Ok(())
}
