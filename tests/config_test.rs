mod common;

use anyhow::Result;
use common::*;
use medirisk::utils::error::ConfigError;
use medirisk::utils::validation::Validate;
use medirisk::{DomainRegistry, EngineConfig, ModelRegistry, OutcomeSource, RiskBand, RiskEngine};
use std::sync::Arc;
use tempfile::TempDir;

const BUILTIN_CATALOG: &str = include_str!("../config/domains.toml");

fn engine_from_config(config: &EngineConfig) -> std::result::Result<RiskEngine, ConfigError> {
    let domains = config.load_catalog().and_then(DomainRegistry::from_catalog)?;
    let models = Arc::new(ModelRegistry::new(config.models_dir(), &domains));
    models.load();
    RiskEngine::new(domains, models, config.engine_options())
}

/// 從 TOML 檔案載入，包含環境變數替換與自訂領域目錄
#[test]
fn test_config_file_with_env_and_custom_catalog() -> Result<()> {
    let workspace = TempDir::new()?;
    let models_dir = workspace.path().join("models");
    write_fetal_artifact(&models_dir)?;

    // lower the breast-cancer high threshold so 55 points lands in `high`
    let catalog = BUILTIN_CATALOG.replacen("medium_max = 60.0", "medium_max = 50.0", 1);
    assert_ne!(catalog, BUILTIN_CATALOG);
    let catalog_path = workspace.path().join("domains.toml");
    std::fs::write(&catalog_path, catalog)?;

    std::env::set_var("MEDIRISK_IT_MODELS_DIR", &models_dir);
    let config_path = workspace.path().join("medirisk.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[engine]
models_dir = "${{MEDIRISK_IT_MODELS_DIR}}"
domains_file = "{}"

[logging]
level = "warn"
format = "compact"
"#,
            catalog_path.display()
        ),
    )?;

    let config = EngineConfig::from_file(&config_path)?;
    config.validate()?;
    assert_eq!(config.models_dir(), models_dir);
    assert!(!config.json_logs());

    let engine = engine_from_config(&config)?;
    assert_eq!(engine.assess(&fetal_request())?.source(), OutcomeSource::Model);

    let mut request = scenario_b();
    request.features.insert("familyHistory".into(), true.into());
    request.features.insert("previousCancer".into(), true.into());
    let result = engine.assess(&request)?;
    assert_eq!(result.score(), 55.0);
    assert_eq!(result.risk(), RiskBand::High);
    Ok(())
}

#[test]
fn test_inverted_thresholds_fail_startup() -> Result<()> {
    let workspace = TempDir::new()?;
    let catalog = BUILTIN_CATALOG.replacen("medium_max = 55.0", "medium_max = 10.0", 1);
    let catalog_path = workspace.path().join("domains.toml");
    std::fs::write(&catalog_path, catalog)?;

    let config = EngineConfig::from_toml_str(&format!(
        "[engine]\nmodels_dir = \"{}\"\ndomains_file = \"{}\"\n",
        workspace.path().display(),
        catalog_path.display()
    ))?;

    let err = engine_from_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfigValueError { .. }));
    assert_eq!(err.to_response().error_kind, "config_error");
    Ok(())
}

#[test]
fn test_missing_catalog_file_is_io_error() -> Result<()> {
    let workspace = TempDir::new()?;
    let config = EngineConfig::from_toml_str(&format!(
        "[engine]\ndomains_file = \"{}\"\n",
        workspace.path().join("nope.toml").display()
    ))?;

    let err = engine_from_config(&config).unwrap_err();
    assert!(matches!(err, ConfigError::IoError(_)));
    Ok(())
}

#[test]
fn test_unknown_log_format_is_rejected() -> Result<()> {
    let config = EngineConfig::from_toml_str("[logging]\nformat = \"xml\"\n")?;
    assert!(config.validate().is_err());
    Ok(())
}
