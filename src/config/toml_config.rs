use crate::config::catalog::DomainCatalog;
use crate::core::engine::EngineOptions;
use crate::utils::error::ConfigError;
use crate::utils::validation::{validate_one_of, validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_models_dir() -> String {
    "./models".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    #[serde(default)]
    pub strict_artifacts: bool,
    /// Domain catalog override. The built-in catalog is used when absent.
    pub domains_file: Option<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            strict_artifacts: false,
            domains_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConfigError::ParseError {
            source_name: "engine config".to_string(),
            message: e.to_string(),
        })
    }

    /// 替換環境變數 (例如 ${MODELS_DIR})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError {
            source_name: "env substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        validate_path("engine.models_dir", &self.engine.models_dir)?;

        if let Some(domains_file) = &self.engine.domains_file {
            validate_path("engine.domains_file", domains_file)?;
        }

        if let Some(level) = &self.logging.level {
            validate_one_of(
                "logging.level",
                level,
                &["trace", "debug", "info", "warn", "error"],
            )?;
        }

        if let Some(format) = &self.logging.format {
            validate_one_of("logging.format", format, &["compact", "json"])?;
        }

        Ok(())
    }

    pub fn models_dir(&self) -> PathBuf {
        PathBuf::from(&self.engine.models_dir)
    }

    /// 取得領域目錄：有指定檔案就讀檔，否則用內建
    pub fn load_catalog(&self) -> Result<DomainCatalog, ConfigError> {
        match &self.engine.domains_file {
            Some(path) => DomainCatalog::from_file(path),
            None => DomainCatalog::builtin(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            strict_artifacts: self.engine.strict_artifacts,
        }
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format.as_deref() == Some("json")
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_config()
    }
}
