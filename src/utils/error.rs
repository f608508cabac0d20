use crate::domain::model::{DomainId, RiskBand};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A single rule violation found while validating a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    UnknownDomain { domain: String },
    Missing { field: String },
    OutOfRange { field: String, value: f64, min: f64, max: f64 },
    NotAnOption { field: String, value: String, options: Vec<String> },
    TypeMismatch { field: String, expected: &'static str },
}

impl Violation {
    pub fn field(&self) -> Option<&str> {
        match self {
            Violation::UnknownDomain { .. } => None,
            Violation::Missing { field }
            | Violation::OutOfRange { field, .. }
            | Violation::NotAnOption { field, .. }
            | Violation::TypeMismatch { field, .. } => Some(field),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::UnknownDomain { domain } => write!(f, "unknown domain '{}'", domain),
            Violation::Missing { field } => write!(f, "{} is required", field),
            Violation::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} is outside [{}, {}]", field, value, min, max)
            }
            Violation::NotAnOption { field, value, options } => write!(
                f,
                "{} = '{}' is not one of {}",
                field,
                value,
                options.join(", ")
            ),
            Violation::TypeMismatch { field, expected } => {
                write!(f, "{} must be {}", field, expected)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("Validation failed for '{domain}': {} violation(s)", violations.len())]
pub struct ValidationError {
    pub domain: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn names_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field() == Some(field))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    #[error("{domain}: artifact declares a {transform} but none was loaded")]
    MissingTransform {
        domain: DomainId,
        transform: &'static str,
    },

    #[error("{domain}: feature '{feature}' is absent and cannot be imputed without a scaler")]
    Unimputable { domain: DomainId, feature: String },

    #[error("{domain}: model expects {expected} features, preprocessing produced {actual}")]
    WidthMismatch {
        domain: DomainId,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Classifier expects {expected} features, got {actual}")]
    InputWidth { expected: usize, actual: usize },

    #[error("Classifier produced a non-finite value")]
    NonFinite,

    #[error("Classifier produced {actual} probabilities for {expected} classes")]
    OutputWidth { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum LoadCause {
    #[error("artifact directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("artifact directory is empty: {0}")]
    EmptyDirectory(PathBuf),

    #[error("required file not found: {0}")]
    MissingFile(PathBuf),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

#[derive(Error, Debug)]
#[error("Model load failed for {domain}: {cause}")]
pub struct ModelLoadError {
    pub domain: DomainId,
    #[source]
    pub cause: LoadCause,
}

impl ModelLoadError {
    pub fn new(domain: DomainId, cause: LoadCause) -> Self {
        Self { domain, cause }
    }

    pub fn mismatch(domain: DomainId, message: impl Into<String>) -> Self {
        Self::new(domain, LoadCause::SchemaMismatch(message.into()))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error in {source_name}: {message}")]
    ParseError {
        source_name: String,
        message: String,
    },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Domain {0} is defined more than once")]
    DuplicateDomain(DomainId),

    #[error("Domain {0} is not defined in the catalog")]
    MissingDomain(DomainId),

    #[error("No guidance configured for {domain}/{band}")]
    MissingGuidance { domain: DomainId, band: RiskBand },

    #[error("Guidance for {domain}/{band} has no usable recommendation")]
    EmptyRecommendations { domain: DomainId, band: RiskBand },
}

impl ConfigError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ConfigError::IoError(_) => "Check that the file exists and is readable",
            ConfigError::ParseError { .. } => "Make sure the file is valid TOML",
            ConfigError::InvalidConfigValueError { .. } | ConfigError::MissingConfigError { .. } => {
                "Fix the named field in the configuration"
            }
            ConfigError::DuplicateDomain(_) | ConfigError::MissingDomain(_) => {
                "Define each domain exactly once in the catalog"
            }
            ConfigError::MissingGuidance { .. } | ConfigError::EmptyRecommendations { .. } => {
                "Add a message and at least one recommendation for every risk band"
            }
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new("config_error", serde_json::json!({ "message": self.to_string() }))
    }
}

impl ModelLoadError {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(
            "model_load_error",
            serde_json::json!({ "domain": self.domain, "message": self.to_string() }),
        )
    }
}

/// Request-level failure returned by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Engine misconfigured: {0}")]
    Misconfigured(#[from] PreprocessError),
}

impl EngineError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::Misconfigured(_) => "engine_misconfigured",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            EngineError::Validation(err) => serde_json::json!({
                "domain": err.domain,
                "violations": err.violations,
                "messages": err.violations.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            }),
            EngineError::Misconfigured(err) => serde_json::json!({ "message": err.to_string() }),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error_kind: self.error_kind().to_string(),
            details: self.details(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "Correct the listed fields and resubmit the request",
            EngineError::Misconfigured(_) => {
                "Reload or replace the model artifact for this domain"
            }
        }
    }
}

/// `{error_kind, details}` body handed back to the request layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_kind: String,
    pub details: serde_json::Value,
}

impl ErrorResponse {
    pub fn new(error_kind: &str, details: serde_json::Value) -> Self {
        Self {
            error_kind: error_kind.to_string(),
            details,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_response_lists_every_violation() {
        let err = EngineError::from(ValidationError {
            domain: "cardiovascular".to_string(),
            violations: vec![
                Violation::Missing {
                    field: "age".to_string(),
                },
                Violation::TypeMismatch {
                    field: "smoking".to_string(),
                    expected: "a boolean",
                },
            ],
        });

        let response = err.to_response();
        assert_eq!(response.error_kind, "validation_error");
        assert_eq!(response.details["violations"].as_array().unwrap().len(), 2);
        assert_eq!(response.details["violations"][0]["rule"], "missing");
        assert_eq!(response.details["messages"][1], "smoking must be a boolean");
    }

    #[test]
    fn test_misconfigured_kind() {
        let err = EngineError::from(PreprocessError::MissingTransform {
            domain: DomainId::FetalHealth,
            transform: "scaler",
        });
        assert_eq!(err.error_kind(), "engine_misconfigured");
        assert!(err.to_string().contains("fetal-health"));
    }
}
