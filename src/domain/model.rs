use crate::utils::error::{ValidationError, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The three independently configured prediction areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainId {
    Cardiovascular,
    BreastCancer,
    FetalHealth,
}

impl DomainId {
    pub const ALL: [DomainId; 3] = [
        DomainId::Cardiovascular,
        DomainId::BreastCancer,
        DomainId::FetalHealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainId::Cardiovascular => "cardiovascular",
            DomainId::BreastCancer => "breast-cancer",
            DomainId::FetalHealth => "fetal-health",
        }
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainId {
    type Err = ValidationError;

    /// 接受前端表單沿用的舊識別碼
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cardiovascular" | "heart-disease" | "kardiyovaskuler-risk" => {
                Ok(DomainId::Cardiovascular)
            }
            "breast-cancer" | "breast_cancer" | "breast" => Ok(DomainId::BreastCancer),
            "fetal-health" | "fetal_health" | "fetal" => Ok(DomainId::FetalHealth),
            _ => Err(ValidationError {
                domain: s.to_string(),
                violations: vec![Violation::UnknownDomain {
                    domain: s.to_string(),
                }],
            }),
        }
    }
}

/// Categorical risk output. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub const ALL: [RiskBand; 3] = [RiskBand::Low, RiskBand::Medium, RiskBand::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        }
    }

    /// Contribution of a class in this band to a model-derived score.
    pub fn weight(&self) -> f64 {
        match self {
            RiskBand::Low => 0.0,
            RiskBand::Medium => 0.5,
            RiskBand::High => 1.0,
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw request as handed over by the form layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(alias = "test_type")]
    pub domain: String,
    #[serde(default, alias = "form_data")]
    pub features: serde_json::Map<String, serde_json::Value>,
}

impl Request {
    pub fn new(domain: impl Into<String>, features: serde_json::Value) -> Self {
        let features = match features {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            domain: domain.into(),
            features,
        }
    }
}

/// Typed feature value produced by the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
    Flag(bool),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FeatureValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// Validated, strongly typed patient input.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientInput {
    domain: DomainId,
    features: FeatureMap,
}

impl PatientInput {
    pub(crate) fn new(domain: DomainId, features: FeatureMap) -> Self {
        Self { domain, features }
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    pub fn features(&self) -> &FeatureMap {
        &self.features
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    Observed,
    Imputed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotProvenance {
    pub feature: String,
    pub source: SlotSource,
    pub scaled: bool,
}

/// Model-ready numeric vector in the artifact's expected order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedVector {
    pub domain: DomainId,
    pub values: Vec<f64>,
    pub provenance: Vec<SlotProvenance>,
}

impl PreprocessedVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSource {
    Model,
    Fallback,
}

/// Why a request was served by the rule-based scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoArtifact,
    PreprocessFailed,
    InferenceFailed,
    Preview,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoArtifact => "no_artifact",
            FallbackReason::PreprocessFailed => "preprocess_failed",
            FallbackReason::InferenceFailed => "inference_failed",
            FallbackReason::Preview => "preview",
        }
    }
}

/// Name/version of whatever produced the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub source: OutcomeSource,
    pub name: String,
    pub version: String,
    pub loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub label: Option<String>,
    pub probabilities: Option<Vec<f64>>,
    pub confidence: Option<f64>,
    pub score: f64,
    pub source: OutcomeSource,
    pub model_info: ModelInfo,
    pub fallback_reason: Option<FallbackReason>,
}

/// Final, immutable result of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskResult {
    domain: DomainId,
    risk: RiskBand,
    score: f64,
    confidence: Option<f64>,
    message: String,
    recommendations: Vec<String>,
    model_info: ModelInfo,
    timestamp: DateTime<Utc>,
}

impl RiskResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        domain: DomainId,
        risk: RiskBand,
        score: f64,
        confidence: Option<f64>,
        message: String,
        recommendations: Vec<String>,
        model_info: ModelInfo,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            domain,
            risk,
            score,
            confidence,
            message,
            recommendations,
            model_info,
            timestamp,
        }
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    pub fn risk(&self) -> RiskBand {
        self.risk
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }

    pub fn source(&self) -> OutcomeSource {
        self.model_info.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
