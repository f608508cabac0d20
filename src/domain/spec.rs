//! Per-domain schema, thresholds, scoring rules and guidance tables.

use crate::domain::model::{DomainId, RiskBand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_required() -> bool {
    true
}

fn default_rules_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric { min: f64, max: f64 },
    Categorical { options: Vec<String> },
    Boolean,
}

impl FeatureKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FeatureKind::Numeric { .. } => "a number",
            FeatureKind::Categorical { .. } => "one of the listed options",
            FeatureKind::Boolean => "a boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureSpec {
    /// Ordinal position of a categorical option, used as its model encoding.
    pub fn ordinal(&self, value: &str) -> Option<usize> {
        match &self.kind {
            FeatureKind::Categorical { options } => options.iter().position(|o| o == value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low_max: f64,
    pub medium_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Every bound that is present must hold.
    Range {
        feature: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gt: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gte: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lt: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lte: Option<f64>,
    },
    Equals {
        feature: String,
        value: String,
    },
    IsTrue {
        feature: String,
    },
}

impl Predicate {
    pub fn feature(&self) -> &str {
        match self {
            Predicate::Range { feature, .. }
            | Predicate::Equals { feature, .. }
            | Predicate::IsTrue { feature } => feature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub name: String,
    pub when: Predicate,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRules {
    #[serde(default = "default_rules_version")]
    pub version: String,
    #[serde(default)]
    pub baseline: f64,
    #[serde(default)]
    pub rules: Vec<ScoringRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandGuidance {
    pub message: String,
    pub recommendations: Vec<String>,
}

/// One domain's complete, immutable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    pub id: DomainId,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub features: Vec<FeatureSpec>,
    pub thresholds: RiskThresholds,
    /// Model class label to band. Empty means the model score is banded by thresholds.
    #[serde(default)]
    pub labels: BTreeMap<String, RiskBand>,
    pub fallback: FallbackRules,
    pub guidance: BTreeMap<RiskBand, BandGuidance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<String>,
}

impl DomainSpec {
    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn artifact_dir_name(&self) -> &str {
        self.artifact_dir.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn band_for_label(&self, label: &str) -> Option<RiskBand> {
        self.labels
            .get(label)
            .or_else(|| self.labels.get(&label.to_ascii_lowercase()))
            .copied()
    }

    pub fn uses_label_mode(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn fallback_model_name(&self) -> String {
        format!("{}-rules", self.id)
    }
}
