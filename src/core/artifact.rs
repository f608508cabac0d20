//! On-disk model artifacts: a classifier plus optional scaler and selector,
//! described by a metadata file. All four parts load as one unit.

use crate::domain::model::DomainId;
use crate::domain::ports::{ArtifactSource, Classifier};
use crate::domain::spec::DomainSpec;
use crate::utils::error::{InferenceError, LoadCause, ModelLoadError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const SELECTOR_FILE: &str = "selector.json";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Scaler,
    Selector,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Scaler => "scaler",
            TransformKind::Selector => "selector",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Model input order, in domain feature names.
    pub features: Vec<String>,
    #[serde(default)]
    pub transforms: Vec<TransformKind>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierFile {
    LogisticRegression {
        classes: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
}

/// Logistic regression. One coefficient row for a binary model (sigmoid),
/// one row per class otherwise (softmax).
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    classes: Vec<String>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    n_features: usize,
}

impl LinearClassifier {
    pub fn new(
        classes: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    ) -> Result<Self, String> {
        if classes.len() < 2 {
            return Err(format!("need at least 2 classes, got {}", classes.len()));
        }
        let expected_rows = if classes.len() == 2 { 1 } else { classes.len() };
        if coefficients.len() != expected_rows {
            return Err(format!(
                "{} classes need {} coefficient row(s), got {}",
                classes.len(),
                expected_rows,
                coefficients.len()
            ));
        }
        if intercepts.len() != expected_rows {
            return Err(format!(
                "expected {} intercept(s), got {}",
                expected_rows,
                intercepts.len()
            ));
        }

        let n_features = coefficients[0].len();
        if n_features == 0 || coefficients.iter().any(|row| row.len() != n_features) {
            return Err("coefficient rows must be non-empty and of equal width".to_string());
        }
        let all_finite = coefficients.iter().flatten().chain(&intercepts).all(|v| v.is_finite());
        if !all_finite {
            return Err("coefficients and intercepts must be finite".to_string());
        }

        Ok(Self {
            classes,
            coefficients,
            intercepts,
            n_features,
        })
    }

    fn logit(&self, row: usize, features: &[f64]) -> f64 {
        self.coefficients[row]
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercepts[row]
    }
}

impl Classifier for LinearClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::InputWidth {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let probabilities = if self.classes.len() == 2 {
            let p = 1.0 / (1.0 + (-self.logit(0, features)).exp());
            vec![1.0 - p, p]
        } else {
            let logits: Vec<f64> = (0..self.classes.len())
                .map(|row| self.logit(row, features))
                .collect();
            let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
            let total: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / total).collect()
        };

        if probabilities.iter().all(|p| p.is_finite()) {
            Ok(probabilities)
        } else {
            Err(InferenceError::NonFinite)
        }
    }

    fn kind(&self) -> &str {
        "logistic_regression"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform_at(&self, index: usize, value: f64) -> f64 {
        (value - self.mean[index]) / self.scale[index]
    }

    fn check(&self, width: usize) -> Result<(), String> {
        if self.mean.len() != width || self.scale.len() != width {
            return Err(format!(
                "scaler has {} means and {} scales for {} features",
                self.mean.len(),
                self.scale.len(),
                width
            ));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err("scaler means must be finite".to_string());
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scaler scales must be finite and positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelector {
    pub support: Vec<bool>,
}

impl FeatureSelector {
    pub fn selected_count(&self) -> usize {
        self.support.iter().filter(|kept| **kept).count()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.support.get(index).copied().unwrap_or(false)
    }
}

/// Immutable, fully validated model artifact for one domain.
#[derive(Debug)]
pub struct ModelArtifact {
    domain: DomainId,
    classifier: Arc<dyn Classifier>,
    scaler: Option<StandardScaler>,
    selector: Option<FeatureSelector>,
    metadata: ArtifactMetadata,
    loaded_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Cross-checks every part against the others and against the domain schema.
    pub fn new(
        spec: &DomainSpec,
        classifier: Arc<dyn Classifier>,
        scaler: Option<StandardScaler>,
        selector: Option<FeatureSelector>,
        metadata: ArtifactMetadata,
    ) -> Result<Self, ModelLoadError> {
        let domain = spec.id;
        let width = metadata.features.len();
        if width == 0 {
            return Err(ModelLoadError::mismatch(domain, "metadata lists no features"));
        }

        let scaler_declared = metadata.transforms.contains(&TransformKind::Scaler);
        let mut seen = HashSet::new();
        for name in &metadata.features {
            let Some(feature) = spec.feature(name) else {
                return Err(ModelLoadError::mismatch(
                    domain,
                    format!("unknown feature '{}'", name),
                ));
            };
            // absent optional values are imputed from the scaler mean
            if !feature.required && !scaler_declared {
                return Err(ModelLoadError::mismatch(
                    domain,
                    format!("optional feature '{}' needs a scaler for imputation", name),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ModelLoadError::mismatch(
                    domain,
                    format!("feature '{}' listed twice", name),
                ));
            }
        }

        for (part, present) in [
            (TransformKind::Scaler, scaler.is_some()),
            (TransformKind::Selector, selector.is_some()),
        ] {
            if present && !metadata.transforms.contains(&part) {
                return Err(ModelLoadError::mismatch(
                    domain,
                    format!("{} supplied but not declared in metadata", part.as_str()),
                ));
            }
        }

        if let Some(scaler) = &scaler {
            scaler
                .check(width)
                .map_err(|m| ModelLoadError::mismatch(domain, m))?;
        }

        let mut output_width = width;
        if let Some(selector) = &selector {
            if selector.support.len() != width {
                return Err(ModelLoadError::mismatch(
                    domain,
                    format!(
                        "selector support has {} entries for {} features",
                        selector.support.len(),
                        width
                    ),
                ));
            }
            output_width = selector.selected_count();
        }

        // A declared but absent selector leaves the true width unknown until it is supplied.
        let selector_pending =
            selector.is_none() && metadata.transforms.contains(&TransformKind::Selector);
        if !selector_pending && output_width != classifier.n_features() {
            return Err(ModelLoadError::mismatch(
                domain,
                format!(
                    "classifier expects {} inputs, pipeline produces {}",
                    classifier.n_features(),
                    output_width
                ),
            ));
        }

        if spec.uses_label_mode() {
            if let Some(class) = classifier
                .classes()
                .iter()
                .find(|c| spec.band_for_label(c).is_none())
            {
                return Err(ModelLoadError::mismatch(
                    domain,
                    format!("class '{}' has no risk band in the label table", class),
                ));
            }
        }

        Ok(Self {
            domain,
            classifier,
            scaler,
            selector,
            metadata,
            loaded_at: Utc::now(),
        })
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn selector(&self) -> Option<&FeatureSelector> {
        self.selector.as_ref()
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn expected_features(&self) -> &[String] {
        &self.metadata.features
    }

    pub fn expected_feature_count(&self) -> usize {
        self.classifier.n_features()
    }

    /// Declared transforms that were not supplied.
    pub fn missing_transforms(&self) -> Vec<TransformKind> {
        self.metadata
            .transforms
            .iter()
            .copied()
            .filter(|t| match t {
                TransformKind::Scaler => self.scaler.is_none(),
                TransformKind::Selector => self.selector.is_none(),
            })
            .collect()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

fn read_json<T: DeserializeOwned>(domain: DomainId, path: &Path) -> Result<T, ModelLoadError> {
    if !path.is_file() {
        return Err(ModelLoadError::new(
            domain,
            LoadCause::MissingFile(path.to_path_buf()),
        ));
    }
    let content = std::fs::read_to_string(path).map_err(|source| {
        ModelLoadError::new(
            domain,
            LoadCause::Io {
                path: path.to_path_buf(),
                source,
            },
        )
    })?;
    serde_json::from_str(&content).map_err(|source| {
        ModelLoadError::new(
            domain,
            LoadCause::Malformed {
                path: path.to_path_buf(),
                source,
            },
        )
    })
}

fn read_transform<T: DeserializeOwned>(
    domain: DomainId,
    dir: &Path,
    file: &str,
    transform: TransformKind,
    declared: &[TransformKind],
) -> Result<Option<T>, ModelLoadError> {
    if !declared.contains(&transform) {
        return Ok(None);
    }
    let path = dir.join(file);
    if !path.exists() {
        tracing::warn!(
            %domain,
            transform = transform.as_str(),
            "artifact declares a transform that is not on disk; requests will fall back"
        );
        return Ok(None);
    }
    read_json(domain, &path).map(Some)
}

/// Reads one domain's artifact directory.
pub fn load_artifact(dir: &Path, spec: &DomainSpec) -> Result<ModelArtifact, ModelLoadError> {
    let domain = spec.id;
    if !dir.is_dir() {
        return Err(ModelLoadError::new(
            domain,
            LoadCause::MissingDirectory(dir.to_path_buf()),
        ));
    }

    let mut entries = std::fs::read_dir(dir).map_err(|source| {
        ModelLoadError::new(
            domain,
            LoadCause::Io {
                path: dir.to_path_buf(),
                source,
            },
        )
    })?;
    if entries.next().is_none() {
        return Err(ModelLoadError::new(
            domain,
            LoadCause::EmptyDirectory(dir.to_path_buf()),
        ));
    }

    let metadata: ArtifactMetadata = read_json(domain, &dir.join(METADATA_FILE))?;
    let classifier_file: ClassifierFile = read_json(domain, &dir.join(CLASSIFIER_FILE))?;
    let ClassifierFile::LogisticRegression {
        classes,
        coefficients,
        intercepts,
    } = classifier_file;
    let classifier = LinearClassifier::new(classes, coefficients, intercepts)
        .map_err(|m| ModelLoadError::mismatch(domain, m))?;

    let scaler = read_transform(
        domain,
        dir,
        SCALER_FILE,
        TransformKind::Scaler,
        &metadata.transforms,
    )?;
    let selector = read_transform(
        domain,
        dir,
        SELECTOR_FILE,
        TransformKind::Selector,
        &metadata.transforms,
    )?;

    ModelArtifact::new(spec, Arc::new(classifier), scaler, selector, metadata)
}

/// One sub-directory per domain under a common root.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactSource {
    root: PathBuf,
}

impl DirectoryArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir_for(&self, spec: &DomainSpec) -> PathBuf {
        self.root.join(spec.artifact_dir_name())
    }
}

impl ArtifactSource for DirectoryArtifactSource {
    fn load(&self, spec: &DomainSpec) -> Result<ModelArtifact, ModelLoadError> {
        load_artifact(&self.dir_for(spec), spec)
    }

    fn describe(&self, spec: &DomainSpec) -> String {
        self.dir_for(spec).display().to_string()
    }
}
