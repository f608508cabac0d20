#![allow(dead_code)]

use medirisk::core::artifact::{ArtifactMetadata, ModelArtifact, StandardScaler, TransformKind};
use medirisk::domain::ports::Classifier;
use medirisk::utils::error::InferenceError;
use medirisk::{DomainId, DomainRegistry, EngineOptions, ModelRegistry, Request, RiskEngine};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub fn write_json(dir: &Path, file: &str, value: Value) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(file), serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

/// Softmax fetal model over three CTG features, scaled then fully selected.
pub fn write_fetal_artifact(root: &Path) -> anyhow::Result<()> {
    let dir = root.join("fetal-health");
    write_json(
        &dir,
        "metadata.json",
        json!({
            "name": "fetal-ctg-softmax",
            "version": "1.2.0",
            "trained_at": "2025-02-10T08:30:00Z",
            "accuracy": 0.91,
            "features": ["baselineValue", "accelerations", "severeDecelerations"],
            "transforms": ["scaler", "selector"]
        }),
    )?;
    write_json(
        &dir,
        "classifier.json",
        json!({
            "kind": "logistic_regression",
            "classes": ["normal", "suspect", "pathological"],
            "coefficients": [[-0.4, 1.5, -2.0], [0.3, -0.2, 0.5], [0.6, -1.3, 2.5]],
            "intercepts": [1.0, 0.0, -1.0]
        }),
    )?;
    write_json(
        &dir,
        "scaler.json",
        json!({"mean": [133.0, 0.003, 0.0001], "scale": [9.8, 0.004, 0.0003]}),
    )?;
    write_json(&dir, "selector.json", json!({"support": [true, true, true]}))?;
    Ok(())
}

/// Binary cardiovascular model, threshold mode.
pub fn write_cardio_artifact(root: &Path) -> anyhow::Result<()> {
    let dir = root.join("cardiovascular");
    write_json(
        &dir,
        "metadata.json",
        json!({
            "name": "cad-logreg",
            "version": "0.9.1",
            "features": ["age", "bloodPressure", "cholesterol", "smoking", "chestPain"],
            "transforms": ["scaler"]
        }),
    )?;
    write_json(
        &dir,
        "classifier.json",
        json!({
            "kind": "logistic_regression",
            "classes": ["0", "1"],
            "coefficients": [[0.8, 0.6, 0.5, 0.4, 0.7]],
            "intercepts": [-0.2]
        }),
    )?;
    write_json(
        &dir,
        "scaler.json",
        json!({"mean": [54.0, 131.0, 246.0, 0.3, 1.2], "scale": [9.0, 17.5, 51.0, 0.46, 1.0]}),
    )?;
    Ok(())
}

pub fn engine_with(root: &Path, options: EngineOptions) -> anyhow::Result<RiskEngine> {
    let domains = DomainRegistry::builtin()?;
    let models = Arc::new(ModelRegistry::new(root, &domains));
    models.load();
    Ok(RiskEngine::new(domains, models, options)?)
}

pub fn engine(root: &Path) -> anyhow::Result<RiskEngine> {
    engine_with(root, EngineOptions::default())
}

pub fn scenario_a() -> Request {
    Request::new(
        "cardiovascular",
        json!({
            "age": 63,
            "chestPain": "severe",
            "bloodPressure": 150,
            "cholesterol": 250,
            "exerciseAngina": true,
            "smoking": true,
            "diabetes": true,
            "familyHistory": true
        }),
    )
}

pub fn scenario_b() -> Request {
    Request::new(
        "breast-cancer",
        json!({
            "familyHistory": false,
            "previousCancer": false,
            "hormoneTherapy": false,
            "alcohol": false,
            "obesity": false
        }),
    )
}

pub fn fetal_request() -> Request {
    Request::new(
        "fetal-health",
        json!({
            "age": 29,
            "gestationalAge": 34,
            "smoking": false,
            "diabetes": false,
            "hypertension": false,
            "previousComplications": false,
            "baselineValue": 150,
            "accelerations": 0.0,
            "severeDecelerations": 0.001
        }),
    )
}

/// Ignores its input and returns a fixed probability vector.
#[derive(Debug)]
pub struct FixedClassifier {
    pub classes: Vec<String>,
    pub output: Vec<f64>,
    pub width: usize,
}

impl Classifier for FixedClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.width
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        Ok(self.output.clone())
    }

    fn kind(&self) -> &str {
        "fixed"
    }
}

pub fn fixed_fetal_artifact(
    domains: &DomainRegistry,
    output: Vec<f64>,
) -> anyhow::Result<ModelArtifact> {
    let spec = domains
        .get(DomainId::FetalHealth)
        .ok_or_else(|| anyhow::anyhow!("fetal-health missing"))?;
    let classifier = FixedClassifier {
        classes: vec!["normal".into(), "suspect".into(), "pathological".into()],
        output,
        width: 1,
    };
    let metadata = ArtifactMetadata {
        name: "fetal-fixed".into(),
        version: "test".into(),
        trained_at: None,
        accuracy: None,
        features: vec!["baselineValue".into()],
        transforms: vec![TransformKind::Scaler],
    };
    let scaler = StandardScaler {
        mean: vec![140.0],
        scale: vec![10.0],
    };
    Ok(ModelArtifact::new(
        spec,
        Arc::new(classifier),
        Some(scaler),
        None,
        metadata,
    )?)
}
