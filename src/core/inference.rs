use crate::core::artifact::ModelArtifact;
use crate::core::fallback;
use crate::core::preprocessor::Prepared;
use crate::domain::model::{
    FallbackReason, InferenceOutcome, ModelInfo, OutcomeSource, PatientInput, PreprocessedVector,
};
use crate::domain::spec::DomainSpec;
use crate::utils::error::InferenceError;
use crate::utils::monitor::DegradationMonitor;

/// Routes a prepared request to the model or the rule scorer. Never fails.
pub fn infer(
    spec: &DomainSpec,
    input: &PatientInput,
    prepared: Prepared,
    monitor: &DegradationMonitor,
) -> InferenceOutcome {
    match prepared {
        Prepared::Model { vector, artifact } => match model_outcome(spec, &vector, &artifact) {
            Ok(outcome) => {
                monitor.record_model();
                outcome
            }
            Err(err) => {
                tracing::warn!(
                    domain = %spec.id,
                    model = %artifact.metadata().name,
                    error = %err,
                    "model inference failed, using fallback scorer"
                );
                monitor.record_fallback(spec.id, FallbackReason::InferenceFailed);
                fallback::outcome(spec, input.features(), FallbackReason::InferenceFailed)
            }
        },
        Prepared::Fallback { features, reason } => {
            monitor.record_fallback(spec.id, reason);
            fallback::outcome(spec, &features, reason)
        }
    }
}

/// Risk-weighted score in `[0, 100]` from a class probability vector.
pub fn model_score(spec: &DomainSpec, classes: &[String], probabilities: &[f64]) -> f64 {
    let score = if spec.uses_label_mode() {
        classes
            .iter()
            .zip(probabilities)
            .map(|(class, p)| p * spec.band_for_label(class).map_or(0.0, |b| b.weight()))
            .sum::<f64>()
            * 100.0
    } else {
        probabilities.last().copied().unwrap_or(0.0) * 100.0
    };
    score.clamp(0.0, 100.0)
}

pub fn model_outcome(
    spec: &DomainSpec,
    vector: &PreprocessedVector,
    artifact: &ModelArtifact,
) -> Result<InferenceOutcome, InferenceError> {
    let classifier = artifact.classifier();
    let classes = classifier.classes();
    let probabilities = classifier.predict_proba(&vector.values)?;

    if classes.is_empty() || probabilities.len() != classes.len() {
        return Err(InferenceError::OutputWidth {
            expected: classes.len(),
            actual: probabilities.len(),
        });
    }
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(InferenceError::NonFinite);
    }

    // first index wins on ties
    let mut best = 0;
    for (index, p) in probabilities.iter().enumerate() {
        if *p > probabilities[best] {
            best = index;
        }
    }

    let score = model_score(spec, classes, &probabilities);
    let metadata = artifact.metadata();

    Ok(InferenceOutcome {
        label: Some(classes[best].clone()),
        confidence: Some(probabilities[best]),
        probabilities: (classes.len() > 2).then_some(probabilities),
        score,
        source: OutcomeSource::Model,
        model_info: ModelInfo {
            source: OutcomeSource::Model,
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            loaded_at: Some(artifact.loaded_at()),
        },
        fallback_reason: None,
    })
}
