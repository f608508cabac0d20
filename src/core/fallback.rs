//! Deterministic additive rule scorer, used whenever no model can serve a request.

use crate::domain::model::{
    FallbackReason, FeatureMap, InferenceOutcome, ModelInfo, OutcomeSource,
};
use crate::domain::spec::{DomainSpec, Predicate};

pub fn evaluate(predicate: &Predicate, features: &FeatureMap) -> bool {
    let value = features.get(predicate.feature());
    match predicate {
        Predicate::Range {
            gt, gte, lt, lte, ..
        } => match value.and_then(|v| v.as_number()) {
            Some(x) => {
                gt.map_or(true, |b| x > b)
                    && gte.map_or(true, |b| x >= b)
                    && lt.map_or(true, |b| x < b)
                    && lte.map_or(true, |b| x <= b)
            }
            None => false,
        },
        Predicate::Equals { value: expected, .. } => {
            value.and_then(|v| v.as_category()) == Some(expected.as_str())
        }
        Predicate::IsTrue { .. } => value.and_then(|v| v.as_flag()) == Some(true),
    }
}

/// Baseline plus every matching rule's delta, clamped to `[0, 100]`.
pub fn score(spec: &DomainSpec, features: &FeatureMap) -> f64 {
    let mut total = spec.fallback.baseline;
    for rule in &spec.fallback.rules {
        if evaluate(&rule.when, features) {
            tracing::debug!(domain = %spec.id, rule = %rule.name, delta = rule.delta, "rule matched");
            total += rule.delta;
        }
    }
    total.clamp(0.0, 100.0)
}

pub fn outcome(spec: &DomainSpec, features: &FeatureMap, reason: FallbackReason) -> InferenceOutcome {
    InferenceOutcome {
        label: None,
        probabilities: None,
        confidence: None,
        score: score(spec, features),
        source: OutcomeSource::Fallback,
        model_info: ModelInfo {
            source: OutcomeSource::Fallback,
            name: spec.fallback_model_name(),
            version: spec.fallback.version.clone(),
            loaded_at: None,
        },
        fallback_reason: Some(reason),
    }
}
