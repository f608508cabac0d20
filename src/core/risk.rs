use crate::domain::model::{InferenceOutcome, RiskBand};
use crate::domain::spec::{DomainSpec, RiskThresholds};

pub fn band_for_score(thresholds: &RiskThresholds, score: f64) -> RiskBand {
    if score < thresholds.low_max {
        RiskBand::Low
    } else if score < thresholds.medium_max {
        RiskBand::Medium
    } else {
        RiskBand::High
    }
}

/// Label mode when the outcome's label is in the domain's table, thresholds otherwise.
pub fn classify(spec: &DomainSpec, outcome: &InferenceOutcome) -> RiskBand {
    outcome
        .label
        .as_deref()
        .and_then(|label| spec.band_for_label(label))
        .unwrap_or_else(|| band_for_score(&spec.thresholds, outcome.score))
}
