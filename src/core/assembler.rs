use crate::domain::model::{DomainId, InferenceOutcome, RiskBand, RiskResult};
use crate::domain::spec::BandGuidance;
use chrono::{DateTime, Utc};

pub fn assemble(
    domain: DomainId,
    band: RiskBand,
    outcome: InferenceOutcome,
    guidance: &BandGuidance,
    timestamp: DateTime<Utc>,
) -> RiskResult {
    RiskResult::new(
        domain,
        band,
        outcome.score.clamp(0.0, 100.0),
        outcome.confidence,
        guidance.message.clone(),
        guidance.recommendations.clone(),
        outcome.model_info,
        timestamp,
    )
}
