use crate::core::model_registry::{ModelRegistry, ReloadOutcome};
use crate::core::recommendations::RecommendationTable;
use crate::core::{assembler, fallback, inference, preprocessor, risk, validator};
use crate::domain::model::{DomainId, FallbackReason, Request, RiskResult};
use crate::domain::registry::DomainRegistry;
use crate::utils::error::{ConfigError, ModelLoadError, Result};
use crate::utils::monitor::DegradationMonitor;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Surface incomplete artifacts as `engine_misconfigured` instead of falling back.
    pub strict_artifacts: bool,
}

/// Validate → preprocess → infer → classify → recommend → assemble.
#[derive(Debug)]
pub struct RiskEngine {
    domains: DomainRegistry,
    models: Arc<ModelRegistry>,
    recommendations: RecommendationTable,
    monitor: DegradationMonitor,
    options: EngineOptions,
}

impl RiskEngine {
    pub fn new(
        domains: DomainRegistry,
        models: Arc<ModelRegistry>,
        options: EngineOptions,
    ) -> std::result::Result<Self, ConfigError> {
        let recommendations = RecommendationTable::build(&domains)?;
        Ok(Self {
            domains,
            models,
            recommendations,
            monitor: DegradationMonitor::new(),
            options,
        })
    }

    pub fn assess(&self, request: &Request) -> Result<RiskResult> {
        self.assess_at(request, Utc::now())
    }

    /// Same as `assess` with a caller-supplied timestamp.
    pub fn assess_at(&self, request: &Request, now: DateTime<Utc>) -> Result<RiskResult> {
        let spec = self.domains.resolve(&request.domain)?;
        let input = validator::validate(spec, &request.features)?;

        let artifact = self.models.get_artifact(spec.id);
        let prepared = match preprocessor::prepare(spec, &input, artifact) {
            Ok(prepared) => prepared,
            Err(err) if self.options.strict_artifacts => {
                tracing::error!(domain = %spec.id, error = %err, "preprocessing failed");
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!(
                    domain = %spec.id,
                    error = %err,
                    "preprocessing failed, using fallback scorer"
                );
                preprocessor::fallback(&input, FallbackReason::PreprocessFailed)
            }
        };

        let outcome = inference::infer(spec, &input, prepared, &self.monitor);
        let band = risk::classify(spec, &outcome);
        let guidance = self.recommendations.get(spec.id, band);

        tracing::debug!(
            domain = %spec.id,
            risk = %band,
            score = outcome.score,
            source = ?outcome.source,
            "assessment complete"
        );
        Ok(assembler::assemble(spec.id, band, outcome, guidance, now))
    }

    /// Results in request order; one bad request does not affect the others.
    pub fn assess_batch(&self, requests: &[Request]) -> Vec<Result<RiskResult>> {
        let now = Utc::now();
        requests.iter().map(|r| self.assess_at(r, now)).collect()
    }

    /// Rule-based score only, ignoring any loaded model.
    pub fn preview(&self, request: &Request) -> Result<RiskResult> {
        self.preview_at(request, Utc::now())
    }

    pub fn preview_at(&self, request: &Request, now: DateTime<Utc>) -> Result<RiskResult> {
        let spec = self.domains.resolve(&request.domain)?;
        let input = validator::validate(spec, &request.features)?;

        self.monitor.record_fallback(spec.id, FallbackReason::Preview);
        let outcome = fallback::outcome(spec, input.features(), FallbackReason::Preview);
        let band = risk::classify(spec, &outcome);
        let guidance = self.recommendations.get(spec.id, band);
        Ok(assembler::assemble(spec.id, band, outcome, guidance, now))
    }

    pub fn reload(&self, domain: DomainId) -> std::result::Result<ReloadOutcome, ModelLoadError> {
        self.models.reload(domain)
    }

    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    pub fn monitor(&self) -> &DegradationMonitor {
        &self.monitor
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{OutcomeSource, RiskBand};
    use crate::utils::error::EngineError;
    use serde_json::json;

    fn engine() -> RiskEngine {
        let domains = DomainRegistry::builtin().unwrap();
        let dir = std::env::temp_dir().join("medirisk-engine-unit-no-models");
        let models = Arc::new(ModelRegistry::new(dir, &domains));
        RiskEngine::new(domains, models, EngineOptions::default()).unwrap()
    }

    #[test]
    fn test_pending_domain_is_served_by_fallback() {
        let engine = engine();
        let request = Request::new(
            "breast-cancer",
            json!({
                "familyHistory": true,
                "previousCancer": false,
                "hormoneTherapy": false,
                "alcohol": false,
                "obesity": false
            }),
        );

        let result = engine.assess(&request).unwrap();
        assert_eq!(result.source(), OutcomeSource::Fallback);
        assert_eq!(result.score(), 30.0);
        assert_eq!(result.risk(), RiskBand::Medium);
        assert_eq!(engine.monitor().snapshot().no_artifact, 1);
    }

    #[test]
    fn test_unknown_domain_is_validation_error() {
        let engine = engine();
        let err = engine
            .assess(&Request::new("dermatology", json!({})))
            .unwrap_err();
        assert_eq!(err.error_kind(), "validation_error");
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_preview_counts_separately() {
        let engine = engine();
        let request = Request::new(
            "fetal",
            json!({
                "age": 30,
                "gestationalAge": 28,
                "smoking": false,
                "diabetes": false,
                "hypertension": false,
                "previousComplications": false
            }),
        );
        let result = engine.preview(&request).unwrap();
        assert_eq!(result.risk(), RiskBand::Low);
        let stats = engine.monitor().snapshot();
        assert_eq!(stats.preview, 1);
        assert_eq!(stats.degraded(), 0);
    }
}
