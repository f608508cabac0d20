use crate::domain::model::{DomainId, FallbackReason};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DegradationStats {
    pub model_served: u64,
    pub no_artifact: u64,
    pub preprocess_failed: u64,
    pub inference_failed: u64,
    pub preview: u64,
}

impl DegradationStats {
    /// Requests that were meant for a model but ended on the rule scorer.
    pub fn degraded(&self) -> u64 {
        self.no_artifact + self.preprocess_failed + self.inference_failed
    }
}

/// Counts which path served each request. Shared by reference across threads.
#[derive(Debug)]
pub struct DegradationMonitor {
    model_served: AtomicU64,
    no_artifact: AtomicU64,
    preprocess_failed: AtomicU64,
    inference_failed: AtomicU64,
    preview: AtomicU64,
    start_time: Instant,
}

impl DegradationMonitor {
    pub fn new() -> Self {
        Self {
            model_served: AtomicU64::new(0),
            no_artifact: AtomicU64::new(0),
            preprocess_failed: AtomicU64::new(0),
            inference_failed: AtomicU64::new(0),
            preview: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_model(&self) {
        self.model_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Callers that know the cause log it; this only counts.
    pub fn record_fallback(&self, domain: DomainId, reason: FallbackReason) {
        let counter = match reason {
            FallbackReason::NoArtifact => &self.no_artifact,
            FallbackReason::PreprocessFailed => &self.preprocess_failed,
            FallbackReason::InferenceFailed => &self.inference_failed,
            FallbackReason::Preview => &self.preview,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%domain, reason = reason.as_str(), "served by fallback scorer");
    }

    pub fn snapshot(&self) -> DegradationStats {
        DegradationStats {
            model_served: self.model_served.load(Ordering::Relaxed),
            no_artifact: self.no_artifact.load(Ordering::Relaxed),
            preprocess_failed: self.preprocess_failed.load(Ordering::Relaxed),
            inference_failed: self.inference_failed.load(Ordering::Relaxed),
            preview: self.preview.load(Ordering::Relaxed),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_stats(&self, phase: &str) {
        let stats = self.snapshot();
        tracing::info!(
            "📊 {} - model: {}, fallback(no_artifact: {}, preprocess: {}, inference: {}), preview: {}, uptime: {:?}",
            phase,
            stats.model_served,
            stats.no_artifact,
            stats.preprocess_failed,
            stats.inference_failed,
            stats.preview,
            self.uptime()
        );
    }
}

impl Default for DegradationMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_reason() {
        let monitor = DegradationMonitor::new();
        monitor.record_model();
        monitor.record_fallback(DomainId::FetalHealth, FallbackReason::NoArtifact);
        monitor.record_fallback(DomainId::FetalHealth, FallbackReason::InferenceFailed);
        monitor.record_fallback(DomainId::BreastCancer, FallbackReason::Preview);

        let stats = monitor.snapshot();
        assert_eq!(stats.model_served, 1);
        assert_eq!(stats.no_artifact, 1);
        assert_eq!(stats.inference_failed, 1);
        assert_eq!(stats.preview, 1);
        assert_eq!(stats.degraded(), 2);
    }
}
