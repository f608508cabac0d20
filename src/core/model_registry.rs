//! Holds the published model artifact for each domain.
//!
//! Readers take a short read lock and clone an `Arc`. Loading happens outside
//! any lock on the slot map; only the pointer swap takes the write lock.
//! Reloads of one domain are serialized by a per-domain mutex taken with
//! `try_lock`, so a second concurrent reload returns immediately.

use crate::core::artifact::{DirectoryArtifactSource, ModelArtifact};
use crate::domain::model::DomainId;
use crate::domain::ports::ArtifactSource;
use crate::domain::registry::DomainRegistry;
use crate::domain::spec::DomainSpec;
use crate::utils::error::ModelLoadError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Ready(Arc<ModelArtifact>),
    FallbackOnly { reason: String },
}

/// Operational view of one domain's slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    Ready {
        name: String,
        version: String,
        loaded_at: DateTime<Utc>,
    },
    FallbackOnly {
        reason: String,
    },
}

#[derive(Debug)]
pub enum ReloadOutcome {
    Reloaded(Arc<ModelArtifact>),
    AlreadyInProgress,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<DomainId>,
    pub failed: Vec<ModelLoadError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ModelRegistry {
    source: Arc<dyn ArtifactSource>,
    specs: BTreeMap<DomainId, Arc<DomainSpec>>,
    slots: RwLock<HashMap<DomainId, Slot>>,
    reload_locks: HashMap<DomainId, Mutex<()>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("status", &self.status())
            .finish()
    }
}

impl ModelRegistry {
    /// Every domain starts `pending`. Nothing is read until `load` or `spawn_load`.
    pub fn new(models_dir: impl Into<PathBuf>, domains: &DomainRegistry) -> Self {
        Self::with_source(Arc::new(DirectoryArtifactSource::new(models_dir)), domains)
    }

    pub fn with_source(source: Arc<dyn ArtifactSource>, domains: &DomainRegistry) -> Self {
        let specs: BTreeMap<DomainId, Arc<DomainSpec>> =
            domains.iter().map(|s| (s.id, Arc::clone(s))).collect();
        let slots = specs.keys().map(|id| (*id, Slot::Pending)).collect();
        let reload_locks = specs.keys().map(|id| (*id, Mutex::new(()))).collect();

        Self {
            source,
            specs,
            slots: RwLock::new(slots),
            reload_locks,
        }
    }

    /// Loads every domain. A failure affects only its own domain.
    pub fn load(&self) -> LoadReport {
        let mut report = LoadReport::default();
        for domain in self.specs.keys().copied() {
            let Some(lock) = self.reload_locks.get(&domain) else {
                continue;
            };
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            match self.load_and_publish(domain) {
                Ok(_) => report.loaded.push(domain),
                Err(err) => report.failed.push(err),
            }
        }
        tracing::info!(
            "📦 Model load finished: {} ready, {} on fallback",
            report.loaded.len(),
            report.failed.len()
        );
        report
    }

    /// Runs `load` on the blocking pool. Domains are served by fallback until published.
    pub fn spawn_load(self: &Arc<Self>) -> tokio::task::JoinHandle<LoadReport> {
        let registry = Arc::clone(self);
        tokio::task::spawn_blocking(move || registry.load())
    }

    pub fn get_artifact(&self, domain: DomainId) -> Option<Arc<ModelArtifact>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        match slots.get(&domain) {
            Some(Slot::Ready(artifact)) => Some(Arc::clone(artifact)),
            _ => None,
        }
    }

    /// Re-reads one domain from its source and swaps it in.
    pub fn reload(&self, domain: DomainId) -> Result<ReloadOutcome, ModelLoadError> {
        let Some(_guard) = self.try_begin_reload(domain) else {
            tracing::info!(%domain, "reload already in progress");
            return Ok(ReloadOutcome::AlreadyInProgress);
        };
        self.load_and_publish(domain).map(ReloadOutcome::Reloaded)
    }

    /// Publishes an artifact built in memory. Waits for an in-flight reload of the same domain.
    pub fn install(&self, artifact: ModelArtifact) -> Arc<ModelArtifact> {
        let domain = artifact.domain();
        let artifact = Arc::new(artifact);
        let _guard = self
            .reload_locks
            .get(&domain)
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));
        self.publish(domain, Slot::Ready(Arc::clone(&artifact)));
        tracing::info!(%domain, model = %artifact.metadata().name, "installed model artifact");
        artifact
    }

    pub fn status(&self) -> BTreeMap<DomainId, ArtifactStatus> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .map(|(domain, slot)| {
                let status = match slot {
                    Slot::Pending => ArtifactStatus::Pending,
                    Slot::Ready(artifact) => ArtifactStatus::Ready {
                        name: artifact.metadata().name.clone(),
                        version: artifact.metadata().version.clone(),
                        loaded_at: artifact.loaded_at(),
                    },
                    Slot::FallbackOnly { reason } => ArtifactStatus::FallbackOnly {
                        reason: reason.clone(),
                    },
                };
                (*domain, status)
            })
            .collect()
    }

    fn try_begin_reload(&self, domain: DomainId) -> Option<MutexGuard<'_, ()>> {
        match self.reload_locks.get(&domain)?.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Caller holds the domain's reload lock.
    fn load_and_publish(&self, domain: DomainId) -> Result<Arc<ModelArtifact>, ModelLoadError> {
        let spec = self
            .specs
            .get(&domain)
            .ok_or_else(|| ModelLoadError::mismatch(domain, "domain is not registered"))?;

        tracing::debug!(%domain, location = %self.source.describe(spec), "loading model artifact");
        match self.source.load(spec) {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                let missing = artifact.missing_transforms();
                if !missing.is_empty() {
                    tracing::warn!(%domain, ?missing, "artifact is incomplete");
                }
                tracing::info!(
                    %domain,
                    model = %artifact.metadata().name,
                    version = %artifact.metadata().version,
                    "✅ model artifact ready"
                );
                self.publish(domain, Slot::Ready(Arc::clone(&artifact)));
                Ok(artifact)
            }
            Err(err) => {
                tracing::warn!(%domain, error = %err, "❌ model unavailable, domain will use fallback scorer");
                self.publish(
                    domain,
                    Slot::FallbackOnly {
                        reason: err.cause.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    fn publish(&self, domain: DomainId, slot: Slot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(domain, slot);
    }
}
