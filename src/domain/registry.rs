use crate::config::catalog::DomainCatalog;
use crate::domain::model::DomainId;
use crate::domain::spec::DomainSpec;
use crate::utils::error::{ConfigError, ValidationError};
use crate::utils::validation::Validate;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable lookup of domain specs, built once at start-up.
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    specs: BTreeMap<DomainId, Arc<DomainSpec>>,
}

impl DomainRegistry {
    pub fn from_catalog(catalog: DomainCatalog) -> Result<Self, ConfigError> {
        catalog.validate()?;
        let specs = catalog
            .domains
            .into_iter()
            .map(|spec| (spec.id, Arc::new(spec)))
            .collect();
        Ok(Self { specs })
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_catalog(DomainCatalog::builtin()?)
    }

    pub fn get(&self, domain: DomainId) -> Option<&Arc<DomainSpec>> {
        self.specs.get(&domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DomainSpec>> {
        self.specs.values()
    }

    /// Parse a request's domain string and look up its spec.
    pub fn resolve(&self, domain: &str) -> Result<&Arc<DomainSpec>, ValidationError> {
        let id: DomainId = domain.parse()?;
        // from_catalog guarantees every DomainId is present
        self.specs.get(&id).ok_or_else(|| ValidationError {
            domain: domain.to_string(),
            violations: vec![crate::utils::error::Violation::UnknownDomain {
                domain: domain.to_string(),
            }],
        })
    }
}
