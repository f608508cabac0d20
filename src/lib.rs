pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use config::{DomainCatalog, EngineConfig};

pub use core::{
    ArtifactStatus, EngineOptions, LoadReport, ModelRegistry, ReloadOutcome, RiskEngine,
};
pub use domain::model::{DomainId, OutcomeSource, Request, RiskBand, RiskResult};
pub use domain::registry::DomainRegistry;
pub use utils::error::{EngineError, ErrorResponse, Result};
