pub mod artifact;
pub mod assembler;
pub mod engine;
pub mod fallback;
pub mod inference;
pub mod model_registry;
pub mod preprocessor;
pub mod recommendations;
pub mod risk;
pub mod validator;

pub use crate::domain::model::{Request, RiskResult};
pub use crate::domain::ports::{ArtifactSource, Classifier};
pub use crate::utils::error::Result;
pub use engine::{EngineOptions, RiskEngine};
pub use model_registry::{ArtifactStatus, LoadReport, ModelRegistry, ReloadOutcome};
