pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use catalog::DomainCatalog;
#[cfg(feature = "cli")]
pub use cli::{Cli, Command};
pub use toml_config::EngineConfig;
