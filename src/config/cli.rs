use crate::config::toml_config::EngineConfig;
use crate::utils::error::ConfigError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "medirisk")]
#[command(about = "Multi-domain health-risk assessment engine", version)]
pub struct Cli {
    /// Path to TOML engine configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the artifact root directory
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Override the domain catalog file
    #[arg(long, global = true)]
    pub domains: Option<PathBuf>,

    /// Surface incomplete artifacts as errors instead of falling back
    #[arg(long, global = true)]
    pub strict: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Assess one request read from a file or stdin
    Assess {
        /// Request JSON file. Reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Override the request's domain
        #[arg(long)]
        domain: Option<String>,

        /// Rule-based preview only, ignoring any loaded model
        #[arg(long)]
        preview: bool,
    },

    /// Assess a JSON-lines file of requests, one result per line
    Batch {
        /// JSON-lines file. Reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List domains and their form schemas
    Domains,

    /// Load artifacts and show per-domain model status
    Models,

    /// Validate configuration, catalog and artifacts, then exit
    CheckConfig,
}

impl Cli {
    /// 讀取設定檔（若有），再套用命令列覆蓋
    pub fn resolve_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        if let Some(models_dir) = &self.models_dir {
            config.engine.models_dir = models_dir.display().to_string();
        }
        if let Some(domains) = &self.domains {
            config.engine.domains_file = Some(domains.display().to_string());
        }
        if self.strict {
            config.engine.strict_artifacts = true;
        }
        if self.json_logs {
            config.logging.format = Some("json".to_string());
        }

        Ok(config)
    }
}
