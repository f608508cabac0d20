use anyhow::Context;
use clap::Parser;
use medirisk::utils::error::ErrorResponse;
use medirisk::utils::{logger, validation::Validate};
use medirisk::{Cli, Command, DomainRegistry, EngineConfig, ModelRegistry, Request, RiskEngine};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(response: ErrorResponse, suggestion: &str) -> ! {
    eprintln!("❌ {}", response.details);
    eprintln!("💡 Suggestion: {}", suggestion);
    if let Ok(body) = serde_json::to_string(&response) {
        println!("{}", body);
    }
    std::process::exit(1);
}

fn load_config(cli: &Cli) -> EngineConfig {
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => fail(e.to_response(), e.recovery_suggestion()),
    };

    logger::init_logger(cli.verbose, config.logging.level.as_deref(), config.json_logs());

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(e.to_response(), e.recovery_suggestion());
    }
    config
}

fn build_engine(config: &EngineConfig) -> RiskEngine {
    let built = config
        .load_catalog()
        .and_then(DomainRegistry::from_catalog)
        .and_then(|domains| {
            let models = Arc::new(ModelRegistry::new(config.models_dir(), &domains));
            RiskEngine::new(domains, models, config.engine_options())
        });

    match built {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("❌ Engine start-up failed: {}", e);
            fail(e.to_response(), e.recovery_suggestion())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli);

    tracing::info!("🚀 Starting medirisk");
    tracing::debug!("Engine config: {:?}", config);

    let engine = build_engine(&config);

    match &cli.command {
        Command::Domains => {
            let specs: Vec<_> = engine.domains().iter().map(|s| s.as_ref()).collect();
            print_json(&specs)?;
        }
        Command::Models => {
            let report = engine.models().spawn_load().await?;
            for err in &report.failed {
                eprintln!("⚠️  {}", err);
            }
            print_json(&engine.models().status())?;
        }
        Command::CheckConfig => {
            let report = engine.models().spawn_load().await?;
            println!("✅ Configuration and domain catalog are valid");
            println!("📦 Models ready: {}", report.loaded.len());
            for err in &report.failed {
                println!("⚠️  {}", serde_json::to_string(&err.to_response())?);
            }
            if !report.is_complete() {
                std::process::exit(2);
            }
        }
        Command::Assess {
            input,
            domain,
            preview,
        } => {
            let raw = read_input(input.as_deref())?;
            let mut request: Request =
                serde_json::from_str(&raw).context("request is not valid JSON")?;
            if let Some(domain) = domain {
                request.domain = domain.clone();
            }

            let result = if *preview {
                engine.preview(&request)
            } else {
                engine.models().spawn_load().await?;
                engine.assess(&request)
            };

            match result {
                Ok(result) => print_json(&result)?,
                Err(e) => fail(e.to_response(), e.recovery_suggestion()),
            }
        }
        Command::Batch { input } => {
            engine.models().spawn_load().await?;
            let raw = read_input(input.as_deref())?;

            for (line_no, line) in raw.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let output = match serde_json::from_str::<Request>(line) {
                    Ok(request) => match engine.assess(&request) {
                        Ok(result) => serde_json::to_string(&result)?,
                        Err(e) => serde_json::to_string(&e.to_response())?,
                    },
                    Err(e) => serde_json::to_string(&ErrorResponse::new(
                        "validation_error",
                        serde_json::json!({ "line": line_no + 1, "message": e.to_string() }),
                    ))?,
                };
                println!("{}", output);
            }
            engine.monitor().log_stats("Batch finished");
        }
    }

    Ok(())
}
