use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use ci_actions::utils::{logger, validation::Validate};
use ci_actions::{app, ActionRunner, CliConfig};
use clap::Parser;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_logger(&logger::LogSettings::from_env(config.log_format, config.verbose));

    let action = config.command.name();
    tracing::info!("Starting ci-actions {}", action);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        println!("::error::{}", e);
        std::process::exit(1);
    }

    let runner = ActionRunner::new(action, config.timeout());
    let outcome = runner.run(app::run_action(&config)).await;

    let line = match &outcome {
        Ok(summary) => format!("✅ {}: {}", action, summary),
        Err(e) => format!("❌ {}: {}", action, e),
    };
    if let Some(path) = &config.step_summary {
        if let Err(e) = append_step_summary(path, &line) {
            tracing::warn!("{:#}", e);
        }
    }

    match outcome {
        Ok(summary) => {
            tracing::info!("✅ {} completed: {}", action, summary);
            println!("{}", summary);
        }
        Err(e) => {
            tracing::error!("❌ {} failed: {} (Severity: {:?})", action, e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // Workflow command so the runner annotates the failed step.
            println!("::error::{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn append_step_summary(path: &Path, line: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open step summary {}", path.display()))?;
    writeln!(file, "{}", line).context("write step summary")?;
    Ok(())
}
