// Stampede CLI
//
// Decision: clap derive with env fallbacks, so CI can configure runs
// entirely through the environment.
// Decision: exit code mirrors the verdict (0 pass, 1 fail) so pipelines can
// gate on the run without parsing output.

mod profiles;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stampede_client::{TargetClient, TargetOptions};
use stampede_runner::{RunConfig, Runner};

#[derive(Parser)]
#[command(name = "stampede")]
#[command(about = "Stampede - staged load testing and post-run analysis")]
#[command(version)]
struct Cli {
    /// Built-in profile to run
    #[arg(long, short, default_value = "smoke", value_parser = profiles::NAMES.to_vec())]
    profile: String,

    /// Base URL of the target service
    #[arg(long, env = "STAMPEDE_TARGET_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Optional Authorization header value sent with every request
    #[arg(long, env = "STAMPEDE_AUTH_HEADER")]
    auth_header: Option<String>,

    /// JSON config file; its fields override the chosen profile
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Fixed RNG seed for reproducible scenario sequences
    #[arg(long, env = "STAMPEDE_SEED")]
    seed: Option<u64>,

    /// Write the raw report as JSON to this path
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Write an HTML report to this path
    #[arg(long)]
    html_out: Option<PathBuf>,

    /// Suppress the text report; the exit code still reflects the verdict
    #[arg(long, short)]
    quiet: bool,
}

/// Overlay a config file's top-level fields onto the profile configuration
fn apply_overrides(base: RunConfig, overrides: serde_json::Value) -> Result<RunConfig> {
    let mut merged = serde_json::to_value(&base)?;
    match (merged.as_object_mut(), overrides) {
        (Some(map), serde_json::Value::Object(over)) => {
            for (key, value) in over {
                map.insert(key, value);
            }
        }
        _ => anyhow::bail!("config file must contain a JSON object"),
    }
    Ok(serde_json::from_value(merged)?)
}

fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = profiles::build(&cli.profile)?;
    if let Some(path) = &cli.config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let overrides: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config = apply_overrides(config, overrides)?;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "stampede=warn" } else { "stampede=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli)?;
    tracing::info!(profile = %config.profile, url = %cli.url, "stampede starting");

    let mut options = TargetOptions::new(&cli.url).with_timeout(config.request_timeout);
    if let Some(auth) = &cli.auth_header {
        options = options.with_auth_header(auth);
    }
    let client = TargetClient::new(options).context("building target client")?;

    let runner = Runner::new(Arc::new(client), config)?;
    let run_report = runner.execute().await?;

    if !cli.quiet {
        print!("{}", report::render_text(&run_report));
    }
    if let Some(path) = &cli.json_out {
        std::fs::write(path, report::render_json(&run_report)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &cli.html_out {
        std::fs::write(path, report::render_html(&run_report))
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if !run_report.verdict.passed {
        std::process::exit(1);
    }
    Ok(())
}
