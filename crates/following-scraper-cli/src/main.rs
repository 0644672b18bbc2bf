//! Command-line runner for `following-scraper`.
//!
//! Resolves targets from the command line and/or an inputs file, runs one
//! extraction per target and writes one file per requested export format
//! into the output directory as `NN_<slug>.<ext>`.
//!
//! Exit code: 0 when every target finished (completed or limitReached),
//! 2 when some target aborted after writing records, 1 otherwise.

mod cli;
mod inputs;
mod output;
mod progress;
mod runner;
mod settings;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use cli::Cli;
use following_scraper::{CancelFlag, SessionContext};
use inputs::TargetInput;
use runner::Runner;
use settings::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "following_scraper=info,following_scraper_cli=info";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("  error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut settings = Settings::load(cli.settings.as_deref())?;
    settings.apply_overrides(&cli);
    init_tracing(settings.log_level.as_deref(), cli.log_json)?;
    settings.scrape.validate()?;

    let mut targets: Vec<TargetInput> = cli.targets.iter().map(TargetInput::new).collect();
    if let Some(path) = &settings.input_file {
        targets.extend(inputs::read_inputs(path)?);
    }
    if targets.is_empty() {
        bail!("no targets given; pass profile URLs or --input <file>");
    }

    let session = match &settings.session_file {
        Some(path) => SessionContext::from_json_file(path)?,
        None => SessionContext::default(),
    };

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, stopping");
            on_interrupt.cancel();
        }
    });

    info!(
        targets = targets.len(),
        max_items = settings.scrape.max_items,
        output_dir = %settings.output_dir().display(),
        "starting batch"
    );
    let show_progress = !cli.quiet && !cli.json && !cli.log_json;
    let runner = Runner::new(settings, session, cancel).with_progress(show_progress);
    let summary = runner.run(&targets).await;

    if cli.json {
        output::print_json(&serde_json::to_value(&summary)?);
    } else if !cli.quiet {
        output::print_summary(&output::Styled::new(), &summary.targets);
    }
    Ok(summary.exit_code())
}

/// `--log-level` wins over `RUST_LOG`; without either only the scraper's own
/// info events are shown.
fn init_tracing(level: Option<&str>, json: bool) -> Result<()> {
    let filter = match level {
        Some(level) => {
            let level = match level.to_ascii_lowercase().as_str() {
                "warning" => "warn".to_string(),
                "critical" | "fatal" => "error".to_string(),
                other => other.to_string(),
            };
            EnvFilter::try_new(format!(
                "following_scraper={level},following_scraper_cli={level}"
            ))?
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
