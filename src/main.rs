use anyhow::{Context, Result};
use clap::Parser;
use latencia::cli::{Cli, OutputFormat};
use latencia::{analysis, output, source};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.analysis_config()?;

    let events = source::open(&args.trace, args.input_format)
        .with_context(|| format!("Failed to open trace {}", args.trace.display()))?;

    let report = analysis::analyze(events, &config)?;

    match args.format {
        OutputFormat::Text => print!("{}", output::format_text(&report)),
        OutputFormat::Json => println!(
            "{}",
            output::format_json(&report).context("Failed to serialize report")?
        ),
        OutputFormat::Csv => print!("{}", output::format_csv(&report)),
    }

    Ok(())
}
