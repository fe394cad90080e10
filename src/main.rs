use anyhow::Result;
use clap::Parser;
use sspinterp::{pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Interpolate, aggregate and reconcile SSP scenario projections"
)]
struct Args {
    /// Pipeline configuration (YAML).
    #[arg(short, long)]
    config: PathBuf,
    /// Output file; `.csv` or `.parquet`. Overrides `output` in the config.
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sspinterp=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    let config = PipelineConfig::from_path(&args.config)?;
    info!(config = %args.config.display(), "startup");

    let out = pipeline::run(&config, args.output.as_deref())?;
    info!(
        rows = out.table.len(),
        cohort_violations = out.violations.len(),
        files = out.written.len(),
        "done"
    );
    for path in &out.written {
        info!(path = %path.display(), "wrote");
    }
    Ok(())
}
