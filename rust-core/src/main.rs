//! Step Sensing CLI
//!
//! Counts steps in an accelerometer recording stored as CSV.
//!
//! ```text
//! step-sensing count walk.csv --has-header --json
//! step-sensing count walk.csv --trace signals.csv -v
//! step-sensing config > defaults.json
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use step_sensing::csv_io::{read_samples_from_path, sort_by_timestamp, write_trace, ColumnLayout};
use step_sensing::export::StepReportBuilder;
use step_sensing::{condition, validate_steps, StepCounterConfig};

#[derive(Parser)]
#[command(name = "step-sensing", version, about = "Accelerometer step counter")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count steps in a CSV recording
    Count(CountArgs),
    /// Print the default configuration as JSON
    Config,
}

#[derive(Args)]
struct CountArgs {
    /// Input CSV with a timestamp column and three axis columns
    input: PathBuf,

    /// Timestamp column
    #[arg(long, default_value_t = 0)]
    time_col: usize,

    /// Column of the x axis; y and z follow it
    #[arg(long, default_value_t = 1)]
    x_col: usize,

    /// First row is a header
    #[arg(long)]
    has_header: bool,

    /// Keep only the first N rows
    #[arg(long)]
    limit: Option<usize>,

    /// JSON configuration file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timestamp units per second
    #[arg(long)]
    divisor: Option<f64>,

    /// Moving-average window in samples
    #[arg(long)]
    window_length: Option<usize>,

    /// Print the full JSON report instead of the step count
    #[arg(long)]
    json: bool,

    /// Write every conditioned signal to this CSV
    #[arg(long)]
    trace: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Count(args) => count(args),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&StepCounterConfig::default())?);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(args: &CountArgs) -> Result<StepCounterConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => StepCounterConfig::default(),
    };
    if let Some(divisor) = args.divisor {
        config.timestamp_divisor = divisor;
    }
    if let Some(window) = args.window_length {
        config.window_length = window;
    }
    config.validate()?;
    Ok(config)
}

fn count(args: CountArgs) -> Result<()> {
    let config = load_config(&args)?;
    let layout = ColumnLayout {
        time: args.time_col,
        x: args.x_col,
        has_header: args.has_header,
    };

    let mut samples = read_samples_from_path(&args.input, &layout, args.limit)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    sort_by_timestamp(&mut samples);
    info!(samples = samples.len(), input = %args.input.display(), "loaded recording");
    if samples.is_empty() {
        warn!("recording has no samples");
    }

    let signals = condition(&samples, &config)?;
    let result = validate_steps(&signals.samples(), &config)?;
    info!(
        steps = result.step_count,
        revoked = result.revoked_steps.len(),
        duration_s = signals.duration(),
        "step count complete"
    );

    if let Some(path) = &args.trace {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_trace(BufWriter::new(file), &signals)?;
        info!(path = %path.display(), "wrote signal trace");
    }

    if args.json {
        let report = StepReportBuilder::new(&result, &config)
            .source(args.input.display().to_string())
            .recording(signals.len(), signals.duration())
            .with_crossings()
            .build();
        println!("{}", report.to_json_pretty()?);
    } else {
        println!("{}", result.step_count);
    }
    Ok(())
}
