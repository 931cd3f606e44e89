//! flocktrack CLI - batch trajectory analysis for GPS collar data
//!
//! Usage:
//!   flocktrack segment   --input <positions.jsonl> [--output <file.json>]
//!   flocktrack elbow     --input <positions.jsonl> [--output <file.json>]
//!   flocktrack cluster   --input <positions.jsonl> --k <n> [--output <file.json>]
//!   flocktrack intervals --input <positions.jsonl> [--output <file.json>]
//!
//! Input is one JSON object per line:
//!   {"device_id": 1, "t": "2022-06-01T12:00:00", "longitude": 11.75, "latitude": 63.42}

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use flocktrack::{
    AnalysisSession, JsonLinesSource, PipelineConfig, Result, SeasonWindow, TrackError,
};

#[derive(Parser)]
#[command(name = "flocktrack")]
#[command(about = "Trajectory segmentation and behavioral clustering for GPS tracking data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct InputArgs {
    /// Normalized position stream (JSON Lines)
    #[arg(short, long)]
    input: PathBuf,

    /// Pipeline configuration file (JSON); flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gap in seconds above which a trajectory is split
    #[arg(long)]
    time_threshold: Option<f64>,

    /// Speed in m/s above which a trajectory is split
    #[arg(long)]
    velocity_threshold: Option<f64>,

    /// Restrict to a month window, e.g. "6-9" for June through September
    #[arg(long)]
    season: Option<String>,

    /// Seed for k-means initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Write the report as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the position stream into trajectories and report counts
    Segment {
        #[command(flatten)]
        args: InputArgs,
    },

    /// Inertia for k = 2..9 to pick a cluster count
    Elbow {
        #[command(flatten)]
        args: InputArgs,
    },

    /// Cluster feature rows and summarize each cluster
    Cluster {
        #[command(flatten)]
        args: InputArgs,

        /// Number of clusters
        #[arg(short, long)]
        k: usize,
    },

    /// Density of sampling intervals within trajectories
    Intervals {
        #[command(flatten)]
        args: InputArgs,

        /// KDE bandwidth factor
        #[arg(long)]
        bandwidth: Option<f64>,

        /// Interval in hours mapped to log2 = 0
        #[arg(long)]
        max_hours: Option<f64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Segment { args } => run_segment(&args),
        Commands::Elbow { args } => run_elbow(&args),
        Commands::Cluster { args, k } => run_cluster(&args, k),
        Commands::Intervals {
            args,
            bandwidth,
            max_hours,
        } => run_intervals(&args, bandwidth, max_hours),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Parse a month window like "6-9".
fn parse_season(value: &str) -> Result<SeasonWindow> {
    let invalid = || TrackError::InvalidConfig(format!("season must look like 6-9, got {value:?}"));
    let (first, last) = value.split_once('-').ok_or_else(invalid)?;
    let first: u32 = first.trim().parse().map_err(|_| invalid())?;
    let last: u32 = last.trim().parse().map_err(|_| invalid())?;
    SeasonWindow::new(first, last)
}

/// Build the pipeline configuration from the optional file plus flag overrides.
fn load_config(args: &InputArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(t) = args.time_threshold {
        config.segmentation.time_threshold = t;
    }
    if let Some(v) = args.velocity_threshold {
        config.segmentation.velocity_threshold = v;
    }
    if let Some(season) = &args.season {
        config.quality.season = Some(parse_season(season)?);
    }
    if let Some(seed) = args.seed {
        config.kmeans.seed = seed;
    }

    config.validate()?;
    Ok(config)
}

fn prepare_session(args: &InputArgs) -> Result<AnalysisSession> {
    let config = load_config(args)?;
    let mut session = AnalysisSession::new(config);
    session.prepare(&JsonLinesSource::new(&args.input))?;
    Ok(session)
}

fn write_json<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report).map_err(std::io::Error::from)?;
    writer.flush()?;
    println!("\nWrote {}", path.display());
    Ok(())
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn run_segment(args: &InputArgs) -> Result<()> {
    let session = prepare_session(args)?;
    let config = session.config();

    print_header("TRAJECTORY SEGMENTATION");
    println!(
        "  Thresholds: dt > {:.0}s or v > {:.2} m/s splits",
        config.segmentation.time_threshold, config.segmentation.velocity_threshold
    );

    let Some(segmentation) = session.segmentation() else {
        return Ok(());
    };
    let stats = &segmentation.stats;
    println!("  Positions after quality filter: {}", stats.input_positions);
    println!("  Devices:                        {}", stats.devices);
    println!("  Trajectories:                   {}", stats.trajectories);
    println!("  Retained rows:                  {}", stats.retained);
    println!("  Discarded break rows:           {}", stats.discarded);

    write_json(args.output.as_deref(), stats)
}

fn run_elbow(args: &InputArgs) -> Result<()> {
    let session = prepare_session(args)?;
    let curve = session.elbow()?;

    print_header("ELBOW DIAGNOSTIC");
    println!("  {:>3}  {:>16}  {:>12}", "k", "inertia", "reduction");
    let mut previous: Option<f64> = None;
    for point in &curve {
        let reduction = previous
            .filter(|p| *p > 0.0)
            .map(|p| format!("{:.1}%", 100.0 * (p - point.inertia) / p))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>3}  {:>16.4}  {:>12}", point.k, point.inertia, reduction);
        previous = Some(point.inertia);
    }

    write_json(args.output.as_deref(), &curve)
}

fn run_cluster(args: &InputArgs, k: usize) -> Result<()> {
    let session = prepare_session(args)?;
    let summaries = session.cluster(k)?;

    print_header(&format!("CLUSTER SUMMARY (k = {})", k));
    println!(
        "  {:>7}  {:>8}  {:>14}  {:>12}  {:>9}",
        "cluster", "rows", "velocity m/s", "time of day", "amplitude"
    );
    for s in &summaries {
        let label = s
            .label
            .map(|l| l.to_string())
            .unwrap_or_else(|| "all".to_string());
        println!(
            "  {:>7}  {:>8}  {:>14.4}  {:>12}  {:>9.3}",
            label,
            s.count,
            s.mean_velocity,
            s.time_of_day.format("%H:%M:%S").to_string(),
            s.amplitude
        );
    }

    write_json(args.output.as_deref(), &summaries)
}

fn run_intervals(args: &InputArgs, bandwidth: Option<f64>, max_hours: Option<f64>) -> Result<()> {
    let session = prepare_session(args)?;
    let mut config = session.config().intervals.clone();
    if let Some(b) = bandwidth {
        config.bandwidth = b;
    }
    if let Some(h) = max_hours {
        config.max_hours = h;
    }
    let density = session.intervals_with(&config)?;

    print_header("SAMPLING INTERVALS");
    println!("  Samples: {}", density.samples);
    println!("  Peaks:");
    for peak in &density.peaks {
        println!(
            "    2^{:<7.2} x {}h  ~ {:>10.0}s  density {:.4}",
            peak.log2_ratio, config.max_hours, peak.interval_seconds, peak.density
        );
    }

    write_json(args.output.as_deref(), &density)
}
