use clap::{Parser, ValueEnum};
use log::info;
use radial_cli::radial_stitch::{init_thread_pool, FallbackPolicy, ProjectionMode, TrialOrder};
use radial_cli::{save_image, RadialStitcher, StitchConfig};
use std::path::PathBuf;
use std::time::Instant;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "radial")]
#[command(about = "Stitch a left-to-right sweep of photos taken from one spot into a panorama")]
#[command(version)]
struct Cli {
    /// Input frames, ordered left to right.
    #[arg(required = true, num_args = 2..)]
    images: Vec<PathBuf>,

    /// Projection surface.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Focal length in pixels.
    #[arg(long)]
    focal: Option<f64>,

    /// Seed of the random hypothesis draws.
    #[arg(long)]
    seed: Option<u64>,

    /// Try every match as hypothesis instead of random draws.
    #[arg(long, conflicts_with = "seed")]
    exhaustive: bool,

    /// Only fall back to the last hypothesis when no consensus was found.
    #[arg(long)]
    strict_fallback: bool,

    /// Configuration file (JSON or TOML); flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the panorama.
    #[arg(short, long, default_value = "panorama.jpg")]
    output: PathBuf,

    /// Worker threads (default: number of CPUs).
    #[arg(long)]
    threads: Option<usize>,

    /// Directory to write per-pair match visualisations into.
    #[arg(long)]
    debug_matches: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Cylindrical,
    Spherical,
}

impl ModeArg {
    fn to_core(self) -> ProjectionMode {
        match self {
            Self::Cylindrical => ProjectionMode::Cylindrical,
            Self::Spherical => ProjectionMode::Spherical,
        }
    }
}

fn build_config(cli: &Cli) -> CliResult<StitchConfig> {
    let mut config = match &cli.config {
        Some(path) => StitchConfig::load(path)?,
        None => StitchConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.projection = mode.to_core();
    }
    if let Some(focal) = cli.focal {
        config.focal_length = focal;
    }
    if let Some(seed) = cli.seed {
        config.estimator.trial_order = TrialOrder::Random { seed };
    }
    if cli.exhaustive {
        config.estimator.trial_order = TrialOrder::Exhaustive;
    }
    if cli.strict_fallback {
        config.estimator.fallback = FallbackPolicy::NoConsensus;
    }
    if let Some(threads) = cli.threads {
        config.n_threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_thread_pool(config.n_threads)?;
    info!("{}", config.summary());

    let stitcher = RadialStitcher::new(config)?;
    let t0 = Instant::now();
    let panorama = stitcher.stitch_files(&cli.images)?;
    info!("stitched in {:.2?}", t0.elapsed());

    if let Some(dir) = &cli.debug_matches {
        stitcher.write_match_debug(&panorama, dir)?;
    }

    save_image(&panorama.canvas, &cli.output)?;
    let (w, h) = panorama.canvas.dimensions();
    info!("wrote {}x{} panorama to {}", w, h, cli.output.display());
    Ok(())
}
