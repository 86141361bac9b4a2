use clap::{Parser, Subcommand};
use quality_triage::config::{self, TriageConfig};
use quality_triage::image_handle::ImageHandle;
use quality_triage::imaging::RustBackend;
use quality_triage::pipeline::{self, Triage};
use quality_triage::{criteria, metrics, output, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "quality-triage")]
#[command(about = "Blur triage and corrective enhancement for inspection images")]
#[command(long_about = "\
Blur triage and corrective enhancement for inspection images

Each image is measured (Laplacian sharpness, noise variance, illumination
uniformity, over-exposure), graded against a sharpness rule table and given
an ordered list of corrective operations:

  Clear          gamma ± · CLAHE
  Slight_Blur    light denoise · light sharpen · CLAHE
  Moderate_Blur  strong denoise · deblur · medium sharpen · CLAHE · gamma ±
  Heavy_Blur     mark as low quality · aggressive deblur

Operations in the middle column only run when the metrics call for them.

Files:

  triage.toml                 # Thresholds and penalties (optional)
  sharpness_criteria.csv      # Rule table (optional, stock table built in)

Run 'quality-triage gen-config' for a documented triage.toml and
'quality-triage gen-rules' for the stock rule table.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Sharpness rule table (overrides criteria.rules from the config)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for single-image inspection commands.
#[derive(clap::Args, Clone)]
struct InspectArgs {
    /// Image to inspect
    image: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Measure the distortion metrics of one image
    Analyze(InspectArgs),
    /// Measure, classify and print the enhancement plan for one image
    Plan(InspectArgs),
    /// Apply the enhancement plan to one image
    Enhance {
        /// Image to enhance
        image: PathBuf,
        /// Where to write the enhanced image (format from the extension)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Triage and enhance every image under a directory
    Batch {
        /// Input directory (searched recursively)
        input: PathBuf,
        /// Output directory for enhanced images and report.json
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print a stock triage.toml with all options documented
    GenConfig,
    /// Print the stock sharpness rule table as CSV
    GenRules,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Analyze(args) => {
            let config = resolve_config(&cli)?;
            let mut handle = ImageHandle::bound(args.image.as_path());
            let measured = metrics::analyze(&mut handle, &config.metrics)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&measured)?);
            } else {
                output::print_metrics(&args.image, &measured);
            }
        }
        Command::Plan(args) => {
            let config = resolve_config(&cli)?;
            let triage = Triage::from_config(&config)?;
            let mut handle = ImageHandle::bound(args.image.as_path());
            let report = triage.triage(&mut handle)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_report(&args.image, &report);
            }
        }
        Command::Enhance { image, output: out } => {
            let config = resolve_config(&cli)?;
            let triage = Triage::from_config(&config)?;
            let mut handle = ImageHandle::bound(image.as_path());
            let (report, enhanced) = triage.enhance(&RustBackend::new(), &mut handle)?;
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            enhanced.save(out)?;
            output::print_report(image, &report);
            println!("==> Wrote {}", out.display());
        }
        Command::Batch { input, output: out } => {
            let config = resolve_config(&cli)?;
            let triage = Triage::from_config(&config)?;
            init_thread_pool(&config.processing);
            let sources = scan::scan(input)?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = pipeline::run_batch(
                &RustBackend::new(),
                &triage,
                &sources,
                input_root(input),
                out,
                Some(tx),
            )?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_batch_summary(&report, out);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::GenRules => {
            print!("{}", criteria::stock_criteria_csv());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber; `-v` raises the level step by step.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load `--config` (stock defaults when absent) and apply `--rules`.
fn resolve_config(cli: &Cli) -> Result<TriageConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(rules) = &cli.rules {
        config.criteria.rules = Some(rules.clone());
    }
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Root that batch output paths are made relative to.
fn input_root(input: &Path) -> &Path {
    if input.is_file() {
        input.parent().unwrap_or(input)
    } else {
        input
    }
}
