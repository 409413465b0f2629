use std::path::PathBuf;
use std::process::ExitCode;

use abcd_plot::guard::DEFAULT_MARKER;
use abcd_plot::locator::DEFAULT_PATTERN;
use abcd_plot::report;
use abcd_plot::table::SchemaPolicy;
use abcd_plot::{ProposalRequest, ReportConfig};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "abcd-plot")]
#[command(about = "Tables and diagnostic charts for ABC-SMC generation output", version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory holding gen_<n>.json documents
    #[arg(long, env = "ABCD_PLOT_DATA_DIR", default_value = "out")]
    data_dir: PathBuf,
    /// Glob for generation files
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,
    /// Directory charts and exports are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Handling of particles with differing parameter keys
    #[arg(long, value_enum, default_value_t = CliPolicy::Union)]
    schema: CliPolicy,
    /// Environment variable that marks an isolated environment
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,
    /// Run even when the marker variable is unset
    #[arg(long)]
    skip_isolation_check: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliPolicy {
    Union,
    Exact,
}

impl From<CliPolicy> for SchemaPolicy {
    fn from(value: CliPolicy) -> Self {
        match value {
            CliPolicy::Union => Self::Union,
            CliPolicy::Exact => Self::Exact,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a run and print the particle and summary tables
    Summary {
        #[command(flatten)]
        run: RunArgs,
        /// Particle rows to print
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// Tolerance/acceptance bars and density by generation (plot_0..2.png)
    Generations {
        #[command(flatten)]
        run: RunArgs,
        /// Parameter drawn in plot_1.png
        #[arg(long, default_value = "heads")]
        parameter: String,
    },
    /// Meta bars, posterior grid and correlation grid of the latest generation
    Posterior {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Particle scatter with proposal density contours
    Proposal {
        #[command(flatten)]
        run: RunArgs,
        /// Particles document (default: latest generation in --data-dir)
        #[arg(long)]
        particles: Option<PathBuf>,
        /// Sample documents, one panel each
        #[arg(long = "samples", num_args = 1..)]
        samples: Vec<PathBuf>,
        /// X parameter
        #[arg(long, default_value = "alpha")]
        x: String,
        /// Y parameter
        #[arg(long, default_value = "beta")]
        y: String,
        /// Fix both axes to -0.25..1.25
        #[arg(long)]
        unit_limits: bool,
        /// Draw each sample document's mean in red
        #[arg(long)]
        show_mean: bool,
        /// Output image (.png or .svg), relative to --output-dir
        #[arg(long, default_value = "plot.png")]
        output: PathBuf,
    },
    /// Write particle and summary tables to Parquet
    Export {
        #[command(flatten)]
        run: RunArgs,
    },
}

fn config(args: &RunArgs) -> Result<ReportConfig> {
    ReportConfig::builder()
        .data_dir(&args.data_dir)
        .pattern(&args.pattern)
        .output_dir(&args.output_dir)
        .policy(args.schema.into())
        .marker(&args.marker)
        .skip_isolation_check(args.skip_isolation_check)
        .build()
        .context("invalid report configuration")
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Summary { run, rows } => {
            let config = config(&run)?;
            let tables = report::summary(&config)
                .with_context(|| format!("failed to load run from {}", run.data_dir.display()))?;
            println!("{}", tables.particles.head(rows));
            println!("{}", tables.summary);
        }
        Commands::Generations { run, parameter } => {
            let config = config(&run)?;
            let written = report::generations(&config, &parameter).context("generations report failed")?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Posterior { run } => {
            let config = config(&run)?;
            let written = report::posterior(&config).context("posterior report failed")?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Proposal {
            run,
            particles,
            samples,
            x,
            y,
            unit_limits,
            show_mean,
            output,
        } => {
            let config = config(&run)?;
            let request = ProposalRequest {
                particles,
                samples,
                x,
                y,
                limits: unit_limits.then_some((-0.25, 1.25)),
                show_mean,
                output,
            };
            let written = report::proposal(&config, &request).context("proposal report failed")?;
            println!("{}", written.display());
        }
        Commands::Export { run } => {
            let config = config(&run)?;
            let (particles, summary) = report::export(&config).context("export failed")?;
            println!("{}", particles.display());
            println!("{}", summary.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
