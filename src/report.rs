//! Report recipes
//!
//! Each report loads a run (or a single generation plus sample documents)
//! and renders a fixed set of charts into the output directory:
//!
//! ```text
//! summary      run ─► log particle + summary tables
//! generations  run ─► plot_0.png  (log_tolerance, acceptance bars)
//!                  ─► plot_1.png  (parameter density by generation)
//!                  ─► plot_2.png  (score density by generation)
//! posterior    run ─► meta_genNNN.svg
//!                  ─► posterior_genNNN.svg
//!                  ─► correlations_genNNN.svg
//! proposal     latest generation + sample files ─► one scatter/contour image
//! export       run ─► particles.parquet, summary.parquet
//! ```

use std::path::{Path, PathBuf};

use crate::export::export_run;
use crate::guard::{require_marker, DEFAULT_MARKER};
use crate::locator::{latest_generation, parse_generation_number, DEFAULT_PATTERN};
use crate::record::GenerationRecord;
use crate::render::palette::Palette;
use crate::render::{
    save_figure, BarColouring, CorrelationGridFigure, DensityOverlay, GenerationDensityFigure,
    PosteriorGridFigure, ProposalFigure, ProposalPanel, SummaryBarsFigure,
};
use crate::run::{load_run, RunTables};
use crate::samples::load_samples;
use crate::table::{ParticleTable, SchemaPolicy, SummaryTable, SCORE_COLUMN};
use crate::{Error, Result};

/// Caption of proposal panels
pub const PROPOSAL_TITLE: &str = "Proposal density given previous particles";

/// Where a report reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    data_dir: PathBuf,
    pattern: String,
    output_dir: PathBuf,
    policy: SchemaPolicy,
    marker: String,
    skip_isolation_check: bool,
}

impl ReportConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Directory holding the generation documents
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Glob matched against file names in the data directory
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory charts and exports are written to
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// How differing parameter keys are handled
    #[must_use]
    pub const fn policy(&self) -> SchemaPolicy {
        self.policy
    }

    /// Check the isolation marker unless the check is disabled.
    ///
    /// # Errors
    ///
    /// Returns `EnvironmentPrecondition` if the marker is missing
    pub fn check_isolation(&self) -> Result<()> {
        if self.skip_isolation_check {
            tracing::warn!(marker = %self.marker, "isolation check skipped");
            return Ok(());
        }
        require_marker(&self.marker).map(|_| ())
    }

    fn load(&self) -> Result<RunTables> {
        load_run(&self.data_dir, &self.pattern, self.policy)
    }

    fn load_nonempty(&self) -> Result<(RunTables, u32)> {
        let run = self.load()?;
        match run.latest_generation() {
            Some(latest) => Ok((run, latest)),
            None => Err(Error::FileNotFound(self.data_dir.join(&self.pattern))),
        }
    }
}

/// Builder for [`ReportConfig`]
#[derive(Debug, Clone)]
pub struct ReportConfigBuilder {
    data_dir: PathBuf,
    pattern: String,
    output_dir: PathBuf,
    policy: SchemaPolicy,
    marker: String,
    skip_isolation_check: bool,
}

impl Default for ReportConfigBuilder {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("out"),
            pattern: DEFAULT_PATTERN.to_string(),
            output_dir: PathBuf::from("."),
            policy: SchemaPolicy::default(),
            marker: DEFAULT_MARKER.to_string(),
            skip_isolation_check: false,
        }
    }
}

impl ReportConfigBuilder {
    /// Set the directory holding the generation documents
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the generation file glob
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the parameter key policy
    #[must_use]
    pub const fn policy(mut self, policy: SchemaPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the isolation marker variable
    #[must_use]
    pub fn marker(mut self, var: impl Into<String>) -> Self {
        self.marker = var.into();
        self
    }

    /// Disable the isolation check
    #[must_use]
    pub const fn skip_isolation_check(mut self, skip: bool) -> Self {
        self.skip_isolation_check = skip;
        self
    }

    /// Build the config
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` for an empty pattern, `EnvironmentPrecondition`
    /// for an empty marker name while the check is enabled
    pub fn build(self) -> Result<ReportConfig> {
        if self.pattern.trim().is_empty() {
            return Err(Error::InvalidPattern {
                pattern: self.pattern,
                reason: "pattern is empty".to_string(),
            });
        }
        if self.marker.is_empty() && !self.skip_isolation_check {
            return Err(Error::EnvironmentPrecondition(
                "isolation marker name is empty".to_string(),
            ));
        }
        Ok(ReportConfig {
            data_dir: self.data_dir,
            pattern: self.pattern,
            output_dir: self.output_dir,
            policy: self.policy,
            marker: self.marker,
            skip_isolation_check: self.skip_isolation_check,
        })
    }
}

/// Load the run and log both tables.
///
/// # Errors
///
/// Returns locator and record errors
pub fn summary(config: &ReportConfig) -> Result<RunTables> {
    let run = config.load()?;
    tracing::info!(
        particles = run.particles.num_rows(),
        generations = run.summary.num_rows(),
        parameters = ?run.particles.parameter_names(),
        "loaded run"
    );
    tracing::debug!("particles\n{}", run.particles);
    tracing::debug!("summary\n{}", run.summary);
    Ok(run)
}

/// Tolerance, acceptance and density-by-generation charts (`plot_0..2.png`).
///
/// `parameter` is the column plotted in `plot_1.png`; its x axis is fixed to
/// `[0, 1]`.
///
/// # Errors
///
/// Returns `EnvironmentPrecondition` before touching any file, then load and
/// column errors before anything is written, then render errors
pub fn generations(config: &ReportConfig, parameter: &str) -> Result<Vec<PathBuf>> {
    config.check_isolation()?;
    let (run, latest) = config.load_nonempty()?;
    tracing::info!(latest, "rendering generation charts");

    let bars = SummaryBarsFigure::from_table(
        &run.summary,
        &[SummaryTable::LOG_TOLERANCE, SummaryTable::ACCEPTANCE],
    )?;
    let parameter_density = GenerationDensityFigure::from_table(
        &run.particles,
        parameter,
        format!("{parameter} density by generation"),
    )?
    .x_range((0.0, 1.0));
    let score_max = run.particles.scores().into_iter().fold(0.0, f64::max);
    let score_density =
        GenerationDensityFigure::from_table(&run.particles, SCORE_COLUMN, "score density by generation")?
            .palette(Palette::RocketReversed)
            .x_range((0.0, if score_max > 0.0 { score_max } else { 1.0 }));

    let plot_0 = config.output_dir.join("plot_0.png");
    let plot_1 = config.output_dir.join("plot_1.png");
    let plot_2 = config.output_dir.join("plot_2.png");
    save_figure(&bars, &plot_0)?;
    save_figure(&parameter_density, &plot_1)?;
    save_figure(&score_density, &plot_2)?;

    Ok(vec![plot_0, plot_1, plot_2])
}

/// File names of the posterior report for generation `latest`
#[must_use]
pub fn posterior_file_names(latest: u32) -> [String; 3] {
    [
        format!("meta_gen{latest:03}.svg"),
        format!("posterior_gen{latest:03}.svg"),
        format!("correlations_gen{latest:03}.svg"),
    ]
}

/// Meta bars, posterior grid and correlation grid, named after the latest
/// generation.
///
/// # Errors
///
/// Returns `EnvironmentPrecondition` before touching any file,
/// `FileNotFound` if the run has no generations, then load and render errors
pub fn posterior(config: &ReportConfig) -> Result<Vec<PathBuf>> {
    config.check_isolation()?;
    let (run, latest) = config.load_nonempty()?;
    tracing::info!(latest, "rendering posterior charts");
    let [meta_name, posterior_name, correlations_name] = posterior_file_names(latest);

    let meta = SummaryBarsFigure::from_table(
        &run.summary,
        &[SummaryTable::TOLERANCE, SummaryTable::ACCEPTANCE],
    )?
    .independent_y()
    .colouring(BarColouring::ByGeneration(Palette::ViridisReversed, 0.8));
    let grid = PosteriorGridFigure::from_table(&run.particles)?;
    let correlations = CorrelationGridFigure::from_table(&run.particles)?;

    let meta_path = config.output_dir.join(meta_name);
    let posterior_path = config.output_dir.join(posterior_name);
    let correlations_path = config.output_dir.join(correlations_name);
    save_figure(&meta, &meta_path)?;
    save_figure(&grid, &posterior_path)?;
    save_figure(&correlations, &correlations_path)?;

    Ok(vec![meta_path, posterior_path, correlations_path])
}

/// Inputs of a proposal chart
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRequest {
    /// Particles document; the latest generation of the run when `None`
    pub particles: Option<PathBuf>,
    /// Sample documents, one panel each
    pub samples: Vec<PathBuf>,
    /// X parameter
    pub x: String,
    /// Y parameter
    pub y: String,
    /// Fixed range for both axes
    pub limits: Option<(f64, f64)>,
    /// Draw each sample document's mean
    pub show_mean: bool,
    /// Output image, relative to the output directory
    pub output: PathBuf,
}

impl Default for ProposalRequest {
    fn default() -> Self {
        Self {
            particles: None,
            samples: Vec::new(),
            x: "alpha".to_string(),
            y: "beta".to_string(),
            limits: None,
            show_mean: false,
            output: PathBuf::from("plot.png"),
        }
    }
}

fn particle_pairs(table: &ParticleTable, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
    let xs = table.column_values(x)?;
    let ys = table.column_values(y)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter_map(|(a, b)| Some((a?, b?)))
        .collect())
}

fn load_particles(config: &ReportConfig, request: &ProposalRequest) -> Result<ParticleTable> {
    let path = match &request.particles {
        Some(path) => path.clone(),
        None => latest_generation(&config.data_dir, &config.pattern)?.path().to_path_buf(),
    };
    // Hand-picked particle files need not follow the generation naming
    let number = parse_generation_number(&path).unwrap_or_default();
    tracing::info!(path = %path.display(), generation = number, "proposal particles");
    let record = GenerationRecord::from_path(&path)?;
    ParticleTable::from_record(&record, number, config.policy)
}

/// Particle scatter with proposal density contours, one panel per sample
/// document.
///
/// # Errors
///
/// Returns `FileNotFound` or `MalformedInput` for any input document,
/// `UnknownColumn` if `x` or `y` is missing, then render errors
pub fn proposal(config: &ReportConfig, request: &ProposalRequest) -> Result<PathBuf> {
    let particles = load_particles(config, request)?;
    let points = particle_pairs(&particles, &request.x, &request.y)?;
    let limits = request.limits.map(|l| (l, l));

    let mut panels = Vec::with_capacity(request.samples.len().max(1));
    for path in &request.samples {
        let tables = load_samples(path)?;
        let means = if request.show_mean && tables.mean.num_rows() > 0 {
            tables.mean.pairs(&request.x, &request.y)?
        } else {
            Vec::new()
        };
        let title = if request.samples.len() > 1 {
            let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            format!("{PROPOSAL_TITLE} ({stem})")
        } else {
            PROPOSAL_TITLE.to_string()
        };
        panels.push(ProposalPanel {
            title,
            x: request.x.clone(),
            y: request.y.clone(),
            particles: points.clone(),
            overlays: vec![DensityOverlay::new(tables.samples.pairs(&request.x, &request.y)?)],
            means,
            limits,
        });
    }
    if panels.is_empty() {
        panels.push(ProposalPanel {
            title: PROPOSAL_TITLE.to_string(),
            x: request.x.clone(),
            y: request.y.clone(),
            particles: points,
            overlays: Vec::new(),
            means: Vec::new(),
            limits,
        });
    }

    let output = config.output_dir.join(&request.output);
    save_figure(&ProposalFigure::new(panels), &output)?;
    Ok(output)
}

/// Write the run's tables to Parquet in the output directory.
///
/// # Errors
///
/// Returns load errors and `Io`/`Parquet` errors from writing
pub fn export(config: &ReportConfig) -> Result<(PathBuf, PathBuf)> {
    let run = config.load()?;
    export_run(&run, &config.output_dir)
}
