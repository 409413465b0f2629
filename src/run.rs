//! Run loading: locator + table builder over one output directory
//!
//! There is no partial-result mode. The first file that fails to parse, or
//! lacks a required key, aborts the whole load.

use std::path::Path;

use crate::locator::{locate_generations, GenerationFile};
use crate::record::GenerationRecord;
use crate::table::{build_fragments, ParticleTable, SchemaPolicy, SummaryTable};
use crate::Result;

/// Every generation of one run, as tables
#[derive(Debug, Clone)]
pub struct RunTables {
    /// One row per particle, generation blocks in ascending order
    pub particles: ParticleTable,
    /// One row per generation, ascending
    pub summary: SummaryTable,
}

impl RunTables {
    /// Highest generation loaded
    #[must_use]
    pub fn latest_generation(&self) -> Option<u32> {
        self.summary.latest_generation()
    }
}

/// Load already-located generation files in the given order.
///
/// # Errors
///
/// Returns the first error raised while reading or tabulating any file
pub fn load_files(files: &[GenerationFile], policy: SchemaPolicy) -> Result<RunTables> {
    let mut particle_fragments = Vec::with_capacity(files.len());
    let mut summary_fragments = Vec::with_capacity(files.len());

    for file in files {
        tracing::info!(
            generation = file.number(),
            path = %file.path().display(),
            "gen number {} from filename {}",
            file.number(),
            file.path().display()
        );
        let record = GenerationRecord::from_path(file.path())?;
        let (particles, summary) = build_fragments(&record, file.number(), policy)?;
        particle_fragments.push(particles);
        summary_fragments.push(summary);
    }

    Ok(RunTables {
        particles: ParticleTable::concat(particle_fragments, policy)?,
        summary: SummaryTable::concat(summary_fragments)?,
    })
}

/// Locate and load every generation file in `dir` matching `pattern`.
///
/// # Errors
///
/// Returns locator errors (`FileNotFound`, `MalformedFilename`,
/// `DuplicateGeneration`) and record errors (`MalformedInput`,
/// `SchemaMismatch`)
pub fn load_run(dir: impl AsRef<Path>, pattern: &str, policy: SchemaPolicy) -> Result<RunTables> {
    let files = locate_generations(dir, pattern)?;
    load_files(&files, policy)
}

/// Particle table of a single generation document.
///
/// The proposal charts only need the latest generation's parameters.
///
/// # Errors
///
/// Returns record errors for `file`
pub fn load_generation(file: &GenerationFile, policy: SchemaPolicy) -> Result<ParticleTable> {
    let record = GenerationRecord::from_path(file.path())?;
    ParticleTable::from_record(&record, file.number(), policy)
}
