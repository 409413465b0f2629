//! Columnar views of generation records (Arrow)
//!
//! ## Table Overview
//!
//! ```text
//! GenerationRecord (1) ──> ParticleTable fragment (N rows, one per particle)
//!                     └──> SummaryTable fragment  (1 row)
//!
//! fragments in locator order ──concat──> run-wide tables
//! ```
//!
//! Row order of a concatenated table is generation order, then particle order
//! within a generation.
//!
//! ## Usage
//!
//! ```rust
//! use abcd_plot::record::GenerationRecord;
//! use abcd_plot::table::{build_fragments, SchemaPolicy};
//!
//! let json = r#"{
//!     "pop": {"acceptance": 0.5, "normalised_particles": [
//!         {"parameters": {"x": 0.1, "y": 0.2}, "score": 0.3}
//!     ]},
//!     "next_gen_tolerance": 0.2
//! }"#;
//! let record = GenerationRecord::from_json_str(json, "gen_002.json")?;
//! let (particles, summary) = build_fragments(&record, 2, SchemaPolicy::Union)?;
//!
//! assert_eq!(particles.num_rows(), 1);
//! assert_eq!(summary.generations(), vec![2]);
//! # Ok::<(), abcd_plot::Error>(())
//! ```

mod particles;
mod summary;

pub use particles::ParticleTable;
pub use summary::{log_tolerance, SummaryTable};

use crate::record::GenerationRecord;
use crate::Result;

/// Column holding each particle's score
pub const SCORE_COLUMN: &str = "score";
/// Column tagging each particle with its generation
pub const GENERATION_COLUMN: &str = "gen_number";

/// How to treat particles whose parameter keys differ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Union the keys and pad missing values with nulls
    #[default]
    Union,
    /// Fail with `SchemaMismatch` on any difference
    Exact,
}

/// Build the particle and summary fragments of one generation.
///
/// # Errors
///
/// Returns `SchemaMismatch` under [`SchemaPolicy::Exact`] when particles
/// disagree on parameter keys, `ReservedColumn` if a parameter is named like
/// a generated column
pub fn build_fragments(
    record: &GenerationRecord,
    generation: u32,
    policy: SchemaPolicy,
) -> Result<(ParticleTable, SummaryTable)> {
    let particles = ParticleTable::from_record(record, generation, policy)?;
    let summary = SummaryTable::from_record(record, generation)?;
    Ok((particles, summary))
}
