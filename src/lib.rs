//! # abcd-plot: charts and tables for ABC-SMC runs
//!
//! An approximate Bayesian computation run (sequential Monte Carlo) writes one
//! JSON document per generation (`gen_<n>.json`). abcd-plot turns a directory
//! of those documents into Arrow tables and renders the diagnostic charts:
//!
//! ```text
//! gen_1.json ┐                 ┌─► ParticleTable (params.., score, gen_number)
//! gen_2.json ├─► locator ─► table ─┤
//! gen_10.json┘  (numeric order)    └─► SummaryTable (generation, tolerance,
//!                                                   acceptance, log_tolerance)
//!                                          │
//!                                          ▼
//!                                 render (plotters) ─► .png / .svg
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use abcd_plot::run::load_run;
//! use abcd_plot::table::SchemaPolicy;
//!
//! let run = load_run("out/unfair_coin", "gen_*.json", SchemaPolicy::Union)?;
//! println!("{}", run.summary);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod export;
pub mod guard;
pub mod kde;
pub mod locator;
pub mod record;
pub mod render;
pub mod report;
pub mod run;
pub mod samples;
pub mod table;

pub use error::{Error, Result};
pub use report::{ProposalRequest, ReportConfig};
pub use run::{load_run, RunTables};
