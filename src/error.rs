//! Error types for abcd-plot
//!
//! Every condition is fatal for the run that raises it. Variants carry the
//! offending path or generation so the message points at the file to fix.

use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// abcd-plot error types
#[derive(Error, Debug)]
pub enum Error {
    /// Expected input path is missing
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Generation number could not be extracted from a file name
    #[error("Malformed generation filename {}: {reason}", .path.display())]
    MalformedFilename {
        /// Offending file
        path: PathBuf,
        /// What was wrong with the name
        reason: String,
    },

    /// Glob pattern could not be compiled
    #[error("Invalid file pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// Pattern as given
        pattern: String,
        /// Glob compiler message
        reason: String,
    },

    /// Two files resolve to the same generation number
    #[error(
        "Duplicate generation {number}: {} and {}\nRemove one of the files so the ordering is unambiguous",
        .first.display(),
        .second.display()
    )]
    DuplicateGeneration {
        /// Shared generation number
        number: u32,
        /// First file seen with this number
        first: PathBuf,
        /// Second file seen with this number
        second: PathBuf,
    },

    /// JSON parse failure, missing key or out-of-range value
    #[error("Malformed input {}: {reason}", .path.display())]
    MalformedInput {
        /// File being read
        path: PathBuf,
        /// Parser or validation message
        reason: String,
    },

    /// Parameter keys differ between particles under the exact schema policy
    #[error("Schema mismatch in generation {generation}: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        /// Generation in which the mismatch was found
        generation: u32,
        /// Parameter names of the first particle seen
        expected: Vec<String>,
        /// Parameter names of the offending particle
        found: Vec<String>,
    },

    /// Parameter name collides with a column the table builder adds
    #[error("Parameter name {0:?} is reserved for a generated column")]
    ReservedColumn(String),

    /// Isolation marker environment variable is absent
    #[error("Environment precondition failed: {0}")]
    EnvironmentPrecondition(String),

    /// Output file extension has no rendering backend
    #[error("Unsupported output format: {}\nUse a .png or .svg extension", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Chart asked for a column the table does not have
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Plotting backend failure
    #[error("Render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// Build a `MalformedInput` error for `path`.
    pub fn malformed_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for Error {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        Self::Render(err.to_string())
    }
}
