//! Parquet export of run tables
//!
//! Tables round-trip through Parquet with their Arrow schema embedded, so
//! `gen_number` comes back as `UInt32` and parameter columns keep their order.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::run::RunTables;
use crate::table::{ParticleTable, SummaryTable};
use crate::{Error, Result};

/// File name of the exported particle table
pub const PARTICLES_FILE: &str = "particles.parquet";
/// File name of the exported summary table
pub const SUMMARY_FILE: &str = "summary.parquet";

const ROW_GROUP_SIZE: usize = 64 * 1024;

/// Write one batch to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created, `Parquet` if encoding fails
pub fn write_batch(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_max_row_group_size(ROW_GROUP_SIZE)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    tracing::info!(path = %path.display(), rows = batch.num_rows(), "wrote parquet table");
    Ok(())
}

/// Read every row group of `path` into one batch.
///
/// # Errors
///
/// Returns `FileNotFound` if `path` is missing, `Parquet` or `Arrow` if it
/// cannot be decoded
pub fn read_batch(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// Write the particle and summary tables of `run` into `dir`.
///
/// Returns the written paths, particles first.
///
/// # Errors
///
/// Returns error if either file cannot be written
pub fn export_run(run: &RunTables, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    let particles = dir.join(PARTICLES_FILE);
    let summary = dir.join(SUMMARY_FILE);
    write_batch(run.particles.batch(), &particles)?;
    write_batch(run.summary.batch(), &summary)?;
    Ok((particles, summary))
}

/// Read tables written by [`export_run`] from `dir`.
///
/// # Errors
///
/// Returns `FileNotFound` for a missing file and `MalformedInput` if a file
/// does not hold the expected table
pub fn import_run(dir: impl AsRef<Path>) -> Result<RunTables> {
    let dir = dir.as_ref();
    Ok(RunTables {
        particles: ParticleTable::from_batch(read_batch(dir.join(PARTICLES_FILE))?)?,
        summary: SummaryTable::from_batch(read_batch(dir.join(SUMMARY_FILE))?)?,
    })
}
