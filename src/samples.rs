//! Sample tables: perturbation-kernel samples and the kernel mean
//!
//! Sample documents are consumed directly as tables; there is no generation
//! number and no score.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::record::{Parameters, SampleSet};
use crate::{Error, Result};

/// One `Float64` column per parameter, one row per sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    batch: RecordBatch,
}

impl SampleTable {
    /// Tabulate rows, unioning keys in first-seen order with null padding.
    ///
    /// # Errors
    ///
    /// Returns error if the Arrow batch cannot be assembled
    pub fn from_rows(rows: &[Parameters]) -> Result<Self> {
        let mut names: Vec<&str> = Vec::new();
        for row in rows {
            for name in row.names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        let fields: Vec<Field> = names
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, true))
            .collect();
        let columns: Vec<ArrayRef> = names
            .iter()
            .map(|name| {
                let values: Float64Array = rows.iter().map(|r| r.get(name)).collect();
                Arc::new(values) as ArrayRef
            })
            .collect();

        let schema = Arc::new(Schema::new(fields));
        let batch = if columns.is_empty() {
            RecordBatch::new_empty(schema)
        } else {
            RecordBatch::try_new(schema, columns)?
        };
        Ok(Self { batch })
    }

    /// Underlying Arrow batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Non-null `(x, y)` pairs of two columns.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` if either column is missing
    pub fn pairs(&self, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
        let xs = self.column(x)?;
        let ys = self.column(y)?;
        Ok(xs
            .iter()
            .zip(ys.iter())
            .filter_map(|(a, b)| Some((a?, b?)))
            .collect())
    }

    fn column(&self, name: &str) -> Result<&Float64Array> {
        self.batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }
}

/// Samples and mean of one sample document
#[derive(Debug, Clone)]
pub struct SampleTables {
    /// Kernel samples
    pub samples: SampleTable,
    /// Kernel mean (usually a single row, empty when absent)
    pub mean: SampleTable,
}

/// Read a sample document into tables.
///
/// # Errors
///
/// Returns `FileNotFound` or `MalformedInput` for the document
pub fn load_samples(path: impl AsRef<Path>) -> Result<SampleTables> {
    let path = path.as_ref();
    let set = SampleSet::from_path(path)?;
    let tables = SampleTables {
        samples: SampleTable::from_rows(&set.samples)?,
        mean: SampleTable::from_rows(&set.mean)?,
    };
    tracing::debug!(
        path = %path.display(),
        samples = tables.samples.num_rows(),
        mean_rows = tables.mean.num_rows(),
        "loaded sample document"
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> Parameters {
        Parameters::new(pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect())
    }

    #[test]
    fn test_rows_become_columns() {
        let table = SampleTable::from_rows(&[
            row(&[("x", 1.0), ("y", 2.0)]),
            row(&[("x", 3.0), ("y", 4.0)]),
        ])
        .unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.pairs("x", "y").unwrap(), vec![(1.0, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn test_pairs_skip_incomplete_rows() {
        let table =
            SampleTable::from_rows(&[row(&[("x", 1.0)]), row(&[("x", 3.0), ("y", 4.0)])]).unwrap();
        assert_eq!(table.pairs("x", "y").unwrap(), vec![(3.0, 4.0)]);
    }

    #[test]
    fn test_unknown_column() {
        let table = SampleTable::from_rows(&[row(&[("x", 1.0)])]).unwrap();
        assert!(matches!(table.pairs("x", "alpha"), Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_no_rows() {
        let table = SampleTable::from_rows(&[]).unwrap();
        assert_eq!(table.num_rows(), 0);
    }
}
