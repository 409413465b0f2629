//! Summary Table - one row per generation

use std::fmt;
use std::sync::{Arc, OnceLock};

use arrow::array::{Array, Float64Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::record::GenerationRecord;
use crate::{Error, Result};

/// Tolerance above which `log_tolerance` stops growing
pub const TOLERANCE_CLAMP: f64 = 0.5;

/// `ln(1 + min(tolerance, 0.5))`.
///
/// Observed tolerances can exceed 1 in early generations; the clamp keeps the
/// statistic on the same scale as the acceptance rate in faceted charts.
#[must_use]
pub fn log_tolerance(tolerance: f64) -> f64 {
    tolerance.min(TOLERANCE_CLAMP).ln_1p()
}

fn summary_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Arc::new(Schema::new(vec![
                Field::new(SummaryTable::GENERATION, DataType::UInt32, false),
                Field::new(SummaryTable::TOLERANCE, DataType::Float64, false),
                Field::new(SummaryTable::ACCEPTANCE, DataType::Float64, false),
                Field::new(SummaryTable::LOG_TOLERANCE, DataType::Float64, false),
            ]))
        })
        .clone()
}

/// Per-generation statistics: tolerance, acceptance and the clamped log tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    batch: RecordBatch,
}

impl SummaryTable {
    /// Generation number column
    pub const GENERATION: &'static str = "generation";
    /// Next-generation tolerance column
    pub const TOLERANCE: &'static str = "tolerance";
    /// Acceptance rate column
    pub const ACCEPTANCE: &'static str = "acceptance";
    /// `ln(1 + min(tolerance, 0.5))` column
    pub const LOG_TOLERANCE: &'static str = "log_tolerance";

    /// Table with no rows
    #[must_use]
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(summary_schema()),
        }
    }

    /// One-row fragment for `record`.
    ///
    /// # Errors
    ///
    /// Returns error if the Arrow batch cannot be assembled
    pub fn from_record(record: &GenerationRecord, generation: u32) -> Result<Self> {
        let tolerance = record.tolerance();
        let batch = RecordBatch::try_new(
            summary_schema(),
            vec![
                Arc::new(UInt32Array::from(vec![generation])),
                Arc::new(Float64Array::from(vec![tolerance])),
                Arc::new(Float64Array::from(vec![record.acceptance()])),
                Arc::new(Float64Array::from(vec![log_tolerance(tolerance)])),
            ],
        )?;
        Ok(Self { batch })
    }

    /// Concatenate fragments in the given order.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow concatenation fails
    pub fn concat(fragments: impl IntoIterator<Item = Self>) -> Result<Self> {
        let batches: Vec<RecordBatch> = fragments.into_iter().map(|f| f.batch).collect();
        let batch = arrow::compute::concat_batches(&summary_schema(), &batches)?;
        Ok(Self { batch })
    }

    /// Wrap a batch read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the batch does not have the summary schema
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let expected = summary_schema();
        let schema = batch.schema();
        let matches = schema.fields().len() == expected.fields().len()
            && schema
                .fields()
                .iter()
                .zip(expected.fields().iter())
                .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());
        if !matches {
            return Err(Error::malformed_input(
                "<summary batch>",
                format!("unexpected summary schema {schema:?}"),
            ));
        }
        let batch = RecordBatch::try_new(expected, batch.columns().to_vec())?;
        Ok(Self { batch })
    }

    /// Underlying Arrow batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of generations
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// True if the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Generation numbers in row order
    #[must_use]
    pub fn generations(&self) -> Vec<u32> {
        self.batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt32Array>()
            .map(|a| a.values().to_vec())
            .unwrap_or_default()
    }

    /// Highest generation number
    #[must_use]
    pub fn latest_generation(&self) -> Option<u32> {
        self.generations().into_iter().max()
    }

    /// Tolerance per row
    #[must_use]
    pub fn tolerance(&self) -> Vec<f64> {
        self.float_column(1)
    }

    /// Acceptance per row
    #[must_use]
    pub fn acceptance(&self) -> Vec<f64> {
        self.float_column(2)
    }

    /// Clamped log tolerance per row
    #[must_use]
    pub fn log_tolerance(&self) -> Vec<f64> {
        self.float_column(3)
    }

    /// `(generation, value)` pairs for one statistic column.
    ///
    /// This is the long-format view faceted bar charts draw from.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` if `name` is not a statistic column
    pub fn statistic(&self, name: &str) -> Result<Vec<(u32, f64)>> {
        let values = match name {
            Self::TOLERANCE => self.tolerance(),
            Self::ACCEPTANCE => self.acceptance(),
            Self::LOG_TOLERANCE => self.log_tolerance(),
            other => return Err(Error::UnknownColumn(other.to_string())),
        };
        Ok(self.generations().into_iter().zip(values).collect())
    }

    fn float_column(&self, index: usize) -> Vec<f64> {
        self.batch
            .column(index)
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.values().to_vec())
            .unwrap_or_default()
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = arrow::util::pretty::pretty_format_batches(std::slice::from_ref(&self.batch))
            .map_err(|_| fmt::Error)?;
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tolerance: f64, acceptance: f64) -> GenerationRecord {
        let json = format!(
            r#"{{"pop": {{"acceptance": {acceptance}, "normalised_particles": []}}, "next_gen_tolerance": {tolerance}}}"#
        );
        GenerationRecord::from_json_str(&json, "gen.json").unwrap()
    }

    #[test]
    fn test_log_tolerance_below_clamp() {
        assert!((log_tolerance(0.2) - 1.2f64.ln()).abs() < 1e-12);
        assert!((log_tolerance(0.2) - 0.1823).abs() < 1e-4);
    }

    #[test]
    fn test_log_tolerance_clamped() {
        assert!((log_tolerance(10.0) - 1.5f64.ln()).abs() < 1e-12);
        assert!((log_tolerance(10.0) - 0.4055).abs() < 1e-4);
        assert!((log_tolerance(0.5) - log_tolerance(1e9)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fragment_has_one_row() {
        let table = SummaryTable::from_record(&record(0.2, 0.4), 5).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.generations(), vec![5]);
        assert_eq!(table.acceptance(), vec![0.4]);
        assert!((table.log_tolerance()[0] - 1.2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_concat_keeps_order() {
        let fragments = vec![
            SummaryTable::from_record(&record(3.0, 0.9), 1).unwrap(),
            SummaryTable::from_record(&record(1.0, 0.5), 2).unwrap(),
            SummaryTable::from_record(&record(0.1, 0.2), 3).unwrap(),
        ];
        let table = SummaryTable::concat(fragments).unwrap();
        assert_eq!(table.generations(), vec![1, 2, 3]);
        assert_eq!(table.tolerance(), vec![3.0, 1.0, 0.1]);
        assert_eq!(table.latest_generation(), Some(3));
    }

    #[test]
    fn test_concat_of_nothing_is_empty() {
        let table = SummaryTable::concat(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.latest_generation(), None);
    }

    #[test]
    fn test_statistic_long_format() {
        let table = SummaryTable::concat(vec![
            SummaryTable::from_record(&record(0.3, 0.6), 1).unwrap(),
            SummaryTable::from_record(&record(0.2, 0.3), 2).unwrap(),
        ])
        .unwrap();
        assert_eq!(
            table.statistic(SummaryTable::ACCEPTANCE).unwrap(),
            vec![(1, 0.6), (2, 0.3)]
        );
        assert!(matches!(
            table.statistic("generation"),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_display_contains_headers() {
        let table = SummaryTable::from_record(&record(0.2, 0.4), 1).unwrap();
        let text = table.to_string();
        assert!(text.contains("log_tolerance"));
        assert!(text.contains("acceptance"));
    }
}
