//! Particle Table - one row per particle, tagged with its generation

use std::fmt;
use std::sync::Arc;

use arrow::array::{new_null_array, Array, ArrayRef, BooleanArray, Float64Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use super::{SchemaPolicy, GENERATION_COLUMN, SCORE_COLUMN};
use crate::record::{GenerationRecord, Particle};
use crate::{Error, Result};

/// Particles of one or more generations.
///
/// Columns are the parameter names in first-seen order (nullable `Float64`),
/// then `score` (`Float64`), then `gen_number` (`UInt32`).
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleTable {
    batch: RecordBatch,
    parameters: Vec<String>,
}

fn schema_for(parameters: &[String]) -> SchemaRef {
    let mut fields: Vec<Field> = parameters
        .iter()
        .map(|name| Field::new(name, DataType::Float64, true))
        .collect();
    fields.push(Field::new(SCORE_COLUMN, DataType::Float64, false));
    fields.push(Field::new(GENERATION_COLUMN, DataType::UInt32, false));
    Arc::new(Schema::new(fields))
}

fn key_list(particle: &Particle) -> Vec<String> {
    particle.parameters.names().map(str::to_string).collect()
}

/// Append names from `incoming` not yet in `names`, keeping first-seen order
fn union_into<'a>(names: &mut Vec<String>, incoming: impl Iterator<Item = &'a str>) {
    for name in incoming {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
}

fn same_names(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|name| b.contains(name))
}

impl ParticleTable {
    /// Table with no rows and no parameter columns
    #[must_use]
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(schema_for(&[])),
            parameters: Vec::new(),
        }
    }

    /// Fragment holding the particles of one generation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` under [`SchemaPolicy::Exact`] when a particle's
    /// keys differ from the first particle's, `ReservedColumn` if a parameter
    /// is named `score` or `gen_number`
    pub fn from_record(
        record: &GenerationRecord,
        generation: u32,
        policy: SchemaPolicy,
    ) -> Result<Self> {
        let particles = record.particles();

        let mut parameters: Vec<String> = Vec::new();
        if let Some(first) = particles.first() {
            for particle in particles {
                if policy == SchemaPolicy::Exact && !particle.parameters.same_keys(&first.parameters) {
                    return Err(Error::SchemaMismatch {
                        generation,
                        expected: key_list(first),
                        found: key_list(particle),
                    });
                }
                union_into(&mut parameters, particle.parameters.names());
            }
        }

        if let Some(reserved) = parameters
            .iter()
            .find(|n| *n == SCORE_COLUMN || *n == GENERATION_COLUMN)
        {
            return Err(Error::ReservedColumn(reserved.clone()));
        }

        let mut columns: Vec<ArrayRef> = parameters
            .iter()
            .map(|name| {
                let values: Float64Array = particles.iter().map(|p| p.parameters.get(name)).collect();
                Arc::new(values) as ArrayRef
            })
            .collect();
        columns.push(Arc::new(Float64Array::from_iter_values(
            particles.iter().map(|p| p.score),
        )));
        columns.push(Arc::new(UInt32Array::from_value(generation, particles.len())));

        let batch = RecordBatch::try_new(schema_for(&parameters), columns)?;
        tracing::debug!(
            generation,
            rows = batch.num_rows(),
            parameters = parameters.len(),
            "built particle fragment"
        );
        Ok(Self { batch, parameters })
    }

    /// Concatenate fragments in the given order.
    ///
    /// Parameter columns are unioned across fragments; a fragment lacking a
    /// column contributes nulls. Under [`SchemaPolicy::Exact`] every non-empty
    /// fragment must carry the same parameter names as the first one.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` under [`SchemaPolicy::Exact`], or an Arrow
    /// error if concatenation fails
    pub fn concat(fragments: impl IntoIterator<Item = Self>, policy: SchemaPolicy) -> Result<Self> {
        let fragments: Vec<Self> = fragments.into_iter().collect();

        let mut parameters: Vec<String> = Vec::new();
        let mut reference: Option<&Self> = None;
        for fragment in fragments.iter().filter(|f| f.num_rows() > 0) {
            match reference {
                None => reference = Some(fragment),
                Some(first) if policy == SchemaPolicy::Exact => {
                    if !same_names(&first.parameters, &fragment.parameters) {
                        return Err(Error::SchemaMismatch {
                            generation: fragment.generations().first().copied().unwrap_or_default(),
                            expected: first.parameters.clone(),
                            found: fragment.parameters.clone(),
                        });
                    }
                }
                Some(_) => {}
            }
            union_into(&mut parameters, fragment.parameters.iter().map(String::as_str));
        }

        let schema = schema_for(&parameters);
        let mut batches = Vec::with_capacity(fragments.len());
        for fragment in &fragments {
            let rows = fragment.num_rows();
            let mut columns: Vec<ArrayRef> = parameters
                .iter()
                .map(|name| {
                    fragment
                        .batch
                        .column_by_name(name)
                        .cloned()
                        .unwrap_or_else(|| new_null_array(&DataType::Float64, rows))
                })
                .collect();
            columns.push(fragment.column(SCORE_COLUMN)?);
            columns.push(fragment.column(GENERATION_COLUMN)?);
            batches.push(RecordBatch::try_new(schema.clone(), columns)?);
        }

        let batch = arrow::compute::concat_batches(&schema, &batches)?;
        Ok(Self { batch, parameters })
    }

    /// Wrap a batch read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the batch lacks the `score` or `gen_number`
    /// columns or carries non-`Float64` parameter columns
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let mut parameters = Vec::new();
        let mut has_score = false;
        let mut has_generation = false;
        for field in schema.fields() {
            match (field.name().as_str(), field.data_type()) {
                (SCORE_COLUMN, DataType::Float64) => has_score = true,
                (GENERATION_COLUMN, DataType::UInt32) => has_generation = true,
                (name, DataType::Float64) => parameters.push(name.to_string()),
                (name, other) => {
                    return Err(Error::malformed_input(
                        "<particle batch>",
                        format!("column {name} has unexpected type {other}"),
                    ))
                }
            }
        }
        if !has_score || !has_generation {
            return Err(Error::malformed_input(
                "<particle batch>",
                "missing score or gen_number column",
            ));
        }

        // Restore the canonical column order
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(parameters.len() + 2);
        for name in parameters.iter().map(String::as_str).chain([SCORE_COLUMN, GENERATION_COLUMN]) {
            columns.push(batch.column_by_name(name).cloned().ok_or_else(|| {
                Error::UnknownColumn(name.to_string())
            })?);
        }
        let batch = RecordBatch::try_new(schema_for(&parameters), columns)?;
        Ok(Self { batch, parameters })
    }

    /// Underlying Arrow batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of particles
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// True if the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Parameter column names in first-seen order
    #[must_use]
    pub fn parameter_names(&self) -> &[String] {
        &self.parameters
    }

    /// Parameter columns holding at least one value
    #[must_use]
    pub fn populated_parameters(&self) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|name| {
                self.batch
                    .column_by_name(name)
                    .is_some_and(|c| c.null_count() < c.len())
            })
            .cloned()
            .collect()
    }

    /// Values of a `Float64` column (a parameter or `score`), nulls as `None`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` if there is no such `Float64` column
    pub fn column_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(name)?;
        let array = column
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        Ok(array.iter().collect())
    }

    /// Scores in row order
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.column_values(SCORE_COLUMN)
            .map(|v| v.into_iter().flatten().collect())
            .unwrap_or_default()
    }

    /// Generation number of each row
    #[must_use]
    pub fn generation_numbers(&self) -> Vec<u32> {
        self.batch
            .column_by_name(GENERATION_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
            .map(|a| a.values().to_vec())
            .unwrap_or_default()
    }

    /// Distinct generations in row order
    #[must_use]
    pub fn generations(&self) -> Vec<u32> {
        let mut seen: Vec<u32> = Vec::new();
        for g in self.generation_numbers() {
            if !seen.contains(&g) {
                seen.push(g);
            }
        }
        seen
    }

    /// Highest generation present
    #[must_use]
    pub fn latest_generation(&self) -> Option<u32> {
        self.generation_numbers().into_iter().max()
    }

    /// Rows belonging to `generation`.
    ///
    /// # Errors
    ///
    /// Returns error if the Arrow filter kernel fails
    pub fn filter_generation(&self, generation: u32) -> Result<Self> {
        let mask: BooleanArray = self
            .generation_numbers()
            .into_iter()
            .map(|g| Some(g == generation))
            .collect();
        let batch = arrow::compute::filter_record_batch(&self.batch, &mask)?;
        Ok(Self {
            batch,
            parameters: self.parameters.clone(),
        })
    }

    /// Non-null values of column `name`, grouped by generation in row order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` if there is no such `Float64` column
    pub fn values_by_generation(&self, name: &str) -> Result<Vec<(u32, Vec<f64>)>> {
        let values = self.column_values(name)?;
        let mut groups: Vec<(u32, Vec<f64>)> = Vec::new();
        for (generation, value) in self.generation_numbers().into_iter().zip(values) {
            let Some(value) = value else { continue };
            match groups.iter_mut().find(|(g, _)| *g == generation) {
                Some((_, group)) => group.push(value),
                None => groups.push((generation, vec![value])),
            }
        }
        Ok(groups)
    }

    /// First `n` rows
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        Self {
            batch: self.batch.slice(0, n.min(self.num_rows())),
            parameters: self.parameters.clone(),
        }
    }

    fn column(&self, name: &str) -> Result<ArrayRef> {
        self.batch
            .column_by_name(name)
            .cloned()
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }
}

impl fmt::Display for ParticleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = arrow::util::pretty::pretty_format_batches(std::slice::from_ref(&self.batch))
            .map_err(|_| fmt::Error)?;
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(particles: &str) -> GenerationRecord {
        let json = format!(
            r#"{{"pop": {{"acceptance": 0.5, "normalised_particles": [{particles}]}}, "next_gen_tolerance": 0.2}}"#
        );
        GenerationRecord::from_json_str(&json, "gen.json").unwrap()
    }

    fn xy_record() -> GenerationRecord {
        record(
            r#"{"parameters": {"x": 0.1, "y": 1.1}, "score": 0.1},
               {"parameters": {"x": 0.2, "y": 1.2}, "score": 0.2},
               {"parameters": {"x": 0.3, "y": 1.3}, "score": 0.3}"#,
        )
    }

    fn column_names(table: &ParticleTable) -> Vec<String> {
        table
            .batch()
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    #[test]
    fn test_fragment_shape() {
        let table = ParticleTable::from_record(&xy_record(), 2, SchemaPolicy::Union).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(column_names(&table), vec!["x", "y", "score", "gen_number"]);
        assert_eq!(table.generation_numbers(), vec![2, 2, 2]);
        assert_eq!(table.scores(), vec![0.1, 0.2, 0.3]);
        assert_eq!(
            table.column_values("y").unwrap(),
            vec![Some(1.1), Some(1.2), Some(1.3)]
        );
    }

    #[test]
    fn test_union_pads_missing_values() {
        let rec = record(
            r#"{"parameters": {"x": 0.1}, "score": 0.1},
               {"parameters": {"x": 0.2, "z": 9.0}, "score": 0.2}"#,
        );
        let table = ParticleTable::from_record(&rec, 1, SchemaPolicy::Union).unwrap();
        assert_eq!(table.parameter_names(), &["x".to_string(), "z".to_string()]);
        assert_eq!(table.column_values("z").unwrap(), vec![None, Some(9.0)]);
    }

    #[test]
    fn test_exact_rejects_differing_keys() {
        let rec = record(
            r#"{"parameters": {"x": 0.1}, "score": 0.1},
               {"parameters": {"y": 0.2}, "score": 0.2}"#,
        );
        let err = ParticleTable::from_record(&rec, 4, SchemaPolicy::Exact).unwrap_err();
        match err {
            Error::SchemaMismatch { generation, expected, found } => {
                assert_eq!(generation, 4);
                assert_eq!(expected, vec!["x"]);
                assert_eq!(found, vec!["y"]);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_reserved_parameter_name() {
        let rec = record(r#"{"parameters": {"score": 0.1}, "score": 0.1}"#);
        let err = ParticleTable::from_record(&rec, 1, SchemaPolicy::Union).unwrap_err();
        assert!(matches!(err, Error::ReservedColumn(name) if name == "score"));
    }

    #[test]
    fn test_empty_population() {
        let table = ParticleTable::from_record(&record(""), 1, SchemaPolicy::Exact).unwrap();
        assert!(table.is_empty());
        assert_eq!(column_names(&table), vec!["score", "gen_number"]);
    }

    #[test]
    fn test_concat_generation_blocks_in_order() {
        let fragments = [1, 2, 3]
            .into_iter()
            .map(|g| ParticleTable::from_record(&xy_record(), g, SchemaPolicy::Union).unwrap());
        let table = ParticleTable::concat(fragments, SchemaPolicy::Union).unwrap();
        assert_eq!(table.num_rows(), 9);
        assert_eq!(table.generation_numbers(), vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
        assert_eq!(table.generations(), vec![1, 2, 3]);
        assert_eq!(table.latest_generation(), Some(3));
    }

    #[test]
    fn test_concat_unions_across_generations() {
        let a = ParticleTable::from_record(
            &record(r#"{"parameters": {"x": 1.0}, "score": 0.0}"#),
            1,
            SchemaPolicy::Union,
        )
        .unwrap();
        let b = ParticleTable::from_record(
            &record(r#"{"parameters": {"y": 2.0}, "score": 0.0}"#),
            2,
            SchemaPolicy::Union,
        )
        .unwrap();

        let table = ParticleTable::concat(vec![a.clone(), b.clone()], SchemaPolicy::Union).unwrap();
        assert_eq!(table.column_values("x").unwrap(), vec![Some(1.0), None]);
        assert_eq!(table.column_values("y").unwrap(), vec![None, Some(2.0)]);

        let err = ParticleTable::concat(vec![a, b], SchemaPolicy::Exact).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { generation: 2, .. }));
    }

    #[test]
    fn test_filter_generation() {
        let fragments = [1, 2]
            .into_iter()
            .map(|g| ParticleTable::from_record(&xy_record(), g, SchemaPolicy::Union).unwrap());
        let table = ParticleTable::concat(fragments, SchemaPolicy::Union).unwrap();
        let latest = table.filter_generation(2).unwrap();
        assert_eq!(latest.num_rows(), 3);
        assert_eq!(latest.generations(), vec![2]);
    }

    #[test]
    fn test_values_by_generation_skips_nulls() {
        let a = ParticleTable::from_record(
            &record(r#"{"parameters": {"x": 1.0}, "score": 0.0}, {"parameters": {"y": 5.0}, "score": 0.0}"#),
            1,
            SchemaPolicy::Union,
        )
        .unwrap();
        let b = ParticleTable::from_record(
            &record(r#"{"parameters": {"x": 2.0}, "score": 0.0}"#),
            2,
            SchemaPolicy::Union,
        )
        .unwrap();
        let table = ParticleTable::concat(vec![a, b], SchemaPolicy::Union).unwrap();
        assert_eq!(
            table.values_by_generation("x").unwrap(),
            vec![(1, vec![1.0]), (2, vec![2.0])]
        );
        assert_eq!(table.populated_parameters(), vec!["x", "y"]);
        assert_eq!(
            table.filter_generation(2).unwrap().populated_parameters(),
            vec!["x"]
        );
    }

    #[test]
    fn test_unknown_column() {
        let table = ParticleTable::from_record(&xy_record(), 1, SchemaPolicy::Union).unwrap();
        assert!(matches!(table.column_values("nope"), Err(Error::UnknownColumn(_))));
        assert!(matches!(
            table.column_values(GENERATION_COLUMN),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_head_and_display() {
        let table = ParticleTable::from_record(&xy_record(), 1, SchemaPolicy::Union).unwrap();
        assert_eq!(table.head(2).num_rows(), 2);
        assert_eq!(table.head(10).num_rows(), 3);
        assert!(table.to_string().contains("gen_number"));
    }
}
