//! Generation and sample documents as written by the abcd process
//!
//! ## Document shapes
//!
//! ```text
//! gen_NNN.json                         samples.json
//! ├── pop                              ├── samples: [ {name: f64, ..}, .. ]
//! │   ├── normalised_particles: [      └── mean: {name: f64, ..} | [ {..} ]
//! │   │     { parameters: {..},
//! │   │       score: f64,
//! │   │       weight: f64 }  ]
//! │   └── acceptance: f64
//! └── next_gen_tolerance: f64
//! ```
//!
//! Unknown keys (such as the `number` the writer sometimes includes) are
//! ignored. Parameter maps keep their document order so table columns appear
//! in the order the model declared them.

use std::fmt;
use std::path::Path;

use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Ordered parameter vector of one particle or sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(Vec<(String, f64)>);

impl Parameters {
    /// Create from ordered `(name, value)` pairs
    #[must_use]
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }

    /// Value of parameter `name`, if present
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    /// Parameter names in document order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// `(name, value)` pairs in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if both parameter sets carry the same names, ignoring order
    #[must_use]
    pub fn same_keys(&self, other: &Self) -> bool {
        self.len() == other.len() && self.names().all(|name| other.get(name).is_some())
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ParametersVisitor;

        impl<'de> Visitor<'de> for ParametersVisitor {
            type Value = Parameters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Parameters, A::Error> {
                let mut entries: Vec<(String, f64)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, f64>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate parameter `{key}`")));
                    }
                    entries.push((key, value));
                }
                Ok(Parameters(entries))
            }
        }

        deserializer.deserialize_map(ParametersVisitor)
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// One candidate parameter vector and its distance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Parameter values
    pub parameters: Parameters,
    /// Fitness/distance measure
    pub score: f64,
    /// Normalised importance weight, when the writer includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Accepted population of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    /// Fraction of proposed particles accepted
    pub acceptance: f64,
    /// Particles after weight normalisation
    pub normalised_particles: Vec<Particle>,
}

/// Full document for one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Accepted population
    pub pop: Population,
    /// Tolerance threshold for the next generation
    pub next_gen_tolerance: f64,
}

impl GenerationRecord {
    /// Read and validate a generation document.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if `path` does not exist, `MalformedInput` if the
    /// document does not parse, lacks a required key or carries an
    /// out-of-range tolerance or acceptance
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let record: Self = read_json(path)?;
        record.validate(path)?;
        Ok(record)
    }

    /// Parse and validate a generation document held in memory.
    ///
    /// `origin` only labels errors.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` under the same conditions as [`Self::from_path`]
    pub fn from_json_str(json: &str, origin: impl AsRef<Path>) -> Result<Self> {
        let origin = origin.as_ref();
        let record: Self = serde_json::from_str(json)
            .map_err(|e| Error::malformed_input(origin, e.to_string()))?;
        record.validate(origin)?;
        Ok(record)
    }

    /// Particles in document order
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.pop.normalised_particles
    }

    /// Acceptance rate
    #[must_use]
    pub const fn acceptance(&self) -> f64 {
        self.pop.acceptance
    }

    /// Tolerance for the next generation
    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.next_gen_tolerance
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        if self.next_gen_tolerance < 0.0 {
            return Err(Error::malformed_input(
                origin,
                format!("next_gen_tolerance must be non-negative, got {}", self.next_gen_tolerance),
            ));
        }
        if !(0.0..=1.0).contains(&self.pop.acceptance) {
            return Err(Error::malformed_input(
                origin,
                format!("pop.acceptance must be within [0, 1], got {}", self.pop.acceptance),
            ));
        }
        Ok(())
    }
}

/// `mean` may be written as a single row or as a one-row array
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum MeanRows {
    One(Parameters),
    Many(Vec<Parameters>),
}

#[derive(Deserialize)]
struct RawSampleSet {
    samples: Vec<Parameters>,
    #[serde(default)]
    mean: Option<MeanRows>,
}

/// Perturbation kernel samples, with the kernel mean when present
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    /// Sampled parameter vectors
    pub samples: Vec<Parameters>,
    /// Kernel mean rows (usually one)
    pub mean: Vec<Parameters>,
}

impl SampleSet {
    /// Read a sample document.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if `path` does not exist, `MalformedInput` if the
    /// document does not parse or lacks `samples`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw: RawSampleSet = read_json(path.as_ref())?;
        let mean = match raw.mean {
            None => Vec::new(),
            Some(MeanRows::One(row)) => vec![row],
            Some(MeanRows::Many(rows)) => rows,
        };
        Ok(Self {
            samples: raw.samples,
            mean,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| Error::malformed_input(path, e.to_string()))
}
