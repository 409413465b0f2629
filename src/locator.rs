//! Generation file discovery
//!
//! The upstream process writes one document per generation as
//! `gen_<digits>.json`. Zero padding is not consistent between runs, so
//! lexical order is wrong (`gen_10.json` < `gen_9.json`). The number embedded
//! in the file name is the only ordering truth; the JSON body may not carry it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// Default glob for generation files
pub const DEFAULT_PATTERN: &str = "gen_*.json";

fn generation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"gen_(\d+)\.json$").expect("generation regex is valid"))
}

/// A generation file paired with the number parsed from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFile {
    number: u32,
    path: PathBuf,
}

impl GenerationFile {
    /// Parse the generation number out of `path`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedFilename` if the name carries no generation number
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let number = parse_generation_number(&path)?;
        Ok(Self { number, path })
    }

    /// Generation number
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Path to the generation document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Extract the generation number from a file name such as `gen_0007.json`.
///
/// Leading zeros never change the value: `gen_000007.json` and `gen_7.json`
/// both give 7, `gen_000.json` gives 0. Only the file name is inspected, so
/// digits in parent directories cannot leak into the result.
///
/// # Errors
///
/// Returns `MalformedFilename` if the name does not end in `gen_<digits>.json`
/// or the number does not fit in a `u32`
pub fn parse_generation_number(path: impl AsRef<Path>) -> Result<u32> {
    let path = path.as_ref();
    let malformed = |reason: String| Error::MalformedFilename {
        path: path.to_path_buf(),
        reason,
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| malformed("no UTF-8 file name".to_string()))?;

    let digits = generation_regex()
        .captures(name)
        .and_then(|c| c.get(1))
        .ok_or_else(|| malformed("expected a name ending in gen_<digits>.json".to_string()))?
        .as_str();

    digits
        .parse::<u32>()
        .map_err(|e| malformed(format!("generation number {digits:?}: {e}")))
}

/// List the files in `dir` matching `pattern`, ordered by generation number.
///
/// # Errors
///
/// Returns error if:
/// - `dir` does not exist (`FileNotFound`)
/// - `pattern` is not a valid glob (`InvalidPattern`)
/// - a matched name carries no generation number (`MalformedFilename`)
/// - two files share a generation number (`DuplicateGeneration`)
pub fn locate_generations(dir: impl AsRef<Path>, pattern: &str) -> Result<Vec<GenerationFile>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.to_path_buf()));
    }

    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let full_pattern = format!("{escaped_dir}/{pattern}");
    let paths = glob::glob(&full_pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(glob::GlobError::into_error)?;
        let file = GenerationFile::from_path(path)?;
        tracing::debug!(number = file.number, path = %file.path.display(), "discovered generation file");
        files.push(file);
    }

    files.sort_by_key(GenerationFile::number);

    if let Some(pair) = files.windows(2).find(|w| w[0].number == w[1].number) {
        return Err(Error::DuplicateGeneration {
            number: pair[0].number,
            first: pair[0].path.clone(),
            second: pair[1].path.clone(),
        });
    }

    tracing::info!(count = files.len(), dir = %dir.display(), "located generation files");
    Ok(files)
}

/// The highest-numbered generation file in `dir`.
///
/// # Errors
///
/// Returns `FileNotFound` if no file matches, otherwise the errors of
/// [`locate_generations`]
pub fn latest_generation(dir: impl AsRef<Path>, pattern: &str) -> Result<GenerationFile> {
    let dir = dir.as_ref();
    locate_generations(dir, pattern)?
        .pop()
        .ok_or_else(|| Error::FileNotFound(dir.join(pattern)))
}
