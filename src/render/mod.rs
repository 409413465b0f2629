//! Chart rendering (plotters)
//!
//! Each chart is a [`Figure`]: plain data prepared from the tables, drawn onto
//! any plotters backend. [`save_figure`] picks the backend from the output
//! extension:
//!
//! - `.png`: raster (`BitMapBackend`)
//! - `.svg`: vector (`SVGBackend`)
//!
//! Drawing text needs a system font; figures are otherwise independent of the
//! environment.

mod bars;
mod density;
mod pairs;
pub mod palette;
mod scatter;

pub use bars::{BarColouring, SummaryBarsFigure};
pub use density::{GenerationDensityFigure, PosteriorGridFigure};
pub use pairs::CorrelationGridFigure;
pub use scatter::{DensityOverlay, ProposalFigure, ProposalPanel};

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{Error, Result};

/// Caption font
pub(crate) const TITLE_FONT: (&str, u32) = ("sans-serif", 18);
/// Axis description font
pub(crate) const LABEL_FONT: (&str, u32) = ("sans-serif", 14);

/// Something that can be drawn onto a plotters drawing area
pub trait Figure {
    /// Canvas size in pixels
    fn size(&self) -> (u32, u32);

    /// Draw onto `root`, which has already been filled white.
    ///
    /// # Errors
    ///
    /// Returns `Render` if the backend fails
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

/// Output formats with a rendering backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Raster image
    Png,
    /// Vector image
    Svg,
}

impl OutputFormat {
    /// Format implied by the extension of `path`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for any extension but `.png` and `.svg`
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => Ok(Self::Png),
            Some("svg") => Ok(Self::Svg),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Render `figure` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `UnsupportedFormat` for unknown extensions, `Io` if the directory
/// cannot be created, `Render` if drawing fails
pub fn save_figure<F: Figure>(figure: &F, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = OutputFormat::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let size = figure.size();
    match format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
    }

    tracing::info!(path = %path.display(), width = size.0, height = size.1, "wrote figure");
    Ok(())
}

/// Kernel density styling for 1-D layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdeStyle {
    /// Multiplier on Scott's bandwidth
    pub bw_adjust: f64,
    /// Bandwidths to extend the curve beyond the data
    pub cut: f64,
    /// Opacity of the fill under each curve
    pub alpha: f64,
    /// Fill under the curve
    pub fill: bool,
}

impl Default for KdeStyle {
    fn default() -> Self {
        Self {
            bw_adjust: 0.8,
            cut: 0.0,
            alpha: 0.1,
            fill: true,
        }
    }
}

/// Smallest and largest finite value, padded by `pad` of the span.
///
/// A zero span is widened to one unit so axes never collapse.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= 0.0 {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - pad * span, hi + pad * span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a/plot.png")).unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path(Path::new("meta.SVG")).unwrap(), OutputFormat::Svg);
        assert!(matches!(
            OutputFormat::from_path(Path::new("meta.pdf")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(OutputFormat::from_path(Path::new("plot")).is_err());
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([0.0, 10.0], 0.1), (-1.0, 11.0));
        assert_eq!(padded_range([2.0, 2.0], 0.1), (1.5, 2.5));
        assert_eq!(padded_range(Vec::new(), 0.1), (0.0, 1.0));
        assert_eq!(padded_range([f64::NAN, 1.0, 3.0], 0.0), (1.0, 3.0));
    }
}
