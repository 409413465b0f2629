//! Faceted summary bars: one row per statistic, one bar per generation

use plotters::coord::Shift;
use plotters::prelude::*;

use super::palette::{Palette, BAR_GREY};
use super::{Figure, LABEL_FONT, TITLE_FONT};
use crate::table::SummaryTable;
use crate::Result;

/// Bar colouring of a summary facet
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarColouring {
    /// Every bar the same grey
    Grey,
    /// One colour per generation from a ramp, at the given opacity
    ByGeneration(Palette, f64),
}

/// Summary statistics across generations, one facet row per statistic
#[derive(Debug, Clone)]
pub struct SummaryBarsFigure {
    /// `(statistic, (generation, value) pairs)` per facet row
    pub panels: Vec<(String, Vec<(u32, f64)>)>,
    /// Share one y range across facets
    pub share_y: bool,
    /// Bar colours
    pub colouring: BarColouring,
    /// Size of one facet row in pixels
    pub facet_size: (u32, u32),
}

impl SummaryBarsFigure {
    /// Facets for the named statistics of `summary`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` for a name that is not a statistic column
    pub fn from_table(summary: &SummaryTable, statistics: &[&str]) -> Result<Self> {
        let panels = statistics
            .iter()
            .map(|name| Ok(((*name).to_string(), summary.statistic(name)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            panels,
            share_y: true,
            colouring: BarColouring::Grey,
            facet_size: (1200, 300),
        })
    }

    /// Give each facet its own y range
    #[must_use]
    pub const fn independent_y(mut self) -> Self {
        self.share_y = false;
        self
    }

    /// Colour bars per generation
    #[must_use]
    pub const fn colouring(mut self, colouring: BarColouring) -> Self {
        self.colouring = colouring;
        self
    }

    /// Upper end of the y axis for facet `index`
    #[must_use]
    pub fn y_max(&self, index: usize) -> f64 {
        let max_of = |values: &[(u32, f64)]| values.iter().map(|v| v.1).fold(0.0, f64::max);
        let max = if self.share_y {
            self.panels.iter().map(|(_, v)| max_of(v)).fold(0.0, f64::max)
        } else {
            self.panels.get(index).map_or(0.0, |(_, v)| max_of(v))
        };
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }

    fn generation_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .panels
            .iter()
            .flat_map(|(_, v)| v.iter().map(|(g, _)| f64::from(*g)))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g| (lo.min(g), hi.max(g)));
        if lo.is_finite() {
            (lo - 0.5, hi + 0.5)
        } else {
            (-0.5, 0.5)
        }
    }
}

impl Figure for SummaryBarsFigure {
    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> (u32, u32) {
        let rows = self.panels.len().max(1) as u32;
        (self.facet_size.0, self.facet_size.1 * rows)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let (x_lo, x_hi) = self.generation_range();
        let areas = root.split_evenly((self.panels.len().max(1), 1));

        for (index, ((statistic, values), area)) in self.panels.iter().zip(areas.iter()).enumerate() {
            let mut chart = ChartBuilder::on(area)
                .caption(format!("statistic = {statistic}"), TITLE_FONT)
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(50)
                .build_cartesian_2d(x_lo..x_hi, 0.0..self.y_max(index))?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(values.len().clamp(2, 30))
                .x_label_formatter(&|x| format!("{x:.0}"))
                .x_desc("generation")
                .y_desc("value")
                .axis_desc_style(LABEL_FONT)
                .draw()?;

            let colors: Vec<RGBColor> = match self.colouring {
                BarColouring::Grey => vec![BAR_GREY; values.len()],
                BarColouring::ByGeneration(palette, _) => palette.sample(values.len()),
            };
            let alpha = match self.colouring {
                BarColouring::Grey => 1.0,
                BarColouring::ByGeneration(_, alpha) => alpha,
            };

            chart.draw_series(values.iter().zip(colors).map(|(&(generation, value), color)| {
                let x = f64::from(generation);
                Rectangle::new([(x - 0.4, 0.0), (x + 0.4, value)], color.mix(alpha).filled())
            }))?;
        }
        Ok(())
    }
}
