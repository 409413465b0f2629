//! Pairwise correlation grid of the latest generation
//!
//! ```text
//!            p0          p1          p2
//!        ┌──────────┬──────────┬──────────┐
//!   p0   │  1-D kde │ scatter  │ scatter  │
//!        ├──────────┼──────────┼──────────┤
//!   p1   │ 2-D kde  │  1-D kde │ scatter  │
//!        ├──────────┼──────────┼──────────┤
//!   p2   │ 2-D kde  │ 2-D kde  │  1-D kde │
//!        └──────────┴──────────┴──────────┘
//! ```

use plotters::coord::Shift;
use plotters::prelude::*;

use super::palette::{Palette, SCATTER_BLUE};
use super::{padded_range, Figure, LABEL_FONT};
use crate::kde::{Kde1d, Kde2d, DEFAULT_GRIDSIZE};
use crate::table::ParticleTable;
use crate::Result;

const HEATMAP_GRIDSIZE: usize = 60;

/// Square grid of pairwise views over one generation's parameters
#[derive(Debug, Clone)]
pub struct CorrelationGridFigure {
    /// `(parameter, value per particle)`, rows aligned across columns
    pub columns: Vec<(String, Vec<Option<f64>>)>,
    /// Bandwidth multiplier for diagonal densities
    pub diag_bw_adjust: f64,
    /// Bandwidth multiplier for lower-triangle densities
    pub lower_bw_adjust: f64,
    /// Size of one cell in pixels
    pub cell_size: (u32, u32),
}

impl CorrelationGridFigure {
    /// Grid over the populated parameters of the latest generation in `particles`.
    ///
    /// # Errors
    ///
    /// Returns error if the generation filter or a column read fails
    pub fn from_table(particles: &ParticleTable) -> Result<Self> {
        let latest = match particles.latest_generation() {
            Some(generation) => particles.filter_generation(generation)?,
            None => particles.clone(),
        };
        let columns = latest
            .populated_parameters()
            .into_iter()
            .map(|name| {
                let values = latest.column_values(&name)?;
                Ok((name, values))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns,
            diag_bw_adjust: 0.6,
            lower_bw_adjust: 0.75,
            cell_size: (350, 350),
        })
    }

    /// Number of rows (and columns) in the grid
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.columns.len()
    }

    /// Rows where both columns hold a value
    #[must_use]
    pub fn pair(&self, x: usize, y: usize) -> Vec<(f64, f64)> {
        let (Some((_, xs)), Some((_, ys))) = (self.columns.get(x), self.columns.get(y)) else {
            return Vec::new();
        };
        xs.iter()
            .zip(ys)
            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
            .collect()
    }

    fn values(&self, index: usize) -> Vec<f64> {
        self.columns
            .get(index)
            .map(|(_, v)| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    fn range(&self, index: usize) -> (f64, f64) {
        padded_range(self.values(index), 0.05)
    }

    fn draw_diagonal<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>, index: usize) -> Result<()> {
        let (x_lo, x_hi) = self.range(index);
        let curve = Kde1d::fit(&self.values(index), self.diag_bw_adjust)
            .map(|kde| kde.curve(0.0, DEFAULT_GRIDSIZE))
            .unwrap_or_default();
        let y_max = curve.iter().map(|p| p.1).fold(0.0, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

        let mut chart = self
            .cell_builder(area, index, index)
            .build_cartesian_2d(x_lo..x_hi, 0.0..y_max)?;
        self.configure_cell(&mut chart, index, index)?;
        chart.draw_series(
            AreaSeries::new(curve, 0.0, SCATTER_BLUE.mix(0.25)).border_style(SCATTER_BLUE.stroke_width(1)),
        )?;
        Ok(())
    }

    fn draw_lower<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>, row: usize, col: usize) -> Result<()> {
        let x_range = self.range(col);
        let y_range = self.range(row);
        let mut chart = self
            .cell_builder(area, row, col)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
        self.configure_cell(&mut chart, row, col)?;

        let Some(kde) = Kde2d::fit(&self.pair(col, row), self.lower_bw_adjust) else {
            tracing::debug!(row, col, "skipping degenerate pair density");
            return Ok(());
        };
        let grid = kde.grid(x_range, y_range, HEATMAP_GRIDSIZE);
        let max = grid.max();
        if max <= 0.0 {
            return Ok(());
        }
        let (xs, ys) = (grid.xs(), grid.ys());
        let cells = xs.windows(2).enumerate().flat_map(|(i, xw)| {
            let grid = &grid;
            ys.windows(2).enumerate().map(move |(j, yw)| {
                let color = Palette::Blues.color_at(grid.value(i, j) / max);
                Rectangle::new([(xw[0], yw[0]), (xw[1], yw[1])], color.filled())
            })
        });
        chart.draw_series(cells)?;
        Ok(())
    }

    fn draw_upper<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>, row: usize, col: usize) -> Result<()> {
        let x_range = self.range(col);
        let y_range = self.range(row);
        let mut chart = self
            .cell_builder(area, row, col)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
        self.configure_cell(&mut chart, row, col)?;
        chart.draw_series(
            self.pair(col, row)
                .into_iter()
                .map(|p| Circle::new(p, 3, SCATTER_BLUE.filled())),
        )?;
        Ok(())
    }

    fn cell_builder<'a, 'b, DB: DrawingBackend>(
        &self,
        area: &'a DrawingArea<DB, Shift>,
        row: usize,
        col: usize,
    ) -> ChartBuilder<'a, 'b, DB> {
        let last = self.dimension().saturating_sub(1);
        let mut builder = ChartBuilder::on(area);
        builder
            .margin(5)
            .x_label_area_size(if row == last { 35 } else { 0 })
            .y_label_area_size(if col == 0 { 45 } else { 0 });
        builder
    }

    fn configure_cell<DB: DrawingBackend>(
        &self,
        chart: &mut ChartContext<'_, DB, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
        row: usize,
        col: usize,
    ) -> Result<()> {
        let last = self.dimension().saturating_sub(1);
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(4).y_labels(4).axis_desc_style(LABEL_FONT);
        if row == last {
            mesh.x_desc(self.columns[col].0.as_str());
        }
        if col == 0 {
            mesh.y_desc(self.columns[row].0.as_str());
        }
        mesh.draw()?;
        Ok(())
    }
}

impl Figure for CorrelationGridFigure {
    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> (u32, u32) {
        let k = self.dimension().max(1) as u32;
        (self.cell_size.0 * k, self.cell_size.1 * k)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let k = self.dimension();
        if k == 0 {
            return Ok(());
        }
        let areas = root.split_evenly((k, k));
        for (index, area) in areas.iter().enumerate() {
            let (row, col) = (index / k, index % k);
            match row.cmp(&col) {
                std::cmp::Ordering::Equal => self.draw_diagonal(area, row)?,
                std::cmp::Ordering::Greater => self.draw_lower(area, row, col)?,
                std::cmp::Ordering::Less => self.draw_upper(area, row, col)?,
            }
        }
        Ok(())
    }
}
