//! Proposal density charts: particle scatter with kernel-sample contours

use plotters::coord::Shift;
use plotters::prelude::*;

use super::palette::SCATTER_BLUE;
use super::{padded_range, Figure, LABEL_FONT, TITLE_FONT};
use crate::kde::Kde2d;
use crate::Result;

const CONTOUR_GRIDSIZE: usize = 100;

/// 2-D density contours of one sample set
#[derive(Debug, Clone)]
pub struct DensityOverlay {
    /// Sample points
    pub points: Vec<(f64, f64)>,
    /// Contour colour
    pub color: RGBColor,
    /// Multiplier on Scott's bandwidth
    pub bw_adjust: f64,
    /// Number of iso-density levels
    pub levels: usize,
}

impl DensityOverlay {
    /// Thin black contours with the wide bandwidth used for kernel samples
    #[must_use]
    pub const fn new(points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            color: BLACK,
            bw_adjust: 2.5,
            levels: 9,
        }
    }
}

/// One panel of a proposal figure
#[derive(Debug, Clone)]
pub struct ProposalPanel {
    /// Panel caption
    pub title: String,
    /// X parameter name
    pub x: String,
    /// Y parameter name
    pub y: String,
    /// Particle positions
    pub particles: Vec<(f64, f64)>,
    /// Density contour layers
    pub overlays: Vec<DensityOverlay>,
    /// Kernel mean points, drawn red
    pub means: Vec<(f64, f64)>,
    /// Fixed `(x, y)` axis limits
    pub limits: Option<((f64, f64), (f64, f64))>,
}

impl ProposalPanel {
    /// Axis ranges: fixed limits, or every drawn point padded by 5%
    #[must_use]
    pub fn ranges(&self) -> ((f64, f64), (f64, f64)) {
        if let Some(limits) = self.limits {
            return limits;
        }
        let all = || {
            self.particles
                .iter()
                .chain(self.means.iter())
                .chain(self.overlays.iter().flat_map(|o| o.points.iter()))
        };
        (
            padded_range(all().map(|p| p.0), 0.05),
            padded_range(all().map(|p| p.1), 0.05),
        )
    }
}

/// Side-by-side proposal panels
#[derive(Debug, Clone)]
pub struct ProposalFigure {
    /// Panels, left to right
    pub panels: Vec<ProposalPanel>,
    /// Size of one panel in pixels
    pub panel_size: (u32, u32),
}

impl ProposalFigure {
    /// Figure with the given panels at the default panel size
    #[must_use]
    pub const fn new(panels: Vec<ProposalPanel>) -> Self {
        Self {
            panels,
            panel_size: (1500, 1500),
        }
    }
}

fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &ProposalPanel) -> Result<()> {
    let ((x_lo, x_hi), (y_lo, y_hi)) = panel.ranges();

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, TITLE_FONT)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc(panel.x.as_str())
        .y_desc(panel.y.as_str())
        .axis_desc_style(LABEL_FONT)
        .draw()?;

    chart.draw_series(
        panel
            .particles
            .iter()
            .map(|&p| Circle::new(p, 4, SCATTER_BLUE.filled())),
    )?;

    for overlay in &panel.overlays {
        let Some(kde) = Kde2d::fit(&overlay.points, overlay.bw_adjust) else {
            tracing::warn!(points = overlay.points.len(), "skipping degenerate contour layer");
            continue;
        };
        let grid = kde.grid((x_lo, x_hi), (y_lo, y_hi), CONTOUR_GRIDSIZE);
        let style = overlay.color.stroke_width(1);
        for level in grid.iso_levels(overlay.levels) {
            chart.draw_series(
                grid.contour_segments(level)
                    .into_iter()
                    .map(|(a, b)| PathElement::new(vec![a, b], style)),
            )?;
        }
    }

    chart.draw_series(panel.means.iter().map(|&p| Circle::new(p, 6, RED.filled())))?;
    Ok(())
}

impl Figure for ProposalFigure {
    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> (u32, u32) {
        let cols = self.panels.len().max(1) as u32;
        (self.panel_size.0 * cols, self.panel_size.1)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let areas = root.split_evenly((1, self.panels.len().max(1)));
        for (panel, area) in self.panels.iter().zip(areas.iter()) {
            draw_panel(area, panel)?;
        }
        Ok(())
    }
}
