//! Density-by-generation charts: single panel and per-parameter facet grid

use plotters::coord::Shift;
use plotters::prelude::*;

use super::palette::Palette;
use super::{Figure, KdeStyle, LABEL_FONT, TITLE_FONT};
use crate::kde::{Kde1d, DEFAULT_GRIDSIZE};
use crate::table::ParticleTable;
use crate::Result;

/// Values of one column, grouped by generation
pub type GenerationGroups = Vec<(u32, Vec<f64>)>;

struct PanelOptions<'a> {
    title: Option<&'a str>,
    x_desc: Option<&'a str>,
    groups: &'a [(u32, Vec<f64>)],
    palette: Palette,
    style: KdeStyle,
    x_range: Option<(f64, f64)>,
    legend: bool,
}

fn draw_density_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    opts: &PanelOptions<'_>,
) -> Result<()> {
    let colors = opts.palette.sample(opts.groups.len());
    let curves: Vec<(u32, RGBColor, Vec<(f64, f64)>)> = opts
        .groups
        .iter()
        .zip(colors)
        .filter_map(|((generation, values), color)| {
            let Some(kde) = Kde1d::fit(values, opts.style.bw_adjust) else {
                tracing::warn!(generation, points = values.len(), "skipping degenerate density layer");
                return None;
            };
            Some((*generation, color, kde.curve(opts.style.cut, DEFAULT_GRIDSIZE)))
        })
        .collect();

    let (x_lo, x_hi) = opts.x_range.unwrap_or_else(|| {
        super::padded_range(
            opts.groups.iter().flat_map(|(_, v)| v.iter().copied()),
            0.0,
        )
    });
    let y_max = curves
        .iter()
        .flat_map(|(_, _, c)| c.iter().map(|p| p.1))
        .fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45);
    if let Some(title) = opts.title {
        builder.caption(title, TITLE_FONT);
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, 0.0..y_max)?;

    {
        let mut mesh = chart.configure_mesh();
        mesh.y_desc("Density").axis_desc_style(LABEL_FONT);
        if let Some(x_desc) = opts.x_desc {
            mesh.x_desc(x_desc);
        }
        mesh.draw()?;
    }

    for (generation, color, curve) in curves {
        let fill = if opts.style.fill { opts.style.alpha } else { 0.0 };
        chart
            .draw_series(
                AreaSeries::new(curve, 0.0, color.mix(fill)).border_style(color.stroke_width(1)),
            )?
            .label(generation.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    if opts.legend && !opts.groups.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// One column's density, one filled curve per generation
#[derive(Debug, Clone)]
pub struct GenerationDensityFigure {
    /// Chart caption
    pub title: String,
    /// Column name, used as x axis description
    pub column: String,
    /// Values per generation, in generation order
    pub groups: GenerationGroups,
    /// Generation hue ramp
    pub palette: Palette,
    /// Kernel styling
    pub style: KdeStyle,
    /// Fixed x axis range
    pub x_range: Option<(f64, f64)>,
    /// Canvas size
    pub size: (u32, u32),
}

impl GenerationDensityFigure {
    /// Figure for `column` of `particles`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` if the table has no such column
    pub fn from_table(particles: &ParticleTable, column: &str, title: impl Into<String>) -> Result<Self> {
        Ok(Self {
            title: title.into(),
            column: column.to_string(),
            groups: particles.values_by_generation(column)?,
            palette: Palette::ViridisReversed,
            style: KdeStyle::default(),
            x_range: None,
            size: (1600, 800),
        })
    }

    /// Use a different hue ramp
    #[must_use]
    pub const fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Fix the x axis to `range`
    #[must_use]
    pub const fn x_range(mut self, range: (f64, f64)) -> Self {
        self.x_range = Some(range);
        self
    }
}

impl Figure for GenerationDensityFigure {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        draw_density_panel(
            root,
            &PanelOptions {
                title: Some(self.title.as_str()),
                x_desc: Some(self.column.as_str()),
                groups: &self.groups,
                palette: self.palette,
                style: self.style,
                x_range: self.x_range,
                legend: true,
            },
        )
    }
}

/// Facet grid: one density-by-generation panel per parameter, independent axes
#[derive(Debug, Clone)]
pub struct PosteriorGridFigure {
    /// `(parameter, values per generation)` per facet
    pub facets: Vec<(String, GenerationGroups)>,
    /// Facets per row
    pub col_wrap: usize,
    /// Generation hue ramp
    pub palette: Palette,
    /// Kernel styling
    pub style: KdeStyle,
    /// Size of one facet in pixels
    pub facet_size: (u32, u32),
}

impl PosteriorGridFigure {
    /// One facet per parameter of `particles` (score excluded).
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` if a parameter column cannot be read
    pub fn from_table(particles: &ParticleTable) -> Result<Self> {
        let facets = particles
            .parameter_names()
            .iter()
            .map(|name| Ok((name.clone(), particles.values_by_generation(name)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            facets,
            col_wrap: 3,
            palette: Palette::ViridisReversed,
            style: KdeStyle::default(),
            facet_size: (600, 450),
        })
    }

    /// `(rows, columns)` of the facet layout
    #[must_use]
    pub fn grid_shape(&self) -> (usize, usize) {
        let n = self.facets.len();
        if n == 0 {
            return (1, 1);
        }
        let cols = self.col_wrap.clamp(1, n);
        (n.div_ceil(cols), cols)
    }
}

impl Figure for PosteriorGridFigure {
    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> (u32, u32) {
        let (rows, cols) = self.grid_shape();
        (self.facet_size.0 * cols as u32, self.facet_size.1 * rows as u32)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let areas = root.split_evenly(self.grid_shape());
        for (index, ((name, groups), area)) in self.facets.iter().zip(areas.iter()).enumerate() {
            let title = format!("variable = {name}");
            draw_density_panel(
                area,
                &PanelOptions {
                    title: Some(title.as_str()),
                    x_desc: None,
                    groups,
                    palette: self.palette,
                    style: self.style,
                    x_range: None,
                    legend: index == 0,
                },
            )?;
        }
        Ok(())
    }
}
