//! Gaussian kernel density estimation
//!
//! Bandwidths follow Scott's rule, scaled by a `bw_adjust` factor:
//!
//! - 1-D: `h = σ · n^(-1/5) · bw_adjust` (σ with ddof = 1)
//! - 2-D: `H = Σ · (n^(-1/6) · bw_adjust)²` (full sample covariance)
//!
//! Degenerate inputs (fewer than two points, zero variance, singular
//! covariance) have no estimate; `fit` returns `None` and callers skip the
//! layer.

use std::f64::consts::PI;

/// Points per axis used when evaluating a density
pub const DEFAULT_GRIDSIZE: usize = 200;

#[allow(clippy::cast_precision_loss)]
fn len_f64(values: usize) -> f64 {
    values as f64
}

fn mean(values: impl Iterator<Item = f64>) -> (f64, usize) {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (sum / len_f64(n.max(1)), n)
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / len_f64(n - 1);
            (0..n).map(|i| len_f64(i).mul_add(step, start)).collect()
        }
    }
}

/// One-dimensional Gaussian KDE
#[derive(Debug, Clone)]
pub struct Kde1d {
    points: Vec<f64>,
    bandwidth: f64,
}

impl Kde1d {
    /// Fit to `values`; non-finite values are dropped.
    #[must_use]
    pub fn fit(values: &[f64], bw_adjust: f64) -> Option<Self> {
        let points: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (mu, n) = mean(points.iter().copied());
        if n < 2 || bw_adjust <= 0.0 {
            return None;
        }
        let variance = points.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / len_f64(n - 1);
        if variance <= 0.0 {
            return None;
        }
        let bandwidth = variance.sqrt() * len_f64(n).powf(-0.2) * bw_adjust;
        Some(Self { points, bandwidth })
    }

    /// Kernel standard deviation
    #[must_use]
    pub const fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Smallest and largest sample
    #[must_use]
    pub fn data_range(&self) -> (f64, f64) {
        self.points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Density at `x`
    #[must_use]
    pub fn density(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let sum: f64 = self
            .points
            .iter()
            .map(|p| (-0.5 * ((x - p) / h).powi(2)).exp())
            .sum();
        sum / (len_f64(self.points.len()) * h * (2.0 * PI).sqrt())
    }

    /// Density curve over the data range extended by `cut` bandwidths.
    ///
    /// `cut = 0` keeps the curve within the observed values.
    #[must_use]
    pub fn curve(&self, cut: f64, gridsize: usize) -> Vec<(f64, f64)> {
        let (lo, hi) = self.data_range();
        let pad = cut * self.bandwidth;
        linspace(lo - pad, hi + pad, gridsize)
            .into_iter()
            .map(|x| (x, self.density(x)))
            .collect()
    }
}

/// Two-dimensional Gaussian KDE with full bandwidth matrix
#[derive(Debug, Clone)]
pub struct Kde2d {
    points: Vec<(f64, f64)>,
    /// Inverse bandwidth matrix `[a, b, d]` of `[[a, b], [b, d]]`
    inverse: [f64; 3],
    norm: f64,
    sigma: (f64, f64),
}

impl Kde2d {
    /// Fit to `points`; pairs with a non-finite coordinate are dropped.
    #[must_use]
    pub fn fit(points: &[(f64, f64)], bw_adjust: f64) -> Option<Self> {
        let points: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let n = points.len();
        if n < 2 || bw_adjust <= 0.0 {
            return None;
        }
        let (mx, _) = mean(points.iter().map(|p| p.0));
        let (my, _) = mean(points.iter().map(|p| p.1));
        let dof = len_f64(n - 1);
        let sxx = points.iter().map(|p| (p.0 - mx).powi(2)).sum::<f64>() / dof;
        let syy = points.iter().map(|p| (p.1 - my).powi(2)).sum::<f64>() / dof;
        let sxy = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum::<f64>() / dof;

        let factor = (len_f64(n).powf(-1.0 / 6.0) * bw_adjust).powi(2);
        let (a, b, d) = (sxx * factor, sxy * factor, syy * factor);
        let det = a.mul_add(d, -(b * b));
        // Near-perfect correlation leaves no usable bandwidth matrix
        if !(det > 1e-12 * a * d) {
            return None;
        }

        Some(Self {
            points,
            inverse: [d / det, -b / det, a / det],
            norm: 1.0 / (len_f64(n) * 2.0 * PI * det.sqrt()),
            sigma: (a.sqrt(), d.sqrt()),
        })
    }

    /// Kernel standard deviation along each axis
    #[must_use]
    pub const fn bandwidth(&self) -> (f64, f64) {
        self.sigma
    }

    /// Density at `(x, y)`
    #[must_use]
    pub fn density(&self, x: f64, y: f64) -> f64 {
        let [ia, ib, id] = self.inverse;
        let sum: f64 = self
            .points
            .iter()
            .map(|&(px, py)| {
                let (dx, dy) = (x - px, y - py);
                let q = (ia * dx).mul_add(dx, (2.0 * ib * dx).mul_add(dy, id * dy * dy));
                (-0.5 * q).exp()
            })
            .sum();
        sum * self.norm
    }

    /// Data bounds extended by three bandwidths on each side
    #[must_use]
    pub fn default_extent(&self) -> ((f64, f64), (f64, f64)) {
        let (sx, sy) = self.sigma;
        let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &self.points {
            x_lo = x_lo.min(x);
            x_hi = x_hi.max(x);
            y_lo = y_lo.min(y);
            y_hi = y_hi.max(y);
        }
        ((x_lo - 3.0 * sx, x_hi + 3.0 * sx), (y_lo - 3.0 * sy, y_hi + 3.0 * sy))
    }

    /// Evaluate on a `gridsize × gridsize` lattice spanning the given ranges
    #[must_use]
    pub fn grid(&self, x_range: (f64, f64), y_range: (f64, f64), gridsize: usize) -> DensityGrid {
        let xs = linspace(x_range.0, x_range.1, gridsize);
        let ys = linspace(y_range.0, y_range.1, gridsize);
        let values = ys
            .iter()
            .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
            .map(|(x, y)| self.density(x, y))
            .collect();
        DensityGrid { xs, ys, values }
    }
}

/// Density sampled on a rectilinear lattice, row-major by `y`
#[derive(Debug, Clone)]
pub struct DensityGrid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    values: Vec<f64>,
}

/// Line segment in data coordinates
pub type Segment = ((f64, f64), (f64, f64));

impl DensityGrid {
    /// Build from axis coordinates and row-major values.
    ///
    /// Returns `None` if `values.len() != xs.len() * ys.len()`.
    #[must_use]
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, values: Vec<f64>) -> Option<Self> {
        (values.len() == xs.len() * ys.len()).then_some(Self { xs, ys, values })
    }

    /// Lattice x coordinates
    #[must_use]
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Lattice y coordinates
    #[must_use]
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Value at lattice index `(i, j)`
    #[must_use]
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.xs.len() + i]
    }

    /// Largest value on the lattice
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// `n` evenly spaced levels strictly between zero and the maximum
    #[must_use]
    pub fn iso_levels(&self, n: usize) -> Vec<f64> {
        let max = self.max();
        let steps = len_f64(n + 1);
        (1..=n).map(|k| max * len_f64(k) / steps).collect()
    }

    /// Iso-line segments at `level` (marching squares).
    ///
    /// Saddle cells are split using the mean of their corners.
    #[must_use]
    pub fn contour_segments(&self, level: f64) -> Vec<Segment> {
        let (nx, ny) = (self.xs.len(), self.ys.len());
        let mut segments = Vec::new();
        if nx < 2 || ny < 2 {
            return segments;
        }

        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let corners = [
                    (self.xs[i], self.ys[j], self.value(i, j)),
                    (self.xs[i + 1], self.ys[j], self.value(i + 1, j)),
                    (self.xs[i + 1], self.ys[j + 1], self.value(i + 1, j + 1)),
                    (self.xs[i], self.ys[j + 1], self.value(i, j + 1)),
                ];
                // Edges in order: bottom, right, top, left
                let crossings: Vec<Option<(f64, f64)>> = (0..4)
                    .map(|e| crossing(corners[e], corners[(e + 1) % 4], level))
                    .collect();

                match crossings.iter().flatten().count() {
                    2 => {
                        let mut ends = crossings.iter().flatten();
                        if let (Some(&a), Some(&b)) = (ends.next(), ends.next()) {
                            segments.push((a, b));
                        }
                    }
                    4 => {
                        let centre = corners.iter().map(|c| c.2).sum::<f64>() / 4.0;
                        let edge = |e: usize| crossings[e].unwrap_or_default();
                        if (centre >= level) == (corners[0].2 >= level) {
                            // Corners 0 and 2 connect through the centre
                            segments.push((edge(0), edge(1)));
                            segments.push((edge(2), edge(3)));
                        } else {
                            segments.push((edge(3), edge(0)));
                            segments.push((edge(1), edge(2)));
                        }
                    }
                    _ => {}
                }
            }
        }
        segments
    }
}

/// Point where the level crosses the edge between two corners, if it does
fn crossing(a: (f64, f64, f64), b: (f64, f64, f64), level: f64) -> Option<(f64, f64)> {
    if (a.2 >= level) == (b.2 >= level) {
        return None;
    }
    let t = (level - a.2) / (b.2 - a.2);
    Some((t.mul_add(b.0 - a.0, a.0), t.mul_add(b.1 - a.1, a.1)))
}
