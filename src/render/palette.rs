//! Colour ramps for generation hues and density fills

use plotters::style::RGBColor;

const VIRIDIS: [(u8, u8, u8); 10] = [
    (0x44, 0x01, 0x54),
    (0x48, 0x28, 0x78),
    (0x3e, 0x49, 0x89),
    (0x31, 0x68, 0x8e),
    (0x26, 0x82, 0x8e),
    (0x1f, 0x9e, 0x89),
    (0x35, 0xb7, 0x79),
    (0x6e, 0xce, 0x58),
    (0xb5, 0xde, 0x2b),
    (0xfd, 0xe7, 0x25),
];

const ROCKET: [(u8, u8, u8); 8] = [
    (0x03, 0x05, 0x1a),
    (0x35, 0x19, 0x3e),
    (0x70, 0x1f, 0x57),
    (0xad, 0x17, 0x59),
    (0xe1, 0x33, 0x42),
    (0xf3, 0x76, 0x51),
    (0xf6, 0xb4, 0x8f),
    (0xfa, 0xeb, 0xdd),
];

const BLUES: [(u8, u8, u8); 9] = [
    (0xf7, 0xfb, 0xff),
    (0xde, 0xeb, 0xf7),
    (0xc6, 0xdb, 0xef),
    (0x9e, 0xca, 0xe1),
    (0x6b, 0xae, 0xd6),
    (0x42, 0x92, 0xc6),
    (0x21, 0x71, 0xb5),
    (0x08, 0x51, 0x9c),
    (0x08, 0x30, 0x6b),
];

/// Default marker colour for scatter layers
pub const SCATTER_BLUE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
/// Bar colour for uncoloured summary facets
pub const BAR_GREY: RGBColor = RGBColor(0x80, 0x80, 0x80);

/// Continuous colour ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    /// Dark purple to yellow
    Viridis,
    /// Yellow to dark purple (early generations light, late generations dark)
    ViridisReversed,
    /// Cream to near-black through red
    RocketReversed,
    /// White to dark blue
    Blues,
}

impl Palette {
    fn stops(self) -> (&'static [(u8, u8, u8)], bool) {
        match self {
            Self::Viridis => (&VIRIDIS, false),
            Self::ViridisReversed => (&VIRIDIS, true),
            Self::RocketReversed => (&ROCKET, true),
            Self::Blues => (&BLUES, false),
        }
    }

    /// Colour at position `t` in `[0, 1]` (clamped)
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn color_at(self, t: f64) -> RGBColor {
        let (stops, reversed) = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let t = if reversed { 1.0 - t } else { t };

        let scaled = t * (stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - lower as f64;
        let (a, b) = (stops[lower], stops[lower + 1]);
        let lerp = |x: u8, y: u8| frac.mul_add(f64::from(y) - f64::from(x), f64::from(x)).round() as u8;
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }

    /// `n` discrete colours, sampled away from the ramp's extremes
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(self, n: usize) -> Vec<RGBColor> {
        (1..=n)
            .map(|i| self.color_at(i as f64 / (n + 1) as f64))
            .collect()
    }
}
