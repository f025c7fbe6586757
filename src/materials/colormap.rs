//! Named colormaps for numeric exports.
//!
//! `viridis` and `magma` are 256-entry lookup tables read by nearest lower entry. `Greens`,
//! `terrain` and `gray` are anchor colours over `[0, 1]`, linearly interpolated. Exports
//! quantize a colormap into a fixed number of discrete colours first, so nearby values share a
//! material.

use crate::error::{Result, VoxelCityError};

use super::{
    lut::{MAGMA, VIRIDIS},
    Rgb,
};

type Anchor = (f64, [f64; 3]);

/// ColorBrewer's 9-class Greens, evenly spaced.
static GREENS: [Anchor; 9] = [
    (0.0, [0.9686274509803922, 0.9882352941176471, 0.9607843137254902]),
    (0.125, [0.8980392156862745, 0.9607843137254902, 0.8784313725490196]),
    (0.25, [0.7803921568627451, 0.9137254901960784, 0.7529411764705882]),
    (0.375, [0.6313725490196078, 0.8509803921568627, 0.6078431372549019]),
    (0.5, [0.4549019607843137, 0.7686274509803922, 0.4627450980392157]),
    (0.625, [0.2549019607843137, 0.6705882352941176, 0.36470588235294116]),
    (0.75, [0.13725490196078433, 0.5450980392156862, 0.27058823529411763]),
    (0.875, [0.0, 0.42745098039215684, 0.17254901960784313]),
    (1.0, [0.0, 0.26666666666666666, 0.10588235294117647]),
];

static TERRAIN: [Anchor; 6] = [
    (0.0, [0.2, 0.2, 0.6]),
    (0.15, [0.0, 0.6, 1.0]),
    (0.25, [0.0, 0.8, 0.4]),
    (0.5, [1.0, 1.0, 0.6]),
    (0.75, [0.5, 0.36, 0.33]),
    (1.0, [1.0, 1.0, 1.0]),
];

static GRAY: [Anchor; 2] = [(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])];

/// Names accepted by [`Colormap::by_name`].
pub const COLORMAP_NAMES: [&str; 5] = ["viridis", "magma", "Greens", "terrain", "gray"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ramp {
    Listed(&'static [[f64; 3]]),
    Segmented(&'static [Anchor]),
}

/// A continuous colormap over `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colormap {
    pub name: &'static str,
    ramp: Ramp,
}

impl Colormap {
    /// Looks up a colormap by name.
    ///
    /// # Returns
    /// The colormap, or `InvalidMaterialTable` if the name is not recognized.
    pub fn by_name(name: &str) -> Result<Self> {
        let (name, ramp) = match name {
            "viridis" => ("viridis", Ramp::Listed(&VIRIDIS)),
            "magma" => ("magma", Ramp::Listed(&MAGMA)),
            "Greens" | "greens" => ("Greens", Ramp::Segmented(&GREENS)),
            "terrain" => ("terrain", Ramp::Segmented(&TERRAIN)),
            "gray" | "grey" => ("gray", Ramp::Segmented(&GRAY)),
            _ => {
                return Err(VoxelCityError::invalid_material_table(format!(
                    "colormap '{name}' is not recognized, expected one of {COLORMAP_NAMES:?}"
                )))
            }
        };
        Ok(Colormap { name, ramp })
    }

    /// Colour at `x`, clamped to `[0, 1]`.
    pub fn sample(&self, x: f64) -> [f64; 3] {
        let x = x.clamp(0.0, 1.0);
        match self.ramp {
            Ramp::Listed(table) => {
                let last = table.len() - 1;
                table[((x * table.len() as f64) as usize).min(last)]
            }
            Ramp::Segmented(anchors) => interpolate(anchors, x),
        }
    }

    /// Quantizes the colormap into `count` colours sampled evenly over `[0, 1]`.
    pub fn discretize(&self, count: usize) -> Result<DiscreteColormap> {
        if count == 0 {
            return Err(VoxelCityError::invalid_parameter(
                "num_colors",
                0.0,
                "must be at least 1",
            ));
        }
        // `i * step`, with the last position pinned to 1
        let step = if count == 1 {
            0.0
        } else {
            1.0 / (count - 1) as f64
        };
        let colors = (0..count)
            .map(|i| {
                let x = if count > 1 && i == count - 1 {
                    1.0
                } else {
                    i as f64 * step
                };
                self.sample(x)
            })
            .collect();
        Ok(DiscreteColormap { colors })
    }
}

fn interpolate(anchors: &[Anchor], x: f64) -> [f64; 3] {
    let upper = anchors
        .iter()
        .position(|(at, _)| *at >= x)
        .unwrap_or(anchors.len() - 1);
    if upper == 0 {
        return anchors[0].1;
    }
    let (x0, c0) = anchors[upper - 1];
    let (x1, c1) = anchors[upper];
    let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
    [
        c0[0] + (c1[0] - c0[0]) * t,
        c0[1] + (c1[1] - c0[1]) * t,
        c0[2] + (c1[2] - c0[2]) * t,
    ]
}

/// A colormap reduced to a fixed set of colours.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteColormap {
    colors: Vec<[f64; 3]>,
}

impl DiscreteColormap {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The 8-bit colour of the bin containing `x`, with `x` clamped to `[0, 1]`.
    ///
    /// Channels are truncated, not rounded, when scaled to 0..=255.
    pub fn color(&self, x: f64) -> Rgb {
        let n = self.colors.len();
        let bin = ((x.clamp(0.0, 1.0) * n as f64) as usize).min(n - 1);
        let [r, g, b] = self.colors[bin];
        Rgb::new((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
    }
}
