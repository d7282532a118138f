//! Lattice interpolation kernels used to blend biome bounds across borders.
//!
//! Every method is a weighted sum of samples taken at integer lattice points
//! around the query, so the taps can be computed once and reused for several
//! fields (the min and max bounds of a generator, for instance).

use serde::{Deserialize, Serialize};

/// Kernel used to build a smoothed field from lattice samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationMethod {
    /// Value of the nearest lattice point. Hard steps at biome borders.
    Nearest,
    /// Bilinear blend of the four surrounding lattice points.
    Bilinear,
    /// Bilinear blend with a smoothstep fade, continuous first derivative.
    SmoothStep,
    /// Catmull-Rom bicubic blend of the 4x4 surrounding lattice points.
    /// May overshoot the sampled range near sharp steps.
    #[default]
    Bicubic,
}

/// One weighted lattice sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeTap {
    /// Lattice x coordinate, in blocks.
    pub x: i32,
    /// Lattice z coordinate, in blocks.
    pub z: i32,
    /// Weight of this sample. Weights of one lattice sum to 1.
    pub weight: f64,
}

const MAX_TAPS: usize = 16;

/// Widest lattice spacing, in blocks.
pub const MAX_LATTICE_STEP: i32 = 1 << 16;

/// The taps contributing to one interpolated value.
#[derive(Clone, Copy, Debug)]
pub struct Lattice {
    taps: [LatticeTap; MAX_TAPS],
    len: usize,
}

impl Lattice {
    /// Compute the taps around `(x, z)` for a lattice of `scale` block spacing.
    ///
    /// The spacing is rounded to whole blocks and clamped to
    /// `1..=MAX_LATTICE_STEP`. Taps with a zero weight are omitted, so a query
    /// on a lattice point yields a single tap for every method. Taps that
    /// would fall outside the `i32` block range are clamped to its edge.
    pub fn around(method: InterpolationMethod, x: i32, z: i32, scale: f64) -> Self {
        let step = i64::from(lattice_step(scale));
        let (x, z) = (i64::from(x), i64::from(z));
        let x0 = x.div_euclid(step) * step;
        let z0 = z.div_euclid(step) * step;
        let fx = (x - x0) as f64 / step as f64;
        let fz = (z - z0) as f64 / step as f64;

        let mut lattice = Self {
            taps: [LatticeTap {
                x: 0,
                z: 0,
                weight: 0.0,
            }; MAX_TAPS],
            len: 0,
        };

        match method {
            InterpolationMethod::Nearest => {
                let nx = if fx < 0.5 { x0 } else { x0 + step };
                let nz = if fz < 0.5 { z0 } else { z0 + step };
                lattice.push(nx, nz, 1.0);
            }
            InterpolationMethod::Bilinear => {
                lattice.push_grid(x0, z0, step, &linear_weights(fx), &linear_weights(fz), 0);
            }
            InterpolationMethod::SmoothStep => {
                let sx = smoothstep(fx);
                let sz = smoothstep(fz);
                lattice.push_grid(x0, z0, step, &linear_weights(sx), &linear_weights(sz), 0);
            }
            InterpolationMethod::Bicubic => {
                lattice.push_grid(x0, z0, step, &catmull_rom_weights(fx), &catmull_rom_weights(fz), -1);
            }
        }

        lattice
    }

    /// The non-zero taps.
    pub fn taps(&self) -> &[LatticeTap] {
        &self.taps[..self.len]
    }

    /// Interpolate a field sampled at the taps.
    pub fn apply(&self, mut sample: impl FnMut(i32, i32) -> f64) -> f64 {
        self.taps()
            .iter()
            .map(|tap| sample(tap.x, tap.z) * tap.weight)
            .sum()
    }

    fn push(&mut self, x: i64, z: i64, weight: f64) {
        if weight != 0.0 {
            self.taps[self.len] = LatticeTap {
                x: clamp_block(x),
                z: clamp_block(z),
                weight,
            };
            self.len += 1;
        }
    }

    fn push_grid(&mut self, x0: i64, z0: i64, step: i64, wx: &[f64], wz: &[f64], first: i64) {
        for (j, wzj) in wz.iter().enumerate() {
            for (i, wxi) in wx.iter().enumerate() {
                let lx = x0 + (first + i as i64) * step;
                let lz = z0 + (first + j as i64) * step;
                self.push(lx, lz, wxi * wzj);
            }
        }
    }
}

/// Interpolate `sample` around `(x, z)` with the given method and lattice spacing.
pub fn interpolate(
    method: InterpolationMethod,
    x: i32,
    z: i32,
    scale: f64,
    sample: impl FnMut(i32, i32) -> f64,
) -> f64 {
    Lattice::around(method, x, z, scale).apply(sample)
}

/// Lattice spacing for `scale`, rounded and clamped to `1..=MAX_LATTICE_STEP`.
pub fn lattice_step(scale: f64) -> i32 {
    if scale.is_nan() {
        return 1;
    }
    scale.round().clamp(1.0, f64::from(MAX_LATTICE_STEP)) as i32
}

/// The lattice anchor of a fractional coordinate: rounded to the nearest
/// block, halves rounding up.
pub fn lattice_anchor(v: f64) -> i32 {
    clamp_block_f64((v + 0.5).floor())
}

fn clamp_block(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn clamp_block_f64(v: f64) -> i32 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

pub(crate) fn floor_block(v: f64) -> i32 {
    clamp_block_f64(v.floor())
}

fn linear_weights(t: f64) -> [f64; 2] {
    [1.0 - t, t]
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Catmull-Rom basis for the samples at offsets -1, 0, 1, 2.
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t + 2.0 * t2 - t3),
        0.5 * (2.0 - 5.0 * t2 + 3.0 * t3),
        0.5 * (t + 4.0 * t2 - 3.0 * t3),
        0.5 * (-t2 + t3),
    ]
}
