//! Coherent-noise primitives consumed by the resolvers and generators.
//!
//! The rest of the crate only depends on the [`NoiseSource`] contract: a
//! seeded, deterministic function of `(x, z)` with values in `[-1, 1]`.
//! [`FractalNoise`] composites octaves of a `noise` crate basis and
//! [`CellNoise`] partitions the plane into jittered Voronoi cells.

use noise::{NoiseFn, OpenSimplex, Perlin, Simplex, Value};
use serde::{Deserialize, Serialize};

/// Deterministic 2D coherent noise with values in `[-1, 1]`.
pub trait NoiseSource: Send + Sync {
    /// Sample the field at a horizontal coordinate.
    fn sample(&self, x: f64, z: f64) -> f64;
}

/// Gradient/value basis of a fractal layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseStyle {
    /// Simplex gradient noise.
    #[default]
    Simplex,
    /// Classic Perlin gradient noise.
    Perlin,
    /// OpenSimplex gradient noise.
    OpenSimplex,
    /// Interpolated lattice value noise (blocky, cheap).
    Value,
}

enum Basis {
    Simplex(Simplex),
    Perlin(Perlin),
    OpenSimplex(OpenSimplex),
    Value(Value),
}

impl Basis {
    fn new(style: NoiseStyle, seed: u32) -> Self {
        match style {
            NoiseStyle::Simplex => Self::Simplex(Simplex::new(seed)),
            NoiseStyle::Perlin => Self::Perlin(Perlin::new(seed)),
            NoiseStyle::OpenSimplex => Self::OpenSimplex(OpenSimplex::new(seed)),
            NoiseStyle::Value => Self::Value(Value::new(seed)),
        }
    }

    #[inline]
    fn get(&self, point: [f64; 2]) -> f64 {
        match self {
            Self::Simplex(n) => n.get(point),
            Self::Perlin(n) => n.get(point),
            Self::OpenSimplex(n) => n.get(point),
            Self::Value(n) => n.get(point),
        }
    }
}

/// Multi-octave fractal Brownian motion over a single basis.
///
/// Output is normalized by the geometric amplitude sum and clamped, so it
/// honors the `[-1, 1]` contract regardless of octave count.
pub struct FractalNoise {
    basis: Basis,
    frequency: f64,
    octaves: u32,
    lacunarity: f64,
    persistence: f64,
    max_amplitude: f64,
}

impl FractalNoise {
    /// Frequency multiplier between successive octaves.
    pub const LACUNARITY: f64 = 2.0;
    /// Amplitude multiplier between successive octaves.
    pub const PERSISTENCE: f64 = 0.5;

    /// Create a fractal layer whose broadest features are about `size` blocks wide.
    ///
    /// `size` below one block is treated as one block; zero octaves as one.
    pub fn new(style: NoiseStyle, seed: u32, size: f64, octaves: u32) -> Self {
        let octaves = octaves.max(1);
        let mut max_amplitude = 0.0;
        let mut amp = 1.0;
        for _ in 0..octaves {
            max_amplitude += amp;
            amp *= Self::PERSISTENCE;
        }

        Self {
            basis: Basis::new(style, seed),
            frequency: 1.0 / size.max(1.0),
            octaves,
            lacunarity: Self::LACUNARITY,
            persistence: Self::PERSISTENCE,
            max_amplitude,
        }
    }

    /// Number of octaves composited per sample.
    pub fn octaves(&self) -> u32 {
        self.octaves
    }
}

impl NoiseSource for FractalNoise {
    fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.frequency;
        let mut amplitude = 1.0;

        for _ in 0..self.octaves {
            total += self.basis.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.persistence;
        }

        (total / self.max_amplitude).clamp(-1.0, 1.0)
    }
}

/// The Voronoi cell owning a sampled point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    /// Stable identifier of the cell (hash of its lattice coordinate).
    pub id: u64,
    /// Stable random value of the cell in `[0, 1)`.
    pub value: f64,
    /// Distance to the cell's feature point, in cell units.
    pub distance: f64,
    /// Gap between the nearest and second nearest feature point, in cell
    /// units. Zero on a cell border, growing towards the cell interior.
    pub edge: f64,
}

/// Jittered Voronoi partition of the plane.
///
/// Every lattice square holds one feature point; a sample belongs to the
/// nearest feature point among the 3x3 neighbouring squares.
#[derive(Clone, Copy, Debug)]
pub struct CellNoise {
    seed: u64,
    size: f64,
}

const SALT_JITTER_X: u64 = 0x068b_c021;
const SALT_JITTER_Z: u64 = 0x02e1_b213;
const SALT_VALUE: u64 = 0x0f1a_1234;

impl CellNoise {
    /// Create a partition with cells roughly `size` blocks across.
    pub fn new(seed: u64, size: f64) -> Self {
        Self {
            seed,
            size: size.max(1.0),
        }
    }

    /// Average cell width in blocks.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Locate the cell owning `(x, z)`.
    pub fn cell(&self, x: f64, z: f64) -> Cell {
        let px = x / self.size;
        let pz = z / self.size;
        let ix = px.floor() as i64;
        let iz = pz.floor() as i64;
        let fx = px - ix as f64;
        let fz = pz - iz as f64;

        let mut nearest = (f64::INFINITY, 0_i64, 0_i64);
        let mut second = f64::INFINITY;
        for dz in -1..=1_i64 {
            for dx in -1..=1_i64 {
                let cx = ix + dx;
                let cz = iz + dz;
                let jx = unit(cell_hash(self.seed, cx, cz, SALT_JITTER_X));
                let jz = unit(cell_hash(self.seed, cx, cz, SALT_JITTER_Z));
                let ox = dx as f64 + jx - fx;
                let oz = dz as f64 + jz - fz;
                let d2 = ox * ox + oz * oz;
                if d2 < nearest.0 {
                    second = nearest.0;
                    nearest = (d2, cx, cz);
                } else if d2 < second {
                    second = d2;
                }
            }
        }

        let (d2, cx, cz) = nearest;
        let id = cell_hash(self.seed, cx, cz, 0);
        let distance = d2.sqrt();
        Cell {
            id,
            value: unit(cell_hash(self.seed, cx, cz, SALT_VALUE)),
            distance,
            edge: (second.sqrt() - distance).max(0.0),
        }
    }
}

impl NoiseSource for CellNoise {
    fn sample(&self, x: f64, z: f64) -> f64 {
        self.cell(x, z).value * 2.0 - 1.0
    }
}

/// Pick an index from weighted candidates using a roll in `[0, 1)`.
///
/// Weights must be positive; returns `None` only for an empty slice.
pub fn pick_weighted(weights: &[f64], roll: f64) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() {
        return None;
    }
    let mut target = roll.clamp(0.0, 1.0) * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return Some(i);
        }
        target -= w;
    }
    Some(weights.len() - 1)
}

#[inline]
fn cell_hash(seed: u64, x: i64, z: i64, salt: u64) -> u64 {
    splitmix64(
        seed ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ salt.wrapping_mul(0x1656_67B1_9E37_79F9),
    )
}

#[inline]
fn splitmix64(mut v: u64) -> u64 {
    v = v.wrapping_add(0x9E37_79B9_7F4A_7C15);
    v = (v ^ (v >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    v = (v ^ (v >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    v ^ (v >> 31)
}

/// Map a hash to `[0, 1)` using its top 53 bits.
#[inline]
fn unit(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1_u64 << 53) as f64
}
