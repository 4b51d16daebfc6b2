//! Scalar noise fields with a spatial gradient

use glam::Vec3;
use ::noise::{NoiseFn, Simplex};

/// A scalar field that also reports its spatial gradient
pub trait NoiseField: Send + Sync {
    /// Returns `(value, gradient)` at `position`. Value is roughly in [-1, 1].
    fn sample(&self, position: Vec3) -> (f32, Vec3);
}

/// Step used for the central-difference gradient
pub const GRADIENT_EPSILON: f32 = 1e-3;

/// Seeded 3D simplex noise; the gradient is taken by central differences
#[derive(Clone)]
pub struct SimplexNoise {
    source: Simplex,
    seed: u32,
    epsilon: f32,
}

impl std::fmt::Debug for SimplexNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexNoise")
            .field("seed", &self.seed)
            .field("epsilon", &self.epsilon)
            .finish()
    }
}

impl Default for SimplexNoise {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SimplexNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            source: Simplex::new(seed),
            seed,
            epsilon: GRADIENT_EPSILON,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    fn value(&self, p: Vec3) -> f32 {
        self.source.get([p.x as f64, p.y as f64, p.z as f64]) as f32
    }
}

impl NoiseField for SimplexNoise {
    fn sample(&self, p: Vec3) -> (f32, Vec3) {
        let e = self.epsilon;
        let dx = self.value(p + Vec3::X * e) - self.value(p - Vec3::X * e);
        let dy = self.value(p + Vec3::Y * e) - self.value(p - Vec3::Y * e);
        let dz = self.value(p + Vec3::Z * e) - self.value(p - Vec3::Z * e);
        (self.value(p), Vec3::new(dx, dy, dz) / (2.0 * e))
    }
}
