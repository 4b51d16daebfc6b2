//! Particle components and GPU vertex data

use bytemuck::{Pod, Zeroable};
use firefly_core::ParticleId;
use glam::Vec3;

/// Per-particle simulation state
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub velocity: Vec3,
    /// Stable identity; also the seed for every per-particle random value
    pub id: ParticleId,
    /// Fraction of the variant's base life this particle lives, in (0, 1]
    pub life_random: f32,
    /// Time alive in seconds; never decreases
    pub age: f32,
}

impl Particle {
    pub fn new(id: ParticleId, life_random: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            id,
            life_random,
            age: 0.0,
        }
    }
}

/// World-space origin of the particle's facet frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position(pub Vec3);

/// Source triangle stored relative to its own centroid; immutable after spawn
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Facet {
    pub vertex1: Vec3,
    pub vertex2: Vec3,
    pub vertex3: Vec3,
}

impl Facet {
    /// Split a world-space triangle into a centroid and a centroid-relative facet
    pub fn from_triangle(v1: Vec3, v2: Vec3, v3: Vec3) -> (Self, Vec3) {
        let centroid = (v1 + v2 + v3) / 3.0;
        (
            Self {
                vertex1: v1 - centroid,
                vertex2: v2 - centroid,
                vertex3: v3 - centroid,
            },
            centroid,
        )
    }

    /// The facet placed at `origin`
    pub fn at(&self, origin: Vec3) -> [Vec3; 3] {
        [origin + self.vertex1, origin + self.vertex2, origin + self.vertex3]
    }
}

/// GPU vertex layout for uploaded geometry.
/// 24 bytes: position then normal, both tightly packed.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facet_is_centroid_relative() {
        let (facet, centroid) = Facet::from_triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
        );
        assert_eq!(centroid, Vec3::new(1.0, 1.0, 0.0));
        let sum = facet.vertex1 + facet.vertex2 + facet.vertex3;
        assert!(sum.length() < 1e-6);
        assert_eq!(facet.at(centroid)[1], Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn new_particle_starts_at_rest() {
        let p = Particle::new(ParticleId(9), 0.5);
        assert_eq!(p.age, 0.0);
        assert_eq!(p.velocity, Vec3::ZERO);
        assert_eq!(p.id.raw(), 9);
    }

    #[test]
    fn mesh_vertex_layout() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
        assert_eq!(std::mem::align_of::<MeshVertex>(), 4);
    }
}
