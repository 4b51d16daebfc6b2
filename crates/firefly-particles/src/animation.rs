//! Curl-noise particle animation
//!
//! Acceleration is the cross product of two noise gradients sampled at offset
//! positions, which gives a swirling, roughly divergence-free flow.

use crate::noise::NoiseField;
use crate::particle::{Particle, Position};
use firefly_core::{saturate, Transform};
use firefly_ecs::FireflyWorld;
use firefly_runtime::{parallel_for_each_mut, FrameTime};
use glam::{Mat4, Vec3};

/// Work items per animation task
pub const ANIMATION_BATCH: usize = 32;

/// Scales delta time per particle; 0 freezes it, 1 runs it at full speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationGate {
    /// Always fully active
    Always,
    /// A front sweeping upward: `saturate(time - delay + y * slope)`
    Sweep { delay: f32, slope: f32 },
    /// Active on the +z side of a volume: `saturate(local.z + 0.5)`
    Volume { world_to_local: Mat4 },
}

impl ActivationGate {
    /// The stock sweep: nothing moves for two seconds, then the front rises
    pub const DEFAULT_SWEEP: Self = Self::Sweep {
        delay: 2.0,
        slope: 2.0,
    };

    pub fn factor(&self, position: Vec3, time: f32) -> f32 {
        match self {
            Self::Always => 1.0,
            Self::Sweep { delay, slope } => saturate(time - delay + position.y * slope),
            Self::Volume { world_to_local } => {
                saturate(world_to_local.transform_point3(position).z + 0.5)
            }
        }
    }
}

/// One animation pass: noise frequency, strength and gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationField {
    pub frequency: f32,
    pub amplitude: f32,
    /// Offset of the second noise sample
    pub offset: Vec3,
    pub gate: ActivationGate,
}

impl Default for AnimationField {
    fn default() -> Self {
        Self {
            frequency: 6.0,
            amplitude: 0.02,
            offset: Vec3::splat(100.0),
            gate: ActivationGate::DEFAULT_SWEEP,
        }
    }
}

impl AnimationField {
    /// A noise volume placed in the world by `transform`
    pub fn effector(frequency: f32, amplitude: f32, transform: &Transform) -> Self {
        Self {
            frequency,
            amplitude,
            offset: Vec3::new(0.0, 0.0, 100.0),
            gate: ActivationGate::Volume {
                world_to_local: transform.to_inverse_matrix(),
            },
        }
    }

    /// Curl-noise acceleration at `position`
    pub fn acceleration(&self, noise: &dyn NoiseField, position: Vec3) -> Vec3 {
        if self.amplitude == 0.0 {
            return Vec3::ZERO;
        }
        let p = position * self.frequency;
        let (_, g1) = noise.sample(p);
        let (_, g2) = noise.sample(p + self.offset);
        g1.cross(g2) * self.amplitude
    }

    /// Advance one particle by one frame.
    ///
    /// Position moves with the velocity from before this step, then the
    /// velocity picks up the acceleration.
    pub fn step(
        &self,
        noise: &dyn NoiseField,
        particle: &mut Particle,
        position: &mut Position,
        time: FrameTime,
    ) {
        let dt = time.delta * self.gate.factor(position.0, time.time);
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let acceleration = self.acceleration(noise, position.0);

        position.0 += particle.velocity * dt;
        particle.age += dt;
        particle.velocity += acceleration * dt;
    }
}

/// Run every field over every particle. Fields apply one after another.
///
/// Returns the number of particles animated.
pub fn animate(
    world: &mut FireflyWorld,
    fields: &[AnimationField],
    noise: &dyn NoiseField,
    time: FrameTime,
) -> usize {
    let mut items: Vec<(&mut Particle, &mut Position)> = world
        .ecs_mut()
        .query_mut::<(&mut Particle, &mut Position)>()
        .into_iter()
        .map(|(_, components)| components)
        .collect();

    for field in fields {
        parallel_for_each_mut(&mut items, ANIMATION_BATCH, |(particle, position)| {
            field.step(noise, particle, position, time);
        });
    }
    items.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::SimplexNoise;
    use crate::particle::Facet;
    use firefly_core::ParticleId;

    fn frame(time: f32, delta: f32) -> FrameTime {
        FrameTime::new(time, delta)
    }

    #[test]
    fn zero_amplitude_is_ballistic() {
        let noise = SimplexNoise::new(1);
        let field = AnimationField {
            amplitude: 0.0,
            gate: ActivationGate::Always,
            ..Default::default()
        };
        let mut particle = Particle::new(ParticleId(0), 1.0);
        particle.velocity = Vec3::new(1.0, 0.0, 0.0);
        let mut position = Position(Vec3::ZERO);

        field.step(&noise, &mut particle, &mut position, frame(0.1, 0.1));

        assert!((position.0 - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-6);
        assert!((particle.age - 0.1).abs() < 1e-6);
        assert_eq!(particle.velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn position_uses_pre_step_velocity() {
        let noise = SimplexNoise::new(2);
        let field = AnimationField {
            amplitude: 5.0,
            gate: ActivationGate::Always,
            ..Default::default()
        };
        let mut particle = Particle::new(ParticleId(0), 1.0);
        let mut position = Position(Vec3::new(0.3, 0.7, 0.1));
        let start = position.0;

        field.step(&noise, &mut particle, &mut position, frame(1.0, 0.5));

        // Started at rest: position cannot move on the first step
        assert_eq!(position.0, start);
        assert!(particle.velocity.length() > 0.0);
    }

    #[test]
    fn sweep_gate_holds_particles_early() {
        let gate = ActivationGate::DEFAULT_SWEEP;
        assert_eq!(gate.factor(Vec3::ZERO, 0.5), 0.0);
        assert_eq!(gate.factor(Vec3::ZERO, 3.0), 1.0);
        assert!((gate.factor(Vec3::new(0.0, 0.25, 0.0), 2.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn frozen_particles_keep_their_age() {
        let noise = SimplexNoise::new(3);
        let field = AnimationField::default();
        let mut particle = Particle::new(ParticleId(0), 1.0);
        let mut position = Position(Vec3::ZERO);
        field.step(&noise, &mut particle, &mut position, frame(0.0, 0.1));
        assert_eq!(particle.age, 0.0);
    }

    #[test]
    fn volume_gate_follows_local_z() {
        let transform = Transform::from_position(Vec3::new(0.0, 0.0, 10.0));
        let field = AnimationField::effector(1.0, 1.0, &transform);
        assert_eq!(field.gate.factor(Vec3::new(0.0, 0.0, 0.0), 0.0), 0.0);
        assert_eq!(field.gate.factor(Vec3::new(0.0, 0.0, 11.0), 0.0), 1.0);
        assert!((field.gate.factor(Vec3::new(5.0, 0.0, 10.0), 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn animate_advances_every_particle() {
        let mut world = FireflyWorld::new();
        world.spawn_batch((0..200).map(|n| {
            (
                Particle::new(ParticleId(n), 1.0),
                Position(Vec3::new(n as f32 * 0.01, 0.0, 0.0)),
                Facet::default(),
            )
        }));
        let fields = [AnimationField {
            gate: ActivationGate::Always,
            ..Default::default()
        }];
        let noise = SimplexNoise::new(4);

        for n in 1..=3 {
            let count = animate(&mut world, &fields, &noise, frame(n as f32 * 0.1, 0.1));
            assert_eq!(count, 200);
        }

        let mut query = world.ecs().query::<&Particle>();
        for (_, particle) in query.iter() {
            assert!((particle.age - 0.3).abs() < 1e-5);
        }
    }

    #[test]
    fn non_finite_gate_leaves_particle_untouched() {
        let noise = SimplexNoise::new(6);
        let field = AnimationField {
            gate: ActivationGate::Volume {
                world_to_local: Mat4::from_scale(Vec3::ZERO).inverse(),
            },
            ..Default::default()
        };
        let mut particle = Particle::new(ParticleId(0), 1.0);
        let mut position = Position(Vec3::new(0.2, 0.4, 0.6));
        field.step(&noise, &mut particle, &mut position, frame(1.0, 0.1));
        assert_eq!(particle.age, 0.0);
        assert!(position.0.is_finite());
    }

    #[test]
    fn age_never_decreases() {
        let noise = SimplexNoise::new(5);
        let field = AnimationField::default();
        let mut particle = Particle::new(ParticleId(0), 1.0);
        let mut position = Position(Vec3::new(0.0, -3.0, 0.0));
        let mut last = particle.age;
        for n in 0..100 {
            let t = n as f32 * 0.05;
            field.step(&noise, &mut particle, &mut position, frame(t, 0.05));
            assert!(particle.age >= last);
            last = particle.age;
        }
    }
}
