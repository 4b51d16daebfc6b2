//! Turning particles back into triangles
//!
//! Each variant kind has a `ReconstructionStrategy` that emits a fixed number
//! of triangles per particle. The stage groups particles by
//! (render target, variant), resets each target's counter once, then
//! dispatches one parallel job per non-empty group.

use crate::buffer::{FrameGeometry, RenderTarget, TriangleWriter};
use crate::particle::{Facet, Particle, Position};
use crate::rand::flap_frequency;
use crate::variant::VariantParams;
use firefly_core::{saturate, ParticleId};
use firefly_ecs::{FireflyWorld, SharedIndex};
use firefly_runtime::parallel_for;
use glam::{Quat, Vec3};
use std::collections::BTreeMap;

/// Work items per reconstruction task
pub const RECONSTRUCTION_BATCH: usize = 8;

/// A snapshot of one particle's reconstruction inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructInput {
    pub id: ParticleId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub facet: Facet,
}

impl ReconstructInput {
    pub fn new(particle: &Particle, position: &Position, facet: &Facet) -> Self {
        Self {
            id: particle.id,
            position: position.0,
            velocity: particle.velocity,
            age: particle.age,
            facet: *facet,
        }
    }
}

/// Generates the triangles for one particle.
///
/// Implementations must be pure functions of their inputs so that running a
/// frame twice writes the same triangle set.
pub trait ReconstructionStrategy: Send + Sync {
    /// Triangles emitted per particle
    fn triangles_per_particle(&self) -> u32;

    fn reconstruct(&self, input: &ReconstructInput, params: &VariantParams, out: &TriangleWriter<'_>);
}

/// The source facet spinning around an axis derived from its velocity
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleShape;

/// Radians per second of tumble
const TUMBLE_RATE: f32 = 3.0;

impl ReconstructionStrategy for SimpleShape {
    fn triangles_per_particle(&self) -> u32 {
        1
    }

    fn reconstruct(&self, input: &ReconstructInput, params: &VariantParams, out: &TriangleWriter<'_>) {
        let facet = &input.facet;
        let axis = (input.velocity + Vec3::splat(1e-4))
            .cross(facet.vertex1)
            .try_normalize()
            .unwrap_or(Vec3::Y);
        let spin = Quat::from_axis_angle(axis, input.age * TUMBLE_RATE);
        let p = input.position;

        out.emit(
            p + spin * (facet.vertex1 * params.size),
            p + spin * (facet.vertex2 * params.size),
            p + spin * (facet.vertex3 * params.size),
        );
    }
}

/// Orthonormal frame facing along the velocity, scaled by size
fn motion_frame(velocity: Vec3, size: f32) -> (Vec3, Vec3, Vec3) {
    let forward = (velocity + Vec3::splat(0.001)).normalize_or_zero();
    let side = Vec3::Y.cross(forward).try_normalize().unwrap_or(Vec3::X);
    let up = forward.cross(side).normalize_or_zero();
    (side * size, up * size, forward * size)
}

/// Flapping wings that grow out of the facet over the first second
#[derive(Debug, Clone, Copy, Default)]
pub struct ButterflyShape;

impl ReconstructionStrategy for ButterflyShape {
    fn triangles_per_particle(&self) -> u32 {
        4
    }

    fn reconstruct(&self, input: &ReconstructInput, params: &VariantParams, out: &TriangleWriter<'_>) {
        let p = input.position;
        let flap = (flap_frequency(input.id) * input.age).sin();
        let (ax, ay, az) = motion_frame(input.velocity, params.size);
        let ay = ay * flap;

        let [a1, a2, a3] = input.facet.at(p);

        let body_front = p + az * 0.2;
        let body_back = p - az * 0.2;
        let left_front = p - ax + ay + az;
        let left_back = p - ax + ay - az;
        let right_front = left_front + ax * 2.0;
        let right_back = left_back + ax * 2.0;

        let grow = saturate(input.age);
        let v1 = a1.lerp(body_front, grow);
        let v2 = a2.lerp(body_back, grow);
        let v3 = a3.lerp(left_front, grow);
        let v4 = a3.lerp(left_back, grow);
        let v5 = a3.lerp(right_front, grow);
        let v6 = a3.lerp(right_back, grow);

        out.emit(v1, v2, v5);
        out.emit(v5, v2, v6);
        out.emit(v3, v4, v1);
        out.emit(v1, v4, v2);
    }
}

/// Double-sided shards that bloom out of the facet
#[derive(Debug, Clone, Copy, Default)]
pub struct DisintegratorShape;

impl ReconstructionStrategy for DisintegratorShape {
    fn triangles_per_particle(&self) -> u32 {
        4
    }

    fn reconstruct(&self, input: &ReconstructInput, params: &VariantParams, out: &TriangleWriter<'_>) {
        let p = input.position;
        let t = input.age;
        let (vx, vy, vz) = motion_frame(input.velocity, params.size);
        let vy = vy * (flap_frequency(input.id) * t).sin();

        let facet = &input.facet;
        let (f1, f2, f3) = (p + facet.vertex1, p + facet.vertex2, p + facet.vertex3);

        let grow = saturate(t);
        let v1 = f1.lerp(p, grow);
        let v2 = f2.lerp(p - vx - vz + vy, grow);
        let v3 = f3.lerp(p - vx + vz + vy, grow);
        let v4 = f2.lerp(p + vx + vz + vy, grow);
        let v5 = f3.lerp(p + vx - vz + vy, grow);

        out.emit(v1, v2, v3);
        out.emit(v1, v3, v2);
        out.emit(v1, v4, v5);
        out.emit(v1, v5, v4);
    }
}

/// Totals for one reconstruction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionStats {
    pub particles: usize,
    pub dispatches: usize,
    pub emitted: usize,
    pub dropped: usize,
}

type GroupKey = (SharedIndex<RenderTarget>, SharedIndex<VariantParams>);

/// Rebuild every render target's geometry from current particle state
pub fn reconstruct(world: &mut FireflyWorld) -> ReconstructionStats {
    let (ecs, shared) = world.split_mut();
    let mut stats = ReconstructionStats::default();

    // Partition by shared-component pair; ordered so dispatch order is stable
    let mut groups: BTreeMap<GroupKey, Vec<ReconstructInput>> = BTreeMap::new();
    {
        let mut query = ecs.query::<(
            &Particle,
            &Position,
            &Facet,
            &SharedIndex<RenderTarget>,
            &SharedIndex<VariantParams>,
        )>();
        for (_, (particle, position, facet, target, variant)) in query.iter() {
            groups
                .entry((*target, *variant))
                .or_default()
                .push(ReconstructInput::new(particle, position, facet));
        }
    }

    let mut dispatches = Vec::with_capacity(groups.len());
    for ((target, variant), inputs) in groups {
        if inputs.is_empty() {
            continue;
        }
        match shared.value(variant) {
            Some(params) => dispatches.push((target, params.clone(), inputs)),
            None => log::warn!(
                "[firefly] {} particle(s) reference missing variant {variant:?}",
                inputs.len()
            ),
        }
    }

    let targets = shared.get_mut::<RenderTarget>();
    for (_, target) in targets.iter_mut() {
        target.begin_frame();
    }

    for (key, params, inputs) in &dispatches {
        let Some(target) = targets.get_mut(*key) else {
            log::warn!(
                "[firefly] {} particle(s) reference missing render target {key:?}",
                inputs.len()
            );
            continue;
        };
        let strategy = params.kind.strategy();
        let writer = target.writer();
        parallel_for(inputs.len(), RECONSTRUCTION_BATCH, |i| {
            strategy.reconstruct(&inputs[i], params, &writer);
        });
        stats.particles += inputs.len();
        stats.dispatches += 1;
    }

    for (_, target) in targets.iter_mut() {
        let FrameGeometry { emitted, dropped } = target.end_frame();
        stats.emitted += emitted;
        stats.dropped += dropped;
    }

    stats
}
