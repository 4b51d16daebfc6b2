//! Cutting source meshes into particles

use crate::buffer::{RenderSettings, RenderTarget};
use crate::mesh::SourceMesh;
use crate::particle::{Facet, Particle, Position};
use crate::rand::{life_fraction, variant_sample};
use crate::reconstruction::ReconstructionStrategy;
use crate::variant::{VariantParams, VariantTable};
use firefly_core::{FireflyError, IdAllocator, ParticleId, Result, Transform};
use firefly_ecs::{Entity, FireflyWorld, SharedIndex};
use glam::Mat4;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Triangles per tessellation task
const TESSELLATE_BATCH: usize = 32;

/// Marker asking the spawn stage to turn a mesh into particles.
///
/// Removed from its entity once processed, so each request spawns once.
/// Variants and settings left unset fall back to the spawner's own.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub mesh: Arc<SourceMesh>,
    pub transform: Transform,
    pub settings: Option<RenderSettings>,
    pub variants: Option<Vec<VariantParams>>,
}

impl SpawnRequest {
    pub fn new(mesh: impl Into<Arc<SourceMesh>>, transform: Transform) -> Self {
        Self {
            mesh: mesh.into(),
            transform,
            settings: None,
            variants: None,
        }
    }

    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_variants(mut self, variants: Vec<VariantParams>) -> Self {
        self.variants = Some(variants);
        self
    }
}

/// World-space facets and centroids for every triangle of `mesh`
pub fn tessellate(mesh: &SourceMesh, local_to_world: Mat4) -> Result<Vec<(Facet, Position)>> {
    mesh.validate()?;
    Ok((0..mesh.triangle_count())
        .into_par_iter()
        .with_min_len(TESSELLATE_BATCH)
        .map(|t| {
            let [v1, v2, v3] = mesh.triangle(t).map(|v| local_to_world.transform_point3(v));
            let (facet, centroid) = Facet::from_triangle(v1, v2, v3);
            (facet, Position(centroid))
        })
        .collect())
}

/// What one processed request produced
#[derive(Debug, Clone)]
pub struct SpawnReport {
    pub source: Entity,
    /// None when the mesh had no triangles
    pub target: Option<SharedIndex<RenderTarget>>,
    pub particles: usize,
    pub first_id: ParticleId,
    pub elapsed: Duration,
}

/// Every request processed in one pass
#[derive(Debug, Default)]
pub struct SpawnBatch {
    pub reports: Vec<SpawnReport>,
    /// Requests that were consumed without spawning anything
    pub failures: Vec<(Entity, FireflyError)>,
}

impl SpawnBatch {
    pub fn particles(&self) -> usize {
        self.reports.iter().map(|r| r.particles).sum()
    }
}

/// Turns `SpawnRequest`s into particle entities
#[derive(Debug)]
pub struct Spawner {
    ids: IdAllocator,
    variants: Vec<VariantParams>,
    settings: RenderSettings,
    max_vertices: usize,
}

impl Spawner {
    pub fn new(variants: Vec<VariantParams>, max_vertices: usize) -> Result<Self> {
        // Fail early on unusable weights
        VariantTable::build(variants.iter().enumerate().map(|(i, v)| (v.weight, i)))?;
        Ok(Self {
            ids: IdAllocator::new(),
            variants,
            settings: RenderSettings::default(),
            max_vertices,
        })
    }

    /// Settings for requests that carry none
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The id the next spawned particle will receive
    pub fn next_id(&self) -> ParticleId {
        self.ids.peek()
    }

    /// Process every pending request in the world.
    ///
    /// A failing request is logged and recorded in `failures`; the rest of
    /// the batch still spawns.
    pub fn spawn(&self, world: &mut FireflyWorld) -> SpawnBatch {
        let requests: Vec<(Entity, SpawnRequest)> = {
            let mut query = world.ecs().query::<&SpawnRequest>();
            query
                .iter()
                .map(|(entity, request)| (entity, request.clone()))
                .collect()
        };

        let mut batch = SpawnBatch {
            reports: Vec::with_capacity(requests.len()),
            failures: Vec::new(),
        };
        for (source, request) in requests {
            // Consumed even on failure so a bad mesh is reported once
            let outcome = world
                .remove_one::<SpawnRequest>(source)
                .and_then(|_| self.spawn_one(world, source, &request));
            match outcome {
                Ok(report) => batch.reports.push(report),
                Err(e) => {
                    log::error!("[firefly] spawn source {source:?} rejected: {e}");
                    batch.failures.push((source, e));
                }
            }
        }
        batch
    }

    fn spawn_one(
        &self,
        world: &mut FireflyWorld,
        source: Entity,
        request: &SpawnRequest,
    ) -> Result<SpawnReport> {
        let start = Instant::now();
        let variants = request.variants.as_deref().unwrap_or(&self.variants);
        let settings = request.settings.as_ref().unwrap_or(&self.settings);
        VariantTable::build(variants.iter().map(|v| (v.weight, ())))?;
        let facets = tessellate(&request.mesh, request.transform.to_matrix())?;

        if facets.is_empty() {
            log::info!("[firefly] spawn source {source:?} has no triangles");
            return Ok(SpawnReport {
                source,
                target: None,
                particles: 0,
                first_id: self.ids.peek(),
                elapsed: start.elapsed(),
            });
        }

        let count = u32::try_from(facets.len()).map_err(|_| {
            FireflyError::InvalidMesh(format!("{} triangles is too many", facets.len()))
        })?;

        let target = world
            .shared_mut::<RenderTarget>()
            .insert(RenderTarget::new(settings.clone(), self.max_vertices)?);

        let store = world.shared_mut::<VariantParams>();
        let keys: Vec<(f32, SharedIndex<VariantParams>)> = variants
            .iter()
            .map(|v| (v.weight, store.intern(v.clone())))
            .collect();
        let table = VariantTable::build(keys)?;

        let worst_case: usize = variants
            .iter()
            .map(|v| v.kind.strategy().triangles_per_particle() as usize)
            .max()
            .unwrap_or(1)
            * facets.len()
            * 3;
        if worst_case > self.max_vertices {
            log::warn!(
                "[firefly] {} particles may need up to {worst_case} vertices; capacity is {}",
                facets.len(),
                self.max_vertices
            );
        }

        let first = self.ids.reserve(count);
        world.spawn_batch(facets.into_iter().enumerate().map(|(n, (facet, position))| {
            let id = ParticleId(first.raw().wrapping_add(n as u32));
            (
                Particle::new(id, life_fraction(id)),
                position,
                facet,
                target,
                table.select(variant_sample(id)),
            )
        }));

        let elapsed = start.elapsed();
        log::info!(
            "[firefly] spawned {count} particle(s) from {source:?} in {:.2} ms",
            elapsed.as_secs_f64() * 1000.0
        );

        Ok(SpawnReport {
            source,
            target: Some(target),
            particles: count as usize,
            first_id: first,
            elapsed,
        })
    }
}
