//! Firefly Particles - Mesh-reconstructing particle effects
//!
//! Cuts source meshes into one particle per triangle, animates the particles
//! through a curl-noise field, and rebuilds a renderable mesh from them every
//! frame:
//! - lock-free triangle appends into fixed-capacity geometry buffers
//! - per-variant reconstruction shapes (tumbling shards, butterflies, fragments)
//! - deterministic per-particle randomness keyed by stable particle ids
//! - deferred expiry so parallel passes never see structural changes

pub mod animation;
pub mod buffer;
pub mod config;
pub mod counter;
pub mod expiration;
pub mod mesh;
pub mod noise;
pub mod particle;
pub mod rand;
pub mod reconstruction;
pub mod render;
pub mod spawn;
pub mod variant;

use firefly_core::Result;
use firefly_ecs::{DeferredCommands, FireflyWorld};
use firefly_runtime::{timed, FrameTime, RuntimeSystem};
use serde::Serialize;
use std::sync::Arc;

pub use animation::{animate, ActivationGate, AnimationField};
pub use buffer::{GeometryBuffer, RenderSettings, RenderTarget, ShadowCasting, TriangleWriter};
pub use config::{FireflyConfig, MeshShape, SpawnConfig};
pub use counter::AppendCounter;
pub use expiration::{expire, is_expired};
pub use mesh::SourceMesh;
pub use self::noise::{NoiseField, SimplexNoise};
pub use particle::{Facet, MeshVertex, Particle, Position};
pub use reconstruction::{reconstruct, ReconstructionStrategy};
pub use render::{IndexFormat, MeshData, MeshSetup, MeshSink, RecordingSink};
pub use spawn::{tessellate, SpawnBatch, SpawnRequest, Spawner};
pub use variant::{VariantKind, VariantParams, VariantTable};

/// What one frame of the pipeline did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub spawned: usize,
    /// Spawn requests rejected this frame
    pub spawn_failures: usize,
    pub animated: usize,
    pub triangles: usize,
    pub dropped: usize,
    pub expired: usize,
}

/// Live totals read straight from the world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    pub particles: usize,
    pub targets: usize,
    pub triangles: usize,
}

impl SceneStats {
    pub fn collect(world: &FireflyWorld) -> Self {
        let particles = world.ecs().query::<&Particle>().iter().count();
        let (targets, triangles) = world
            .shared::<RenderTarget>()
            .map(|store| {
                (
                    store.len(),
                    store.iter().map(|(_, t)| t.emitted_triangles()).sum::<usize>(),
                )
            })
            .unwrap_or((0, 0));
        Self {
            particles,
            targets,
            triangles,
        }
    }
}

/// The whole effect as one system: spawn, animate, reconstruct, draw, expire.
pub struct FireflySystem<S: MeshSink = RecordingSink> {
    config: FireflyConfig,
    fields: Vec<AnimationField>,
    noise: SimplexNoise,
    spawner: Spawner,
    sink: S,
    ramp: render::IndexRamp,
    commands: DeferredCommands,
    /// Configured spawns not yet issued, latest first
    scheduled: Vec<SpawnConfig>,
    last_frame: FrameStats,
}

impl FireflySystem<RecordingSink> {
    pub fn new(config: FireflyConfig) -> Result<Self> {
        Self::with_sink(config, RecordingSink::new())
    }
}

impl<S: MeshSink> FireflySystem<S> {
    pub fn with_sink(config: FireflyConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let spawner = Spawner::new(config.variants.clone(), config.renderer.max_vertices)?
            .with_settings(config.renderer.settings.clone());
        let mut scheduled = config.spawns.clone();
        scheduled.sort_by(|a, b| b.at_frame.cmp(&a.at_frame));
        Ok(Self {
            fields: config.fields(),
            noise: SimplexNoise::new(config.seed),
            spawner,
            sink,
            ramp: render::IndexRamp::default(),
            commands: DeferredCommands::new(),
            scheduled,
            last_frame: FrameStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &FireflyConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    /// Configured spawns still waiting for their frame
    pub fn pending_spawns(&self) -> usize {
        self.scheduled.len()
    }

    /// Turn due `[[spawn]]` entries into `SpawnRequest` entities
    fn issue_scheduled(&mut self, world: &mut FireflyWorld, frame: u64) {
        while self.scheduled.last().is_some_and(|s| s.at_frame <= frame) {
            let Some(spawn) = self.scheduled.pop() else {
                break;
            };
            let mut request = SpawnRequest::new(Arc::new(spawn.shape.build()), spawn.transform);
            request.settings = spawn.settings;
            request.variants = spawn.variants;
            world.spawn((request,));
        }
    }
}

impl<S: MeshSink> RuntimeSystem for FireflySystem<S> {
    fn initialize(&mut self, _world: &mut FireflyWorld) -> Result<()> {
        log::info!(
            "[firefly] {} variant(s), {} animation pass(es), {} vertices per target",
            self.config.variants.len(),
            self.fields.len(),
            self.config.renderer.max_vertices
        );
        Ok(())
    }

    fn update(&mut self, world: &mut FireflyWorld, time: FrameTime) -> Result<()> {
        self.issue_scheduled(world, time.frame);

        let batch = timed("spawn", || self.spawner.spawn(world));

        let animated = timed("animate", || animate(world, &self.fields, &self.noise, time));
        let geometry = timed("reconstruct", || reconstruct(world));
        timed("submit", || render::submit(world, &mut self.sink, &mut self.ramp))?;
        let expired = timed("expire", || expire(world, &mut self.commands));

        self.last_frame = FrameStats {
            spawned: batch.particles(),
            spawn_failures: batch.failures.len(),
            animated,
            triangles: geometry.emitted,
            dropped: geometry.dropped,
            expired,
        };
        log::trace!("[firefly] frame {}: {:?}", time.frame, self.last_frame);
        Ok(())
    }

    fn shutdown(&mut self, world: &mut FireflyWorld) -> Result<()> {
        let released = render::release_all(world, &mut self.sink)?;
        log::info!("[firefly] released {released} render target(s)");
        Ok(())
    }

    fn name(&self) -> &str {
        "firefly"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firefly_core::Transform;
    use firefly_runtime::FrameLoop;

    fn scene(extra: &str) -> FireflyConfig {
        FireflyConfig::from_toml_str(&format!(
            r#"
[renderer]
max_vertices = 30000

[animation]
gate = "always"

[[spawn]]
mesh = "grid"
columns = 4
rows = 4
{extra}
"#
        ))
        .unwrap()
    }

    #[test]
    fn full_frame_pipeline() {
        let mut system = FireflySystem::new(scene("")).unwrap();
        let mut world = FireflyWorld::new();
        system.initialize(&mut world).unwrap();

        system.update(&mut world, FrameTime::new(0.1, 0.1)).unwrap();
        let frame = system.last_frame();
        assert_eq!(frame.spawned, 32);
        assert_eq!(frame.animated, 32);
        assert!(frame.triangles >= 32 && frame.triangles <= 32 * 4);
        assert_eq!(frame.dropped, 0);
        assert_eq!(frame.expired, 0);

        let stats = SceneStats::collect(&world);
        assert_eq!(stats.particles, 32);
        assert_eq!(stats.targets, 1);
        assert_eq!(stats.triangles, frame.triangles);
        assert_eq!(system.sink().total_triangles(), frame.triangles);
        assert_eq!(system.sink().draws.len(), 1);
    }

    #[test]
    fn particles_expire_after_their_life() {
        let mut config = scene("");
        for variant in &mut config.variants {
            variant.life = 0.5;
        }
        let mut system = FireflySystem::new(config).unwrap();
        let mut world = FireflyWorld::new();

        let mut expired = 0;
        for n in 0..10 {
            let mut time = FrameTime::new((n + 1) as f32 * 0.1, 0.1);
            time.frame = n;
            system.update(&mut world, time).unwrap();
            expired += system.last_frame().expired;
        }
        assert_eq!(expired, 32);
        assert_eq!(SceneStats::collect(&world).particles, 0);
    }

    #[test]
    fn scheduled_spawns_wait_for_their_frame() {
        let mut system = FireflySystem::new(scene("at_frame = 3")).unwrap();
        let mut world = FireflyWorld::new();
        for n in 0..3 {
            let mut time = FrameTime::new(0.0, 0.1);
            time.frame = n;
            system.update(&mut world, time).unwrap();
            assert_eq!(system.last_frame().spawned, 0);
        }
        assert_eq!(system.pending_spawns(), 1);

        let mut time = FrameTime::new(0.0, 0.1);
        time.frame = 3;
        system.update(&mut world, time).unwrap();
        assert_eq!(system.last_frame().spawned, 32);
        assert_eq!(system.pending_spawns(), 0);
    }

    #[test]
    fn shutdown_releases_targets() {
        let mut system = FireflySystem::new(scene("")).unwrap();
        let mut world = FireflyWorld::new();
        world.spawn((SpawnRequest::new(SourceMesh::quad(1.0), Transform::IDENTITY),));
        system.update(&mut world, FrameTime::new(0.1, 0.1)).unwrap();
        system.shutdown(&mut world).unwrap();
        assert_eq!(system.sink().released.len(), 2);
        assert_eq!(SceneStats::collect(&world).targets, 0);
    }

    #[test]
    fn runs_inside_the_frame_loop() {
        let mut frames = FrameLoop::default();
        frames
            .add_system(Box::new(FireflySystem::new(scene("")).unwrap()))
            .unwrap();
        for _ in 0..5 {
            frames.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(SceneStats::collect(&frames.world).particles, 32);
        frames.shutdown().unwrap();
    }

    #[test]
    fn bad_spawn_requests_do_not_skip_the_frame() {
        let mut system = FireflySystem::new(scene("")).unwrap();
        let mut world = FireflyWorld::new();
        let bad = SourceMesh::new(vec![glam::Vec3::ZERO; 3], vec![0, 1]);
        world.spawn((SpawnRequest::new(bad, Transform::IDENTITY),));

        system.update(&mut world, FrameTime::new(0.1, 0.1)).unwrap();
        let frame = system.last_frame();
        assert_eq!(frame.spawn_failures, 1);
        assert_eq!(frame.spawned, 32);
        assert_eq!(frame.animated, 32);
        assert!(frame.triangles >= 32);
    }

    #[test]
    fn scheduled_spawns_keep_their_overrides() {
        let mut system = FireflySystem::new(scene(
            "material = \"moths\"\n[[spawn.variants]]\nkind = \"disintegrator\"",
        ))
        .unwrap();
        let mut world = FireflyWorld::new();
        system.update(&mut world, FrameTime::new(0.1, 0.1)).unwrap();

        let (_, target) = world.shared::<RenderTarget>().unwrap().iter().next().unwrap();
        assert_eq!(target.settings.material, "moths");
        let mut query = world.ecs().query::<&firefly_ecs::SharedIndex<VariantParams>>();
        for (_, key) in query.iter() {
            assert_eq!(
                world.shared_value(*key).map(|v| v.kind),
                Some(VariantKind::Disintegrator)
            );
        }
    }

    #[test]
    fn singular_effectors_are_rejected_up_front() {
        assert!(FireflySystem::new(scene("[[effectors]]\nscale = [0, 0, 0]")).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = FireflyConfig::default();
        config.renderer.max_vertices = 10;
        assert!(FireflySystem::new(config).is_err());
    }
}
