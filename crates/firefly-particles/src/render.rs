//! Hand-off of reconstructed geometry to whatever draws it

use crate::buffer::{RenderSettings, RenderTarget};
use crate::particle::MeshVertex;
use firefly_core::{FireflyError, Result};
use firefly_ecs::{FireflyWorld, SharedIndex};
use glam::Vec3;
use std::collections::HashMap;

/// Half-extent of the bounds given to every uploaded mesh.
/// Particles wander far from their source, so culling is effectively off.
pub const MESH_BOUNDS_EXTENT: f32 = 1000.0;

/// Width of the mesh index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

/// One-time mesh setup sent with a target's first upload
#[derive(Debug, Clone, Copy)]
pub struct MeshSetup<'a> {
    /// Always `U32`: capacities run past 65535 vertices
    pub index_format: IndexFormat,
    /// Vertices are rewritten every frame
    pub dynamic: bool,
    /// Identity ramp `0..capacity`
    pub indices: &'a [u32],
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

/// Geometry for one upload
#[derive(Debug, Clone, Copy)]
pub struct MeshData<'a> {
    /// Full-capacity arrays; slots past `triangle_count` are zero
    pub vertices: &'a [Vec3],
    pub normals: &'a [Vec3],
    pub triangle_count: usize,
    /// Present only on the target's first upload
    pub setup: Option<MeshSetup<'a>>,
}

impl MeshData<'_> {
    /// Interleave positions and normals into the GPU vertex layout
    pub fn interleaved(&self) -> Vec<MeshVertex> {
        self.vertices
            .iter()
            .zip(self.normals)
            .map(|(p, n)| MeshVertex::new(*p, *n))
            .collect()
    }
}

/// Receives geometry each frame. Implemented by the host renderer.
pub trait MeshSink {
    fn upload(&mut self, target: SharedIndex<RenderTarget>, mesh: &MeshData<'_>) -> Result<()>;

    fn draw(&mut self, target: SharedIndex<RenderTarget>, settings: &RenderSettings) -> Result<()>;

    /// The target is gone; free anything held for it
    fn release(&mut self, target: SharedIndex<RenderTarget>) -> Result<()>;
}

/// Last state uploaded for one target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedMesh {
    pub uploads: usize,
    pub vertex_bytes: usize,
    pub triangle_count: usize,
    pub index_count: usize,
    pub index_format: Option<IndexFormat>,
    pub dynamic: bool,
    pub bounds: Option<(Vec3, Vec3)>,
}

/// A sink that keeps counts instead of drawing. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub meshes: HashMap<SharedIndex<RenderTarget>, RecordedMesh>,
    pub draws: Vec<(SharedIndex<RenderTarget>, RenderSettings)>,
    pub released: Vec<SharedIndex<RenderTarget>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(&self, target: SharedIndex<RenderTarget>) -> Option<&RecordedMesh> {
        self.meshes.get(&target)
    }

    /// Triangles visible across all live meshes as of the last upload
    pub fn total_triangles(&self) -> usize {
        self.meshes.values().map(|m| m.triangle_count).sum()
    }
}

impl MeshSink for RecordingSink {
    fn upload(&mut self, target: SharedIndex<RenderTarget>, mesh: &MeshData<'_>) -> Result<()> {
        let vertices = mesh.interleaved();
        let record = self.meshes.entry(target).or_default();
        record.uploads += 1;
        record.vertex_bytes = bytemuck::cast_slice::<MeshVertex, u8>(&vertices).len();
        record.triangle_count = mesh.triangle_count;
        if let Some(setup) = mesh.setup {
            record.index_count = setup.indices.len();
            record.index_format = Some(setup.index_format);
            record.dynamic = setup.dynamic;
            record.bounds = Some((setup.bounds_min, setup.bounds_max));
        }
        Ok(())
    }

    fn draw(&mut self, target: SharedIndex<RenderTarget>, settings: &RenderSettings) -> Result<()> {
        if !self.meshes.contains_key(&target) {
            return Err(FireflyError::RenderError(format!(
                "draw of {target:?} before any upload"
            )));
        }
        self.draws.push((target, settings.clone()));
        Ok(())
    }

    fn release(&mut self, target: SharedIndex<RenderTarget>) -> Result<()> {
        self.meshes.remove(&target);
        self.released.push(target);
        Ok(())
    }
}

/// Grow-only identity index list shared by every target
#[derive(Debug, Default)]
pub struct IndexRamp {
    indices: Vec<u32>,
}

impl IndexRamp {
    pub fn get(&mut self, len: usize) -> &[u32] {
        if self.indices.len() < len {
            let start = self.indices.len() as u32;
            self.indices.extend(start..len as u32);
        }
        &self.indices[..len]
    }
}

/// Upload and draw every render target. Returns the number of targets drawn.
pub fn submit(world: &mut FireflyWorld, sink: &mut dyn MeshSink, ramp: &mut IndexRamp) -> Result<usize> {
    let targets = world.shared_mut::<RenderTarget>();
    let mut drawn = 0;
    for (key, target) in targets.iter_mut() {
        let buffer = target.buffer();
        let setup = if target.is_uploaded() {
            None
        } else {
            Some(MeshSetup {
                index_format: IndexFormat::U32,
                dynamic: true,
                indices: ramp.get(buffer.capacity_vertices()),
                bounds_min: Vec3::splat(-MESH_BOUNDS_EXTENT),
                bounds_max: Vec3::splat(MESH_BOUNDS_EXTENT),
            })
        };
        let mesh = MeshData {
            vertices: buffer.vertices(),
            normals: buffer.normals(),
            triangle_count: target.emitted_triangles(),
            setup,
        };
        sink.upload(key, &mesh)?;
        sink.draw(key, &target.settings)?;
        target.mark_uploaded();
        drawn += 1;
    }
    Ok(drawn)
}

/// Remove every render target and tell the sink to free it
pub fn release_all(world: &mut FireflyWorld, sink: &mut dyn MeshSink) -> Result<usize> {
    let drained = world.shared_mut::<RenderTarget>().drain();
    let count = drained.len();
    for (key, _) in drained {
        sink.release(key)?;
    }
    Ok(count)
}
