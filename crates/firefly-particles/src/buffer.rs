//! Fixed-capacity triangle output and the render targets that own it

use crate::counter::AppendCounter;
use firefly_core::{FireflyError, Result};
use glam::Vec3;
use std::marker::PhantomData;

/// Vertex capacity each render target gets unless configured otherwise
pub const DEFAULT_MAX_VERTICES: usize = 510_000;

/// Shadow casting mode forwarded to the mesh sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowCasting {
    Off,
    #[default]
    On,
    TwoSided,
    ShadowsOnly,
}

impl ShadowCasting {
    pub const NAMES: [&'static str; 4] = ["off", "on", "two_sided", "shadows_only"];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "two_sided" => Ok(Self::TwoSided),
            "shadows_only" => Ok(Self::ShadowsOnly),
            other => Err(FireflyError::InvalidEnumValue {
                value: other.to_string(),
                allowed: Self::NAMES.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

/// How a render target's mesh is drawn. Opaque to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub material: String,
    pub cast_shadows: ShadowCasting,
    pub receive_shadows: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            material: "default".to_string(),
            cast_shadows: ShadowCasting::On,
            receive_shadows: true,
        }
    }
}

/// Flat vertex and normal arrays sized once at creation.
///
/// Triangle `t` occupies vertex slots `3t..3t+3`. Slots past the last
/// emitted triangle are kept zeroed so stale geometry never reaches the GPU.
#[derive(Debug)]
pub struct GeometryBuffer {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    /// Triangles that may hold non-zero data
    dirty_triangles: usize,
}

impl GeometryBuffer {
    pub fn with_capacity(max_vertices: usize) -> Result<Self> {
        if max_vertices == 0 || max_vertices % 3 != 0 {
            return Err(FireflyError::InvalidConfig(format!(
                "max_vertices must be a positive multiple of 3, got {max_vertices}"
            )));
        }
        Ok(Self {
            vertices: vec![Vec3::ZERO; max_vertices],
            normals: vec![Vec3::ZERO; max_vertices],
            dirty_triangles: 0,
        })
    }

    pub fn capacity_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn capacity_triangles(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Concurrent writer that claims slots from `counter`
    pub fn writer<'a>(&'a mut self, counter: &'a AppendCounter) -> TriangleWriter<'a> {
        TriangleWriter {
            vertices: self.vertices.as_mut_ptr(),
            normals: self.normals.as_mut_ptr(),
            capacity_triangles: self.capacity_triangles() as u32,
            counter,
            _buffer: PhantomData,
        }
    }

    /// Zero every slot from `emitted_triangles` up to the previous high-water mark
    pub fn clear_tail(&mut self, emitted_triangles: usize) {
        let emitted = emitted_triangles.min(self.capacity_triangles());
        if self.dirty_triangles > emitted {
            let range = emitted * 3..self.dirty_triangles * 3;
            self.vertices[range.clone()].fill(Vec3::ZERO);
            self.normals[range].fill(Vec3::ZERO);
        }
        self.dirty_triangles = emitted;
    }
}

/// Lock-free triangle appender over a `GeometryBuffer`.
///
/// Each `emit` claims a slot from the shared counter and writes three
/// vertices and the facet normal there. Claims past capacity are dropped.
pub struct TriangleWriter<'a> {
    vertices: *mut Vec3,
    normals: *mut Vec3,
    capacity_triangles: u32,
    counter: &'a AppendCounter,
    _buffer: PhantomData<&'a mut [Vec3]>,
}

// SAFETY: the writer holds the buffer's unique borrow for 'a and writes only
// to slots handed out by the counter, which never returns the same value twice
// between resets. A reset needs `&mut AppendCounter`, which cannot coexist
// with the shared borrow stored here.
unsafe impl Send for TriangleWriter<'_> {}
unsafe impl Sync for TriangleWriter<'_> {}

impl TriangleWriter<'_> {
    /// Append one triangle; returns the slot written, or None when full
    pub fn emit(&self, v1: Vec3, v2: Vec3, v3: Vec3) -> Option<u32> {
        let slot = self.counter.increment();
        if slot >= self.capacity_triangles {
            return None;
        }

        let normal = (v2 - v1).cross(v3 - v1).normalize_or_zero();
        let base = slot as usize * 3;

        // SAFETY: slot < capacity_triangles, so base + 2 is in bounds, and no
        // other caller owns this slot (see the Send/Sync impls above).
        unsafe {
            self.vertices.add(base).write(v1);
            self.vertices.add(base + 1).write(v2);
            self.vertices.add(base + 2).write(v3);
            self.normals.add(base).write(normal);
            self.normals.add(base + 1).write(normal);
            self.normals.add(base + 2).write(normal);
        }
        Some(slot)
    }
}

/// Per-frame output numbers for one render target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Triangles written to the buffer
    pub emitted: usize,
    /// Triangles claimed past capacity and discarded
    pub dropped: usize,
}

/// One mesh: settings, geometry buffer and append counter.
///
/// Shared by every particle spawned from the same source.
#[derive(Debug)]
pub struct RenderTarget {
    pub settings: RenderSettings,
    buffer: GeometryBuffer,
    counter: AppendCounter,
    uploaded: bool,
    last_frame: FrameGeometry,
}

impl RenderTarget {
    pub fn new(settings: RenderSettings, max_vertices: usize) -> Result<Self> {
        Ok(Self {
            settings,
            buffer: GeometryBuffer::with_capacity(max_vertices)?,
            counter: AppendCounter::new(),
            uploaded: false,
            last_frame: FrameGeometry::default(),
        })
    }

    /// Reset the append counter ahead of this frame's first dispatch
    pub fn begin_frame(&mut self) {
        self.counter.reset();
    }

    pub fn writer(&mut self) -> TriangleWriter<'_> {
        let Self {
            buffer, counter, ..
        } = self;
        buffer.writer(counter)
    }

    /// Settle the frame: clamp the count to capacity and zero the stale tail
    pub fn end_frame(&mut self) -> FrameGeometry {
        let claimed = self.counter.value() as usize;
        let capacity = self.buffer.capacity_triangles();
        let emitted = claimed.min(capacity);
        let dropped = claimed - emitted;
        if dropped > 0 {
            log::warn!(
                "[firefly] render target full: dropped {dropped} of {claimed} triangles (capacity {capacity})"
            );
        }
        self.buffer.clear_tail(emitted);
        self.last_frame = FrameGeometry { emitted, dropped };
        self.last_frame
    }

    pub fn emitted_triangles(&self) -> usize {
        self.last_frame.emitted
    }

    pub fn last_frame(&self) -> FrameGeometry {
        self.last_frame
    }

    pub fn claimed_triangles(&self) -> u32 {
        self.counter.value()
    }

    pub fn buffer(&self) -> &GeometryBuffer {
        &self.buffer
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    pub(crate) fn mark_uploaded(&mut self) {
        self.uploaded = true;
    }
}
