//! Indexed source meshes and a few built-in shapes

use firefly_core::{FireflyError, Result};
use glam::Vec3;
use std::collections::HashMap;

/// Largest built-in mesh a scene may ask for
pub const MAX_BUILTIN_TRIANGLES: usize = 1 << 22;

/// Triangles in a `columns` x `rows` grid, or None on overflow
pub fn grid_triangle_count(columns: u32, rows: u32) -> Option<usize> {
    (columns.max(1) as usize)
        .checked_mul(rows.max(1) as usize)?
        .checked_mul(2)
}

/// An indexed triangle list that particles are cut from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl SourceMesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Index count must be a multiple of 3 and every index in range
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(FireflyError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(FireflyError::InvalidMesh(format!(
                "index {bad} out of range for {} vertices",
                self.vertices.len()
            )));
        }
        Ok(())
    }

    /// Corners of triangle `t`
    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let i = &self.indices[t * 3..t * 3 + 3];
        [
            self.vertices[i[0] as usize],
            self.vertices[i[1] as usize],
            self.vertices[i[2] as usize],
        ]
    }

    /// Unit quad in the XY plane, two triangles
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        Self::new(
            vec![
                Vec3::new(-h, -h, 0.0),
                Vec3::new(h, -h, 0.0),
                Vec3::new(h, h, 0.0),
                Vec3::new(-h, h, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// `columns` x `rows` cells in the XY plane, two triangles per cell.
    ///
    /// Callers check the size with `grid_triangle_count` first.
    pub fn grid(columns: u32, rows: u32, size: f32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let mut vertices = Vec::with_capacity((columns as usize + 1).saturating_mul(rows as usize + 1));
        for y in 0..=rows {
            for x in 0..=columns {
                vertices.push(Vec3::new(
                    (x as f32 / columns as f32 - 0.5) * size,
                    (y as f32 / rows as f32 - 0.5) * size,
                    0.0,
                ));
            }
        }

        let stride = columns + 1;
        let mut indices = Vec::with_capacity(grid_triangle_count(columns, rows).unwrap_or(0).saturating_mul(3));
        for y in 0..rows {
            for x in 0..columns {
                let a = y * stride + x;
                let b = a + 1;
                let c = a + stride + 1;
                let d = a + stride;
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
        Self::new(vertices, indices)
    }

    /// Icosahedron subdivided `subdivisions` times, projected onto a sphere
    pub fn icosphere(radius: f32, subdivisions: u32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let mut vertices: Vec<Vec3> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();

        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut midpoint = |a: u32, b: u32, vertices: &mut Vec<Vec3>| {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let m = ((vertices[a as usize] + vertices[b as usize]) * 0.5).normalize();
                    vertices.push(m);
                    (vertices.len() - 1) as u32
                })
            };

            let mut next = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
            }
            faces = next;
        }

        for v in &mut vertices {
            *v *= radius;
        }
        Self::new(vertices, faces.into_iter().flatten().collect())
    }
}
