//! Regular-grid tessellation of a height field
//!
//! A mesh at LOD `L` visits every `increment`-th row and column of the
//! height field, where `increment = 1` for LOD 0 and `2 * L` otherwise.
//! The grid is centered on the chunk origin with rows running toward -Z,
//! and UVs always span `[0, 1]` regardless of LOD.

use std::io::Write;

use crate::core::types::{Vec2, Vec3};
use crate::core::{Error, Result};
use crate::terrain::{HeightCurve, HeightField};

/// Immutable triangle mesh
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    /// Vertices along the X axis
    pub width: usize,
    /// Vertices along the Z axis
    pub depth: usize,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Positions as raw bytes for buffer upload
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// UVs as raw bytes for buffer upload
    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    /// Indices as raw bytes for buffer upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Face normal of triangle `t` (not normalized)
    pub fn face_normal(&self, t: usize) -> Vec3 {
        let i = t * 3;
        let a = self.positions[self.indices[i] as usize];
        let b = self.positions[self.indices[i + 1] as usize];
        let c = self.positions[self.indices[i + 2] as usize];
        (b - a).cross(c - a)
    }

    /// Smooth per-vertex normals accumulated from adjacent faces
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for t in 0..self.triangle_count() {
            let n = self.face_normal(t);
            for k in 0..3 {
                normals[self.indices[t * 3 + k] as usize] += n;
            }
        }
        for n in &mut normals {
            let unit = n.normalize_or_zero();
            *n = if unit == Vec3::ZERO { Vec3::Y } else { unit };
        }
        normals
    }

    /// Write as Wavefront OBJ with positions, UVs and smooth normals
    pub fn write_obj<W: Write>(&self, mut out: W) -> Result<()> {
        for p in &self.positions {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for uv in &self.uvs {
            writeln!(out, "vt {} {}", uv.x, uv.y)?;
        }
        for n in self.vertex_normals() {
            writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
        }
        // OBJ indices are 1-based
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] + 1, tri[1] + 1, tri[2] + 1];
            writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Row/column step for a LOD level
pub fn lod_increment(lod: u32) -> usize {
    if lod == 0 { 1 } else { lod as usize * 2 }
}

/// Vertices per axis for a side of `size` samples at `lod`
pub fn vertices_per_line(size: usize, lod: u32) -> usize {
    (size.max(1) - 1) / lod_increment(lod) + 1
}

/// Reject LOD levels whose increment does not evenly divide `size - 1`
pub fn validate_lod(size: usize, lod: u32) -> Result<()> {
    let increment = lod_increment(lod);
    let span = size.max(1) - 1;
    if span % increment != 0 {
        return Err(Error::Config(format!(
            "LOD {} uses increment {} which does not divide side length {} - 1",
            lod, increment, size
        )));
    }
    Ok(())
}

/// Build the mesh for `heights` at `lod`.
///
/// Each visited sample is remapped through `curve` and scaled by
/// `height_multiplier`. Fails if the LOD increment does not evenly cover
/// either axis of the field.
pub fn build_terrain_mesh(
    heights: &HeightField,
    curve: &HeightCurve,
    height_multiplier: f32,
    lod: u32,
) -> Result<MeshData> {
    let width = heights.width();
    let depth = heights.height();
    if width == 0 || depth == 0 {
        return Err(Error::Generation("cannot mesh an empty height field".into()));
    }
    validate_lod(width, lod)?;
    validate_lod(depth, lod)?;

    let increment = lod_increment(lod);
    let verts_x = vertices_per_line(width, lod);
    let verts_z = vertices_per_line(depth, lod);

    let top_left_x = (width - 1) as f32 / -2.0;
    let top_left_z = (depth - 1) as f32 / 2.0;
    let uv_span_x = (width - 1).max(1) as f32;
    let uv_span_z = (depth - 1).max(1) as f32;

    let mut positions = Vec::with_capacity(verts_x * verts_z);
    let mut uvs = Vec::with_capacity(verts_x * verts_z);
    let quads = (verts_x - 1) * (verts_z - 1);
    let mut indices = Vec::with_capacity(quads * 6);

    for (row, y) in (0..depth).step_by(increment).enumerate() {
        for (col, x) in (0..width).step_by(increment).enumerate() {
            let h = curve.evaluate(heights[(x, y)]) * height_multiplier;
            positions.push(Vec3::new(top_left_x + x as f32, h, top_left_z - y as f32));
            uvs.push(Vec2::new(x as f32 / uv_span_x, y as f32 / uv_span_z));

            if col + 1 < verts_x && row + 1 < verts_z {
                let i = (row * verts_x + col) as u32;
                let w = verts_x as u32;
                indices.extend_from_slice(&[i, i + w + 1, i + w]);
                indices.extend_from_slice(&[i + w + 1, i, i + 1]);
            }
        }
    }

    Ok(MeshData {
        positions,
        uvs,
        indices,
        width: verts_x,
        depth: verts_z,
    })
}
