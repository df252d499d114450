//! Attribute interleaving
//!
//! Flattens one mesh's vertex range into the fixed `position, color, texcoord`
//! layout the renderer's vertex input expects, plus a sequential index list.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::resources::{SourceMesh, SourceModel};

/// Floats per interleaved vertex: 3 position, 3 color, 2 texcoord.
pub const FLOATS_PER_VERTEX: usize = 8;

/// One interleaved vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InterleavedVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub texcoord: [f32; 2],
}

/// One vertex attribute of [`InterleavedVertex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u32,
    pub components: u32,
}

impl InterleavedVertex {
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            location: 0,
            offset: 0,
            components: 3,
        },
        VertexAttribute {
            location: 1,
            offset: 12,
            components: 3,
        },
        VertexAttribute {
            location: 2,
            offset: 24,
            components: 2,
        },
    ];
}

/// Interleaved vertex data for one mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterleavedVertexBlock {
    floats: Vec<f32>,
}

impl InterleavedVertexBlock {
    pub fn as_floats(&self) -> &[f32] {
        &self.floats
    }

    pub fn vertices(&self) -> &[InterleavedVertex] {
        bytemuck::cast_slice(&self.floats)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.floats)
    }

    pub fn vertex_count(&self) -> usize {
        self.floats.len() / FLOATS_PER_VERTEX
    }

    pub fn is_empty(&self) -> bool {
        self.floats.is_empty()
    }
}

/// Sequential indices `0..count` for one mesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexBlock {
    indices: Vec<u32>,
}

impl IndexBlock {
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Build the vertex and index blocks for `mesh`.
///
/// # Panics
///
/// Panics if the mesh's range runs past its position pool, past the texcoord
/// pool for a textured mesh, or if its material index is out of range. Use
/// [`SourceModel::validate`] to reject such models up front.
pub fn interleave_mesh(model: &SourceModel, mesh: &SourceMesh) -> (InterleavedVertexBlock, IndexBlock) {
    let positions = model.positions_for(mesh);
    let end = mesh.vertex_end();
    assert!(
        end <= positions.len(),
        "mesh '{}' reads vertices {}..{} but its position pool holds {}",
        mesh.name,
        mesh.vertex_start,
        end,
        positions.len()
    );
    if mesh.textured {
        assert!(
            end <= model.textured.texcoords.len(),
            "mesh '{}' reads texcoords {}..{} but the pool holds {}",
            mesh.name,
            mesh.vertex_start,
            end,
            model.textured.texcoords.len()
        );
    }
    assert!(
        u32::try_from(mesh.vertex_count).is_ok(),
        "mesh '{}' has more vertices than a u32 index can address",
        mesh.name
    );

    let color = model.material(mesh).diffuse_color;
    let mut floats = Vec::with_capacity(mesh.vertex_count * FLOATS_PER_VERTEX);
    let mut indices = Vec::with_capacity(mesh.vertex_count);

    for (local, i) in (mesh.vertex_start..end).enumerate() {
        let texcoord = if mesh.textured {
            model.textured.texcoords[i]
        } else {
            Vec2::ZERO
        };
        floats.extend_from_slice(&positions[i].to_array());
        floats.extend_from_slice(&color.to_array());
        floats.extend_from_slice(&texcoord.to_array());
        indices.push(local as u32);
    }

    (InterleavedVertexBlock { floats }, IndexBlock { indices })
}
