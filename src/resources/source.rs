//! CPU-side model description consumed by the uploader.
//!
//! A [`SourceModel`] keeps two position pools: one shared by every textured
//! mesh and one shared by every untextured mesh. Texture coordinates live in a
//! third pool that runs parallel to the textured positions, so a textured mesh
//! reads both with the same vertex index.

use glam::{Vec2, Vec3};

use super::material::Material;
use crate::error::ModelError;

/// Positions (and, for the textured pool, texture coordinates) shared by meshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePool {
    pub positions: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
}

/// One mesh: a contiguous vertex range in one of the model's pools.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMesh {
    pub name: String,
    pub textured: bool,
    pub material_index: usize,
    pub vertex_start: usize,
    pub vertex_count: usize,
}

impl SourceMesh {
    pub fn new(name: &str, material_index: usize, vertex_start: usize, vertex_count: usize) -> Self {
        Self {
            name: name.to_string(),
            textured: false,
            material_index,
            vertex_start,
            vertex_count,
        }
    }

    pub fn textured(mut self) -> Self {
        self.textured = true;
        self
    }

    /// One past the last vertex this mesh reads.
    pub fn vertex_end(&self) -> usize {
        self.vertex_start + self.vertex_count
    }
}

/// Immutable input to the upload pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceModel {
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<Material>,
    pub textured: AttributePool,
    pub untextured: AttributePool,
}

impl SourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Material used by `mesh`.
    ///
    /// # Panics
    ///
    /// Panics if the mesh's material index is out of range.
    pub fn material(&self, mesh: &SourceMesh) -> &Material {
        &self.materials[mesh.material_index]
    }

    /// Position pool `mesh` reads from.
    pub fn positions_for(&self, mesh: &SourceMesh) -> &[Vec3] {
        if mesh.textured {
            &self.textured.positions
        } else {
            &self.untextured.positions
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertex_count).sum()
    }

    pub fn textured_mesh_count(&self) -> usize {
        self.meshes.iter().filter(|m| m.textured).count()
    }

    /// Check every mesh against the pools and the materials table.
    ///
    /// The uploader treats these as contract violations and panics on them;
    /// this lets a caller reject a bad model up front instead.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (index, mesh) in self.meshes.iter().enumerate() {
            if mesh.material_index >= self.materials.len() {
                return Err(ModelError::MissingMaterial {
                    mesh: index,
                    material: mesh.material_index,
                    available: self.materials.len(),
                });
            }

            let end = mesh.vertex_end();
            let (pool, len) = if mesh.textured {
                ("textured positions", self.textured.positions.len())
            } else {
                ("untextured positions", self.untextured.positions.len())
            };
            if end > len {
                return Err(ModelError::RangeOutOfBounds {
                    mesh: index,
                    pool,
                    end,
                    len,
                });
            }

            if mesh.textured && end > self.textured.texcoords.len() {
                return Err(ModelError::RangeOutOfBounds {
                    mesh: index,
                    pool: "texcoords",
                    end,
                    len: self.textured.texcoords.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_one_textured_quad() -> SourceModel {
        SourceModel {
            meshes: vec![SourceMesh::new("quad", 0, 0, 4).textured()],
            materials: vec![Material::new("brick").with_diffuse_texture("brick.png")],
            textured: AttributePool {
                positions: vec![Vec3::ZERO; 4],
                texcoords: vec![Vec2::ZERO; 4],
            },
            untextured: AttributePool::default(),
        }
    }

    #[test]
    fn test_validate_accepts_consistent_model() {
        assert_eq!(model_with_one_textured_quad().validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_missing_texcoords() {
        let mut model = model_with_one_textured_quad();
        model.textured.texcoords.truncate(3);
        assert_eq!(
            model.validate(),
            Err(ModelError::RangeOutOfBounds {
                mesh: 0,
                pool: "texcoords",
                end: 4,
                len: 3,
            })
        );
    }

    #[test]
    fn test_validate_reports_missing_material() {
        let mut model = model_with_one_textured_quad();
        model.meshes[0].material_index = 2;
        assert!(matches!(
            model.validate(),
            Err(ModelError::MissingMaterial { material: 2, .. })
        ));
    }

    #[test]
    fn test_untextured_mesh_reads_untextured_pool() {
        let mut model = model_with_one_textured_quad();
        model.untextured.positions = vec![Vec3::X; 2];
        model.meshes.push(SourceMesh::new("line", 0, 0, 2));

        assert_eq!(model.positions_for(&model.meshes[1]), &[Vec3::X, Vec3::X]);
        assert_eq!(model.vertex_count(), 6);
        assert_eq!(model.textured_mesh_count(), 1);
    }
}
