//! Model assembly
//!
//! Drives interleaving, staging, synchronization and texture binding for each
//! mesh of a [`SourceModel`] and collects the results into a
//! [`RenderableModel`].

use crate::backend::UploadBackend;
use crate::error::{ImageLoadError, UploadError, UploadResult};
use crate::resources::{RenderableMesh, RenderableModel, SourceMesh, SourceModel};
use crate::UploadConfig;

use super::binder::{bind_texture, DescriptorContext};
use super::interleave::interleave_mesh;
use super::scoped::Scoped;
use super::staging::{stage_buffer, BufferIntent};
use super::sync::UploadBatch;

/// Uploads source models through one backend.
pub struct ModelUploader<'a, B: UploadBackend> {
    backend: &'a B,
    descriptors: DescriptorContext<'a, B>,
    config: UploadConfig,
}

impl<'a, B: UploadBackend> ModelUploader<'a, B> {
    pub fn new(backend: &'a B, descriptors: DescriptorContext<'a, B>, config: UploadConfig) -> Self {
        Self {
            backend,
            descriptors,
            config,
        }
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload every mesh of `model`, in order.
    ///
    /// All or nothing: if any mesh fails, the meshes already uploaded are
    /// released and the error is returned.
    pub fn upload_model(&self, model: &SourceModel) -> UploadResult<RenderableModel<B>> {
        log::info!(
            "Uploading model: {} meshes, {} vertices, {} textured",
            model.meshes.len(),
            model.vertex_count(),
            model.textured_mesh_count()
        );

        let mut uploaded = RenderableModel::new();
        for (index, mesh) in model.meshes.iter().enumerate() {
            log::debug!(
                "Uploading mesh {}/{} '{}' ({} vertices)",
                index + 1,
                model.meshes.len(),
                mesh.name,
                mesh.vertex_count
            );
            match self.upload_mesh_labeled(model, mesh, &format!("mesh{index}")) {
                Ok(renderable) => uploaded.meshes.push(renderable),
                Err(err) => {
                    log::error!("Failed to upload mesh {} '{}': {}", index, mesh.name, err);
                    uploaded.release(self.backend);
                    return Err(err);
                }
            }
        }

        log::info!(
            "Uploaded {} meshes ({} indices)",
            uploaded.len(),
            uploaded.index_count()
        );
        Ok(uploaded)
    }

    /// Upload one mesh of `model`.
    pub fn upload_mesh(&self, model: &SourceModel, mesh: &SourceMesh) -> UploadResult<RenderableMesh<B>> {
        let prefix = match model.meshes.iter().position(|m| std::ptr::eq(m, mesh)) {
            Some(index) => format!("mesh{index}"),
            None => mesh.name.clone(),
        };
        self.upload_mesh_labeled(model, mesh, &prefix)
    }

    fn upload_mesh_labeled(
        &self,
        model: &SourceModel,
        mesh: &SourceMesh,
        prefix: &str,
    ) -> UploadResult<RenderableMesh<B>> {
        let backend = self.backend;

        let texture_path = if mesh.textured {
            match model.material(mesh).diffuse_texture() {
                Some(path) => Some(path),
                None => {
                    return Err(UploadError::image_load(
                        format!("<material '{}'>", model.material(mesh).name),
                        ImageLoadError::MissingPath,
                    ))
                }
            }
        } else {
            None
        };

        let (vertices, indices) = interleave_mesh(model, mesh);
        let label = |intent: BufferIntent| {
            self.config
                .debug_labels
                .then(|| format!("{prefix}.{}", intent.name()))
        };

        let vertex_transfer = stage_buffer(
            backend,
            BufferIntent::Vertex,
            vertices.as_bytes(),
            label(BufferIntent::Vertex).as_deref(),
        )?;
        let index_transfer = stage_buffer(
            backend,
            BufferIntent::Index,
            indices.as_bytes(),
            label(BufferIntent::Index).as_deref(),
        )?;

        let mut batch = UploadBatch::new(backend);
        batch.push(vertex_transfer);
        batch.push(index_transfer);
        let buffers = batch.submit_and_wait(self.config.fence_timeout_ns)?;
        let [vertex_buffer, index_buffer] = <[B::Buffer; 2]>::try_from(buffers)
            .unwrap_or_else(|_| unreachable!("one device buffer per staged transfer"));
        let vertex_buffer = Scoped::new(backend, vertex_buffer, B::destroy_buffer);
        let index_buffer = Scoped::new(backend, index_buffer, B::destroy_buffer);

        let texture = match texture_path {
            Some(path) => Some(bind_texture(
                backend,
                self.descriptors,
                path,
                self.config.texture_format,
            )?),
            None => None,
        };

        Ok(RenderableMesh {
            name: mesh.name.clone(),
            vertex_buffer: vertex_buffer.into_inner(),
            index_buffer: index_buffer.into_inner(),
            index_count: indices.count(),
            texture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyEvent, ResourceKind};
    use crate::backend::DummyBackend;
    use crate::resources::{AttributePool, Material, TextureData};
    use glam::{Vec2, Vec3};

    fn quad_and_line() -> SourceModel {
        SourceModel {
            meshes: vec![
                SourceMesh::new("quad", 1, 0, 4).textured(),
                SourceMesh::new("line", 0, 0, 2),
            ],
            materials: vec![
                Material::new("plain"),
                Material::new("brick").with_diffuse_texture("brick.png"),
            ],
            textured: AttributePool {
                positions: vec![Vec3::ZERO; 4],
                texcoords: vec![Vec2::ONE; 4],
            },
            untextured: AttributePool {
                positions: vec![Vec3::X; 2],
                texcoords: Vec::new(),
            },
        }
    }

    #[test]
    fn test_labels_follow_mesh_index() {
        let backend =
            DummyBackend::new().with_texture("brick.png", TextureData::solid_color([9; 4], "brick"));
        let pool = backend.create_descriptor_pool(2);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();
        let uploader = ModelUploader::new(
            &backend,
            DescriptorContext::new(&pool, &layout, &sampler),
            UploadConfig::default(),
        );

        let model = uploader.upload_model(&quad_and_line()).unwrap();
        let labels: Vec<String> = backend
            .events()
            .into_iter()
            .filter_map(|e| match e {
                DummyEvent::BufferCreated { label, .. } => label,
                _ => None,
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                "mesh0.vertices",
                "mesh0.vertices.staging",
                "mesh0.indices",
                "mesh0.indices.staging",
                "mesh1.vertices",
                "mesh1.vertices.staging",
                "mesh1.indices",
                "mesh1.indices.staging",
            ]
        );
        model.release(&backend);
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn test_labels_disabled() {
        let backend = DummyBackend::new();
        let pool = backend.create_descriptor_pool(0);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();
        let uploader = ModelUploader::new(
            &backend,
            DescriptorContext::new(&pool, &layout, &sampler),
            UploadConfig::default().with_debug_labels(false),
        );

        let source = quad_and_line();
        let mesh = uploader.upload_mesh(&source, &source.meshes[1]).unwrap();
        assert!(backend
            .events()
            .iter()
            .all(|e| !matches!(e, DummyEvent::BufferCreated { label: Some(_), .. })));
        mesh.release(&backend);
    }

    #[test]
    fn test_missing_texture_path_fails_before_staging() {
        let backend = DummyBackend::new();
        let pool = backend.create_descriptor_pool(2);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();
        let uploader = ModelUploader::new(
            &backend,
            DescriptorContext::new(&pool, &layout, &sampler),
            UploadConfig::default(),
        );

        let mut source = quad_and_line();
        source.materials[1].diffuse_texture_path = None;
        let err = uploader.upload_model(&source).unwrap_err();

        assert!(matches!(
            err,
            UploadError::ImageLoad {
                source: ImageLoadError::MissingPath,
                ..
            }
        ));
        assert_eq!(backend.live_count(ResourceKind::Buffer), 0);
        assert!(backend.events().is_empty());
    }
}
