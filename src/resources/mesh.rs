//! GPU-resident meshes produced by the uploader

use crate::backend::UploadBackend;

/// A sampled texture bound into its own descriptor set.
///
/// The descriptor set is returned to its pool when the pool is reset or
/// destroyed; releasing a `BoundTexture` only destroys the view and image.
pub struct BoundTexture<B: UploadBackend> {
    pub image: B::Image,
    pub view: B::ImageView,
    pub descriptor_set: B::DescriptorSet,
}

impl<B: UploadBackend> BoundTexture<B> {
    /// Destroy the view, then the image it refers to.
    pub fn release(self, backend: &B) {
        backend.destroy_image_view(self.view);
        backend.destroy_image(self.image);
    }
}

/// A mesh whose vertex and index data live in device-local buffers
pub struct RenderableMesh<B: UploadBackend> {
    pub name: String,
    pub vertex_buffer: B::Buffer,
    pub index_buffer: B::Buffer,
    pub index_count: u32,
    /// Present iff the source mesh was textured.
    pub texture: Option<BoundTexture<B>>,
}

impl<B: UploadBackend> RenderableMesh<B> {
    pub fn is_textured(&self) -> bool {
        self.texture.is_some()
    }

    pub fn descriptor_set(&self) -> Option<B::DescriptorSet> {
        self.texture.as_ref().map(|t| t.descriptor_set)
    }

    /// Destroy every GPU resource owned by this mesh.
    ///
    /// The caller must ensure no submitted GPU work still references them.
    pub fn release(self, backend: &B) {
        if let Some(texture) = self.texture {
            texture.release(backend);
        }
        backend.destroy_buffer(self.index_buffer);
        backend.destroy_buffer(self.vertex_buffer);
    }
}

impl<B: UploadBackend> std::fmt::Debug for RenderableMesh<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderableMesh")
            .field("name", &self.name)
            .field("index_count", &self.index_count)
            .field("textured", &self.is_textured())
            .finish_non_exhaustive()
    }
}

/// Every mesh of a model, in source order
pub struct RenderableModel<B: UploadBackend> {
    pub meshes: Vec<RenderableMesh<B>>,
}

impl<B: UploadBackend> RenderableModel<B> {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderableMesh<B>> {
        self.meshes.iter()
    }

    /// Total number of indices across meshes
    pub fn index_count(&self) -> u64 {
        self.meshes.iter().map(|m| m.index_count as u64).sum()
    }

    /// Destroy every mesh's GPU resources, last mesh first.
    ///
    /// The caller must ensure no submitted GPU work still references them.
    pub fn release(self, backend: &B) {
        for mesh in self.meshes.into_iter().rev() {
            mesh.release(backend);
        }
    }
}

impl<B: UploadBackend> Default for RenderableModel<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: UploadBackend> std::fmt::Debug for RenderableModel<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderableModel")
            .field("meshes", &self.meshes)
            .finish()
    }
}
