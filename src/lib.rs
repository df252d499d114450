//! Model Upload - moves CPU-side model data into GPU-resident, render-ready meshes
//!
//! The pipeline turns a [`SourceModel`] (shared position/texcoord pools,
//! per-mesh vertex ranges and materials) into a [`RenderableModel`]: one
//! device-local vertex buffer and index buffer per mesh, plus a sampled
//! texture and descriptor set for textured meshes.
//!
//! It is written against the [`UploadBackend`] trait. Two backends ship:
//! - **Vulkan**: via ash and gpu-allocator (feature `vulkan-backend`, on by default)
//! - **Dummy**: in-memory, for tests and headless tooling
//!
//! # Features
//! - Staged transfers into device-local memory with explicit barriers
//! - One fence-waited submission per mesh; staging memory is never freed early
//! - Scoped acquisition of every transient resource, on every exit path
//! - All-or-nothing model assembly

pub mod backend;
pub mod error;
pub mod resources;
pub mod upload;

use std::time::Duration;

pub use backend::{DummyBackend, TextureFormat, UploadBackend};
pub use error::{
    CommandStage, FenceOperation, ImageLoadError, ModelError, StatusCode, UploadError,
    UploadResult,
};
pub use resources::{
    AttributePool, BoundTexture, Material, RenderableMesh, RenderableModel, SourceMesh,
    SourceModel, TextureData,
};
pub use upload::{DescriptorContext, ModelUploader};

#[cfg(feature = "vulkan-backend")]
pub use backend::vulkan::VulkanUploadBackend;

/// Configuration for the upload pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Fence wait timeout in nanoseconds; `u64::MAX` waits indefinitely
    pub fence_timeout_ns: u64,
    /// Format textures are uploaded and viewed in
    pub texture_format: TextureFormat,
    /// Attach debug labels such as `mesh0.vertices` to buffers
    pub debug_labels: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            fence_timeout_ns: u64::MAX,
            texture_format: TextureFormat::Rgba8UnormSrgb,
            debug_labels: true,
        }
    }
}

impl UploadConfig {
    /// Saturates at `u64::MAX` nanoseconds.
    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_texture_format(mut self, format: TextureFormat) -> Self {
        self.texture_format = format;
        self
    }

    pub fn with_debug_labels(mut self, enabled: bool) -> Self {
        self.debug_labels = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.fence_timeout_ns, u64::MAX);
        assert_eq!(config.texture_format, TextureFormat::Rgba8UnormSrgb);
        assert!(config.debug_labels);
    }

    #[test]
    fn test_fence_timeout_builder() {
        let config = UploadConfig::default().with_fence_timeout(Duration::from_millis(5));
        assert_eq!(config.fence_timeout_ns, 5_000_000);

        let config = UploadConfig::default().with_fence_timeout(Duration::MAX);
        assert_eq!(config.fence_timeout_ns, u64::MAX);
    }
}
