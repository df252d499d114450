//! Texture descriptor binding

use std::path::Path;

use crate::backend::{ImageLayout, TextureFormat, UploadBackend};
use crate::error::{ImageLoadError, UploadError, UploadResult};
use crate::resources::BoundTexture;

use super::scoped::Scoped;

/// Binding slot of the diffuse texture in the per-mesh descriptor set.
pub const DIFFUSE_TEXTURE_BINDING: u32 = 0;

/// Descriptor resources owned by the caller and shared by every mesh.
pub struct DescriptorContext<'c, B: UploadBackend> {
    pub pool: &'c B::DescriptorPool,
    pub layout: &'c B::DescriptorSetLayout,
    pub sampler: &'c B::Sampler,
}

impl<'c, B: UploadBackend> DescriptorContext<'c, B> {
    pub fn new(
        pool: &'c B::DescriptorPool,
        layout: &'c B::DescriptorSetLayout,
        sampler: &'c B::Sampler,
    ) -> Self {
        Self {
            pool,
            layout,
            sampler,
        }
    }
}

impl<B: UploadBackend> Clone for DescriptorContext<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: UploadBackend> Copy for DescriptorContext<'_, B> {}

/// Load the texture at `path` and bind it into a freshly allocated set.
///
/// The set is allocated last; a load or view failure never consumes pool
/// space, and an allocation failure releases the view and image.
pub fn bind_texture<B: UploadBackend>(
    backend: &B,
    descriptors: DescriptorContext<'_, B>,
    path: &Path,
    format: TextureFormat,
) -> UploadResult<BoundTexture<B>> {
    let image = Scoped::new(
        backend,
        backend.load_texture_2d(path, format)?,
        B::destroy_image,
    );
    let view = backend
        .create_image_view(&image, format)
        .map_err(|code| UploadError::image_load(path, ImageLoadError::ViewCreation(code)))?;
    let view = Scoped::new(backend, view, B::destroy_image_view);

    let descriptor_set = backend.allocate_descriptor_set(descriptors.pool, descriptors.layout)?;
    backend.write_combined_image_sampler(
        descriptor_set,
        DIFFUSE_TEXTURE_BINDING,
        &view,
        descriptors.sampler,
        ImageLayout::ShaderReadOnly,
    );
    log::debug!("Bound texture {} ({:?})", path.display(), format);

    Ok(BoundTexture {
        view: view.into_inner(),
        image: image.into_inner(),
        descriptor_set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyFaults, ResourceKind};
    use crate::backend::DummyBackend;
    use crate::resources::TextureData;

    #[test]
    fn test_bind_writes_binding_zero() {
        let backend = DummyBackend::new()
            .with_texture("brick.png", TextureData::checkerboard(4, [255; 4], [0, 0, 0, 255]));
        let pool = backend.create_descriptor_pool(4);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();
        let descriptors = DescriptorContext::new(&pool, &layout, &sampler);

        let texture = bind_texture(
            &backend,
            descriptors,
            Path::new("brick.png"),
            TextureFormat::Rgba8UnormSrgb,
        )
        .unwrap();

        assert_eq!(texture.image.dimensions(), (4, 4));
        assert_eq!(
            backend.bound_combined_image_sampler(texture.descriptor_set, DIFFUSE_TEXTURE_BINDING),
            Some((texture.view.id(), sampler.id()))
        );
        texture.release(&backend);
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn test_missing_file_allocates_no_set() {
        let backend = DummyBackend::new();
        let pool = backend.create_descriptor_pool(4);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();

        let err = bind_texture(
            &backend,
            DescriptorContext::new(&pool, &layout, &sampler),
            Path::new("does/not/exist.png"),
            TextureFormat::Rgba8UnormSrgb,
        )
        .err()
        .unwrap();

        assert!(matches!(
            err,
            UploadError::ImageLoad {
                source: ImageLoadError::NotFound,
                ..
            }
        ));
        assert_eq!(backend.descriptor_sets_allocated(&pool), 0);
    }

    #[test]
    fn test_view_failure_releases_image() {
        let backend = DummyBackend::new()
            .with_texture("a.png", TextureData::solid_color([1, 2, 3, 4], "a"))
            .with_faults(DummyFaults {
                fail_image_view: true,
                ..Default::default()
            });
        let pool = backend.create_descriptor_pool(4);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();

        let err = bind_texture(
            &backend,
            DescriptorContext::new(&pool, &layout, &sampler),
            Path::new("a.png"),
            TextureFormat::Rgba8UnormSrgb,
        )
        .err()
        .unwrap();

        assert!(matches!(
            err,
            UploadError::ImageLoad {
                source: ImageLoadError::ViewCreation(_),
                ..
            }
        ));
        assert_eq!(backend.live_count(ResourceKind::Image), 0);
        assert_eq!(backend.descriptor_sets_allocated(&pool), 0);
    }

    #[test]
    fn test_exhausted_pool_releases_view_and_image() {
        let backend = DummyBackend::new()
            .with_texture("a.png", TextureData::solid_color([1, 2, 3, 4], "a"));
        let pool = backend.create_descriptor_pool(0);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();

        let err = bind_texture(
            &backend,
            DescriptorContext::new(&pool, &layout, &sampler),
            Path::new("a.png"),
            TextureFormat::Rgba8UnormSrgb,
        )
        .err()
        .unwrap();

        assert!(matches!(err, UploadError::DescriptorAlloc { .. }));
        assert_eq!(backend.live_total(), 0);
    }
}
