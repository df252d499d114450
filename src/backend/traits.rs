//! Core backend abstraction traits
//!
//! [`UploadBackend`] is the contract the upload pipeline consumes. Device
//! bring-up, allocator internals, descriptor pool/layout creation and sampler
//! creation stay with whoever constructs the backend.

use std::ops::DerefMut;
use std::path::Path;

use crate::backend::types::*;
use crate::error::{StatusCode, UploadResult};

/// Services the upload pipeline needs from a GPU backend.
///
/// All methods take `&self`; backends synchronize their internal state
/// themselves. Resources are plain owned values: whoever holds one is
/// responsible for handing it back to the matching `destroy_*` call.
pub trait UploadBackend {
    type Buffer;
    /// Host view of a mapped buffer. Dropping it releases the borrow, after
    /// which [`UploadBackend::unmap_buffer`] may be called.
    type Mapping<'m>: DerefMut<Target = [u8]>
    where
        Self: 'm;
    type CommandPool;
    type CommandBuffer: Copy;
    type Fence;
    type Image;
    type ImageView;
    type DescriptorSet: Copy;
    type DescriptorPool;
    type DescriptorSetLayout;
    type Sampler;

    /// Get the backend name.
    fn name(&self) -> &'static str;

    // Buffer allocation

    /// Allocate a buffer. Fails with [`UploadError::Allocation`](crate::UploadError::Allocation).
    fn create_buffer(&self, desc: &BufferDescriptor) -> UploadResult<Self::Buffer>;

    /// Destroy a buffer and free its memory.
    fn destroy_buffer(&self, buffer: Self::Buffer);

    /// Size of a buffer in bytes.
    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    // Memory mapping

    /// Map a host-visible buffer. Fails with [`UploadError::MemoryMap`](crate::UploadError::MemoryMap).
    fn map_buffer<'m>(&'m self, buffer: &'m mut Self::Buffer) -> UploadResult<Self::Mapping<'m>>;

    /// Unmap a buffer previously mapped with [`UploadBackend::map_buffer`].
    fn unmap_buffer(&self, buffer: &mut Self::Buffer);

    // Command submission

    /// Create a transient command pool on the graphics queue family.
    fn create_command_pool(&self) -> UploadResult<Self::CommandPool>;

    /// Destroy a command pool, freeing every command buffer allocated from it.
    fn destroy_command_pool(&self, pool: Self::CommandPool);

    /// Allocate one primary command buffer.
    fn allocate_command_buffer(&self, pool: &Self::CommandPool)
        -> UploadResult<Self::CommandBuffer>;

    /// Begin a one-time-submit recording.
    fn begin_command_buffer(&self, cmd: Self::CommandBuffer) -> UploadResult<()>;

    /// Record a whole-range copy of `size` bytes from `src` to `dst`.
    fn cmd_copy_buffer(
        &self,
        cmd: Self::CommandBuffer,
        src: &Self::Buffer,
        dst: &Self::Buffer,
        size: u64,
    );

    /// Record a memory barrier covering the whole of `buffer`.
    fn cmd_buffer_barrier(
        &self,
        cmd: Self::CommandBuffer,
        buffer: &Self::Buffer,
        barrier: &BufferBarrier,
    );

    /// End recording.
    fn end_command_buffer(&self, cmd: Self::CommandBuffer) -> UploadResult<()>;

    /// Submit a recorded command buffer to the graphics queue, signaling `fence`
    /// on completion.
    fn submit(&self, cmd: Self::CommandBuffer, fence: &Self::Fence) -> UploadResult<()>;

    // Fences

    /// Create an unsignaled fence.
    fn create_fence(&self) -> UploadResult<Self::Fence>;

    /// Block the calling thread until `fence` signals or `timeout_ns` elapses.
    fn wait_fence(&self, fence: &Self::Fence, timeout_ns: u64) -> UploadResult<()>;

    /// Destroy a fence.
    fn destroy_fence(&self, fence: Self::Fence);

    // Images

    /// Decode a 2D texture from `path` and upload it into a device-local image
    /// left in the shader-read-only layout.
    fn load_texture_2d(&self, path: &Path, format: TextureFormat) -> UploadResult<Self::Image>;

    /// Destroy an image and free its memory.
    fn destroy_image(&self, image: Self::Image);

    /// Create a 2D shader-readable view over `image`.
    ///
    /// Returns the raw status on failure; the caller knows which texture the
    /// view was for.
    fn create_image_view(
        &self,
        image: &Self::Image,
        format: TextureFormat,
    ) -> Result<Self::ImageView, StatusCode>;

    /// Destroy an image view.
    fn destroy_image_view(&self, view: Self::ImageView);

    // Descriptors

    /// Allocate one descriptor set from `pool` with `layout`.
    fn allocate_descriptor_set(
        &self,
        pool: &Self::DescriptorPool,
        layout: &Self::DescriptorSetLayout,
    ) -> UploadResult<Self::DescriptorSet>;

    /// Point `binding` of `set` at a combined image sampler.
    fn write_combined_image_sampler(
        &self,
        set: Self::DescriptorSet,
        binding: u32,
        view: &Self::ImageView,
        sampler: &Self::Sampler,
        layout: ImageLayout,
    );
}
