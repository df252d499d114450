//! Vulkan upload backend via ash
//!
//! Device bring-up stays with the caller: the backend borrows an existing
//! logical device, graphics queue and shared gpu-allocator instance. Buffers
//! and images own their allocation and are freed back to the allocator when
//! destroyed.

mod allocator;
mod conversion;
mod texture;

pub use allocator::create_allocator;
pub use conversion::vertex_input_description;

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;

use crate::backend::traits::UploadBackend;
use crate::backend::types::*;
use crate::error::{CommandStage, FenceOperation, StatusCode, UploadError, UploadResult};

use conversion::{
    convert_access, convert_buffer_usage, convert_pipeline_stage, convert_residency,
    convert_texture_format,
};

/// Vulkan buffer with its memory allocation
pub struct VulkanBuffer {
    buffer: vk::Buffer,
    allocation: Allocation,
    size: u64,
    label: String,
}

impl VulkanBuffer {
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl std::fmt::Debug for VulkanBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBuffer")
            .field("buffer", &self.buffer)
            .field("size", &self.size)
            .field("label", &self.label)
            .finish()
    }
}

/// Vulkan image with its memory allocation
pub struct VulkanImage {
    image: vk::Image,
    allocation: Allocation,
    extent: vk::Extent3D,
    format: vk::Format,
}

impl VulkanImage {
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl std::fmt::Debug for VulkanImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanImage")
            .field("image", &self.image)
            .field("extent", &self.extent)
            .field("format", &self.format)
            .finish()
    }
}

/// [`UploadBackend`] over an existing Vulkan device.
pub struct VulkanUploadBackend {
    device: ash::Device,
    graphics_queue: Mutex<vk::Queue>,
    graphics_queue_family: u32,
    allocator: Arc<Mutex<Allocator>>,
}

impl VulkanUploadBackend {
    pub fn new(
        device: ash::Device,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        allocator: Arc<Mutex<Allocator>>,
    ) -> Self {
        Self {
            device,
            graphics_queue: Mutex::new(graphics_queue),
            graphics_queue_family,
            allocator,
        }
    }

    /// Get the device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the graphics queue family index.
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Get the shared memory allocator.
    pub fn allocator(&self) -> Arc<Mutex<Allocator>> {
        Arc::clone(&self.allocator)
    }

    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation, gpu_allocator::AllocationError> {
        self.allocator.lock().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
    }

    fn free(&self, allocation: Allocation) {
        if let Err(e) = self.allocator.lock().free(allocation) {
            log::error!("Failed to free allocation: {}", e);
        }
    }

    fn command_error(stage: CommandStage, result: vk::Result) -> UploadError {
        UploadError::CommandSubmission {
            stage,
            code: status(result),
        }
    }
}

pub(crate) fn status(result: vk::Result) -> StatusCode {
    StatusCode(result.as_raw())
}

impl UploadBackend for VulkanUploadBackend {
    type Buffer = VulkanBuffer;
    type Mapping<'m>
        = &'m mut [u8]
    where
        Self: 'm;
    type CommandPool = vk::CommandPool;
    type CommandBuffer = vk::CommandBuffer;
    type Fence = vk::Fence;
    type Image = VulkanImage;
    type ImageView = vk::ImageView;
    type DescriptorSet = vk::DescriptorSet;
    type DescriptorPool = vk::DescriptorPool;
    type DescriptorSetLayout = vk::DescriptorSetLayout;
    type Sampler = vk::Sampler;

    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> UploadResult<VulkanBuffer> {
        let label = desc.label_or("buffer");
        let allocation_error = |reason: String| UploadError::Allocation {
            label: label.to_string(),
            size: desc.size,
            residency: desc.residency,
            reason,
        };

        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(convert_buffer_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&buffer_info, None) }
            .map_err(|e| allocation_error(format!("failed to create buffer: {:?}", e)))?;

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let allocation = match self.allocate(label, requirements, convert_residency(desc.residency), true) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(allocation_error(e.to_string()));
            }
        };

        let bound = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            self.free(allocation);
            unsafe { self.device.destroy_buffer(buffer, None) };
            return Err(allocation_error(format!("failed to bind buffer memory: {:?}", e)));
        }

        log::trace!(
            "Vulkan: created buffer {} ({} bytes, {:?})",
            label,
            desc.size,
            desc.residency
        );
        Ok(VulkanBuffer {
            buffer,
            allocation,
            size: desc.size,
            label: label.to_string(),
        })
    }

    fn destroy_buffer(&self, buffer: VulkanBuffer) {
        log::trace!("Vulkan: destroying buffer {}", buffer.label);
        unsafe { self.device.destroy_buffer(buffer.buffer, None) };
        self.free(buffer.allocation);
    }

    fn buffer_size(&self, buffer: &VulkanBuffer) -> u64 {
        buffer.size
    }

    fn map_buffer<'m>(&'m self, buffer: &'m mut VulkanBuffer) -> UploadResult<&'m mut [u8]> {
        // gpu-allocator keeps host-visible memory persistently mapped.
        let VulkanBuffer {
            allocation, label, ..
        } = buffer;
        allocation
            .mapped_slice_mut()
            .ok_or_else(|| UploadError::MemoryMap {
                label: label.clone(),
                code: StatusCode::MEMORY_MAP_FAILED,
            })
    }

    fn unmap_buffer(&self, _buffer: &mut VulkanBuffer) {
        // CpuToGpu memory is host-coherent; nothing to flush.
    }

    fn create_command_pool(&self) -> UploadResult<vk::CommandPool> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);

        unsafe { self.device.create_command_pool(&pool_info, None) }
            .map_err(|e| Self::command_error(CommandStage::CreatePool, e))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn allocate_command_buffer(&self, pool: &vk::CommandPool) -> UploadResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| Self::command_error(CommandStage::AllocateBuffer, e))?;
        buffers.first().copied().ok_or(UploadError::CommandSubmission {
            stage: CommandStage::AllocateBuffer,
            code: StatusCode::OUT_OF_HOST_MEMORY,
        })
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> UploadResult<()> {
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(cmd, &begin_info) }
            .map_err(|e| Self::command_error(CommandStage::Begin, e))
    }

    fn cmd_copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: &VulkanBuffer,
        dst: &VulkanBuffer,
        size: u64,
    ) {
        let region = vk::BufferCopy::default().size(size);
        unsafe {
            self.device
                .cmd_copy_buffer(cmd, src.buffer, dst.buffer, &[region])
        };
    }

    fn cmd_buffer_barrier(
        &self,
        cmd: vk::CommandBuffer,
        buffer: &VulkanBuffer,
        barrier: &BufferBarrier,
    ) {
        let buffer_barrier = vk::BufferMemoryBarrier::default()
            .src_access_mask(convert_access(barrier.src_access))
            .dst_access_mask(convert_access(barrier.dst_access))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(buffer.buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE);

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                convert_pipeline_stage(barrier.src_stage),
                convert_pipeline_stage(barrier.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[buffer_barrier],
                &[],
            );
        }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> UploadResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
            .map_err(|e| Self::command_error(CommandStage::End, e))
    }

    fn submit(&self, cmd: vk::CommandBuffer, fence: &vk::Fence) -> UploadResult<()> {
        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        let queue = self.graphics_queue.lock();
        unsafe { self.device.queue_submit(*queue, &[submit_info], *fence) }
            .map_err(|e| Self::command_error(CommandStage::Submit, e))
    }

    fn create_fence(&self) -> UploadResult<vk::Fence> {
        unsafe { self.device.create_fence(&vk::FenceCreateInfo::default(), None) }.map_err(|e| {
            UploadError::SyncWait {
                operation: FenceOperation::Create,
                code: status(e),
            }
        })
    }

    fn wait_fence(&self, fence: &vk::Fence, timeout_ns: u64) -> UploadResult<()> {
        unsafe { self.device.wait_for_fences(&[*fence], true, timeout_ns) }.map_err(|e| {
            UploadError::SyncWait {
                operation: FenceOperation::Wait,
                code: status(e),
            }
        })
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn load_texture_2d(&self, path: &Path, format: TextureFormat) -> UploadResult<VulkanImage> {
        let texture = crate::resources::TextureData::from_file(path, format)
            .map_err(|source| UploadError::image_load(path, source))?;
        self.upload_texture(&texture, format)
    }

    fn destroy_image(&self, image: VulkanImage) {
        unsafe { self.device.destroy_image(image.image, None) };
        self.free(image.allocation);
    }

    fn create_image_view(
        &self,
        image: &VulkanImage,
        format: TextureFormat,
    ) -> Result<vk::ImageView, StatusCode> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(convert_texture_format(format))
            .subresource_range(texture::color_subresource_range());

        unsafe { self.device.create_image_view(&view_info, None) }.map_err(status)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn allocate_descriptor_set(
        &self,
        pool: &vk::DescriptorPool,
        layout: &vk::DescriptorSetLayout,
    ) -> UploadResult<vk::DescriptorSet> {
        let layouts = [*layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(*pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(|e| UploadError::DescriptorAlloc { code: status(e) })?;
        sets.first().copied().ok_or(UploadError::DescriptorAlloc {
            code: StatusCode::OUT_OF_POOL_MEMORY,
        })
    }

    fn write_combined_image_sampler(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        view: &vk::ImageView,
        sampler: &vk::Sampler,
        layout: ImageLayout,
    ) {
        let image_info = [vk::DescriptorImageInfo::default()
            .sampler(*sampler)
            .image_view(*view)
            .image_layout(conversion::convert_image_layout(layout))];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);

        unsafe { self.device.update_descriptor_sets(&[write], &[]) };
    }
}
