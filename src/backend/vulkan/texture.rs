//! Sampled texture upload

use ash::vk;
use gpu_allocator::MemoryLocation;

use super::conversion::convert_texture_format;
use super::{VulkanImage, VulkanUploadBackend};
use crate::backend::traits::UploadBackend;
use crate::backend::types::{BufferDescriptor, BufferUsage, Residency, TextureFormat};
use crate::error::{StatusCode, UploadError, UploadResult};
use crate::resources::TextureData;
use crate::upload::Scoped;

pub(super) fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn layout_barrier(
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
}

impl VulkanUploadBackend {
    fn create_image(&self, texture: &TextureData, format: TextureFormat) -> UploadResult<VulkanImage> {
        let allocation_error = |reason: String| UploadError::Allocation {
            label: texture.name.clone(),
            size: texture.byte_len(),
            residency: Residency::DeviceLocal,
            reason,
        };

        let extent = vk::Extent3D {
            width: texture.width,
            height: texture.height,
            depth: 1,
        };
        let vk_format = convert_texture_format(format);
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .format(vk_format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { self.device.create_image(&image_info, None) }
            .map_err(|e| allocation_error(format!("failed to create image: {:?}", e)))?;

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let allocation = match self.allocate(&texture.name, requirements, MemoryLocation::GpuOnly, false) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(allocation_error(e.to_string()));
            }
        };

        let bound = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            self.free(allocation);
            unsafe { self.device.destroy_image(image, None) };
            return Err(allocation_error(format!("failed to bind image memory: {:?}", e)));
        }

        Ok(VulkanImage {
            image,
            allocation,
            extent,
            format: vk_format,
        })
    }

    /// Copy decoded texels into a new device-local image and leave it in the
    /// shader-read-only layout. Blocks until the copy has completed.
    pub(super) fn upload_texture(
        &self,
        texture: &TextureData,
        format: TextureFormat,
    ) -> UploadResult<VulkanImage> {
        let image = Scoped::new(self, self.create_image(texture, format)?, Self::destroy_image);

        let staging_desc = BufferDescriptor::new(
            texture.byte_len(),
            BufferUsage::COPY_SRC,
            Residency::HostToDevice,
        )
        .with_label(format!("{}.staging", texture.name));
        let mut staging = Scoped::new(self, self.create_buffer(&staging_desc)?, Self::destroy_buffer);
        {
            let mapping = self.map_buffer(&mut staging)?;
            if mapping.len() < texture.data.len() {
                return Err(UploadError::MemoryMap {
                    label: staging_desc.label_or("staging").to_string(),
                    code: StatusCode::MEMORY_MAP_FAILED,
                });
            }
            mapping[..texture.data.len()].copy_from_slice(&texture.data);
        }
        self.unmap_buffer(&mut staging);

        let fence = Scoped::new(self, self.create_fence()?, Self::destroy_fence);
        let pool = Scoped::new(self, self.create_command_pool()?, Self::destroy_command_pool);
        let cmd = self.allocate_command_buffer(&pool)?;
        self.begin_command_buffer(cmd)?;

        let to_transfer = layout_barrier(
            image.image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
        );
        let region = vk::BufferImageCopy::default()
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_extent(image.extent);
        let to_shader_read = layout_barrier(
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
        );

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );
            self.device.cmd_copy_buffer_to_image(
                cmd,
                staging.handle(),
                image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
            self.device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader_read],
            );
        }

        self.end_command_buffer(cmd)?;
        self.submit(cmd, &fence)?;
        if let Err(err) = self.wait_fence(&fence, u64::MAX) {
            if err.status_code() == Some(StatusCode::TIMEOUT) {
                staging.leak();
                image.leak();
                pool.leak();
                fence.leak();
            }
            return Err(err);
        }

        log::trace!(
            "Vulkan: uploaded texture {} ({}x{})",
            texture.name,
            texture.width,
            texture.height
        );
        Ok(image.into_inner())
    }
}
