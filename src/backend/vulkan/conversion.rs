//! Type conversions between upload types and Vulkan types.

use ash::vk;
use gpu_allocator::MemoryLocation;

use crate::backend::types::{Access, BufferUsage, ImageLayout, PipelineStage, Residency, TextureFormat};
use crate::upload::InterleavedVertex;

/// Convert BufferUsage flags to Vulkan buffer usage flags.
pub fn convert_buffer_usage(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut result = vk::BufferUsageFlags::empty();

    if usage.contains(BufferUsage::VERTEX) {
        result |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        result |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::COPY_SRC) {
        result |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        result |= vk::BufferUsageFlags::TRANSFER_DST;
    }

    result
}

pub fn convert_residency(residency: Residency) -> MemoryLocation {
    match residency {
        Residency::DeviceLocal => MemoryLocation::GpuOnly,
        Residency::HostToDevice => MemoryLocation::CpuToGpu,
    }
}

pub fn convert_texture_format(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
    }
}

pub fn convert_access(access: Access) -> vk::AccessFlags {
    match access {
        Access::TransferWrite => vk::AccessFlags::TRANSFER_WRITE,
        Access::VertexAttributeRead => vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
        Access::IndexRead => vk::AccessFlags::INDEX_READ,
    }
}

pub fn convert_pipeline_stage(stage: PipelineStage) -> vk::PipelineStageFlags {
    match stage {
        PipelineStage::Transfer => vk::PipelineStageFlags::TRANSFER,
        PipelineStage::VertexInput => vk::PipelineStageFlags::VERTEX_INPUT,
    }
}

pub fn convert_image_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }
}

/// Vertex input binding and attributes for [`InterleavedVertex`] at binding 0.
pub fn vertex_input_description() -> (
    vk::VertexInputBindingDescription,
    [vk::VertexInputAttributeDescription; 3],
) {
    let binding = vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(InterleavedVertex::STRIDE)
        .input_rate(vk::VertexInputRate::VERTEX);

    let attributes = InterleavedVertex::ATTRIBUTES.map(|attribute| {
        let format = match attribute.components {
            2 => vk::Format::R32G32_SFLOAT,
            _ => vk::Format::R32G32B32_SFLOAT,
        };
        vk::VertexInputAttributeDescription::default()
            .binding(0)
            .location(attribute.location)
            .format(format)
            .offset(attribute.offset)
    });

    (binding, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_conversion() {
        let flags = convert_buffer_usage(BufferUsage::INDEX | BufferUsage::COPY_DST);
        assert_eq!(
            flags,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
        );
    }

    #[test]
    fn test_vertex_input_description() {
        let (binding, attributes) = vertex_input_description();
        assert_eq!(binding.stride, 32);
        assert_eq!(attributes.map(|a| a.offset), [0, 12, 24]);
        assert_eq!(attributes[2].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attributes[1].format, vk::Format::R32G32B32_SFLOAT);
    }
}
