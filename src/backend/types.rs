//! Common types shared between backends

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    Rgba8Unorm,
    #[default]
    Rgba8UnormSrgb,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => 4,
        }
    }

    pub fn is_srgb(&self) -> bool {
        matches!(self, TextureFormat::Rgba8UnormSrgb)
    }
}

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferUsage(u32);

impl BufferUsage {
    pub const COPY_SRC: Self = Self(1 << 0);
    pub const COPY_DST: Self = Self(1 << 1);
    pub const INDEX: Self = Self(1 << 2);
    pub const VERTEX: Self = Self(1 << 3);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Where a buffer's memory should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Residency {
    /// GPU-optimal memory, not visible to the host. Populated by copies.
    DeviceLocal,
    /// Host-visible memory used as a transfer source.
    HostToDevice,
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
    pub residency: Residency,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage, residency: Residency) -> Self {
        Self {
            label: None,
            size,
            usage,
            residency,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(fallback)
    }
}

/// Memory access scope on one side of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    TransferWrite,
    VertexAttributeRead,
    IndexRead,
}

/// Pipeline stage on one side of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Transfer,
    VertexInput,
}

/// A whole-buffer memory barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBarrier {
    pub src_access: Access,
    pub dst_access: Access,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
}

impl BufferBarrier {
    /// Makes a completed transfer write visible to vertex input reads.
    pub fn transfer_to_vertex_input(dst_access: Access) -> Self {
        Self {
            src_access: Access::TransferWrite,
            dst_access,
            src_stage: PipelineStage::Transfer,
            dst_stage: PipelineStage::VertexInput,
        }
    }
}

/// Image layout a combined image sampler is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    ShaderReadOnly,
}
