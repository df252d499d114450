//! Upload error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::types::Residency;

/// Raw status code reported by the backend that produced an error.
///
/// For the Vulkan backend this is the `VkResult` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const NOT_READY: Self = Self(1);
    pub const TIMEOUT: Self = Self(2);
    pub const OUT_OF_HOST_MEMORY: Self = Self(-1);
    pub const OUT_OF_DEVICE_MEMORY: Self = Self(-2);
    pub const INITIALIZATION_FAILED: Self = Self(-3);
    pub const DEVICE_LOST: Self = Self(-4);
    pub const MEMORY_MAP_FAILED: Self = Self(-5);
    pub const FORMAT_NOT_SUPPORTED: Self = Self(-11);
    pub const OUT_OF_POOL_MEMORY: Self = Self(-1_000_069_000);

    /// Get the raw status value.
    pub fn raw(self) -> i32 {
        self.0
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::NOT_READY => "NOT_READY",
            Self::TIMEOUT => "TIMEOUT",
            Self::OUT_OF_HOST_MEMORY => "ERROR_OUT_OF_HOST_MEMORY",
            Self::OUT_OF_DEVICE_MEMORY => "ERROR_OUT_OF_DEVICE_MEMORY",
            Self::INITIALIZATION_FAILED => "ERROR_INITIALIZATION_FAILED",
            Self::DEVICE_LOST => "ERROR_DEVICE_LOST",
            Self::MEMORY_MAP_FAILED => "ERROR_MEMORY_MAP_FAILED",
            Self::FORMAT_NOT_SUPPORTED => "ERROR_FORMAT_NOT_SUPPORTED",
            Self::OUT_OF_POOL_MEMORY => "ERROR_OUT_OF_POOL_MEMORY",
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "status {}", self.0),
        }
    }
}

/// Step of the command submission protocol that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStage {
    CreatePool,
    AllocateBuffer,
    Begin,
    End,
    Submit,
}

impl fmt::Display for CommandStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreatePool => "creating command pool",
            Self::AllocateBuffer => "allocating command buffer",
            Self::Begin => "beginning command buffer recording",
            Self::End => "ending command buffer recording",
            Self::Submit => "submitting commands",
        };
        f.write_str(s)
    }
}

/// Fence operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceOperation {
    Create,
    Wait,
}

impl fmt::Display for FenceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("creation"),
            Self::Wait => f.write_str("wait"),
        }
    }
}

/// Reasons a texture could not be loaded into a sampled image.
#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("file not found")]
    NotFound,
    #[error("material has no diffuse texture path")]
    MissingPath,
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to create image view: {0}")]
    ViewCreation(StatusCode),
}

/// Errors raised by the upload pipeline and its backends.
///
/// Every variant is fatal to the current upload. Nothing is retried.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("failed to allocate {label} ({size} bytes, {residency:?}): {reason}")]
    Allocation {
        label: String,
        size: u64,
        residency: Residency,
        reason: String,
    },
    #[error("failed to map {label} for writing: {code}")]
    MemoryMap { label: String, code: StatusCode },
    #[error("command submission failed while {stage}: {code}")]
    CommandSubmission { stage: CommandStage, code: StatusCode },
    #[error("fence {operation} failed: {code}")]
    SyncWait {
        operation: FenceOperation,
        code: StatusCode,
    },
    #[error("failed to load texture {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: ImageLoadError,
    },
    #[error("failed to allocate descriptor set: {code}")]
    DescriptorAlloc { code: StatusCode },
}

impl UploadError {
    /// Status code of the originating backend call, if it reported one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Allocation { .. } => None,
            Self::MemoryMap { code, .. }
            | Self::CommandSubmission { code, .. }
            | Self::SyncWait { code, .. }
            | Self::DescriptorAlloc { code } => Some(*code),
            Self::ImageLoad {
                source: ImageLoadError::ViewCreation(code),
                ..
            } => Some(*code),
            Self::ImageLoad { .. } => None,
        }
    }

    pub(crate) fn image_load(path: impl Into<PathBuf>, source: ImageLoadError) -> Self {
        Self::ImageLoad {
            path: path.into(),
            source,
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Inconsistencies found by [`SourceModel::validate`](crate::resources::SourceModel::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("mesh {mesh} references material {material}, but only {available} exist")]
    MissingMaterial {
        mesh: usize,
        material: usize,
        available: usize,
    },
    #[error("mesh {mesh} reads {pool} up to vertex {end}, but the pool holds {len}")]
    RangeOutOfBounds {
        mesh: usize,
        pool: &'static str,
        end: usize,
        len: usize,
    },
}
