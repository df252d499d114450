//! Staged buffer transfers
//!
//! Device-local buffers can't be written by the host. Each payload is copied
//! into a host-visible staging buffer first; the GPU copy that moves it into
//! place is recorded later by [`UploadBatch`](super::UploadBatch).

use crate::backend::{
    Access, BufferBarrier, BufferDescriptor, BufferUsage, Residency, UploadBackend,
};
use crate::error::{StatusCode, UploadError, UploadResult};

use super::scoped::Scoped;

/// What a device-local buffer will be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferIntent {
    Vertex,
    Index,
}

impl BufferIntent {
    pub fn usage(self) -> BufferUsage {
        match self {
            Self::Vertex => BufferUsage::VERTEX | BufferUsage::COPY_DST,
            Self::Index => BufferUsage::INDEX | BufferUsage::COPY_DST,
        }
    }

    pub fn read_access(self) -> Access {
        match self {
            Self::Vertex => Access::VertexAttributeRead,
            Self::Index => Access::IndexRead,
        }
    }

    /// Barrier that must follow the copy into a buffer of this intent.
    pub fn barrier(self) -> BufferBarrier {
        BufferBarrier::transfer_to_vertex_input(self.read_access())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertices",
            Self::Index => "indices",
        }
    }
}

/// A filled staging buffer paired with its device-local destination.
///
/// Owns both buffers until the copy has completed. Dropping it releases both.
pub struct StagedTransfer<'a, B: UploadBackend> {
    intent: BufferIntent,
    size: u64,
    device: Scoped<'a, B, B::Buffer>,
    staging: Scoped<'a, B, B::Buffer>,
}

impl<'a, B: UploadBackend> StagedTransfer<'a, B> {
    pub fn intent(&self) -> BufferIntent {
        self.intent
    }

    /// Bytes to copy.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn device(&self) -> &B::Buffer {
        &self.device
    }

    pub fn staging(&self) -> &B::Buffer {
        &self.staging
    }

    /// Release the staging buffer and keep the destination.
    ///
    /// Only valid once the recorded copy has completed on the GPU.
    pub(crate) fn complete(self) -> B::Buffer {
        let Self {
            device, staging, ..
        } = self;
        drop(staging);
        device.into_inner()
    }

    /// Leak both buffers. Used when a submitted copy can't be proven finished.
    pub(crate) fn abandon(self) {
        self.staging.leak();
        self.device.leak();
    }
}

/// Allocate a device-local buffer for `intent` and a staging buffer holding
/// `payload`.
///
/// Nothing is recorded or submitted; the device buffer's contents are
/// undefined until the transfer is submitted and its fence has signaled.
pub fn stage_buffer<'a, B: UploadBackend>(
    backend: &'a B,
    intent: BufferIntent,
    payload: &[u8],
    label: Option<&str>,
) -> UploadResult<StagedTransfer<'a, B>> {
    let size = payload.len() as u64;
    let device_label = label.unwrap_or(intent.name());
    if size == 0 {
        return Err(UploadError::Allocation {
            label: device_label.to_string(),
            size,
            residency: Residency::DeviceLocal,
            reason: "cannot stage an empty payload".into(),
        });
    }

    let mut device_desc = BufferDescriptor::new(size, intent.usage(), Residency::DeviceLocal);
    let mut staging_desc =
        BufferDescriptor::new(size, BufferUsage::COPY_SRC, Residency::HostToDevice);
    if let Some(label) = label {
        device_desc = device_desc.with_label(label);
        staging_desc = staging_desc.with_label(format!("{label}.staging"));
    }

    let device = Scoped::new(backend, backend.create_buffer(&device_desc)?, B::destroy_buffer);
    let mut staging = Scoped::new(
        backend,
        backend.create_buffer(&staging_desc)?,
        B::destroy_buffer,
    );

    {
        let mut mapping = backend.map_buffer(&mut staging)?;
        if mapping.len() < payload.len() {
            return Err(UploadError::MemoryMap {
                label: staging_desc.label_or("staging buffer").to_string(),
                code: StatusCode::MEMORY_MAP_FAILED,
            });
        }
        mapping[..payload.len()].copy_from_slice(payload);
    }
    backend.unmap_buffer(&mut staging);

    log::debug!(
        "Staged {} bytes for {} ({:?})",
        size,
        device_label,
        intent
    );

    Ok(StagedTransfer {
        intent,
        size,
        device,
        staging,
    })
}
