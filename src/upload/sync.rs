//! Upload synchronization
//!
//! Records every pending staged copy into one command buffer, submits it and
//! blocks on a fence. Staging memory outlives the GPU's reads of it: the
//! transfers are only completed, and their staging buffers destroyed, once
//! the fence has signaled.

use crate::backend::UploadBackend;
use crate::error::{StatusCode, UploadResult};

use super::scoped::Scoped;
use super::staging::StagedTransfer;

/// Staged transfers waiting to be submitted together.
pub struct UploadBatch<'a, B: UploadBackend> {
    backend: &'a B,
    transfers: Vec<StagedTransfer<'a, B>>,
}

impl<'a, B: UploadBackend> UploadBatch<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            transfers: Vec::new(),
        }
    }

    pub fn push(&mut self, transfer: StagedTransfer<'a, B>) {
        self.transfers.push(transfer);
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Submit every copy and block until the GPU has finished them.
    ///
    /// Returns the device-local buffers in push order. On any error every
    /// buffer of the batch is released, except after a wait timeout: the GPU
    /// may still be reading, so the staging and device buffers, the command
    /// pool and the fence are leaked instead.
    pub fn submit_and_wait(self, timeout_ns: u64) -> UploadResult<Vec<B::Buffer>> {
        let backend = self.backend;
        if self.transfers.is_empty() {
            return Ok(Vec::new());
        }

        let fence = Scoped::new(backend, backend.create_fence()?, B::destroy_fence);
        let pool = Scoped::new(
            backend,
            backend.create_command_pool()?,
            B::destroy_command_pool,
        );
        let cmd = backend.allocate_command_buffer(&pool)?;

        backend.begin_command_buffer(cmd)?;
        for transfer in &self.transfers {
            backend.cmd_copy_buffer(cmd, transfer.staging(), transfer.device(), transfer.size());
            backend.cmd_buffer_barrier(cmd, transfer.device(), &transfer.intent().barrier());
        }
        backend.end_command_buffer(cmd)?;

        let bytes: u64 = self.transfers.iter().map(StagedTransfer::size).sum();
        log::debug!(
            "Submitting {} transfers ({} bytes) on {}",
            self.transfers.len(),
            bytes,
            backend.name()
        );
        backend.submit(cmd, &fence)?;

        if let Err(err) = backend.wait_fence(&fence, timeout_ns) {
            if err.status_code() == Some(StatusCode::TIMEOUT) {
                log::error!(
                    "Upload fence timed out after {} ns; leaking {} in-flight transfers",
                    timeout_ns,
                    self.transfers.len()
                );
                for transfer in self.transfers {
                    transfer.abandon();
                }
                pool.leak();
                fence.leak();
            }
            return Err(err);
        }

        Ok(self
            .transfers
            .into_iter()
            .map(StagedTransfer::complete)
            .collect())
    }
}

impl<B: UploadBackend> std::fmt::Debug for UploadBatch<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadBatch")
            .field("transfers", &self.transfers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyEvent, DummyFaults, ResourceKind};
    use crate::error::UploadError;
    use crate::backend::DummyBackend;
    use crate::upload::staging::{stage_buffer, BufferIntent};

    fn stage_pair(backend: &DummyBackend) -> UploadBatch<'_, DummyBackend> {
        let mut batch = UploadBatch::new(backend);
        batch.push(stage_buffer(backend, BufferIntent::Vertex, &[7; 32], None).unwrap());
        batch.push(stage_buffer(backend, BufferIntent::Index, &[1, 0, 0, 0], None).unwrap());
        batch
    }

    #[test]
    fn test_contents_arrive_after_wait() {
        let backend = DummyBackend::new();
        let buffers = stage_pair(&backend).submit_and_wait(u64::MAX).unwrap();

        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers[0].contents(), vec![7; 32]);
        assert_eq!(buffers[1].contents(), vec![1, 0, 0, 0]);
        assert!(backend.violations().is_empty());
        assert_eq!(backend.live_count(ResourceKind::Buffer), 2);
        assert_eq!(backend.live_count(ResourceKind::Fence), 0);
        assert_eq!(backend.live_count(ResourceKind::CommandPool), 0);
    }

    #[test]
    fn test_staging_destroyed_only_after_wait() {
        let backend = DummyBackend::new();
        let buffers = stage_pair(&backend).submit_and_wait(u64::MAX).unwrap();

        let events = backend.events();
        let signaled = events
            .iter()
            .position(|e| matches!(e, DummyEvent::FenceSignaled { .. }))
            .unwrap();
        let first_destroy = events
            .iter()
            .position(|e| matches!(e, DummyEvent::BufferDestroyed { .. }))
            .unwrap();
        assert!(signaled < first_destroy);
        drop(buffers);
    }

    #[test]
    fn test_submit_failure_releases_everything() {
        let backend = DummyBackend::new().with_faults(DummyFaults {
            fail_submit: true,
            ..Default::default()
        });
        let err = stage_pair(&backend).submit_and_wait(u64::MAX).unwrap_err();

        assert!(matches!(err, UploadError::CommandSubmission { .. }));
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn test_timeout_leaks_in_flight_resources() {
        let backend = DummyBackend::new().with_faults(DummyFaults {
            fail_fence_wait: Some(StatusCode::TIMEOUT),
            ..Default::default()
        });
        let err = stage_pair(&backend).submit_and_wait(1_000).unwrap_err();

        assert_eq!(err.status_code(), Some(StatusCode::TIMEOUT));
        assert_eq!(backend.live_count(ResourceKind::Buffer), 4);
        assert_eq!(backend.live_count(ResourceKind::Fence), 1);
    }

    #[test]
    fn test_device_lost_releases_everything() {
        let backend = DummyBackend::new().with_faults(DummyFaults {
            fail_fence_wait: Some(StatusCode::DEVICE_LOST),
            ..Default::default()
        });
        let err = stage_pair(&backend).submit_and_wait(u64::MAX).unwrap_err();

        assert!(matches!(err, UploadError::SyncWait { .. }));
        assert_eq!(backend.live_total(), 0);
    }
}
