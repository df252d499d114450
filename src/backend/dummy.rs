//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. Buffers are plain memory, commands are
//! recorded into lists, and submitted work only executes when its fence is
//! waited on, the way a real queue runs behind the host. Every call is
//! appended to an event log, and misuse that a validation layer would flag
//! (use of a destroyed buffer, copies without a following barrier, commands
//! recorded outside a recording) is collected as a violation instead of
//! crashing.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::backend::traits::UploadBackend;
use crate::backend::types::*;
use crate::error::{
    CommandStage, FenceOperation, ImageLoadError, StatusCode, UploadError, UploadResult,
};
use crate::resources::TextureData;

type Memory = Arc<Mutex<Vec<u8>>>;

/// Buffer backed by host memory
#[derive(Debug)]
pub struct DummyBuffer {
    id: u64,
    size: u64,
    usage: BufferUsage,
    residency: Residency,
    memory: Memory,
}

impl DummyBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Snapshot of the buffer's current contents.
    pub fn contents(&self) -> Vec<u8> {
        self.memory.lock().clone()
    }
}

#[derive(Debug)]
pub struct DummyCommandPool {
    id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DummyCommandBuffer {
    id: u64,
}

#[derive(Debug)]
pub struct DummyFence {
    id: u64,
}

impl DummyFence {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Image holding decoded texels
#[derive(Debug)]
pub struct DummyImage {
    id: u64,
    width: u32,
    height: u32,
    format: TextureFormat,
    texels: Vec<u8>,
}

impl DummyImage {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn texels(&self) -> &[u8] {
        &self.texels
    }
}

#[derive(Debug)]
pub struct DummyImageView {
    id: u64,
    image: u64,
}

impl DummyImageView {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> u64 {
        self.image
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DummyDescriptorSet {
    id: u64,
}

impl DummyDescriptorSet {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Descriptor pool holding at most `capacity` sets
#[derive(Debug)]
pub struct DummyDescriptorPool {
    id: u64,
    capacity: usize,
}

#[derive(Debug)]
pub struct DummyDescriptorSetLayout {
    id: u64,
}

impl DummyDescriptorSetLayout {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
pub struct DummySampler {
    id: u64,
}

impl DummySampler {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Kinds of resources the dummy backend tracks as live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    CommandPool,
    Fence,
    Image,
    ImageView,
}

/// One backend call, as observed by the dummy backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyEvent {
    BufferCreated {
        id: u64,
        size: u64,
        usage: BufferUsage,
        residency: Residency,
        label: Option<String>,
    },
    BufferDestroyed { id: u64 },
    BufferMapped { id: u64 },
    BufferUnmapped { id: u64 },
    CommandPoolCreated { id: u64 },
    CommandPoolDestroyed { id: u64 },
    CommandBufferAllocated { id: u64, pool: u64 },
    RecordingBegun { cmd: u64 },
    CopyRecorded { cmd: u64, src: u64, dst: u64, size: u64 },
    BarrierRecorded { cmd: u64, buffer: u64, barrier: BufferBarrier },
    RecordingEnded { cmd: u64 },
    Submitted { cmd: u64, fence: u64 },
    FenceCreated { id: u64 },
    FenceWaited { id: u64, timeout_ns: u64 },
    FenceSignaled { id: u64 },
    FenceDestroyed { id: u64 },
    ImageLoaded { id: u64, path: PathBuf },
    ImageDestroyed { id: u64 },
    ImageViewCreated { id: u64, image: u64 },
    ImageViewDestroyed { id: u64 },
    DescriptorSetAllocated { id: u64, pool: u64 },
    DescriptorWritten { set: u64, binding: u32, view: u64, sampler: u64 },
}

/// Failures the dummy backend injects on request.
#[derive(Debug, Clone, Default)]
pub struct DummyFaults {
    /// Number of buffer allocations that succeed before every later one fails.
    pub buffer_allocation_limit: Option<usize>,
    pub fail_map: bool,
    pub fail_command_pool: bool,
    pub fail_allocate_command_buffer: bool,
    pub fail_begin: bool,
    pub fail_end: bool,
    pub fail_submit: bool,
    pub fail_fence_create: bool,
    /// Status returned by every fence wait.
    pub fail_fence_wait: Option<StatusCode>,
    pub fail_image_view: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordingState {
    Initial,
    Recording,
    Executable,
    Pending,
}

enum Command {
    Copy {
        src: u64,
        dst: u64,
        src_memory: Memory,
        dst_memory: Memory,
        size: u64,
    },
    Barrier {
        buffer: u64,
    },
}

struct CommandBufferState {
    pool: u64,
    state: RecordingState,
    commands: Vec<Command>,
}

#[derive(Default)]
struct DummyState {
    next_id: u64,
    events: Vec<DummyEvent>,
    violations: Vec<String>,
    live: HashMap<u64, ResourceKind>,
    buffer_allocations: usize,
    command_buffers: HashMap<u64, CommandBufferState>,
    /// Submitted command buffers per fence, not yet executed.
    pending: HashMap<u64, Vec<u64>>,
    signaled: HashSet<u64>,
    descriptor_sets: HashMap<u64, usize>,
    bindings: HashMap<(u64, u32), (u64, u64)>,
}

impl DummyState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn create(&mut self, kind: ResourceKind) -> u64 {
        let id = self.next_id();
        self.live.insert(id, kind);
        id
    }

    fn destroy(&mut self, id: u64, kind: ResourceKind) {
        if self.live.remove(&id).is_none() {
            self.violation(format!("{kind:?} {id} destroyed twice or never created"));
        }
    }

    fn is_live(&self, id: u64) -> bool {
        self.live.contains_key(&id)
    }

    fn violation(&mut self, message: String) {
        log::warn!("DummyBackend: {}", message);
        self.violations.push(message);
    }

    fn recording(&mut self, cmd: u64, what: &str) -> Option<&mut CommandBufferState> {
        match self.command_buffers.get(&cmd).map(|c| c.state) {
            Some(RecordingState::Recording) => self.command_buffers.get_mut(&cmd),
            Some(state) => {
                self.violation(format!("{what} recorded into command buffer {cmd} in state {state:?}"));
                None
            }
            None => {
                self.violation(format!("{what} recorded into unknown command buffer {cmd}"));
                None
            }
        }
    }

    /// Run every command buffer submitted with `fence`.
    fn execute(&mut self, fence: u64) {
        let Some(submissions) = self.pending.remove(&fence) else {
            return;
        };
        for cmd in submissions {
            let Some(mut buffer) = self.command_buffers.remove(&cmd) else {
                self.violation(format!(
                    "command buffer {cmd} was freed before its submission executed"
                ));
                continue;
            };
            for command in &buffer.commands {
                if let Command::Copy {
                    src,
                    dst,
                    src_memory,
                    dst_memory,
                    size,
                } = command
                {
                    if !self.is_live(*src) || !self.is_live(*dst) {
                        self.violation(format!(
                            "copy {src} -> {dst} executed after a buffer was destroyed"
                        ));
                        continue;
                    }
                    let len = *size as usize;
                    let data = src_memory.lock()[..len].to_vec();
                    dst_memory.lock()[..len].copy_from_slice(&data);
                }
            }
            buffer.state = RecordingState::Executable;
            self.command_buffers.insert(cmd, buffer);
        }
    }
}

enum RegisteredTexture {
    Decoded(TextureData),
    Encoded(Vec<u8>),
}

/// In-memory implementation of [`UploadBackend`].
pub struct DummyBackend {
    state: Mutex<DummyState>,
    faults: DummyFaults,
    textures: HashMap<PathBuf, RegisteredTexture>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DummyState::default()),
            faults: DummyFaults::default(),
            textures: HashMap::new(),
        }
    }

    pub fn with_faults(mut self, faults: DummyFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Serve `texture` for loads of `path` instead of reading the filesystem.
    pub fn with_texture(mut self, path: impl Into<PathBuf>, texture: TextureData) -> Self {
        self.textures
            .insert(path.into(), RegisteredTexture::Decoded(texture));
        self
    }

    /// Serve encoded image `bytes` for loads of `path`; they are decoded on load.
    pub fn with_encoded_texture(mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        self.textures
            .insert(path.into(), RegisteredTexture::Encoded(bytes));
        self
    }

    pub fn create_descriptor_pool(&self, capacity: usize) -> DummyDescriptorPool {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.descriptor_sets.insert(id, 0);
        DummyDescriptorPool { id, capacity }
    }

    pub fn create_descriptor_set_layout(&self) -> DummyDescriptorSetLayout {
        DummyDescriptorSetLayout {
            id: self.state.lock().next_id(),
        }
    }

    pub fn create_sampler(&self) -> DummySampler {
        DummySampler {
            id: self.state.lock().next_id(),
        }
    }

    /// Every call observed so far, in order.
    pub fn events(&self) -> Vec<DummyEvent> {
        self.state.lock().events.clone()
    }

    /// Misuse detected so far.
    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    /// Number of live resources of `kind`.
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.state.lock().live.values().filter(|k| **k == kind).count()
    }

    /// Number of live resources of any kind.
    pub fn live_total(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Sets allocated from `pool` so far.
    pub fn descriptor_sets_allocated(&self, pool: &DummyDescriptorPool) -> usize {
        self.state
            .lock()
            .descriptor_sets
            .get(&pool.id)
            .copied()
            .unwrap_or(0)
    }

    /// View and sampler written to `binding` of `set`, if any.
    pub fn bound_combined_image_sampler(
        &self,
        set: DummyDescriptorSet,
        binding: u32,
    ) -> Option<(u64, u64)> {
        self.state.lock().bindings.get(&(set.id, binding)).copied()
    }

    fn decode(&self, path: &Path, format: TextureFormat) -> Result<TextureData, ImageLoadError> {
        match self.textures.get(path) {
            Some(RegisteredTexture::Decoded(texture)) => Ok(texture.clone()),
            Some(RegisteredTexture::Encoded(bytes)) => {
                TextureData::from_bytes(bytes, &path.to_string_lossy(), format)
            }
            None => TextureData::from_file(path, format),
        }
    }

    fn command_error(stage: CommandStage) -> UploadError {
        UploadError::CommandSubmission {
            stage,
            code: StatusCode::OUT_OF_DEVICE_MEMORY,
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadBackend for DummyBackend {
    type Buffer = DummyBuffer;
    type Mapping<'m>
        = MappedMutexGuard<'m, [u8]>
    where
        Self: 'm;
    type CommandPool = DummyCommandPool;
    type CommandBuffer = DummyCommandBuffer;
    type Fence = DummyFence;
    type Image = DummyImage;
    type ImageView = DummyImageView;
    type DescriptorSet = DummyDescriptorSet;
    type DescriptorPool = DummyDescriptorPool;
    type DescriptorSetLayout = DummyDescriptorSetLayout;
    type Sampler = DummySampler;

    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> UploadResult<DummyBuffer> {
        let mut state = self.state.lock();
        if let Some(limit) = self.faults.buffer_allocation_limit {
            if state.buffer_allocations >= limit {
                return Err(UploadError::Allocation {
                    label: desc.label_or("buffer").to_string(),
                    size: desc.size,
                    residency: desc.residency,
                    reason: "injected allocation failure".into(),
                });
            }
        }
        if desc.size == 0 {
            return Err(UploadError::Allocation {
                label: desc.label_or("buffer").to_string(),
                size: 0,
                residency: desc.residency,
                reason: "buffer size must be non-zero".into(),
            });
        }
        state.buffer_allocations += 1;

        let id = state.create(ResourceKind::Buffer);
        log::trace!(
            "DummyBackend: creating buffer {} {:?} (size: {})",
            id,
            desc.label,
            desc.size
        );
        state.events.push(DummyEvent::BufferCreated {
            id,
            size: desc.size,
            usage: desc.usage,
            residency: desc.residency,
            label: desc.label.clone(),
        });
        Ok(DummyBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
            residency: desc.residency,
            memory: Arc::new(Mutex::new(vec![0; desc.size as usize])),
        })
    }

    fn destroy_buffer(&self, buffer: DummyBuffer) {
        log::trace!("DummyBackend: destroying buffer {}", buffer.id);
        let mut state = self.state.lock();
        state.destroy(buffer.id, ResourceKind::Buffer);
        state
            .events
            .push(DummyEvent::BufferDestroyed { id: buffer.id });
    }

    fn buffer_size(&self, buffer: &DummyBuffer) -> u64 {
        buffer.size
    }

    fn map_buffer<'m>(
        &'m self,
        buffer: &'m mut DummyBuffer,
    ) -> UploadResult<MappedMutexGuard<'m, [u8]>> {
        if self.faults.fail_map || buffer.residency == Residency::DeviceLocal {
            return Err(UploadError::MemoryMap {
                label: format!("buffer {}", buffer.id),
                code: StatusCode::MEMORY_MAP_FAILED,
            });
        }
        self.state
            .lock()
            .events
            .push(DummyEvent::BufferMapped { id: buffer.id });
        Ok(MutexGuard::map(buffer.memory.lock(), |memory| {
            memory.as_mut_slice()
        }))
    }

    fn unmap_buffer(&self, buffer: &mut DummyBuffer) {
        self.state
            .lock()
            .events
            .push(DummyEvent::BufferUnmapped { id: buffer.id });
    }

    fn create_command_pool(&self) -> UploadResult<DummyCommandPool> {
        if self.faults.fail_command_pool {
            return Err(Self::command_error(CommandStage::CreatePool));
        }
        let mut state = self.state.lock();
        let id = state.create(ResourceKind::CommandPool);
        state.events.push(DummyEvent::CommandPoolCreated { id });
        Ok(DummyCommandPool { id })
    }

    fn destroy_command_pool(&self, pool: DummyCommandPool) {
        let mut state = self.state.lock();
        let owned: Vec<u64> = state
            .command_buffers
            .iter()
            .filter(|(_, c)| c.pool == pool.id)
            .map(|(id, _)| *id)
            .collect();
        for cmd in owned {
            if state.command_buffers.get(&cmd).map(|c| c.state) == Some(RecordingState::Pending) {
                state.violation(format!(
                    "command pool {} destroyed while command buffer {cmd} is pending",
                    pool.id
                ));
            }
            state.command_buffers.remove(&cmd);
        }
        state.destroy(pool.id, ResourceKind::CommandPool);
        state
            .events
            .push(DummyEvent::CommandPoolDestroyed { id: pool.id });
    }

    fn allocate_command_buffer(&self, pool: &DummyCommandPool) -> UploadResult<DummyCommandBuffer> {
        if self.faults.fail_allocate_command_buffer {
            return Err(Self::command_error(CommandStage::AllocateBuffer));
        }
        let mut state = self.state.lock();
        let id = state.next_id();
        state.command_buffers.insert(
            id,
            CommandBufferState {
                pool: pool.id,
                state: RecordingState::Initial,
                commands: Vec::new(),
            },
        );
        state
            .events
            .push(DummyEvent::CommandBufferAllocated { id, pool: pool.id });
        Ok(DummyCommandBuffer { id })
    }

    fn begin_command_buffer(&self, cmd: DummyCommandBuffer) -> UploadResult<()> {
        if self.faults.fail_begin {
            return Err(Self::command_error(CommandStage::Begin));
        }
        let mut state = self.state.lock();
        match state.command_buffers.get_mut(&cmd.id) {
            Some(buffer) if buffer.state != RecordingState::Pending => {
                buffer.state = RecordingState::Recording;
                buffer.commands.clear();
            }
            _ => state.violation(format!("cannot begin command buffer {}", cmd.id)),
        }
        state.events.push(DummyEvent::RecordingBegun { cmd: cmd.id });
        Ok(())
    }

    fn cmd_copy_buffer(
        &self,
        cmd: DummyCommandBuffer,
        src: &DummyBuffer,
        dst: &DummyBuffer,
        size: u64,
    ) {
        let mut state = self.state.lock();
        if size > src.size || size > dst.size {
            state.violation(format!(
                "copy of {size} bytes exceeds buffer {} or {}",
                src.id, dst.id
            ));
        }
        if !src.usage.contains(BufferUsage::COPY_SRC) || !dst.usage.contains(BufferUsage::COPY_DST)
        {
            state.violation(format!(
                "copy {} -> {} without transfer usage",
                src.id, dst.id
            ));
        }
        if let Some(buffer) = state.recording(cmd.id, "copy") {
            buffer.commands.push(Command::Copy {
                src: src.id,
                dst: dst.id,
                src_memory: Arc::clone(&src.memory),
                dst_memory: Arc::clone(&dst.memory),
                size: size.min(src.size).min(dst.size),
            });
        }
        state.events.push(DummyEvent::CopyRecorded {
            cmd: cmd.id,
            src: src.id,
            dst: dst.id,
            size,
        });
    }

    fn cmd_buffer_barrier(
        &self,
        cmd: DummyCommandBuffer,
        buffer: &DummyBuffer,
        barrier: &BufferBarrier,
    ) {
        let mut state = self.state.lock();
        if let Some(recording) = state.recording(cmd.id, "barrier") {
            recording
                .commands
                .push(Command::Barrier { buffer: buffer.id });
        }
        state.events.push(DummyEvent::BarrierRecorded {
            cmd: cmd.id,
            buffer: buffer.id,
            barrier: *barrier,
        });
    }

    fn end_command_buffer(&self, cmd: DummyCommandBuffer) -> UploadResult<()> {
        if self.faults.fail_end {
            return Err(Self::command_error(CommandStage::End));
        }
        let mut state = self.state.lock();
        let mut unguarded = Vec::new();
        match state.command_buffers.get_mut(&cmd.id) {
            Some(buffer) if buffer.state == RecordingState::Recording => {
                for (i, command) in buffer.commands.iter().enumerate() {
                    if let Command::Copy { dst, .. } = command {
                        let guarded = buffer.commands[i + 1..]
                            .iter()
                            .any(|c| matches!(c, Command::Barrier { buffer } if buffer == dst));
                        if !guarded {
                            unguarded.push(*dst);
                        }
                    }
                }
                buffer.state = RecordingState::Executable;
            }
            _ => state.violation(format!("ended command buffer {} without recording", cmd.id)),
        }
        for dst in unguarded {
            state.violation(format!(
                "copy into buffer {dst} has no following barrier in command buffer {}",
                cmd.id
            ));
        }
        state.events.push(DummyEvent::RecordingEnded { cmd: cmd.id });
        Ok(())
    }

    fn submit(&self, cmd: DummyCommandBuffer, fence: &DummyFence) -> UploadResult<()> {
        if self.faults.fail_submit {
            return Err(Self::command_error(CommandStage::Submit));
        }
        let mut state = self.state.lock();
        match state.command_buffers.get_mut(&cmd.id) {
            Some(buffer) if buffer.state == RecordingState::Executable => {
                buffer.state = RecordingState::Pending;
            }
            _ => state.violation(format!(
                "command buffer {} submitted without being recorded",
                cmd.id
            )),
        }
        log::trace!(
            "DummyBackend: submitting command buffer {} with fence {}",
            cmd.id,
            fence.id
        );
        state.pending.entry(fence.id).or_default().push(cmd.id);
        state.events.push(DummyEvent::Submitted {
            cmd: cmd.id,
            fence: fence.id,
        });
        Ok(())
    }

    fn create_fence(&self) -> UploadResult<DummyFence> {
        if self.faults.fail_fence_create {
            return Err(UploadError::SyncWait {
                operation: FenceOperation::Create,
                code: StatusCode::OUT_OF_HOST_MEMORY,
            });
        }
        let mut state = self.state.lock();
        let id = state.create(ResourceKind::Fence);
        state.events.push(DummyEvent::FenceCreated { id });
        Ok(DummyFence { id })
    }

    fn wait_fence(&self, fence: &DummyFence, timeout_ns: u64) -> UploadResult<()> {
        let mut state = self.state.lock();
        state.events.push(DummyEvent::FenceWaited {
            id: fence.id,
            timeout_ns,
        });
        if let Some(code) = self.faults.fail_fence_wait {
            return Err(UploadError::SyncWait {
                operation: FenceOperation::Wait,
                code,
            });
        }
        if !state.signaled.contains(&fence.id) {
            if !state.pending.contains_key(&fence.id) {
                state.violation(format!("waited on fence {} with nothing submitted", fence.id));
                return Err(UploadError::SyncWait {
                    operation: FenceOperation::Wait,
                    code: StatusCode::TIMEOUT,
                });
            }
            state.execute(fence.id);
            state.signaled.insert(fence.id);
            state.events.push(DummyEvent::FenceSignaled { id: fence.id });
        }
        Ok(())
    }

    fn destroy_fence(&self, fence: DummyFence) {
        let mut state = self.state.lock();
        if state.pending.contains_key(&fence.id) {
            state.violation(format!("fence {} destroyed with work pending", fence.id));
        }
        state.signaled.remove(&fence.id);
        state.destroy(fence.id, ResourceKind::Fence);
        state
            .events
            .push(DummyEvent::FenceDestroyed { id: fence.id });
    }

    fn load_texture_2d(&self, path: &Path, format: TextureFormat) -> UploadResult<DummyImage> {
        let texture = self
            .decode(path, format)
            .map_err(|source| UploadError::image_load(path, source))?;
        let mut state = self.state.lock();
        let id = state.create(ResourceKind::Image);
        log::trace!(
            "DummyBackend: loaded texture {} ({}x{}) as image {}",
            path.display(),
            texture.width,
            texture.height,
            id
        );
        state.events.push(DummyEvent::ImageLoaded {
            id,
            path: path.to_path_buf(),
        });
        Ok(DummyImage {
            id,
            width: texture.width,
            height: texture.height,
            format,
            texels: texture.data,
        })
    }

    fn destroy_image(&self, image: DummyImage) {
        let mut state = self.state.lock();
        state.destroy(image.id, ResourceKind::Image);
        state
            .events
            .push(DummyEvent::ImageDestroyed { id: image.id });
    }

    fn create_image_view(
        &self,
        image: &DummyImage,
        format: TextureFormat,
    ) -> Result<DummyImageView, StatusCode> {
        if self.faults.fail_image_view {
            return Err(StatusCode::OUT_OF_HOST_MEMORY);
        }
        let mut state = self.state.lock();
        if format != image.format {
            state.violation(format!(
                "view format {format:?} differs from image {} format {:?}",
                image.id, image.format
            ));
        }
        let id = state.create(ResourceKind::ImageView);
        state.events.push(DummyEvent::ImageViewCreated {
            id,
            image: image.id,
        });
        Ok(DummyImageView {
            id,
            image: image.id,
        })
    }

    fn destroy_image_view(&self, view: DummyImageView) {
        let mut state = self.state.lock();
        state.destroy(view.id, ResourceKind::ImageView);
        state
            .events
            .push(DummyEvent::ImageViewDestroyed { id: view.id });
    }

    fn allocate_descriptor_set(
        &self,
        pool: &DummyDescriptorPool,
        _layout: &DummyDescriptorSetLayout,
    ) -> UploadResult<DummyDescriptorSet> {
        let mut state = self.state.lock();
        let allocated = state.descriptor_sets.get(&pool.id).copied().unwrap_or(0);
        if allocated >= pool.capacity {
            return Err(UploadError::DescriptorAlloc {
                code: StatusCode::OUT_OF_POOL_MEMORY,
            });
        }
        state.descriptor_sets.insert(pool.id, allocated + 1);
        let id = state.next_id();
        state
            .events
            .push(DummyEvent::DescriptorSetAllocated { id, pool: pool.id });
        Ok(DummyDescriptorSet { id })
    }

    fn write_combined_image_sampler(
        &self,
        set: DummyDescriptorSet,
        binding: u32,
        view: &DummyImageView,
        sampler: &DummySampler,
        _layout: ImageLayout,
    ) {
        let mut state = self.state.lock();
        if !state.is_live(view.id) {
            state.violation(format!("descriptor write references dead view {}", view.id));
        }
        state
            .bindings
            .insert((set.id, binding), (view.id, sampler.id));
        state.events.push(DummyEvent::DescriptorWritten {
            set: set.id,
            binding,
            view: view.id,
            sampler: sampler.id,
        });
    }
}
