//! Scripted device, fence and swap chain for unit tests.
//!
//! Every double journals what it was asked to do and can be told to fail its
//! next call.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::decode::{DecodeError, DecodedImage, ImageDecoder};
use crate::descriptor::{CpuDescriptorHandle, DescriptorHeapInfo, DescriptorPair, GpuDescriptorHandle};
use crate::device::{
    AcquireError, CommandAllocator, CopyableFootprint, DeviceError, Fence, PresentStatus,
    RenderDevice, ResourceState, SwapChain, TextureDesc, WgpuDevice,
};
use crate::paint::Color;
use crate::texture::footprint_for;

// ── fence ─────────────────────────────────────────────────────────────────

/// When a mock fence reports completion.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Completion {
    /// Immediately at signal.
    OnSignal,
    /// When someone waits on the value.
    OnWait,
    /// Only through [`MockFence::complete`]; `wait` blocks until then.
    Manual,
}

#[derive(Debug, Default)]
struct FenceState {
    completed: u64,
    signaled: Vec<u64>,
    waited: Vec<u64>,
}

#[derive(Debug)]
struct FenceShared {
    mode: Completion,
    state: Mutex<FenceState>,
    cond: Condvar,
}

/// Thread-safe fence; clones share state.
#[derive(Debug, Clone)]
pub(crate) struct MockFence {
    shared: Arc<FenceShared>,
}

impl MockFence {
    pub(crate) fn new(mode: Completion) -> Self {
        Self {
            shared: Arc::new(FenceShared {
                mode,
                state: Mutex::new(FenceState::default()),
                cond: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FenceState> {
        self.shared.state.lock().unwrap()
    }

    /// Marks every value up to `value` as completed and wakes waiters.
    pub(crate) fn complete(&self, value: u64) {
        let mut state = self.lock();
        state.completed = state.completed.max(value);
        self.shared.cond.notify_all();
    }

    pub(crate) fn signaled(&self) -> Vec<u64> {
        self.lock().signaled.clone()
    }

    pub(crate) fn last_signaled(&self) -> u64 {
        self.lock().signaled.last().copied().unwrap_or(0)
    }

    pub(crate) fn waited_values(&self) -> Vec<u64> {
        self.lock().waited.clone()
    }

    pub(crate) fn wait_calls(&self) -> usize {
        self.lock().waited.len()
    }

    /// Whether the device has caught up with everything signaled.
    pub(crate) fn is_drained(&self) -> bool {
        let state = self.lock();
        state.completed >= state.signaled.last().copied().unwrap_or(0)
    }
}

impl Fence for MockFence {
    fn signal(&self, value: u64) {
        let mut state = self.lock();
        state.signaled.push(value);
        if self.shared.mode == Completion::OnSignal {
            state.completed = state.completed.max(value);
            self.shared.cond.notify_all();
        }
    }

    fn completed_value(&self) -> u64 {
        self.lock().completed
    }

    fn wait(&self, value: u64) {
        let mut state = self.lock();
        state.waited.push(value);
        if self.shared.mode == Completion::OnWait {
            state.completed = state.completed.max(value);
            return;
        }
        while state.completed < value {
            state = self.shared.cond.wait(state).unwrap();
        }
    }
}

// ── recording objects ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct MockAllocator {
    pub resets: u32,
}

impl CommandAllocator for MockAllocator {
    fn reset(&mut self) {
        self.resets += 1;
    }
}

#[derive(Debug)]
pub(crate) struct MockCommandList {
    pub id: u32,
}

#[derive(Debug)]
pub(crate) struct MockStaging {
    bytes: Vec<u8>,
}

/// Texture whose contents are filled by staging copies.
#[derive(Debug)]
pub(crate) struct MockTexture {
    id: u32,
    state: Cell<ResourceState>,
    contents: RefCell<Vec<u8>>,
    live: Rc<Cell<usize>>,
}

impl MockTexture {
    pub(crate) fn state(&self) -> ResourceState {
        self.state.get()
    }

    /// Tightly packed texel bytes.
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.contents.borrow().clone()
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

// ── device ────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum DeviceCall {
    CreateFence,
    CreateAllocator,
    BeginCommands,
    Execute,
    CreateTexture { width: u32, height: u32 },
    CreateStaging { size: u64 },
    WriteStaging { len: u64 },
    Bind { slot: u32 },
    Unbind { slot: u32 },
    CopyToTexture,
    Barrier,
}

pub(crate) struct MockDevice {
    heap: DescriptorHeapInfo,
    max_dimension: u32,
    fence_mode: Completion,
    calls: RefCell<Vec<DeviceCall>>,
    live: Rc<Cell<usize>>,
    next_id: Cell<u32>,
    bound: RefCell<BTreeMap<u32, u32>>,
    staging_sizes: RefCell<Vec<u64>>,
    fences: Rc<RefCell<Vec<MockFence>>>,
    fail_texture: Cell<bool>,
    fail_staging: Cell<bool>,
    fail_execute: Cell<bool>,
}

impl MockDevice {
    pub(crate) fn new(capacity: u32) -> Self {
        Self {
            heap: DescriptorHeapInfo {
                capacity,
                cpu_start: CpuDescriptorHandle(0x1000),
                gpu_start: GpuDescriptorHandle(0x10_0000),
                increment: 32,
            },
            max_dimension: 16384,
            fence_mode: Completion::OnWait,
            calls: RefCell::new(Vec::new()),
            live: Rc::new(Cell::new(0)),
            next_id: Cell::new(1),
            bound: RefCell::new(BTreeMap::new()),
            staging_sizes: RefCell::new(Vec::new()),
            fences: Rc::new(RefCell::new(Vec::new())),
            fail_texture: Cell::new(false),
            fail_staging: Cell::new(false),
            fail_execute: Cell::new(false),
        }
    }

    pub(crate) fn with_fence_mode(mut self, mode: Completion) -> Self {
        self.fence_mode = mode;
        self
    }

    fn record(&self, call: DeviceCall) {
        self.calls.borrow_mut().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<DeviceCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub(crate) fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.live.get()
    }

    /// Shared live-texture counter; outlives the device.
    pub(crate) fn live_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.live)
    }

    /// Heap slots currently holding a view, ascending.
    pub(crate) fn bound_slots(&self) -> Vec<u32> {
        self.bound.borrow().keys().copied().collect()
    }

    pub(crate) fn staging_sizes(&self) -> Vec<u64> {
        self.staging_sizes.borrow().clone()
    }

    /// Every fence this device has created, in creation order.
    pub(crate) fn fences(&self) -> Rc<RefCell<Vec<MockFence>>> {
        Rc::clone(&self.fences)
    }

    pub(crate) fn fail_next_texture(&self) {
        self.fail_texture.set(true);
    }

    pub(crate) fn fail_next_staging(&self) {
        self.fail_staging.set(true);
    }

    pub(crate) fn fail_next_execute(&self) {
        self.fail_execute.set(true);
    }
}

impl RenderDevice for MockDevice {
    type Fence = MockFence;
    type CommandAllocator = MockAllocator;
    type CommandList = MockCommandList;
    type Texture = MockTexture;
    type StagingBuffer = MockStaging;

    fn descriptor_heap(&self) -> DescriptorHeapInfo {
        self.heap
    }

    fn create_fence(&self) -> Result<MockFence, DeviceError> {
        self.record(DeviceCall::CreateFence);
        let fence = MockFence::new(self.fence_mode);
        self.fences.borrow_mut().push(fence.clone());
        Ok(fence)
    }

    fn create_command_allocator(&self, _label: &str) -> Result<MockAllocator, DeviceError> {
        self.record(DeviceCall::CreateAllocator);
        Ok(MockAllocator::default())
    }

    fn begin_commands(&self, _allocator: &mut MockAllocator) -> Result<MockCommandList, DeviceError> {
        self.record(DeviceCall::BeginCommands);
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(MockCommandList { id })
    }

    fn execute(&self, _list: MockCommandList) -> Result<(), DeviceError> {
        self.record(DeviceCall::Execute);
        if self.fail_execute.take() {
            return Err(DeviceError::Lost);
        }
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<MockTexture, DeviceError> {
        self.record(DeviceCall::CreateTexture {
            width: desc.width,
            height: desc.height,
        });
        if self.fail_texture.take() {
            return Err(DeviceError::OutOfMemory { what: "texture" });
        }
        let max = self.max_dimension;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(DeviceError::InvalidDimensions {
                width: desc.width,
                height: desc.height,
                max,
            });
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.live.set(self.live.get() + 1);
        let size = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel() as usize;
        Ok(MockTexture {
            id,
            state: Cell::new(ResourceState::CopyDest),
            contents: RefCell::new(vec![0; size]),
            live: Rc::clone(&self.live),
        })
    }

    fn copyable_footprint(&self, desc: &TextureDesc) -> Result<CopyableFootprint, DeviceError> {
        footprint_for(desc.width, desc.height, desc.format.bytes_per_pixel(), 256)
    }

    fn create_staging_buffer(&self, size: u64) -> Result<MockStaging, DeviceError> {
        self.record(DeviceCall::CreateStaging { size });
        self.staging_sizes.borrow_mut().push(size);
        if self.fail_staging.take() {
            return Err(DeviceError::OutOfMemory { what: "staging buffer" });
        }
        Ok(MockStaging {
            bytes: vec![0; size as usize],
        })
    }

    fn write_staging(&self, staging: &mut MockStaging, offset: u64, bytes: &[u8]) -> Result<(), DeviceError> {
        self.record(DeviceCall::WriteStaging {
            len: bytes.len() as u64,
        });
        let size = staging.bytes.len() as u64;
        let end = offset + bytes.len() as u64;
        if end > size {
            return Err(DeviceError::StagingOutOfBounds {
                offset,
                len: bytes.len() as u64,
                size,
            });
        }
        staging.bytes[offset as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }

    fn bind_shader_view(&self, texture: &MockTexture, slot: DescriptorPair) {
        self.record(DeviceCall::Bind { slot: slot.index });
        self.bound.borrow_mut().insert(slot.index, texture.id);
    }

    fn unbind_shader_view(&self, slot: DescriptorPair) {
        self.record(DeviceCall::Unbind { slot: slot.index });
        self.bound.borrow_mut().remove(&slot.index);
    }

    fn copy_staging_to_texture(
        &self,
        _list: &mut MockCommandList,
        staging: &MockStaging,
        footprint: &CopyableFootprint,
        texture: &MockTexture,
    ) {
        self.record(DeviceCall::CopyToTexture);
        let row_size = footprint.row_size as usize;
        let pitch = footprint.row_pitch as usize;
        let offset = footprint.offset as usize;
        let mut contents = texture.contents.borrow_mut();
        for row in 0..footprint.rows as usize {
            let src = offset + row * pitch;
            contents[row * row_size..(row + 1) * row_size]
                .copy_from_slice(&staging.bytes[src..src + row_size]);
        }
    }

    fn texture_barrier(
        &self,
        _list: &mut MockCommandList,
        texture: &MockTexture,
        before: ResourceState,
        after: ResourceState,
    ) {
        self.record(DeviceCall::Barrier);
        assert_eq!(texture.state.get(), before, "barrier source state mismatch");
        texture.state.set(after);
    }
}

// ── swap chain ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SwapEvent {
    WaitLatency,
    Acquire { buffer: u32 },
    BeginTarget { buffer: u32, clear: Color },
    EndTarget { buffer: u32 },
    Present { buffer: u32 },
    ReleaseTargets,
    CreateTargets,
    /// `drained` is whether every watched fence had completed its last signal.
    Resize { width: u32, height: u32, drained: bool },
}

#[derive(Debug)]
pub(crate) struct MockTarget {
    pub buffer: u32,
}

pub(crate) struct MockSwapChain {
    width: u32,
    height: u32,
    buffer_count: u32,
    next_buffer: u32,
    events: Rc<RefCell<Vec<SwapEvent>>>,
    acquire_script: RefCell<VecDeque<AcquireError>>,
    occlude_present: Cell<bool>,
    fail_resize: Cell<bool>,
    watched: Rc<RefCell<Vec<MockFence>>>,
}

impl MockSwapChain {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer_count: 2,
            next_buffer: 0,
            events: Rc::new(RefCell::new(Vec::new())),
            acquire_script: RefCell::new(VecDeque::new()),
            occlude_present: Cell::new(false),
            fail_resize: Cell::new(false),
            watched: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Fences inspected when the buffers are resized.
    pub(crate) fn with_watched(self, fences: Vec<MockFence>) -> Self {
        self.with_shared_watch(Rc::new(RefCell::new(fences)))
    }

    pub(crate) fn with_shared_watch(mut self, fences: Rc<RefCell<Vec<MockFence>>>) -> Self {
        self.watched = fences;
        self
    }

    pub(crate) fn events(&self) -> Rc<RefCell<Vec<SwapEvent>>> {
        Rc::clone(&self.events)
    }

    pub(crate) fn fail_next_acquire(&self, err: AcquireError) {
        self.acquire_script.borrow_mut().push_back(err);
    }

    pub(crate) fn occlude_next_present(&self) {
        self.occlude_present.set(true);
    }

    pub(crate) fn fail_next_resize(&self) {
        self.fail_resize.set(true);
    }

    fn push(&self, event: SwapEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl SwapChain for MockSwapChain {
    type Target = MockTarget;
    type CommandList = MockCommandList;

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn wait_for_frame_latency(&self) {
        self.push(SwapEvent::WaitLatency);
    }

    fn acquire(&mut self) -> Result<MockTarget, AcquireError> {
        if let Some(err) = self.acquire_script.borrow_mut().pop_front() {
            return Err(err);
        }
        let buffer = self.next_buffer;
        self.next_buffer = (self.next_buffer + 1) % self.buffer_count;
        self.push(SwapEvent::Acquire { buffer });
        Ok(MockTarget { buffer })
    }

    fn begin_target(&self, _list: &mut MockCommandList, target: &MockTarget, clear: Color) {
        self.push(SwapEvent::BeginTarget {
            buffer: target.buffer,
            clear,
        });
    }

    fn end_target(&self, _list: &mut MockCommandList, target: &MockTarget) {
        self.push(SwapEvent::EndTarget { buffer: target.buffer });
    }

    fn present(&mut self, target: MockTarget) -> PresentStatus {
        self.push(SwapEvent::Present { buffer: target.buffer });
        if self.occlude_present.take() {
            PresentStatus::Occluded
        } else {
            PresentStatus::Presented
        }
    }

    fn release_render_targets(&mut self) {
        self.push(SwapEvent::ReleaseTargets);
    }

    fn create_render_targets(&mut self) -> Result<(), DeviceError> {
        self.push(SwapEvent::CreateTargets);
        Ok(())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        if self.fail_resize.take() {
            return Err(DeviceError::Other("resize refused".into()));
        }
        let drained = self.watched.borrow().iter().all(MockFence::is_drained);
        self.width = width;
        self.height = height;
        self.push(SwapEvent::Resize { width, height, drained });
        Ok(())
    }
}

// ── decoder ───────────────────────────────────────────────────────────────

/// Decoder serving solid-color images from an in-memory table.
#[derive(Default)]
pub(crate) struct MockDecoder {
    images: BTreeMap<String, (u32, u32)>,
    decodes: Rc<Cell<usize>>,
}

impl MockDecoder {
    pub(crate) fn with_image(mut self, path: &str, width: u32, height: u32) -> Self {
        self.images.insert(path.to_string(), (width, height));
        self
    }

    /// Shared counter of decode calls.
    pub(crate) fn decodes(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.decodes)
    }
}

impl ImageDecoder for MockDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        self.decodes.set(self.decodes.get() + 1);
        let key = path.to_string_lossy();
        match self.images.get(key.as_ref()) {
            Some(&(width, height)) => Ok(DecodedImage {
                pixels: vec![0x7f; width as usize * height as usize * 4],
                width,
                height,
            }),
            None => Err(DecodeError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such image"),
            }),
        }
    }
}

// ── wgpu no-op backend ────────────────────────────────────────────────────

/// A real `WgpuDevice` on wgpu's no-op backend: full validation, no GPU.
pub(crate) fn noop_wgpu_device(descriptor_capacity: u32) -> WgpuDevice {
    let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
    WgpuDevice::new(device, queue, descriptor_capacity)
}
