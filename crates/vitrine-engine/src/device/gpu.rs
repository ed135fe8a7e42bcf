use std::cell::{Cell, RefCell};

use anyhow::{Context, Result};
use winit::window::Window;

use crate::descriptor::{CpuDescriptorHandle, DescriptorHeapInfo, DescriptorPair, GpuDescriptorHandle};
use crate::texture::footprint_for;

use super::api::{
    CommandAllocator, CopyableFootprint, PixelFormat, RenderDevice, ResourceState, TextureDesc,
};
use super::error::DeviceError;
use super::fence::WgpuFence;
use super::surface::{self, WgpuSwapChain};
use super::GpuInit;

// Synthetic heap addresses. wgpu has no descriptor heaps; slots are resolved
// through `ShaderViewHeap`, so the bases only need to be distinct and non-null.
const HEAP_CPU_START: u64 = 0x0001_0000;
const HEAP_GPU_START: u64 = 0x0100_0000_0000;
const HEAP_INCREMENT: u64 = 1;

/// Creates the wgpu device, queue and swap chain for a window.
///
/// Adapter/device acquisition is asynchronous under wgpu.
pub async fn create_wgpu_backend<'w>(
    window: &'w Window,
    init: GpuInit,
    back_buffer_count: u32,
    descriptor_capacity: u32,
) -> Result<(WgpuDevice, WgpuSwapChain<'w>)> {
    let size = window.inner_size();
    anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");
    anyhow::ensure!(descriptor_capacity > 0, "descriptor heap needs at least one slot");

    let GpuInit {
        prefer_srgb,
        present_mode,
        alpha_mode,
        required_features,
        required_limits,
    } = init;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let surface = instance
        .create_surface(window)
        .context("failed to create wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("vitrine device"),
            required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
        .context("no supported surface formats")?;
    let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width,
        height: size.height,
        present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: back_buffer_count,
    };

    log::info!(
        "wgpu backend ready: adapter={:?}, format={format:?}, {}x{}, {back_buffer_count} buffers",
        adapter.get_info().name,
        size.width,
        size.height,
    );

    let swap_chain = WgpuSwapChain::new(surface, device.clone(), config, back_buffer_count);
    let device = WgpuDevice::new(device, queue, descriptor_capacity);

    Ok((device, swap_chain))
}

/// Shader-visible view table addressed by descriptor handles.
struct ShaderViewHeap {
    info: DescriptorHeapInfo,
    views: RefCell<Vec<Option<wgpu::TextureView>>>,
}

impl ShaderViewHeap {
    fn new(capacity: u32) -> Self {
        Self {
            info: DescriptorHeapInfo {
                capacity,
                cpu_start: CpuDescriptorHandle(HEAP_CPU_START),
                gpu_start: GpuDescriptorHandle(HEAP_GPU_START),
                increment: HEAP_INCREMENT,
            },
            views: RefCell::new(vec![None; capacity as usize]),
        }
    }

    fn slot_of_cpu(&self, handle: CpuDescriptorHandle) -> Option<usize> {
        let offset = handle.0.checked_sub(self.info.cpu_start.0)?;
        let index = (offset / self.info.increment) as usize;
        (index < self.info.capacity as usize).then_some(index)
    }

    fn slot_of_gpu(&self, handle: GpuDescriptorHandle) -> Option<usize> {
        let offset = handle.0.checked_sub(self.info.gpu_start.0)?;
        let index = (offset / self.info.increment) as usize;
        (index < self.info.capacity as usize).then_some(index)
    }
}

/// wgpu texture plus its sampled view and tracked usage state.
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    state: Cell<ResourceState>,
}

impl WgpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn state(&self) -> ResourceState {
        self.state.get()
    }
}

pub struct WgpuStagingBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

/// Per-frame recording slot.
///
/// wgpu recycles encoder memory internally, so the allocator only tracks how
/// often it has been recycled for diagnostics.
pub struct WgpuCommandAllocator {
    label: String,
    generation: u64,
}

impl WgpuCommandAllocator {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl CommandAllocator for WgpuCommandAllocator {
    fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// An open command encoder.
pub struct WgpuCommandList {
    pub encoder: wgpu::CommandEncoder,
}

/// wgpu logical device + queue + shader-visible view heap.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    heap: ShaderViewHeap,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, descriptor_capacity: u32) -> Self {
        Self {
            device,
            queue,
            heap: ShaderViewHeap::new(descriptor_capacity),
        }
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Resolves a display handle to the view bound in its slot.
    pub fn shader_view(&self, handle: GpuDescriptorHandle) -> Option<wgpu::TextureView> {
        let index = self.heap.slot_of_gpu(handle)?;
        self.heap.views.borrow()[index].clone()
    }

    /// Runs `f` inside internal, out-of-memory and validation error scopes.
    ///
    /// Errors wgpu would otherwise hand to its uncaptured-error handler, which
    /// panics by default, come back as `DeviceError`.
    fn checked<T>(&self, what: &'static str, f: impl FnOnce() -> T) -> Result<T, DeviceError> {
        let internal = self.device.push_error_scope(wgpu::ErrorFilter::Internal);
        let oom = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f();

        // Scopes pop in reverse order of creation.
        let validation = pollster::block_on(validation.pop());
        let oom = pollster::block_on(oom.pop());
        let internal = pollster::block_on(internal.pop());

        match oom.or(validation).or(internal) {
            None => Ok(value),
            Some(err) => Err(device_error(what, err)),
        }
    }
}

fn device_error(what: &'static str, err: wgpu::Error) -> DeviceError {
    match err {
        wgpu::Error::OutOfMemory { .. } => DeviceError::OutOfMemory { what },
        wgpu::Error::Validation { description, .. } => DeviceError::Validation { what, description },
        other => DeviceError::Other(format!("{what}: {other}")),
    }
}

impl RenderDevice for WgpuDevice {
    type Fence = WgpuFence;
    type CommandAllocator = WgpuCommandAllocator;
    type CommandList = WgpuCommandList;
    type Texture = WgpuTexture;
    type StagingBuffer = WgpuStagingBuffer;

    fn descriptor_heap(&self) -> DescriptorHeapInfo {
        self.heap.info
    }

    fn create_fence(&self) -> Result<WgpuFence, DeviceError> {
        Ok(WgpuFence::new(self.device.clone(), self.queue.clone()))
    }

    fn create_command_allocator(&self, label: &str) -> Result<WgpuCommandAllocator, DeviceError> {
        Ok(WgpuCommandAllocator {
            label: label.to_string(),
            generation: 0,
        })
    }

    fn begin_commands(
        &self,
        allocator: &mut WgpuCommandAllocator,
    ) -> Result<WgpuCommandList, DeviceError> {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&allocator.label),
            });
        Ok(WgpuCommandList { encoder })
    }

    fn execute(&self, list: WgpuCommandList) -> Result<(), DeviceError> {
        self.checked("command submission", || {
            self.queue.submit(std::iter::once(list.encoder.finish()));
        })
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<WgpuTexture, DeviceError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(DeviceError::InvalidDimensions {
                width: desc.width,
                height: desc.height,
                max,
            });
        }

        let format = match desc.format {
            PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        };

        let (texture, view) = self.checked("texture", || {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&desc.label),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        })?;

        Ok(WgpuTexture {
            texture,
            view,
            state: Cell::new(ResourceState::CopyDest),
        })
    }

    fn copyable_footprint(&self, desc: &TextureDesc) -> Result<CopyableFootprint, DeviceError> {
        footprint_for(
            desc.width,
            desc.height,
            desc.format.bytes_per_pixel(),
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        )
    }

    fn create_staging_buffer(&self, size: u64) -> Result<WgpuStagingBuffer, DeviceError> {
        if size == 0 || size > self.device.limits().max_buffer_size {
            return Err(DeviceError::OutOfMemory { what: "staging buffer" });
        }
        // `write_buffer` needs a size that is a multiple of COPY_BUFFER_ALIGNMENT.
        let padded = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let buffer = self.checked("staging buffer", || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("vitrine upload staging"),
                size: padded,
                usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        Ok(WgpuStagingBuffer { buffer, size: padded })
    }

    fn write_staging(
        &self,
        staging: &mut WgpuStagingBuffer,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        let len = bytes.len() as u64;
        if offset.checked_add(len).is_none_or(|end| end > staging.size) {
            return Err(DeviceError::StagingOutOfBounds {
                offset,
                len,
                size: staging.size,
            });
        }
        // Tail padding keeps the write aligned to COPY_BUFFER_ALIGNMENT.
        let rem = (len % wgpu::COPY_BUFFER_ALIGNMENT) as usize;
        self.checked("staging write", || {
            if rem == 0 {
                self.queue.write_buffer(&staging.buffer, offset, bytes);
            } else {
                let mut aligned = bytes.to_vec();
                aligned.resize(bytes.len() + (wgpu::COPY_BUFFER_ALIGNMENT as usize - rem), 0);
                self.queue.write_buffer(&staging.buffer, offset, &aligned);
            }
        })
    }

    fn bind_shader_view(&self, texture: &WgpuTexture, slot: DescriptorPair) {
        let Some(index) = self.heap.slot_of_cpu(slot.cpu) else {
            log::error!("bind_shader_view: handle {:?} outside heap", slot.cpu);
            return;
        };
        self.heap.views.borrow_mut()[index] = Some(texture.view.clone());
    }

    fn unbind_shader_view(&self, slot: DescriptorPair) {
        if let Some(index) = self.heap.slot_of_cpu(slot.cpu) {
            self.heap.views.borrow_mut()[index] = None;
        }
    }

    fn copy_staging_to_texture(
        &self,
        list: &mut WgpuCommandList,
        staging: &WgpuStagingBuffer,
        footprint: &CopyableFootprint,
        texture: &WgpuTexture,
    ) {
        list.encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &staging.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: footprint.offset,
                    bytes_per_row: Some(footprint.row_pitch),
                    rows_per_image: Some(footprint.rows),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: footprint.width,
                height: footprint.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn texture_barrier(
        &self,
        _list: &mut WgpuCommandList,
        texture: &WgpuTexture,
        before: ResourceState,
        after: ResourceState,
    ) {
        // wgpu inserts the real transition at submit; keep the declared state in
        // sync so mismatched barriers are caught.
        debug_assert_eq!(texture.state.get(), before, "barrier source state mismatch");
        texture.state.set(after);
    }
}
