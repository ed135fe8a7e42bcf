use crate::descriptor::{DescriptorHeapInfo, DescriptorPair};
use crate::paint::Color;

use super::error::{AcquireError, DeviceError};

/// Pixel formats the upload path understands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelFormat {
    /// 8-bit RGBA, sRGB encoded, as produced by common image decoders.
    Rgba8,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Description of a sampled 2D texture.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Usage state of a GPU resource, as declared by barriers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceState {
    /// Target of a copy operation.
    CopyDest,
    /// Readable from pixel shaders.
    PixelShaderResource,
    /// Bound as a color attachment.
    RenderTarget,
    /// Owned by the presentation engine.
    Present,
}

/// Placement of one subresource inside a linear staging buffer.
///
/// `row_pitch` is the padded destination stride; `row_size` is the number of
/// meaningful bytes per row. `total_bytes` is the minimum staging size, which is
/// `offset + row_pitch * (rows - 1) + row_size`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CopyableFootprint {
    pub offset: u64,
    pub width: u32,
    pub height: u32,
    pub row_pitch: u32,
    pub row_size: u32,
    pub rows: u32,
    pub total_bytes: u64,
}

/// GPU-side completion counter.
///
/// Values are signaled on the queue after previously submitted work and become
/// "completed" once the device has finished that work. `wait` blocks the calling
/// thread with no timeout.
pub trait Fence {
    /// Enqueues a signal of `value` behind all work submitted so far.
    fn signal(&self, value: u64);

    /// Highest value the device has confirmed.
    fn completed_value(&self) -> u64;

    /// Blocks until `completed_value() >= value`.
    fn wait(&self, value: u64);
}

/// Backing memory for recorded commands, reused across frames.
pub trait CommandAllocator {
    /// Recycles the allocator. Only valid once all work recorded from it has
    /// been confirmed complete.
    fn reset(&mut self);
}

/// Device operations the renderer core depends on.
///
/// One implementation drives wgpu; tests drive a scripted device. Creation
/// calls return `Result` so that callers can unwind partially built state.
pub trait RenderDevice {
    type Fence: Fence;
    type CommandAllocator: CommandAllocator;
    type CommandList;
    type Texture;
    type StagingBuffer;

    /// Geometry of the shader-visible descriptor heap owned by the device.
    fn descriptor_heap(&self) -> DescriptorHeapInfo;

    fn create_fence(&self) -> Result<Self::Fence, DeviceError>;

    fn create_command_allocator(&self, label: &str) -> Result<Self::CommandAllocator, DeviceError>;

    /// Opens a command list recording into `allocator`.
    fn begin_commands(
        &self,
        allocator: &mut Self::CommandAllocator,
    ) -> Result<Self::CommandList, DeviceError>;

    /// Closes and submits a command list to the queue.
    fn execute(&self, list: Self::CommandList) -> Result<(), DeviceError>;

    /// Creates a texture in [`ResourceState::CopyDest`].
    fn create_texture(&self, desc: &TextureDesc) -> Result<Self::Texture, DeviceError>;

    /// Staging layout required to fill `desc` with a single copy.
    fn copyable_footprint(&self, desc: &TextureDesc) -> Result<CopyableFootprint, DeviceError>;

    /// Creates a CPU-writable linear buffer of `size` bytes in upload memory.
    fn create_staging_buffer(&self, size: u64) -> Result<Self::StagingBuffer, DeviceError>;

    /// Writes `bytes` into `staging` starting at `offset`.
    fn write_staging(
        &self,
        staging: &mut Self::StagingBuffer,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), DeviceError>;

    /// Writes a shader-resource view of `texture` into the heap slot.
    fn bind_shader_view(&self, texture: &Self::Texture, slot: DescriptorPair);

    /// Clears the heap slot so it no longer references any resource.
    fn unbind_shader_view(&self, slot: DescriptorPair);

    fn copy_staging_to_texture(
        &self,
        list: &mut Self::CommandList,
        staging: &Self::StagingBuffer,
        footprint: &CopyableFootprint,
        texture: &Self::Texture,
    );

    fn texture_barrier(
        &self,
        list: &mut Self::CommandList,
        texture: &Self::Texture,
        before: ResourceState,
        after: ResourceState,
    );
}

/// Result of handing a frame to the presentation engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentStatus {
    Presented,
    /// The surface is not visible (e.g. minimized). Not an error.
    Occluded,
}

/// Swappable render targets bound to a window.
pub trait SwapChain {
    /// A back buffer acquired for one frame.
    type Target;
    type CommandList;

    fn buffer_count(&self) -> u32;

    /// Current back-buffer size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Blocks until the presentation engine accepts another frame.
    fn wait_for_frame_latency(&self);

    /// Acquires the next back buffer.
    fn acquire(&mut self) -> Result<Self::Target, AcquireError>;

    /// Transitions the target to render-target use and clears it.
    fn begin_target(&self, list: &mut Self::CommandList, target: &Self::Target, clear: Color);

    /// Transitions the target back to presentable.
    fn end_target(&self, list: &mut Self::CommandList, target: &Self::Target);

    fn present(&mut self, target: Self::Target) -> PresentStatus;

    /// Drops every view/resource referencing the back buffers.
    fn release_render_targets(&mut self);

    /// Recreates the back-buffer views after creation or resize.
    fn create_render_targets(&mut self) -> Result<(), DeviceError>;

    /// Resizes the back buffers. Render targets must be released first.
    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError>;
}
