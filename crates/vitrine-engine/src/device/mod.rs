//! GPU device seam + wgpu backend.
//!
//! This module is responsible for:
//! - the traits the renderer core is written against (`RenderDevice`, `Fence`,
//!   `CommandAllocator`, `SwapChain`)
//! - the wgpu implementation of those traits
//! - creating the wgpu Instance/Adapter/Device/Queue and Surface for a window

mod api;
mod error;
mod fence;
mod frame;
mod gpu;
mod init;
mod surface;

pub use api::{
    CommandAllocator, CopyableFootprint, Fence, PixelFormat, PresentStatus, RenderDevice,
    ResourceState, SwapChain, TextureDesc,
};
pub use error::{AcquireError, DeviceError};
pub use fence::WgpuFence;
pub use frame::WgpuTarget;
pub use gpu::{
    create_wgpu_backend, WgpuCommandAllocator, WgpuCommandList, WgpuDevice, WgpuStagingBuffer,
    WgpuTexture,
};
pub use init::GpuInit;
pub use surface::WgpuSwapChain;
