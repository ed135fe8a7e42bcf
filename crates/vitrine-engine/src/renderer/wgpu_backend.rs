use anyhow::{Context, Result};
use winit::window::Window;

use crate::config::RendererConfig;
use crate::device::{create_wgpu_backend, WgpuDevice, WgpuSwapChain};

use super::orchestrator::Renderer;

/// Renderer over the wgpu backend, borrowing the window it presents to.
pub type WgpuRenderer<'w> = Renderer<WgpuDevice, WgpuSwapChain<'w>>;

impl<'w> Renderer<WgpuDevice, WgpuSwapChain<'w>> {
    /// Creates the wgpu device and surface for `window` and initializes the
    /// renderer on top of them.
    ///
    /// Blocks on adapter and device acquisition.
    pub fn for_window(window: &'w Window, config: &RendererConfig) -> Result<Self> {
        let (device, swap_chain) = pollster::block_on(create_wgpu_backend(
            window,
            config.gpu.clone(),
            config.back_buffer_count,
            config.descriptor_capacity,
        ))
        .context("failed to initialize wgpu backend")?;

        Self::initialize(device, swap_chain, config)
    }
}
