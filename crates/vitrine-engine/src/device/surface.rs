use crate::paint::Color;

use super::api::{PresentStatus, SwapChain};
use super::error::{AcquireError, DeviceError};
use super::frame::WgpuTarget;
use super::gpu::WgpuCommandList;

/// wgpu surface configured as a swap chain.
///
/// Frame latency is bounded by `desired_maximum_frame_latency`, which wgpu
/// enforces inside `get_current_texture`; that call is the pacing wait.
pub struct WgpuSwapChain<'w> {
    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; the window must outlive the
    /// swap chain.
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,
    buffer_count: u32,
    targets_live: bool,
}

impl<'w> WgpuSwapChain<'w> {
    pub(crate) fn new(
        surface: wgpu::Surface<'w>,
        device: wgpu::Device,
        config: wgpu::SurfaceConfiguration,
        buffer_count: u32,
    ) -> Self {
        Self {
            surface,
            device,
            config,
            buffer_count,
            targets_live: false,
        }
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

impl SwapChain for WgpuSwapChain<'_> {
    type Target = WgpuTarget;
    type CommandList = WgpuCommandList;

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn wait_for_frame_latency(&self) {}

    fn acquire(&mut self) -> Result<WgpuTarget, AcquireError> {
        match self.surface.get_current_texture() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(WgpuTarget { surface_texture, view })
            }
            Err(err) => Err(map_surface_error(&self.surface, &self.device, &self.config, err)),
        }
    }

    fn begin_target(&self, list: &mut WgpuCommandList, target: &WgpuTarget, clear: Color) {
        // Load-op clear; the pass is dropped immediately so the caller can record
        // further passes onto the same encoder.
        let _rpass = list.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vitrine clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: clear.r as f64,
                        g: clear.g as f64,
                        b: clear.b as f64,
                        a: clear.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn end_target(&self, _list: &mut WgpuCommandList, _target: &WgpuTarget) {}

    fn present(&mut self, target: WgpuTarget) -> PresentStatus {
        drop(target.view);
        target.surface_texture.present();
        PresentStatus::Presented
    }

    fn release_render_targets(&mut self) {
        self.targets_live = false;
    }

    fn create_render_targets(&mut self) -> Result<(), DeviceError> {
        self.targets_live = true;
        Ok(())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        debug_assert!(!self.targets_live, "render targets must be released before resize");
        if width == 0 || height == 0 {
            return Err(DeviceError::InvalidDimensions {
                width,
                height,
                max: self.device.limits().max_texture_dimension_2d,
            });
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        Ok(())
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    let preferred: &[wgpu::TextureFormat] = if prefer_srgb {
        &[wgpu::TextureFormat::Rgba8UnormSrgb, wgpu::TextureFormat::Bgra8UnormSrgb]
    } else {
        &[wgpu::TextureFormat::Rgba8Unorm, wgpu::TextureFormat::Bgra8Unorm]
    };
    for f in preferred {
        if caps.formats.contains(f) {
            return Some(*f);
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> AcquireError {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if config.width > 0 && config.height > 0 {
                surface.configure(device, config);
            }
            AcquireError::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => AcquireError::Fatal,
        wgpu::SurfaceError::Timeout => AcquireError::Occluded,
        wgpu::SurfaceError::Other => AcquireError::Occluded,
    }
}
