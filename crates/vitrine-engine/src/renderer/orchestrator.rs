use std::path::Path;

use anyhow::{Context, Result};

use crate::config::RendererConfig;
use crate::decode::{ImageDecoder, ImageFileDecoder};
use crate::descriptor::DescriptorSlotAllocator;
use crate::device::{AcquireError, DeviceError, PixelFormat, PresentStatus, RenderDevice, SwapChain};
use crate::frame::FrameSynchronizer;
use crate::paint::Color;
use crate::present::{PresentationSurface, ResizeOutcome};
use crate::texture::{normalize_path, LoadedTextureRegistry, TextureUploadPipeline};

use super::error::{FrameStatus, LoadError, LoadOutcome};

/// Owns the device and every component built on it.
///
/// Single-threaded: all calls come from the thread that drives the window.
/// Teardown is `wait_for_last_submitted_frame` then `shutdown`; dropping a
/// renderer that was not shut down does both.
pub struct Renderer<D, S>
where
    D: RenderDevice,
    S: SwapChain<CommandList = D::CommandList>,
{
    decoder: Box<dyn ImageDecoder>,
    textures: LoadedTextureRegistry<D::Texture>,
    uploads: TextureUploadPipeline<D>,
    slots: DescriptorSlotAllocator,
    surface: PresentationSurface<S>,
    sync: FrameSynchronizer<D::Fence, D::CommandAllocator>,
    device: D,
    shut_down: bool,
}

impl<D, S> Renderer<D, S>
where
    D: RenderDevice,
    S: SwapChain<CommandList = D::CommandList>,
{
    /// Builds the descriptor allocator, frame ring, upload pipeline and
    /// render targets on top of an already created device and swap chain.
    pub fn initialize(device: D, swap_chain: S, config: &RendererConfig) -> Result<Self> {
        anyhow::ensure!(config.frames_in_flight > 0, "frames_in_flight must be at least 1");

        let heap = device.descriptor_heap();
        anyhow::ensure!(heap.capacity > 0, "descriptor heap has no slots");
        let slots = DescriptorSlotAllocator::new(heap);

        if swap_chain.buffer_count() != config.back_buffer_count {
            log::warn!(
                "swap chain has {} buffers, configured for {}",
                swap_chain.buffer_count(),
                config.back_buffer_count
            );
        }

        let fence = device.create_fence().context("failed to create frame fence")?;
        let allocators = (0..config.frames_in_flight)
            .map(|i| device.create_command_allocator(&format!("vitrine frame {i}")))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to create frame command allocators")?;
        let sync = FrameSynchronizer::new(fence, allocators);

        let uploads = TextureUploadPipeline::new(&device).context("failed to create upload fence")?;

        let surface = PresentationSurface::new(swap_chain).context("failed to create render targets")?;

        log::info!(
            "renderer initialized: {} frames in flight, {} back buffers, {} descriptor slots",
            config.frames_in_flight,
            surface.buffer_count(),
            heap.capacity
        );

        Ok(Self {
            decoder: Box::new(ImageFileDecoder),
            textures: LoadedTextureRegistry::new(),
            uploads,
            slots,
            surface,
            sync,
            device,
            shut_down: false,
        })
    }

    /// Replaces the image decoder used by [`request_load`](Self::request_load).
    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn surface(&self) -> &PresentationSurface<S> {
        &self.surface
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer<D::Fence, D::CommandAllocator> {
        &self.sync
    }

    pub fn descriptor_slots(&self) -> &DescriptorSlotAllocator {
        &self.slots
    }

    /// Loaded images, for the UI to draw from.
    pub fn textures(&self) -> &LoadedTextureRegistry<D::Texture> {
        &self.textures
    }

    pub fn is_occluded(&self) -> bool {
        self.surface.is_occluded()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Records and presents one frame.
    ///
    /// The back buffer is cleared to `clear` (premultiplied) and `draw` records
    /// the frame's commands into the open list. Occlusion and surface
    /// reconfiguration skip the frame without error.
    pub fn render<F>(&mut self, clear: Color, draw: F) -> Result<FrameStatus, DeviceError>
    where
        F: FnOnce(&D, &mut D::CommandList, &S::Target),
    {
        if self.shut_down {
            return Ok(FrameStatus::Skipped);
        }

        let target = match self.surface.acquire() {
            Ok(target) => target,
            Err(AcquireError::Occluded) => return Ok(FrameStatus::Occluded),
            Err(AcquireError::Reconfigured) => return Ok(FrameStatus::Skipped),
            Err(AcquireError::Fatal) => {
                log::error!("back buffer acquisition failed fatally");
                return Err(DeviceError::Lost);
            }
        };

        let slot = self.sync.acquire_next();

        let mut list = match self
            .device
            .begin_commands(&mut self.sync.context_mut(slot).allocator)
        {
            Ok(list) => list,
            Err(err) => {
                self.sync.abandon(slot);
                return Err(err);
            }
        };

        let swap_chain = self.surface.swap_chain();
        swap_chain.begin_target(&mut list, &target, clear);
        draw(&self.device, &mut list, &target);
        swap_chain.end_target(&mut list, &target);

        if let Err(err) = self.device.execute(list) {
            self.sync.abandon(slot);
            log::error!("frame submission failed: {err}");
            return Err(err);
        }

        let status = self.surface.present(target);
        self.sync.submit(slot);

        Ok(match status {
            PresentStatus::Presented => FrameStatus::Presented,
            PresentStatus::Occluded => FrameStatus::Occluded,
        })
    }

    /// Resizes the back buffers. Zero or unchanged sizes are ignored.
    pub fn resize_buffers(&mut self, width: u32, height: u32) -> Result<ResizeOutcome, DeviceError> {
        if self.shut_down {
            return Ok(ResizeOutcome::Unchanged);
        }
        self.surface.resize(&mut self.sync, width, height)
    }

    /// Blocks until the most recently submitted frame has completed.
    pub fn wait_for_last_submitted_frame(&mut self) {
        self.sync.wait_for_last_submitted();
    }

    /// Decodes and uploads the image at `path` unless it is already loaded.
    ///
    /// Blocks until the upload has completed on the GPU.
    pub fn request_load(&mut self, path: impl AsRef<Path>) -> Result<LoadOutcome, LoadError> {
        if self.shut_down {
            return Err(LoadError::ShutDown);
        }
        let Some(key) = normalize_path(path.as_ref()) else {
            return Ok(LoadOutcome::Ignored);
        };
        if self.textures.contains(&key) {
            log::debug!("{} already loaded", key.display());
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let image = self.decoder.decode(&key)?;

        let texture = self
            .uploads
            .load(
                &self.device,
                &mut self.slots,
                &image.pixels,
                image.width,
                image.height,
                PixelFormat::Rgba8.bytes_per_pixel(),
            )
            .map_err(|source| LoadError::Upload {
                path: key.clone(),
                source,
            })?;

        log::info!(
            "loaded {} ({}x{}) into slot {}",
            key.display(),
            texture.width(),
            texture.height(),
            texture.slot().map_or(0, |s| s.index)
        );

        if let Err(mut rejected) = self.textures.insert(key, texture) {
            rejected.release(&self.device, &mut self.slots);
        }
        Ok(LoadOutcome::Loaded)
    }

    /// Releases a loaded image and its descriptor slot after draining the GPU.
    pub fn unload(&mut self, path: impl AsRef<Path>) -> bool {
        let Some(key) = normalize_path(path.as_ref()) else {
            return false;
        };
        if !self.textures.contains(&key) {
            return false;
        }
        self.sync.wait_idle();
        self.textures.remove(&key, &self.device, &mut self.slots)
    }

    /// Drains the GPU and releases textures, then render targets.
    ///
    /// Idempotent. The device itself is released when the renderer drops.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.sync.wait_for_last_submitted();
        self.sync.wait_idle();

        self.textures.release_all(&self.device, &mut self.slots);
        self.surface.release();
        self.shut_down = true;

        if self.slots.allocated_count() != 0 {
            log::warn!(
                "{} descriptor slots still allocated at shutdown",
                self.slots.allocated_count()
            );
        }
        log::info!("renderer shut down after {} frames", self.sync.frame_index());
    }
}

impl<D, S> Drop for Renderer<D, S>
where
    D: RenderDevice,
    S: SwapChain<CommandList = D::CommandList>,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
