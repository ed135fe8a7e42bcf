use crate::device::{AcquireError, CommandAllocator, DeviceError, Fence, PresentStatus, SwapChain};
use crate::frame::FrameSynchronizer;

/// What a resize request did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResizeOutcome {
    Resized { width: u32, height: u32 },
    /// Zero-sized request (minimized window); nothing touched.
    SkippedZero,
    /// Same size as the current back buffers; nothing touched.
    Unchanged,
}

/// Owns the swap chain's render-target set and its resize lifecycle.
///
/// Occlusion is tracked as a flag rather than an error. The host keeps calling
/// into the surface; frames simply are not drawn while it is set.
pub struct PresentationSurface<S: SwapChain> {
    swap_chain: S,
    occluded: bool,
    targets_live: bool,
}

impl<S: SwapChain> PresentationSurface<S> {
    /// Creates the render targets for every back buffer.
    pub fn new(mut swap_chain: S) -> Result<Self, DeviceError> {
        swap_chain.create_render_targets()?;
        log::debug!(
            "presentation surface: {} back buffers, {:?}",
            swap_chain.buffer_count(),
            swap_chain.size()
        );
        Ok(Self {
            swap_chain,
            occluded: false,
            targets_live: true,
        })
    }

    pub fn swap_chain(&self) -> &S {
        &self.swap_chain
    }

    pub fn buffer_count(&self) -> u32 {
        self.swap_chain.buffer_count()
    }

    pub fn size(&self) -> (u32, u32) {
        self.swap_chain.size()
    }

    /// Whether the last acquire or present reported the surface as hidden.
    pub fn is_occluded(&self) -> bool {
        self.occluded
    }

    /// Waits for frame latency, then acquires the next back buffer.
    pub fn acquire(&mut self) -> Result<S::Target, AcquireError> {
        self.swap_chain.wait_for_frame_latency();
        match self.swap_chain.acquire() {
            Ok(target) => {
                self.occluded = false;
                Ok(target)
            }
            Err(AcquireError::Occluded) => {
                self.occluded = true;
                Err(AcquireError::Occluded)
            }
            Err(err) => Err(err),
        }
    }

    pub fn present(&mut self, target: S::Target) -> PresentStatus {
        let status = self.swap_chain.present(target);
        self.occluded = status == PresentStatus::Occluded;
        status
    }

    /// Resizes the back buffers after draining in-flight work.
    ///
    /// Zero or unchanged dimensions are a no-op and do not wait.
    pub fn resize<F, A>(
        &mut self,
        sync: &mut FrameSynchronizer<F, A>,
        width: u32,
        height: u32,
    ) -> Result<ResizeOutcome, DeviceError>
    where
        F: Fence,
        A: CommandAllocator,
    {
        if width == 0 || height == 0 {
            return Ok(ResizeOutcome::SkippedZero);
        }
        if self.swap_chain.size() == (width, height) && self.targets_live {
            return Ok(ResizeOutcome::Unchanged);
        }

        sync.wait_for_last_submitted();
        // An abandoned frame can leave the newest stamp in another slot.
        sync.wait_idle();

        self.release();
        self.swap_chain.resize_buffers(width, height)?;
        self.swap_chain.create_render_targets()?;
        self.targets_live = true;

        log::debug!("swap chain resized to {width}x{height}");
        Ok(ResizeOutcome::Resized { width, height })
    }

    /// Releases every render-target view. Idempotent.
    pub fn release(&mut self) {
        if self.targets_live {
            self.swap_chain.release_render_targets();
            self.targets_live = false;
        }
    }
}
