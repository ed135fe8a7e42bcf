//! Renderer orchestrator.
//!
//! Owns the device and wires the descriptor allocator, frame ring,
//! presentation surface, upload pipeline and texture registry together.
//! Hosts drive it with `render`, `resize_buffers`, `request_load`,
//! `wait_for_last_submitted_frame` and `shutdown`.

mod error;
mod orchestrator;
mod wgpu_backend;

pub use error::{FrameStatus, LoadError, LoadOutcome};
pub use orchestrator::Renderer;
pub use wgpu_backend::WgpuRenderer;
