//! Vitrine engine crate.
//!
//! GPU resource and synchronization layer for an image-viewing UI surface:
//! descriptor slot allocation, frames-in-flight pacing, swap-chain resize,
//! and synchronous texture upload, over a wgpu backend.

pub mod config;
pub mod decode;
pub mod descriptor;
pub mod device;
pub mod frame;
pub mod logging;
pub mod paint;
pub mod present;
pub mod renderer;
pub mod texture;
pub mod time;

#[cfg(test)]
mod testing;

pub use config::RendererConfig;
pub use renderer::{FrameStatus, LoadError, LoadOutcome, Renderer, WgpuRenderer};
