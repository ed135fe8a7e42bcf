//! Color representation shared by the renderer and its callers.
//!
//! Colors are linear with premultiplied alpha; clear colors given in straight
//! alpha are converted before they reach the GPU.

mod color;

pub use color::Color;
