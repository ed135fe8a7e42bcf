//! Presentation surface and its resize lifecycle.

mod surface;

pub use surface::{PresentationSurface, ResizeOutcome};
