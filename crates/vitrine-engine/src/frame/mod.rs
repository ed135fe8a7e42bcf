//! Frames in flight.
//!
//! A fixed ring of recording contexts paced by a completion fence. See
//! [`FrameSynchronizer`].

mod sync;

pub use sync::{FrameContext, FrameState, FrameSynchronizer};
