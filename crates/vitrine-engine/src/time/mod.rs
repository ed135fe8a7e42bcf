//! Frame timing for host loops.
//!
//! `FrameStats` keeps a rolling window of frame durations; call `tick()` once
//! per presented frame.

mod frame_stats;

pub use frame_stats::FrameStats;
