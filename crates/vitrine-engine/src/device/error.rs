use thiserror::Error;

/// Failure reported by a device creation or submission call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("invalid texture dimensions {width}x{height} (max {max})")]
    InvalidDimensions { width: u32, height: u32, max: u32 },

    #[error("size computation overflowed")]
    SizeOverflow,

    #[error("out of memory while creating {what}")]
    OutOfMemory { what: &'static str },

    #[error("wgpu rejected {what}: {description}")]
    Validation { what: &'static str, description: String },

    #[error("staging write of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    StagingOutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("device lost")]
    Lost,

    #[error("{0}")]
    Other(String),
}

/// Why a back buffer could not be acquired.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum AcquireError {
    /// Surface is hidden or timed out; skip this frame.
    #[error("surface occluded")]
    Occluded,
    /// Surface was lost or outdated and has been reconfigured; skip this frame.
    #[error("surface reconfigured")]
    Reconfigured,
    /// Unrecoverable (commonly out of memory).
    #[error("surface acquisition failed fatally")]
    Fatal,
}
