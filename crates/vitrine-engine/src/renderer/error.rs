use std::path::PathBuf;

use thiserror::Error;

use crate::decode::DecodeError;
use crate::texture::UploadError;

/// Why `request_load` did not register an image. The registry is unchanged.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to upload {}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: UploadError,
    },

    #[error("renderer has been shut down")]
    ShutDown,
}

/// What `request_load` did on success.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadOutcome {
    /// Decoded, uploaded and registered.
    Loaded,
    /// Path already registered; no work done.
    AlreadyLoaded,
    /// Empty path; nothing to do.
    Ignored,
}

/// What `render` did with the frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Presented,
    /// Surface hidden; the frame was dropped or presented without being shown.
    Occluded,
    /// Surface was reconfigured or the renderer is shut down.
    Skipped,
}
