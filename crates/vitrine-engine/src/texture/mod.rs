//! Texture upload and ownership.
//!
//! - `footprint`: staging layout math (row pitch alignment, row packing)
//! - `upload`: one-shot staging copy into a new sampled texture
//! - `gpu_texture`: move-only texture + descriptor slot ownership
//! - `registry`: loaded images keyed by source path

mod footprint;
mod gpu_texture;
mod registry;
mod upload;

pub use footprint::{align_up, footprint_for, pack_rows};
pub use gpu_texture::GpuTexture;
pub use registry::{fit_within, normalize_path, LoadedTextureRegistry, TextureInfo, MAX_DISPLAY_EXTENT};
pub use upload::{TextureUploadPipeline, UploadError};
