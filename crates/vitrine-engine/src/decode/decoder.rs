use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;

/// Decoded pixels: RGBA8, top-to-bottom, `width * 4` bytes per row.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{} has no pixels", path.display())]
    Empty { path: PathBuf },
}

/// Turns an image file into RGBA8 pixels.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate. The format is guessed from content,
/// falling back to the extension.
#[derive(Debug, Default, Copy, Clone)]
pub struct ImageFileDecoder;

impl ImageDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let io_err = |source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let image_err = |source| DecodeError::Image {
            path: path.to_path_buf(),
            source,
        };

        let rgba = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(image_err)?
            .to_rgba8();

        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(DecodedImage {
            pixels: rgba.into_raw(),
            width,
            height,
        })
    }
}
