//! Image file decoding into tightly packed RGBA8.

mod decoder;

pub use decoder::{DecodeError, DecodedImage, ImageDecoder, ImageFileDecoder};
