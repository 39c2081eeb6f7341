//! Asset loading/parsers.
//! Image files are read and decoded into CPU-side texture data ready for upload.

pub mod texture;

pub use texture::{TextureData, TextureError, TextureFormat};
