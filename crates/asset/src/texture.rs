//! Texture loading and data structures.
//! Image files are decoded from an in-memory buffer into RGB8 or RGBA8 pixels.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture file not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("failed to read texture {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decoded image is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Pixel layouts produced by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// Opaque, 3 bytes per pixel.
    Rgb8,
    /// With alpha, 4 bytes per pixel.
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, TextureFormat::Rgba8)
    }
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::with_format(width, height, data, TextureFormat::Rgba8)
    }

    /// Create a new texture with given dimensions and RGB8 format.
    pub fn new_rgb8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::with_format(width, height, data, TextureFormat::Rgb8)
    }

    fn with_format(width: u32, height: u32, data: Vec<u8>, format: TextureFormat) -> Self {
        assert_eq!(
            data.len(),
            (width * height * format.bytes_per_pixel()) as usize,
            "Data size doesn't match {format:?} format"
        );
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Read the whole file and decode it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => TextureError::FileNotFound(path.to_path_buf()),
            _ => TextureError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::decode(&bytes)
    }

    /// Decode an encoded image (PNG, JPEG, BMP) held in memory.
    /// Images carrying an alpha channel keep it; everything else becomes RGB8.
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }

        let texture = if img.color().has_alpha() {
            Self::new_rgba8(width, height, img.into_rgba8().into_raw())
        } else {
            Self::new_rgb8(width, height, img.into_rgb8().into_raw())
        };

        log::info!(
            "Decoded texture {}x{} ({:?}) with {} bytes",
            width,
            height,
            texture.format,
            texture.data.len()
        );
        Ok(texture)
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    /// Pixels as RGBA8, expanding RGB8 with an opaque alpha.
    pub fn to_rgba8_pixels(&self) -> std::borrow::Cow<'_, [u8]> {
        match self.format {
            TextureFormat::Rgba8 => std::borrow::Cow::Borrowed(&self.data[..]),
            TextureFormat::Rgb8 => std::borrow::Cow::Owned(
                self.data
                    .chunks_exact(3)
                    .flat_map(|px| [px[0], px[1], px[2], 255])
                    .collect(),
            ),
        }
    }
}
