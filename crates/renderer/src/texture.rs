//! GPU textures built from image files.
//!
//! The graphics API sits behind [`TextureBackend`]; [`GpuTexture`] drives it:
//! decode on the CPU, upload once, keep the handle and pixel size around.

use std::path::Path;

use asset::{TextureData, TextureError, TextureFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(String),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("texture {width}x{height} exceeds the device limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("texture upload failed: {0}")]
    Upload(String),
    #[error("{len} bytes do not describe a {width}x{height} {format:?} image")]
    InvalidData {
        width: u32,
        height: u32,
        format: TextureFormat,
        len: usize,
    },
}

/// Failure of [`GpuTexture::load`], split by stage.
#[derive(Debug, Error)]
pub enum TextureLoadError {
    #[error("texture decode failed: {0}")]
    Decode(#[from] TextureError),
    #[error("texture upload failed: {0}")]
    Upload(#[from] RendererError),
}

/// Sampling filter applied for both minification and magnification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Parameters for one texture upload.
#[derive(Clone, Copy, Debug, Default)]
pub struct UploadDesc<'a> {
    pub label: Option<&'a str>,
    pub filter: FilterMode,
}

/// Graphics-API capability used to create and free textures.
/// Calls must happen on the thread that owns the graphics context.
pub trait TextureBackend {
    type Handle;

    /// Create a texture object, upload `texture`'s pixels and set its filtering.
    fn upload(
        &mut self,
        desc: &UploadDesc<'_>,
        texture: &TextureData,
    ) -> Result<Self::Handle, RendererError>;

    /// Free the GPU object behind `handle`.
    fn release(&mut self, handle: Self::Handle);
}

/// A texture resident on the GPU. Freed explicitly with [`GpuTexture::destroy`].
#[derive(Debug)]
pub struct GpuTexture<H> {
    handle: H,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl<H> GpuTexture<H> {
    /// Read, decode and upload an image file with linear filtering.
    /// The decoded pixels are dropped once the upload returns.
    pub fn load<B>(path: impl AsRef<Path>, backend: &mut B) -> Result<Self, TextureLoadError>
    where
        B: TextureBackend<Handle = H>,
    {
        let path = path.as_ref();
        let data = TextureData::load(path)?;
        let label = path.to_string_lossy();
        let desc = UploadDesc {
            label: Some(&*label),
            filter: FilterMode::Linear,
        };
        Self::from_data(&data, &desc, backend)
    }

    /// Upload already decoded pixels. The buffer must match the stated size and format.
    pub fn from_data<B>(
        data: &TextureData,
        desc: &UploadDesc<'_>,
        backend: &mut B,
    ) -> Result<Self, TextureLoadError>
    where
        B: TextureBackend<Handle = H>,
    {
        if !data.is_valid() {
            return Err(RendererError::InvalidData {
                width: data.width,
                height: data.height,
                format: data.format,
                len: data.data.len(),
            }
            .into());
        }
        let handle = backend.upload(desc, data)?;
        log::debug!(
            "Uploaded {:?} texture {}x{}",
            data.format,
            data.width,
            data.height
        );
        Ok(Self {
            handle,
            width: data.width,
            height: data.height,
            format: data.format,
        })
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of the decoded source image.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Release the GPU resource.
    pub fn destroy<B>(self, backend: &mut B)
    where
        B: TextureBackend<Handle = H>,
    {
        backend.release(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[derive(Debug)]
    struct Upload {
        width: u32,
        height: u32,
        format: TextureFormat,
        filter: FilterMode,
        bytes: usize,
    }

    /// Stands in for a graphics context; hands out increasing integer names.
    #[derive(Default)]
    struct RecordingBackend {
        next: u32,
        uploads: Vec<Upload>,
        released: Vec<u32>,
        refuse: bool,
    }

    impl TextureBackend for RecordingBackend {
        type Handle = u32;

        fn upload(
            &mut self,
            desc: &UploadDesc<'_>,
            texture: &TextureData,
        ) -> Result<u32, RendererError> {
            if self.refuse {
                return Err(RendererError::Upload("out of memory".into()));
            }
            self.uploads.push(Upload {
                width: texture.width,
                height: texture.height,
                format: texture.format,
                filter: desc.filter,
                bytes: texture.data.len(),
            });
            self.next += 1;
            Ok(self.next)
        }

        fn release(&mut self, handle: u32) {
            self.released.push(handle);
        }
    }

    fn png(dir: &tempfile::TempDir, img: image::DynamicImage) -> PathBuf {
        let path = dir.path().join("tex.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn load_uploads_with_linear_filtering() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(&dir, image::RgbaImage::new(8, 4).into());
        let mut backend = RecordingBackend::default();

        let tex = GpuTexture::load(&path, &mut backend).unwrap();
        assert_eq!(*tex.handle(), 1);
        assert_eq!(tex.size(), (8, 4));
        assert_eq!(tex.format(), TextureFormat::Rgba8);

        let up = &backend.uploads[0];
        assert_eq!((up.width, up.height), (8, 4));
        assert_eq!(up.filter, FilterMode::Linear);
        assert_eq!(up.bytes, 8 * 4 * 4);
    }

    #[test]
    fn opaque_image_uploads_three_bytes_per_pixel() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(&dir, image::RgbImage::new(5, 5).into());
        let mut backend = RecordingBackend::default();

        let tex = GpuTexture::load(&path, &mut backend).unwrap();
        assert_eq!(tex.format(), TextureFormat::Rgb8);
        assert_eq!(backend.uploads[0].format, TextureFormat::Rgb8);
        assert_eq!(backend.uploads[0].bytes, 5 * 5 * 3);
    }

    #[test]
    fn decode_failure_never_reaches_the_gpu() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let mut backend = RecordingBackend::default();

        let err = GpuTexture::load(&path, &mut backend).unwrap_err();
        assert!(matches!(err, TextureLoadError::Decode(TextureError::Decode(_))));
        assert!(backend.uploads.is_empty());
    }

    #[test]
    fn missing_file_is_a_decode_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = RecordingBackend::default();
        let err = GpuTexture::load(dir.path().join("nope.png"), &mut backend).unwrap_err();
        assert!(matches!(
            err,
            TextureLoadError::Decode(TextureError::FileNotFound(_))
        ));
    }

    #[test]
    fn upload_failure_is_reported_separately() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(&dir, image::RgbaImage::new(2, 2).into());
        let mut backend = RecordingBackend {
            refuse: true,
            ..Default::default()
        };
        let err = GpuTexture::load(&path, &mut backend).unwrap_err();
        assert!(matches!(err, TextureLoadError::Upload(_)));
    }

    #[test]
    fn mismatched_buffer_is_rejected_before_upload() {
        let mut backend = RecordingBackend::default();
        let data = TextureData {
            data: vec![0; 3],
            width: 2,
            height: 2,
            format: TextureFormat::Rgba8,
        };
        let err = GpuTexture::from_data(&data, &UploadDesc::default(), &mut backend).unwrap_err();
        assert!(matches!(
            err,
            TextureLoadError::Upload(RendererError::InvalidData { len: 3, .. })
        ));
        assert!(backend.uploads.is_empty());
    }

    #[test]
    fn destroy_releases_the_handle() {
        let mut backend = RecordingBackend::default();
        let data = TextureData::new_rgba8(1, 1, vec![0, 0, 0, 255]);
        let a = GpuTexture::from_data(&data, &UploadDesc::default(), &mut backend).unwrap();
        let b = GpuTexture::from_data(&data, &UploadDesc::default(), &mut backend).unwrap();
        a.destroy(&mut backend);
        assert_eq!(backend.released, vec![1]);
        b.destroy(&mut backend);
        assert_eq!(backend.released, vec![1, 2]);
    }
}
