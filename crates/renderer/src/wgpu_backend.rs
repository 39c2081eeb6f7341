//! wgpu implementation of [`TextureBackend`].
//! wgpu = 26.x

use asset::TextureData;
use wgpu::{
    AddressMode, Device, DeviceDescriptor, ErrorFilter, Extent3d, Instance, InstanceDescriptor, Limits,
    Origin3d, PowerPreference, Queue, Sampler, SamplerDescriptor, TexelCopyBufferLayout,
    TexelCopyTextureInfo, Texture, TextureAspect, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};

use crate::texture::{FilterMode, RendererError, TextureBackend, UploadDesc};

/// wgpu has no 3-byte format; RGB sources are widened to this on upload.
const UPLOAD_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Device + queue without a surface, for tools and offline loading.
pub struct GpuContext {
    device: Device,
    queue: Queue,
}

impl GpuContext {
    /// Create a headless device on one of `backends`.
    pub fn headless(backends: wgpu::Backends) -> Result<Self, RendererError> {
        pollster::block_on(Self::headless_async(backends))
    }

    async fn headless_async(backends: wgpu::Backends) -> Result<Self, RendererError> {
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RendererError::NoAdapter(e.to_string()))?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Studio Device"),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await?;

        Ok(Self { device, queue })
    }

    pub fn backend(&self) -> WgpuBackend<'_> {
        WgpuBackend::new(&self.device, &self.queue)
    }
}

/// Texture object plus the view and sampler needed to bind it.
pub struct WgpuTexture {
    pub texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
}

impl std::fmt::Debug for WgpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self.texture.size();
        f.debug_struct("WgpuTexture")
            .field("width", &size.width)
            .field("height", &size.height)
            .field("format", &self.texture.format())
            .finish()
    }
}

pub struct WgpuBackend<'a> {
    device: &'a Device,
    queue: &'a Queue,
}

impl<'a> WgpuBackend<'a> {
    pub fn new(device: &'a Device, queue: &'a Queue) -> Self {
        Self { device, queue }
    }
}

fn to_wgpu_filter(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

impl TextureBackend for WgpuBackend<'_> {
    type Handle = WgpuTexture;

    fn upload(
        &mut self,
        desc: &UploadDesc<'_>,
        data: &TextureData,
    ) -> Result<WgpuTexture, RendererError> {
        if !data.is_valid() {
            return Err(RendererError::InvalidData {
                width: data.width,
                height: data.height,
                format: data.format,
                len: data.data.len(),
            });
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if data.width > max || data.height > max {
            return Err(RendererError::TooLarge {
                width: data.width,
                height: data.height,
                max,
            });
        }

        // Capture upload errors here instead of in the device's uncaptured-error handler.
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);

        let size = Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&TextureDescriptor {
            label: desc.label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: UPLOAD_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let pixels = data.to_rgba8_pixels();
        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &pixels,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width),
                rows_per_image: Some(data.height),
            },
            size,
        );

        let filter = to_wgpu_filter(desc.filter);
        let sampler = self.device.create_sampler(&SamplerDescriptor {
            label: desc.label,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });
        let view = texture.create_view(&TextureViewDescriptor::default());

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            texture.destroy();
            return Err(RendererError::Upload(err.to_string()));
        }

        log::debug!(
            "Created wgpu texture {:?} {}x{} (source {:?})",
            desc.label,
            data.width,
            data.height,
            data.format
        );
        Ok(WgpuTexture {
            texture,
            view,
            sampler,
        })
    }

    fn release(&mut self, handle: WgpuTexture) {
        handle.texture.destroy();
    }
}
