//! Renderer: GPU texture resources.
//! `TextureBackend` is the graphics-API seam; `WgpuBackend` implements it on wgpu.

pub mod texture;
pub mod wgpu_backend;

pub use texture::{
    FilterMode, GpuTexture, RendererError, TextureBackend, TextureLoadError, UploadDesc,
};
pub use wgpu_backend::{GpuContext, WgpuBackend, WgpuTexture};
