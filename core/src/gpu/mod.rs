//! GPU rendering using wgpu.
//!
//! Provides the hardware `RenderBackend`: phrase textures and point buffers
//! live on the device, and each strategy is a fullscreen-triangle pipeline
//! whose fragment shader evaluates the compositor math per pixel.

pub mod backend;
pub mod context;
pub mod layouts;
pub mod pipelines;
pub mod textures;
pub mod uniforms;

pub use backend::{GpuBackend, GpuBuffer, GpuTexture};
pub use context::{GpuContext, GpuError};
pub use textures::{ReadbackBuffer, RenderTarget};
