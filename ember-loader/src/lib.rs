//! Ember resource loader: an asynchronous CPU→GPU upload engine over a ring
//! of staging buffers, driven by a background worker thread.

mod image;
mod loader;

pub use image::{Image, RawImage};
pub use loader::{ResourceLoader, ResourceLoaderDesc, UpdateBufferDesc, UpdateTextureDesc};
