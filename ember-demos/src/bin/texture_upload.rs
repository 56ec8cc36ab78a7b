//! Headless upload demo: bring up a device, stream a generated 64x64 RGBA8
//! image through the resource loader, and report allocator balance.

use ember_loader::{RawImage, ResourceLoader, ResourceLoaderDesc};
use ember_rhi::{AdapterDesc, BackendDesc, DeviceDesc, Format, VulkanBackend};

fn main() {
    env_logger::init();

    let backend = match VulkanBackend::create(&BackendDesc { app_name: "texture_upload".to_string() }) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("backend creation failed: {e}");
            return;
        }
    };
    let Some(adapter) = backend.request_adapter(&AdapterDesc::default()) else {
        return;
    };
    let device = match adapter.request_device(&DeviceDesc::default()) {
        Ok(device) => device,
        Err(e) => {
            log::error!("device creation failed: {e}");
            return;
        }
    };

    {
        let loader = ResourceLoader::new(
            device.clone(),
            &ResourceLoaderDesc { staging_buffer_size: 16 * 1024 * 1024, staging_buffer_count: 2 },
        )
        .expect("resource loader");

        // A 64x64 gradient.
        let mut pixels = vec![0u8; 64 * 64 * 4];
        for y in 0..64usize {
            for x in 0..64usize {
                let i = (y * 64 + x) * 4;
                pixels[i] = (x * 4) as u8;
                pixels[i + 1] = (y * 4) as u8;
                pixels[i + 2] = 0x80;
                pixels[i + 3] = 0xFF;
            }
        }
        let image = RawImage::new_2d(64, 64, Format::R8G8B8A8Unorm, pixels);

        let texture = loader.load_texture(Box::new(image), "gradient").expect("texture upload");
        loader.wait_idle();
        log::info!(
            "uploaded {}x{} texture, {} mips",
            texture.width(),
            texture.height(),
            texture.mip_levels()
        );
        drop(texture);
    }

    device.wait_idle();
    // The device's default resources are still alive here; the allocator
    // balances fully once the device itself is released.
    let stats = device.allocator_stats();
    log::info!(
        "allocator: {} allocations, {} frees so far",
        stats.allocation_count,
        stats.free_count,
    );

    adapter.release_device(device);
    backend.release_adapter(adapter);
}
