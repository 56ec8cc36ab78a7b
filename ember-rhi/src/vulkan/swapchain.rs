//! Swap chain: surface plumbing, present-queue resolution, format and
//! present-mode negotiation, and per-image render targets.

use std::sync::Arc;

use ash::vk::{self, Handle};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::{ClearValue, Format, RenderTargetDesc, ResourceState, RhiError, SampleCount};

use super::convert;
use super::device::{DeviceShared, VulkanDevice};
use super::queue::VulkanQueue;
use super::render_target::VulkanRenderTarget;
use super::sync::{VulkanFence, VulkanSemaphore};

pub struct SwapChainDesc<'a> {
    pub display_handle: RawDisplayHandle,
    pub window_handle: RawWindowHandle,
    /// Queue that will present; the swap chain may still resolve a
    /// dedicated present queue of its own.
    pub present_queue: &'a VulkanQueue,
    pub width: u32,
    pub height: u32,
    pub image_count: u32,
    pub use_hdr: bool,
    pub enable_vsync: bool,
    pub color_clear_value: ClearValue,
}

pub struct VulkanSwapChain {
    device: Arc<DeviceShared>,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    handle: vk::SwapchainKHR,
    render_targets: Vec<VulkanRenderTarget>,
    /// Set when presentation runs on a different family than the graphics
    /// queue handed in at creation.
    present_queue: Option<vk::Queue>,
    present_family_index: u32,
    format: Format,
    width: u32,
    height: u32,
    enable_vsync: bool,
}

impl VulkanSwapChain {
    pub(crate) fn create(device: &VulkanDevice, desc: &SwapChainDesc<'_>) -> Result<VulkanSwapChain, RhiError> {
        let shared = Arc::clone(device.shared());
        let instance_shared = shared.adapter.instance_shared();
        let physical_device = shared.adapter.handle();

        let surface = unsafe {
            ash_window::create_surface(
                &instance_shared.entry,
                &instance_shared.instance,
                desc.display_handle,
                desc.window_handle,
                None,
            )
            .map_err(|e| RhiError::resource(format!("create_surface: {e:?}")))?
        };
        let surface_loader =
            ash::khr::surface::Instance::new(&instance_shared.entry, &instance_shared.instance);
        // Tear the surface down on any failure past this point.
        let fail = |surface_loader: &ash::khr::surface::Instance, error: RhiError| -> RhiError {
            unsafe { surface_loader.destroy_surface(surface, None) };
            error
        };

        // Present-capable family, preferring one distinct from the
        // requested present queue's family.
        let family_count = unsafe {
            instance_shared
                .instance
                .get_physical_device_queue_family_properties(physical_device)
                .len() as u32
        };
        let mut first_available = None;
        let mut dedicated = None;
        for family in 0..family_count {
            let supported = unsafe {
                surface_loader
                    .get_physical_device_surface_support(physical_device, family, surface)
                    .unwrap_or(false)
            };
            if !supported {
                continue;
            }
            if first_available.is_none() {
                first_available = Some(family);
            }
            if dedicated.is_none() && family != desc.present_queue.family_index() as u32 {
                dedicated = Some(family);
                break;
            }
        }
        let Some(present_family_index) = dedicated.or(first_available) else {
            return Err(fail(&surface_loader, RhiError::config("no present-capable queue family")));
        };
        let present_queue = (present_family_index != desc.present_queue.family_index() as u32)
            .then(|| unsafe { shared.device.get_device_queue(present_family_index, 0) });

        let capabilities = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| {
                    fail(&surface_loader, RhiError::resource(format!("surface capabilities: {e:?}")))
                })?
        };

        // Image count clamped into the surface's supported interval.
        let mut image_count = if desc.image_count == 0 {
            capabilities.min_image_count + 1
        } else {
            desc.image_count
        };
        if image_count < capabilities.min_image_count {
            log::warn!(
                "requested swap chain image count {} below the surface minimum {}",
                image_count,
                capabilities.min_image_count
            );
            image_count = capabilities.min_image_count;
        }
        if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
            log::warn!(
                "requested swap chain image count {} above the surface maximum {}",
                image_count,
                capabilities.max_image_count
            );
            image_count = capabilities.max_image_count;
        }

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: desc.width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: desc.height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        let usage = vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST;
        if !capabilities.supported_usage_flags.contains(usage) {
            return Err(fail(
                &surface_loader,
                RhiError::config("surface does not support color-attachment + transfer-dst usage"),
            ));
        }
        let pre_transform = if capabilities
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            vk::SurfaceTransformFlagsKHR::IDENTITY
        } else {
            capabilities.current_transform
        };

        // Format: HDR10 when requested and the surface agrees, else sRGB.
        let formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| fail(&surface_loader, RhiError::resource(format!("surface formats: {e:?}"))))?
        };
        let srgb = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let hdr = vk::SurfaceFormatKHR {
            format: vk::Format::A2B10G10R10_UNORM_PACK32,
            color_space: vk::ColorSpaceKHR::HDR10_ST2084_EXT,
        };
        let hdr_supported =
            formats.iter().any(|f| f.format == hdr.format && f.color_space == hdr.color_space);
        let srgb_supported =
            formats.iter().any(|f| f.format == srgb.format && f.color_space == srgb.color_space);
        if desc.use_hdr && !hdr_supported {
            log::warn!("presentation surface does not support HDR10, using sRGB instead");
        }
        let use_srgb = !desc.use_hdr || !hdr_supported;
        if use_srgb && !srgb_supported {
            log::warn!("presentation surface does not report sRGB B8G8R8A8, using it anyway");
        }
        let surface_format = if use_srgb { srgb } else { hdr };

        // Present mode: mailbox preferred, FIFO accepted, anything else is
        // a configuration failure.
        let present_modes = unsafe {
            surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    fail(&surface_loader, RhiError::resource(format!("surface present modes: {e:?}")))
                })?
        };
        let mut present_mode = None;
        for mode in present_modes {
            if mode == vk::PresentModeKHR::MAILBOX {
                present_mode = Some(mode);
                break;
            }
            if mode == vk::PresentModeKHR::FIFO {
                present_mode = Some(mode);
            }
        }
        let Some(present_mode) = present_mode else {
            return Err(fail(&surface_loader, RhiError::config("neither mailbox nor FIFO present mode supported")));
        };

        let family_indices = [present_family_index];
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&family_indices)
            .pre_transform(pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let swapchain_loader =
            ash::khr::swapchain::Device::new(&instance_shared.instance, &shared.device);
        let handle = unsafe {
            swapchain_loader.create_swapchain(&create_info, None).map_err(|e| {
                fail(&surface_loader, RhiError::resource(format!("vkCreateSwapchainKHR: {e:?}")))
            })?
        };

        let images = unsafe {
            swapchain_loader.get_swapchain_images(handle).map_err(|e| {
                swapchain_loader.destroy_swapchain(handle, None);
                fail(&surface_loader, RhiError::resource(format!("vkGetSwapchainImagesKHR: {e:?}")))
            })?
        };

        let format = convert::from_vk_format(surface_format.format);
        let mut render_targets = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let rt_desc = RenderTargetDesc {
                name: format!("SwapChain RT[{i}]"),
                native_handle: Some(image.as_raw()),
                width: extent.width,
                height: extent.height,
                depth: 1,
                array_size: 1,
                mip_levels: 1,
                sample_count: SampleCount::Count1,
                format,
                start_state: ResourceState::PRESENT,
                clear_value: desc.color_clear_value,
                ..Default::default()
            };
            match device.create_render_target(&rt_desc) {
                Ok(render_target) => render_targets.push(render_target),
                Err(e) => {
                    drop(render_targets);
                    unsafe { swapchain_loader.destroy_swapchain(handle, None) };
                    return Err(fail(&surface_loader, e));
                }
            }
        }

        Ok(VulkanSwapChain {
            device: shared,
            surface_loader,
            swapchain_loader,
            surface,
            handle,
            render_targets,
            present_queue,
            present_family_index,
            format,
            width: extent.width,
            height: extent.height,
            enable_vsync: desc.enable_vsync,
        })
    }

    /// Acquire the next image, signaling `semaphore` when it is ready.
    /// `None` means the swap chain is out of date and needs a reload;
    /// suboptimal acquires log and succeed.
    pub fn acquire_next_image(&self, semaphore: &VulkanSemaphore) -> Option<u32> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.handle,
                u64::MAX,
                semaphore.handle(),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    log::info!("vkAcquireNextImageKHR returned suboptimal; ignore if the window just resized");
                }
                semaphore.set_signaled(true);
                Some(index)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                semaphore.set_signaled(false);
                None
            }
            Err(e) => {
                log::error!("vkAcquireNextImageKHR failed: {e:?}");
                None
            }
        }
    }

    /// Fence-signaled overload of `acquire_next_image`.
    pub fn acquire_next_image_fence(&self, fence: &VulkanFence) -> Option<u32> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.handle,
                u64::MAX,
                vk::Semaphore::null(),
                fence.handle(),
            )
        };
        match result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    log::info!("vkAcquireNextImageKHR returned suboptimal; ignore if the window just resized");
                }
                fence.mark_submitted(true);
                Some(index)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                fence.reset_raw();
                fence.mark_submitted(false);
                None
            }
            Err(e) => {
                log::error!("vkAcquireNextImageKHR failed: {e:?}");
                None
            }
        }
    }

    pub fn render_target(&self, index: u32) -> Option<&VulkanRenderTarget> {
        self.render_targets.get(index as usize)
    }

    pub fn image_count(&self) -> u32 {
        self.render_targets.len() as u32
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn vsync_enabled(&self) -> bool {
        self.enable_vsync
    }

    pub fn present_family_index(&self) -> u32 {
        self.present_family_index
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    pub(crate) fn present_queue_handle(&self) -> Option<vk::Queue> {
        self.present_queue
    }

    pub(crate) fn loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }
}

impl Drop for VulkanSwapChain {
    fn drop(&mut self) {
        let _ = unsafe { self.device.device.device_wait_idle() };
        self.render_targets.clear();
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.handle, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

impl std::fmt::Debug for VulkanSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSwapChain")
            .field("extent", &(self.width, self.height))
            .field("format", &self.format)
            .field("image_count", &self.render_targets.len())
            .finish()
    }
}
