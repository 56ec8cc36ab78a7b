//! Render targets: a backing texture plus per-slice views for color/depth
//! rendering, with depth-format fallback probing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::{
    ClearValue, DescriptorType, Format, RenderTargetDesc, ResourceState, RhiError, SampleCount,
    TextureCreationFlags, TextureDesc,
};

use super::convert;
use super::device::{DeviceShared, VulkanDevice};
use super::texture::VulkanTexture;

static RENDER_TARGET_IDS: AtomicU32 = AtomicU32::new(0);

pub struct VulkanRenderTarget {
    device: Arc<DeviceShared>,
    texture: VulkanTexture,
    /// Primary view covering every slice.
    view: vk::ImageView,
    /// Per-mip views; 2D arrays get one view per (mip, slice).
    slice_views: Vec<vk::ImageView>,
    id: u32,
    width: u32,
    height: u32,
    depth: u32,
    array_size: u32,
    mip_levels: u32,
    sample_count: SampleCount,
    format: Format,
    clear_value: ClearValue,
}

impl VulkanRenderTarget {
    pub(crate) fn create(device: &VulkanDevice, desc: &RenderTargetDesc) -> Result<VulkanRenderTarget, RhiError> {
        let is_depth = desc.format.has_depth();
        debug_assert!(
            !(is_depth && desc.descriptor_type.intersects(DescriptorType::RW_TEXTURE)),
            "cannot use a depth-stencil target as UAV"
        );
        let shared = device.shared();

        let mip_levels = desc.mip_levels.max(1);
        let start_state = if desc.start_state != ResourceState::UNDEFINED {
            desc.start_state
        } else if is_depth {
            ResourceState::DEPTH_WRITE
        } else {
            ResourceState::RENDER_TARGET
        };

        let mut format = desc.format;
        if is_depth {
            // Probe support for the requested depth format; unsupported
            // formats fall back to D16.
            let format_info = vk::PhysicalDeviceImageFormatInfo2::default()
                .format(convert::to_vk_format(format))
                .ty(vk::ImageType::TYPE_2D)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT);
            let mut format_properties = vk::ImageFormatProperties2::default();
            let supported = unsafe {
                shared
                    .adapter
                    .instance_shared()
                    .instance
                    .get_physical_device_image_format_properties2(
                        shared.adapter.handle(),
                        &format_info,
                        &mut format_properties,
                    )
                    .is_ok()
            };
            if !supported {
                log::warn!("depth stencil format {format:?} not supported, falling back to D16Unorm");
                format = Format::D16Unorm;
            }
        }

        let mut descriptor_type = desc.descriptor_type;
        if !desc.flags.intersects(TextureCreationFlags::ON_TILE) {
            // Render targets are sampled later in the frame by default.
            descriptor_type |= DescriptorType::TEXTURE;
        } else if descriptor_type.intersects(DescriptorType::TEXTURE | DescriptorType::RW_TEXTURE) {
            log::warn!("on-tile render targets cannot be sampled or written as UAV");
            descriptor_type &= !(DescriptorType::TEXTURE | DescriptorType::RW_TEXTURE);
        }

        let texture_desc = TextureDesc {
            name: desc.name.clone(),
            native_handle: desc.native_handle,
            clear_value: desc.clear_value,
            flags: desc.flags,
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            array_size: desc.array_size,
            mip_levels,
            sample_count: desc.sample_count,
            sample_quality: desc.sample_quality,
            format,
            start_state,
            descriptor_type,
        };
        let texture = VulkanTexture::create(shared, &texture_desc)?;

        let depth_array_size = desc.array_size * desc.depth;
        let view_type = if desc.height > 1 {
            if depth_array_size > 1 { vk::ImageViewType::TYPE_2D_ARRAY } else { vk::ImageViewType::TYPE_2D }
        } else if depth_array_size > 1 {
            vk::ImageViewType::TYPE_1D_ARRAY
        } else {
            vk::ImageViewType::TYPE_1D
        };

        let mut view_info = vk::ImageViewCreateInfo::default()
            .image(texture.handle())
            .view_type(view_type)
            .format(convert::to_vk_format(format))
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(convert::aspect_mask_of_format(format, true))
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(depth_array_size),
            );
        let view = unsafe {
            shared
                .device
                .create_image_view(&view_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateImageView: {e:?}")))?
        };

        // Per-mip views, split per slice when the target is sampled as an
        // array.
        let per_slice = depth_array_size > 1
            && descriptor_type.intersects(DescriptorType::TEXTURE | DescriptorType::RW_TEXTURE);
        let mut slice_views = Vec::new();
        for mip in 0..mip_levels {
            view_info.subresource_range.base_mip_level = mip;
            if per_slice {
                for slice in 0..depth_array_size {
                    view_info.subresource_range.base_array_layer = slice;
                    view_info.subresource_range.layer_count = 1;
                    let slice_view = unsafe {
                        shared
                            .device
                            .create_image_view(&view_info, None)
                            .map_err(|e| RhiError::resource(format!("vkCreateImageView: {e:?}")))?
                    };
                    slice_views.push(slice_view);
                }
            } else {
                view_info.subresource_range.base_array_layer = 0;
                view_info.subresource_range.layer_count = depth_array_size;
                let mip_view = unsafe {
                    shared
                        .device
                        .create_image_view(&view_info, None)
                        .map_err(|e| RhiError::resource(format!("vkCreateImageView: {e:?}")))?
                };
                slice_views.push(mip_view);
            }
        }

        let render_target = VulkanRenderTarget {
            device: Arc::clone(shared),
            texture,
            view,
            slice_views,
            id: RENDER_TARGET_IDS.fetch_add(1, Ordering::Relaxed),
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            array_size: desc.array_size,
            mip_levels,
            sample_count: desc.sample_count,
            format,
            clear_value: desc.clear_value,
        };
        shared.set_debug_name(render_target.view, &desc.name);

        // Vulkan images start in the undefined layout; move the target into
        // its advertised start state so callers never see undefined.
        device.initial_transition(&render_target.texture, start_state);

        Ok(render_target)
    }

    pub fn texture(&self) -> &VulkanTexture {
        &self.texture
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn clear_value(&self) -> ClearValue {
        self.clear_value
    }

    /// Monotonic id assigned at creation, for debugging and cache keys.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn view(&self) -> vk::ImageView {
        self.view
    }

    pub(crate) fn slice_view(&self, index: usize) -> vk::ImageView {
        self.slice_views.get(index).copied().unwrap_or(vk::ImageView::null())
    }
}

impl Drop for VulkanRenderTarget {
    fn drop(&mut self) {
        unsafe {
            for view in self.slice_views.drain(..) {
                self.device.device.destroy_image_view(view, None);
            }
            self.device.device.destroy_image_view(self.view, None);
        }
    }
}

impl std::fmt::Debug for VulkanRenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanRenderTarget")
            .field("id", &self.id)
            .field("extent", &(self.width, self.height))
            .field("format", &self.format)
            .finish()
    }
}
