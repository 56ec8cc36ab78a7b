//! Textures: image creation (including multi-planar and transient paths),
//! SRV/stencil/per-mip-UAV views, and staged subresource upload.

use std::sync::Arc;

use ash::vk::{self, Handle};

use crate::{
    DescriptorType, Format, ResourceState, RhiError, SampleCount, SubresourceDataDesc,
    TextureCreationFlags, TextureDesc, MAX_PLANE_COUNT,
};

use super::buffer::VulkanBuffer;
use super::cmd::{ImageBarrierState, TextureBarrier, VulkanCmd};
use super::convert;
use super::device::DeviceShared;
use super::memory::Allocation;

/// Staged upload request: the caller provides the staging buffer and the
/// command buffer to record into.
pub struct TextureUpdateDesc<'a> {
    pub src_buffer: &'a VulkanBuffer,
    pub cmd: &'a VulkanCmd,
    pub base_mip_level: u32,
    pub mip_levels: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

// The allocation's mapped pointer is never populated for images; the raw
// pointer field alone suppresses the auto traits.
unsafe impl Send for VulkanTexture {}
unsafe impl Sync for VulkanTexture {}

pub struct VulkanTexture {
    device: Arc<DeviceShared>,
    handle: vk::Image,
    allocation: Option<Allocation>,
    owns_image: bool,
    srv_view: vk::ImageView,
    srv_stencil_view: vk::ImageView,
    uav_views: Vec<vk::ImageView>,
    aspect_mask: vk::ImageAspectFlags,
    width: u32,
    height: u32,
    depth: u32,
    mip_levels: u32,
    array_size: u32,
    sample_count: SampleCount,
    format: Format,
    lazily_allocated: bool,
}

impl VulkanTexture {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &TextureDesc) -> Result<VulkanTexture, RhiError> {
        if desc.sample_count > SampleCount::Count1 && desc.mip_levels > 1 {
            return Err(RhiError::config("multisampled textures cannot have mipmaps"));
        }

        let (owns_image, mut handle) = match desc.native_handle {
            Some(raw) if !desc.flags.intersects(TextureCreationFlags::IMPORT) => {
                (false, vk::Image::from_raw(raw))
            }
            _ => (true, vk::Image::null()),
        };

        let mut additional_usage = vk::ImageUsageFlags::empty();
        if desc.start_state.intersects(ResourceState::RENDER_TARGET) {
            additional_usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        } else if desc.start_state.intersects(ResourceState::DEPTH_WRITE) {
            additional_usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        }

        let image_type = if desc.flags.intersects(TextureCreationFlags::FORCE_2D) {
            debug_assert_eq!(desc.depth, 1);
            vk::ImageType::TYPE_2D
        } else if desc.flags.intersects(TextureCreationFlags::FORCE_3D) {
            vk::ImageType::TYPE_3D
        } else if desc.depth > 1 {
            vk::ImageType::TYPE_3D
        } else if desc.height > 1 {
            vk::ImageType::TYPE_2D
        } else {
            vk::ImageType::TYPE_1D
        };

        let cubemap = desc.descriptor_type.contains(DescriptorType::TEXTURE_CUBE);
        debug_assert!(!cubemap || desc.array_size >= 6);
        let num_planes = desc.format.num_planes();
        let single_plane = desc.format.is_single_plane();
        debug_assert!(num_planes as usize <= MAX_PLANE_COUNT);

        let mut allocation = None;
        let mut lazily_allocated = false;

        if handle == vk::Image::null() {
            let mut usage = convert::to_image_usage(desc.descriptor_type) | additional_usage;
            if usage.intersects(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::STORAGE) {
                // Keep every shader-visible texture copyable both ways.
                usage |= vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
            }

            let mut flags = vk::ImageCreateFlags::empty();
            if cubemap {
                flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
            }
            if image_type == vk::ImageType::TYPE_3D {
                flags |= vk::ImageCreateFlags::TYPE_2D_ARRAY_COMPATIBLE;
            }

            // Lazily allocated transient memory restricts usage to the four
            // attachment-compatible bits.
            if desc.flags.intersects(TextureCreationFlags::ON_TILE)
                && device.allocator.has_lazily_allocated_memory()
            {
                usage |= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT;
                usage &= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT
                    | vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
                    | vk::ImageUsageFlags::INPUT_ATTACHMENT;
                lazily_allocated = true;
            }

            let vk_format = convert::to_vk_format(desc.format);
            let format_list = [vk_format];
            let mut format_list_info =
                vk::ImageFormatListCreateInfo::default().view_formats(&format_list);

            let mut create_info = vk::ImageCreateInfo::default()
                .flags(flags)
                .image_type(image_type)
                .format(vk_format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: desc.depth })
                .mip_levels(desc.mip_levels)
                .array_layers(desc.array_size)
                .samples(convert::to_vk_sample_count(desc.sample_count))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            if !single_plane {
                // Multi-planar formats bind each plane separately and must
                // carry the mutable-format flag with an explicit view list.
                create_info.flags |= vk::ImageCreateFlags::DISJOINT
                    | vk::ImageCreateFlags::MUTABLE_FORMAT;
                create_info = create_info.push_next(&mut format_list_info);
            }

            handle = unsafe {
                device
                    .device
                    .create_image(&create_info, None)
                    .map_err(|e| RhiError::resource(format!("vkCreateImage: {e:?}")))?
            };

            if single_plane {
                let requirements = unsafe { device.device.get_image_memory_requirements(handle) };
                let result = if lazily_allocated {
                    device.allocator.allocate_lazily(&device.device, requirements)
                } else {
                    device.allocator.allocate(
                        &device.device,
                        requirements,
                        crate::ResourceMemoryUsage::GpuOnly,
                        false,
                    )
                };
                let block = match result {
                    Ok(block) => block,
                    Err(e) => {
                        unsafe { device.device.destroy_image(handle, None) };
                        return Err(e);
                    }
                };
                if let Err(e) = unsafe { device.device.bind_image_memory(handle, block.memory, 0) } {
                    device.allocator.free(&device.device, block);
                    unsafe { device.device.destroy_image(handle, None) };
                    return Err(RhiError::resource(format!("vkBindImageMemory: {e:?}")));
                }
                allocation = Some(block);
            } else {
                // Query each plane, build one aligned block covering all of
                // them, then bind plane by plane at its offset.
                let mut total_size = 0u64;
                let mut type_bits = 0u32;
                let mut plane_offsets = [0u64; MAX_PLANE_COUNT];
                for plane in 0..num_planes {
                    let mut plane_info = vk::ImagePlaneMemoryRequirementsInfo::default()
                        .plane_aspect(plane_aspect(plane));
                    let info = vk::ImageMemoryRequirementsInfo2::default()
                        .image(handle)
                        .push_next(&mut plane_info);
                    let mut requirements = vk::MemoryRequirements2::default();
                    unsafe {
                        device.device.get_image_memory_requirements2(&info, &mut requirements)
                    };
                    let reqs = requirements.memory_requirements;
                    plane_offsets[plane as usize] = total_size;
                    total_size += crate::round_up(reqs.size, reqs.alignment.max(1));
                    type_bits |= reqs.memory_type_bits;
                }

                let memory_type_index =
                    match device.allocator.memory_type_for(type_bits, crate::ResourceMemoryUsage::GpuOnly) {
                        Ok(index) => index,
                        Err(e) => {
                            unsafe { device.device.destroy_image(handle, None) };
                            return Err(e);
                        }
                    };
                let block = match device
                    .allocator
                    .allocate_with_type(&device.device, total_size, memory_type_index, false)
                {
                    Ok(block) => block,
                    Err(e) => {
                        unsafe { device.device.destroy_image(handle, None) };
                        return Err(e);
                    }
                };
                let mut plane_infos: Vec<vk::BindImagePlaneMemoryInfo> = (0..num_planes)
                    .map(|plane| vk::BindImagePlaneMemoryInfo::default().plane_aspect(plane_aspect(plane)))
                    .collect();
                let bind_infos: Vec<vk::BindImageMemoryInfo> = plane_infos
                    .iter_mut()
                    .enumerate()
                    .map(|(plane, plane_info)| {
                        vk::BindImageMemoryInfo::default()
                            .image(handle)
                            .memory(block.memory)
                            .memory_offset(plane_offsets[plane])
                            .push_next(plane_info)
                    })
                    .collect();
                if let Err(e) = unsafe { device.device.bind_image_memory2(&bind_infos) } {
                    device.allocator.free(&device.device, block);
                    unsafe { device.device.destroy_image(handle, None) };
                    return Err(RhiError::resource(format!("vkBindImageMemory2: {e:?}")));
                }
                allocation = Some(block);
            }
        }

        let mut texture = VulkanTexture {
            device: Arc::clone(device),
            handle,
            allocation,
            owns_image,
            srv_view: vk::ImageView::null(),
            srv_stencil_view: vk::ImageView::null(),
            uav_views: Vec::new(),
            aspect_mask: convert::aspect_mask_of_format(desc.format, true),
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            mip_levels: desc.mip_levels,
            array_size: desc.array_size,
            sample_count: desc.sample_count,
            format: desc.format,
            lazily_allocated,
        };
        texture.create_views(desc, image_type, cubemap)?;
        Ok(texture)
    }

    fn create_views(
        &mut self,
        desc: &TextureDesc,
        image_type: vk::ImageType,
        cubemap: bool,
    ) -> Result<(), RhiError> {
        let view_type = match image_type {
            vk::ImageType::TYPE_1D => {
                if desc.array_size > 1 { vk::ImageViewType::TYPE_1D_ARRAY } else { vk::ImageViewType::TYPE_1D }
            }
            vk::ImageType::TYPE_2D => {
                if cubemap {
                    if desc.array_size > 6 { vk::ImageViewType::CUBE_ARRAY } else { vk::ImageViewType::CUBE }
                } else if desc.array_size > 1 {
                    vk::ImageViewType::TYPE_2D_ARRAY
                } else {
                    vk::ImageViewType::TYPE_2D
                }
            }
            _ => {
                debug_assert!(desc.array_size == 1, "3D texture arrays are not supported");
                vk::ImageViewType::TYPE_3D
            }
        };

        let vk_format = convert::to_vk_format(desc.format);
        let srv_info = vk::ImageViewCreateInfo::default()
            .image(self.handle)
            .view_type(view_type)
            .format(vk_format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(convert::aspect_mask_of_format(desc.format, false))
                    .base_mip_level(0)
                    .level_count(desc.mip_levels)
                    .base_array_layer(0)
                    .layer_count(desc.array_size),
            );

        if desc.descriptor_type.intersects(DescriptorType::TEXTURE) {
            self.srv_view = unsafe {
                self.device
                    .device
                    .create_image_view(&srv_info, None)
                    .map_err(|e| RhiError::resource(format!("vkCreateImageView: {e:?}")))?
            };

            if desc.format.has_stencil() {
                let mut stencil_info = srv_info;
                stencil_info.subresource_range.aspect_mask = vk::ImageAspectFlags::STENCIL;
                self.srv_stencil_view = unsafe {
                    self.device
                        .device
                        .create_image_view(&stencil_info, None)
                        .map_err(|e| RhiError::resource(format!("vkCreateImageView: {e:?}")))?
                };
            }
        }

        if desc.descriptor_type.intersects(DescriptorType::RW_TEXTURE) {
            // Storage images never use cube view types; cubemaps degrade to
            // 2D arrays for image load/store.
            let mut uav_info = srv_info;
            if matches!(uav_info.view_type, vk::ImageViewType::CUBE | vk::ImageViewType::CUBE_ARRAY) {
                uav_info.view_type = vk::ImageViewType::TYPE_2D_ARRAY;
            }
            uav_info.subresource_range.level_count = 1;
            for mip in 0..desc.mip_levels {
                uav_info.subresource_range.base_mip_level = mip;
                let view = unsafe {
                    self.device
                        .device
                        .create_image_view(&uav_info, None)
                        .map_err(|e| RhiError::resource(format!("vkCreateImageView: {e:?}")))?
                };
                self.uav_views.push(view);
            }
        }

        Ok(())
    }

    /// Records a staged upload: transition to copy-dest, copy every
    /// requested (layer, mip) from the staging buffer at aligned pitches,
    /// then transition to shader-resource.
    pub fn update(&self, desc: &TextureUpdateDesc<'_>) -> Result<(), RhiError> {
        let settings = self.device.adapter.gpu_settings();
        let (row_alignment, slice_alignment) = crate::upload_alignments(settings, self.format);

        desc.cmd.resource_barrier(
            &[TextureBarrier {
                texture: self,
                barrier: ImageBarrierState {
                    current_state: ResourceState::UNDEFINED,
                    new_state: ResourceState::COPY_DEST,
                    ..Default::default()
                },
                subresource_barrier: false,
                mip_level: 0,
                array_layer: 0,
            }],
            &[],
            &[],
        );

        let mut offset = 0u64;
        for layer in desc.base_array_layer..desc.base_array_layer + desc.layer_count {
            for mip in desc.base_mip_level..desc.base_mip_level + desc.mip_levels {
                let width = (self.width >> mip).max(1);
                let height = (self.height >> mip).max(1);
                let depth = (self.depth >> mip).max(1);
                let (_, row_bytes, num_rows) = self
                    .format
                    .surface_info(width, height)
                    .ok_or_else(|| RhiError::state("no surface info for texture format"))?;

                let row_pitch = crate::round_up(row_bytes as u64, row_alignment as u64) as u32;
                let slice_pitch =
                    crate::round_up(row_pitch as u64 * num_rows as u64, slice_alignment as u64) as u32;

                desc.cmd.update_subresource(
                    self,
                    desc.src_buffer,
                    &SubresourceDataDesc {
                        src_offset: desc.src_buffer.offset() + offset,
                        mip_level: mip,
                        array_layer: layer,
                        row_pitch,
                        slice_pitch,
                    },
                );
                offset += depth as u64 * slice_pitch as u64;
            }
        }

        desc.cmd.resource_barrier(
            &[TextureBarrier {
                texture: self,
                barrier: ImageBarrierState {
                    current_state: ResourceState::COPY_DEST,
                    new_state: ResourceState::SHADER_RESOURCE,
                    ..Default::default()
                },
                subresource_barrier: false,
                mip_level: 0,
                array_layer: 0,
            }],
            &[],
            &[],
        );
        Ok(())
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

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn owns_image(&self) -> bool {
        self.owns_image
    }

    pub fn lazily_allocated(&self) -> bool {
        self.lazily_allocated
    }

    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    pub(crate) fn aspect_mask(&self) -> vk::ImageAspectFlags {
        self.aspect_mask
    }

    pub(crate) fn srv_view(&self) -> vk::ImageView {
        self.srv_view
    }

    pub(crate) fn srv_stencil_view(&self) -> vk::ImageView {
        self.srv_stencil_view
    }

    pub(crate) fn uav_view(&self, mip: u32) -> vk::ImageView {
        self.uav_views.get(mip as usize).copied().unwrap_or(vk::ImageView::null())
    }

    pub(crate) fn uav_view_count(&self) -> u32 {
        self.uav_views.len() as u32
    }
}

fn plane_aspect(plane: u32) -> vk::ImageAspectFlags {
    match plane {
        0 => vk::ImageAspectFlags::PLANE_0,
        1 => vk::ImageAspectFlags::PLANE_1,
        _ => vk::ImageAspectFlags::PLANE_2,
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            for view in self.uav_views.drain(..) {
                self.device.device.destroy_image_view(view, None);
            }
            if self.srv_stencil_view != vk::ImageView::null() {
                self.device.device.destroy_image_view(self.srv_stencil_view, None);
            }
            if self.srv_view != vk::ImageView::null() {
                self.device.device.destroy_image_view(self.srv_view, None);
            }
            if self.owns_image && self.handle != vk::Image::null() {
                self.device.device.destroy_image(self.handle, None);
            }
        }
        if let Some(allocation) = self.allocation.take() {
            self.device.allocator.free(&self.device.device, allocation);
        }
    }
}

impl std::fmt::Debug for VulkanTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanTexture")
            .field("extent", &(self.width, self.height, self.depth))
            .field("format", &self.format)
            .field("mip_levels", &self.mip_levels)
            .finish()
    }
}
