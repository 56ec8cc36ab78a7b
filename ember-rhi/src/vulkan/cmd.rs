//! Command recording: pools, command buffers, resource-barrier translation,
//! render-target binding, copies, draws, dispatches, and debug markers.

use std::cell::Cell;
use std::sync::Arc;

use ash::vk;

use crate::{
    ClearValue, IndexType, LoadActionType, QueueType, ResourceState, RhiError, StoreActionType,
};

use super::buffer::VulkanBuffer;
use super::convert;
use super::descriptor::VulkanDescriptorSet;
use super::device::{DeviceShared, RenderPassCacheKey};
use super::pipeline::VulkanPipeline;
use super::queue::VulkanQueue;
use super::render_target::VulkanRenderTarget;
use super::root_signature::{TierKind, VulkanRootSignature};
use super::texture::VulkanTexture;

pub struct CmdPoolDesc<'a> {
    pub queue: &'a VulkanQueue,
    /// Command buffers from this pool are short-lived and re-recorded often.
    pub transient: bool,
    /// Allow resetting command buffers individually instead of pool-wide.
    pub allow_individual_reset: bool,
}

pub struct CmdDesc<'a> {
    pub pool: &'a VulkanCmdPool,
    pub secondary: bool,
}

/// Per-thread command allocator. Resetting the pool invalidates every
/// command buffer allocated from it.
pub struct VulkanCmdPool {
    device: Arc<DeviceShared>,
    handle: vk::CommandPool,
    queue_family_index: u8,
    queue_type: QueueType,
}

impl VulkanCmdPool {
    pub(crate) fn create(
        device: &Arc<DeviceShared>,
        desc: &CmdPoolDesc<'_>,
    ) -> Result<VulkanCmdPool, RhiError> {
        let mut flags = vk::CommandPoolCreateFlags::empty();
        if desc.allow_individual_reset {
            flags |= vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER;
        }
        if desc.transient {
            flags |= vk::CommandPoolCreateFlags::TRANSIENT;
        }
        let create_info = vk::CommandPoolCreateInfo::default()
            .flags(flags)
            .queue_family_index(desc.queue.family_index() as u32);
        let handle = unsafe {
            device
                .device
                .create_command_pool(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateCommandPool: {e:?}")))?
        };
        Ok(VulkanCmdPool {
            device: Arc::clone(device),
            handle,
            queue_family_index: desc.queue.family_index(),
            queue_type: desc.queue.queue_type(),
        })
    }

    pub fn reset(&self) {
        let result = unsafe {
            self.device.device.reset_command_pool(self.handle, vk::CommandPoolResetFlags::empty())
        };
        if let Err(e) = result {
            log::error!("vkResetCommandPool failed: {e:?}");
        }
    }

    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }
}

impl Drop for VulkanCmdPool {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_command_pool(self.handle, None);
        }
    }
}

impl std::fmt::Debug for VulkanCmdPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanCmdPool").field("queue_type", &self.queue_type).finish()
    }
}

/// Logical transition of one resource between `begin` and `end` of a
/// barrier batch, including queue-family ownership transfer hints.
#[derive(Debug, Clone, Copy)]
pub struct ImageBarrierState {
    pub current_state: ResourceState,
    pub new_state: ResourceState,
    /// First half of a split barrier (accepted, folded into a full barrier).
    pub begin_only: bool,
    /// Second half of a split barrier.
    pub end_only: bool,
    /// This queue acquires ownership from `queue_type`'s family.
    pub acquire: bool,
    /// This queue releases ownership to `queue_type`'s family.
    pub release: bool,
    pub queue_type: QueueType,
}

impl Default for ImageBarrierState {
    fn default() -> Self {
        Self {
            current_state: ResourceState::UNDEFINED,
            new_state: ResourceState::UNDEFINED,
            begin_only: false,
            end_only: false,
            acquire: false,
            release: false,
            queue_type: QueueType::Graphics,
        }
    }
}

pub struct TextureBarrier<'a> {
    pub texture: &'a VulkanTexture,
    pub barrier: ImageBarrierState,
    pub subresource_barrier: bool,
    pub mip_level: u8,
    pub array_layer: u16,
}

pub struct BufferBarrier<'a> {
    pub buffer: &'a VulkanBuffer,
    pub barrier: ImageBarrierState,
}

pub struct RenderTargetBarrier<'a> {
    pub render_target: &'a VulkanRenderTarget,
    pub barrier: ImageBarrierState,
    pub subresource_barrier: bool,
    pub mip_level: u8,
    pub array_layer: u16,
}

/// Access masks and layouts of one barrier. A transition that stays in
/// `UNORDERED_ACCESS` still needs a write→read+write self-barrier to order
/// read-modify-write chains within the UAV lifetime.
pub(crate) fn barrier_access_and_layout(
    info: &ImageBarrierState,
) -> (vk::AccessFlags, vk::AccessFlags, vk::ImageLayout, vk::ImageLayout) {
    let both_unordered_access = info.current_state == ResourceState::UNORDERED_ACCESS
        && info.new_state == ResourceState::UNORDERED_ACCESS;
    if both_unordered_access {
        (
            vk::AccessFlags::SHADER_WRITE,
            vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::GENERAL,
        )
    } else {
        (
            convert::resource_state_to_access_flags(info.current_state),
            convert::resource_state_to_access_flags(info.new_state),
            convert::resource_state_to_image_layout(info.current_state),
            convert::resource_state_to_image_layout(info.new_state),
        )
    }
}

/// One command buffer recording into a backend command list. The bound
/// pipeline layout and the active render pass are scratch state valid
/// between `begin` and `end`.
pub struct VulkanCmd {
    device: Arc<DeviceShared>,
    handle: vk::CommandBuffer,
    pool_handle: vk::CommandPool,
    queue_type: QueueType,
    queue_family_index: u8,
    bound_pipeline_layout: Cell<vk::PipelineLayout>,
    active_render_pass: Cell<vk::RenderPass>,
}

impl VulkanCmd {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &CmdDesc<'_>) -> Result<VulkanCmd, RhiError> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(desc.pool.handle())
            .level(if desc.secondary {
                vk::CommandBufferLevel::SECONDARY
            } else {
                vk::CommandBufferLevel::PRIMARY
            })
            .command_buffer_count(1);
        let buffers = unsafe {
            device
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| RhiError::resource(format!("vkAllocateCommandBuffers: {e:?}")))?
        };
        Ok(VulkanCmd {
            device: Arc::clone(device),
            handle: buffers[0],
            pool_handle: desc.pool.handle(),
            queue_type: desc.pool.queue_type(),
            queue_family_index: desc.pool.queue_family_index,
            bound_pipeline_layout: Cell::new(vk::PipelineLayout::null()),
            active_render_pass: Cell::new(vk::RenderPass::null()),
        })
    }

    /// Opens one-time-submit recording and clears the scratch state.
    pub fn begin(&self) {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        let result = unsafe { self.device.device.begin_command_buffer(self.handle, &begin_info) };
        if let Err(e) = result {
            log::error!("vkBeginCommandBuffer failed: {e:?}");
        }
        self.bound_pipeline_layout.set(vk::PipelineLayout::null());
        self.active_render_pass.set(vk::RenderPass::null());
    }

    /// Closes the active render pass, if any, then closes recording.
    pub fn end(&self) {
        if self.active_render_pass.get() != vk::RenderPass::null() {
            unsafe { self.device.device.cmd_end_render_pass(self.handle) };
            self.active_render_pass.set(vk::RenderPass::null());
        }
        let result = unsafe { self.device.device.end_command_buffer(self.handle) };
        if let Err(e) = result {
            log::error!("vkEndCommandBuffer failed: {e:?}");
        }
    }

    /// Sets the viewport with the y-axis flipped so clip space matches the
    /// D3D convention.
    pub fn set_viewport(&self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        debug_assert!(width > 0.0 && height > 0.0);
        let viewport = vk::Viewport {
            x,
            y: y + height,
            width,
            height: -height,
            min_depth,
            max_depth,
        };
        unsafe { self.device.device.cmd_set_viewport(self.handle, 0, &[viewport]) };
    }

    pub fn set_scissor(&self, x: u32, y: u32, width: u32, height: u32) {
        let rect = vk::Rect2D {
            offset: vk::Offset2D { x: x as i32, y: y as i32 },
            extent: vk::Extent2D { width, height },
        };
        unsafe { self.device.device.cmd_set_scissor(self.handle, 0, &[rect]) };
    }

    pub fn set_stencil_reference_value(&self, value: u32) {
        unsafe {
            self.device.device.cmd_set_stencil_reference(
                self.handle,
                vk::StencilFaceFlags::FRONT_AND_BACK,
                value,
            )
        };
    }

    /// Opens a render pass over the given targets, reusing cached render
    /// passes and framebuffers keyed by attachment configuration. An
    /// already-active pass is closed first; an empty desc only closes.
    pub fn bind_render_targets(&self, desc: &BindRenderTargetsDesc<'_>) {
        if self.active_render_pass.get() != vk::RenderPass::null() {
            unsafe { self.device.device.cmd_end_render_pass(self.handle) };
            self.active_render_pass.set(vk::RenderPass::null());
        }
        if desc.color.is_empty() && desc.depth_stencil.is_none() {
            return;
        }

        let sample_count = desc
            .color
            .first()
            .map(|t| t.render_target.sample_count())
            .or_else(|| desc.depth_stencil.as_ref().map(|t| t.render_target.sample_count()))
            .unwrap_or_default();
        let key = RenderPassCacheKey {
            color: desc
                .color
                .iter()
                .map(|t| (t.render_target.format(), t.load_action, t.store_action))
                .collect(),
            depth: desc
                .depth_stencil
                .as_ref()
                .map(|t| (t.render_target.format(), t.load_action, t.store_action)),
            sample_count,
        };
        let render_pass = match self.device.get_or_create_render_pass(&key, None) {
            Ok(render_pass) => render_pass,
            Err(e) => {
                log::error!("bind_render_targets: {e}");
                return;
            }
        };

        let mut views = Vec::new();
        let mut clear_values = Vec::new();
        let (mut width, mut height) = (1, 1);
        for target in &desc.color {
            views.push(target.render_target.view());
            width = target.render_target.width();
            height = target.render_target.height();
            let (r, g, b, a) = match target.clear_value.unwrap_or(target.render_target.clear_value()) {
                ClearValue::Color { r, g, b, a } => (r, g, b, a),
                ClearValue::DepthStencil { .. } => (0.0, 0.0, 0.0, 0.0),
            };
            clear_values.push(vk::ClearValue { color: vk::ClearColorValue { float32: [r, g, b, a] } });
        }
        if let Some(target) = &desc.depth_stencil {
            views.push(target.render_target.view());
            width = target.render_target.width();
            height = target.render_target.height();
            let (depth, stencil) = match target.clear_value.unwrap_or(target.render_target.clear_value()) {
                ClearValue::DepthStencil { depth, stencil } => (depth, stencil),
                ClearValue::Color { .. } => (1.0, 0),
            };
            clear_values.push(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
            });
        }

        let framebuffer =
            match self.device.get_or_create_framebuffer(render_pass, &views, width, height) {
                Ok(framebuffer) => framebuffer,
                Err(e) => {
                    log::error!("bind_render_targets: {e}");
                    return;
                }
            };

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width, height },
            })
            .clear_values(&clear_values);
        unsafe {
            self.device.device.cmd_begin_render_pass(self.handle, &begin_info, vk::SubpassContents::INLINE)
        };
        self.active_render_pass.set(render_pass);
    }

    /// Binds `set` at its update-frequency slot. On a pipeline-layout
    /// change, hole tiers of the root signature first get the device's
    /// empty descriptor set so no referenced set number stays unbound.
    pub fn bind_descriptor_set(&self, index: u32, set: &VulkanDescriptorSet) {
        let root_signature = set.root_signature();
        let bind_point = convert::to_pipeline_bind_point(root_signature.pipeline_type());
        let pipeline_layout = root_signature.pipeline_layout();

        if self.bound_pipeline_layout.get() != pipeline_layout {
            self.bound_pipeline_layout.set(pipeline_layout);
            for tier in 0..crate::UpdateFrequency::COUNT {
                if root_signature.tier_kind(tier) == TierKind::Hole {
                    unsafe {
                        self.device.device.cmd_bind_descriptor_sets(
                            self.handle,
                            bind_point,
                            pipeline_layout,
                            tier as u32,
                            &[self.device.empty_descriptor_set],
                            &[],
                        );
                    }
                }
            }
        }

        unsafe {
            self.device.device.cmd_bind_descriptor_sets(
                self.handle,
                bind_point,
                pipeline_layout,
                set.update_frequency().index() as u32,
                &[set.handle(index)],
                set.dynamic_offsets(),
            );
        }
    }

    /// Pushes an inline constant block declared by the root signature.
    pub fn bind_push_constants(&self, root_signature: &VulkanRootSignature, name: &str, data: &[u8]) {
        let Some((stages, size)) = root_signature.push_constant_range(name) else {
            log::error!("push constant block {name} not found in root signature");
            return;
        };
        debug_assert!(data.len() as u32 <= size);
        unsafe {
            self.device.device.cmd_push_constants(
                self.handle,
                root_signature.pipeline_layout(),
                stages,
                0,
                data,
            );
        }
    }

    pub fn bind_pipeline(&self, pipeline: &VulkanPipeline) {
        unsafe {
            self.device.device.cmd_bind_pipeline(
                self.handle,
                convert::to_pipeline_bind_point(pipeline.pipeline_type()),
                pipeline.handle(),
            );
        }
    }

    pub fn bind_index_buffer(&self, buffer: &VulkanBuffer, index_type: IndexType, offset: u64) {
        unsafe {
            self.device.device.cmd_bind_index_buffer(
                self.handle,
                buffer.handle(),
                offset,
                convert::to_vk_index_type(index_type),
            );
        }
    }

    pub fn bind_vertex_buffers(&self, first_binding: u32, buffers: &[&VulkanBuffer], offsets: &[u64]) {
        debug_assert_eq!(buffers.len(), offsets.len());
        let handles: Vec<vk::Buffer> = buffers.iter().map(|b| b.handle()).collect();
        unsafe {
            self.device.device.cmd_bind_vertex_buffers(self.handle, first_binding, &handles, offsets);
        }
    }

    pub fn draw(&self, vertex_count: u32, first_vertex: u32) {
        unsafe { self.device.device.cmd_draw(self.handle, vertex_count, 1, first_vertex, 0) };
    }

    pub fn draw_instanced(
        &self,
        vertex_count: u32,
        first_vertex: u32,
        instance_count: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.device.cmd_draw(
                self.handle,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            )
        };
    }

    pub fn draw_indexed(&self, index_count: u32, first_index: u32, first_vertex: i32) {
        unsafe {
            self.device.device.cmd_draw_indexed(self.handle, index_count, 1, first_index, first_vertex, 0)
        };
    }

    pub fn draw_indexed_instanced(
        &self,
        index_count: u32,
        first_index: u32,
        instance_count: u32,
        first_instance: u32,
        first_vertex: i32,
    ) {
        unsafe {
            self.device.device.cmd_draw_indexed(
                self.handle,
                index_count,
                instance_count,
                first_index,
                first_vertex,
                first_instance,
            )
        };
    }

    pub fn dispatch(&self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        unsafe {
            self.device.device.cmd_dispatch(self.handle, group_count_x, group_count_y, group_count_z)
        };
    }

    /// Translates logical state transitions into one batched pipeline
    /// barrier: per-resource access masks and layouts, queue-family
    /// ownership transfer, then source/destination stages derived from the
    /// aggregated access masks and this command buffer's queue type.
    pub fn resource_barrier(
        &self,
        texture_barriers: &[TextureBarrier<'_>],
        buffer_barriers: &[BufferBarrier<'_>],
        render_target_barriers: &[RenderTargetBarrier<'_>],
    ) {
        if texture_barriers.is_empty() && buffer_barriers.is_empty() && render_target_barriers.is_empty()
        {
            return;
        }

        let mut src_access = vk::AccessFlags::empty();
        let mut dst_access = vk::AccessFlags::empty();

        let ownership = |info: &ImageBarrierState| -> (u32, u32) {
            if info.acquire && info.current_state != ResourceState::UNDEFINED {
                (
                    self.device.queue_family_indexes[info.queue_type.index()] as u32,
                    self.queue_family_index as u32,
                )
            } else if info.release && info.current_state != ResourceState::UNDEFINED {
                (
                    self.queue_family_index as u32,
                    self.device.queue_family_indexes[info.queue_type.index()] as u32,
                )
            } else {
                (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
            }
        };

        let mut vk_buffer_barriers = Vec::with_capacity(buffer_barriers.len());
        for barrier in buffer_barriers {
            let (src, dst, _, _) = barrier_access_and_layout(&barrier.barrier);
            let (src_family, dst_family) = ownership(&barrier.barrier);
            src_access |= src;
            dst_access |= dst;
            vk_buffer_barriers.push(
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(src)
                    .dst_access_mask(dst)
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .buffer(barrier.buffer.handle())
                    .offset(0)
                    .size(vk::WHOLE_SIZE),
            );
        }

        let mut vk_image_barriers =
            Vec::with_capacity(texture_barriers.len() + render_target_barriers.len());
        {
            let mut push_image_barrier = |texture: &VulkanTexture,
                                          info: &ImageBarrierState,
                                          subresource: bool,
                                          mip_level: u8,
                                          array_layer: u16| {
                let (src, dst, old_layout, new_layout) = barrier_access_and_layout(info);
                let (src_family, dst_family) = ownership(info);
                src_access |= src;
                dst_access |= dst;
                vk_image_barriers.push(
                    vk::ImageMemoryBarrier::default()
                        .src_access_mask(src)
                        .dst_access_mask(dst)
                        .old_layout(old_layout)
                        .new_layout(new_layout)
                        .src_queue_family_index(src_family)
                        .dst_queue_family_index(dst_family)
                        .image(texture.handle())
                        .subresource_range(vk::ImageSubresourceRange {
                            aspect_mask: texture.aspect_mask(),
                            base_mip_level: if subresource { mip_level as u32 } else { 0 },
                            level_count: if subresource { 1 } else { vk::REMAINING_MIP_LEVELS },
                            base_array_layer: if subresource { array_layer as u32 } else { 0 },
                            layer_count: if subresource { 1 } else { vk::REMAINING_ARRAY_LAYERS },
                        }),
                );
            };

            for barrier in texture_barriers {
                push_image_barrier(
                    barrier.texture,
                    &barrier.barrier,
                    barrier.subresource_barrier,
                    barrier.mip_level,
                    barrier.array_layer,
                );
            }
            for barrier in render_target_barriers {
                push_image_barrier(
                    barrier.render_target.texture(),
                    &barrier.barrier,
                    barrier.subresource_barrier,
                    barrier.mip_level,
                    barrier.array_layer,
                );
            }
        }

        let settings = self.device.adapter.gpu_settings();
        let stage_option = |access| convert::PipelineStageOption {
            access,
            queue_type: self.queue_type,
            geometry_shader_supported: settings.geometry_shader_supported,
            tessellation_supported: settings.tessellation_supported,
            raytracing_supported: self.device.raytracing_supported,
        };
        let src_stages = convert::determine_pipeline_stage_flags(stage_option(src_access));
        let dst_stages = convert::determine_pipeline_stage_flags(stage_option(dst_access));

        unsafe {
            self.device.device.cmd_pipeline_barrier(
                self.handle,
                src_stages,
                dst_stages,
                vk::DependencyFlags::empty(),
                &[],
                &vk_buffer_barriers,
                &vk_image_barriers,
            );
        }
    }

    pub fn copy_buffer(&self, dst: &VulkanBuffer, src: &VulkanBuffer, src_offset: u64, dst_offset: u64, size: u64) {
        let region =
            vk::BufferCopy::default().src_offset(src_offset).dst_offset(dst_offset).size(size);
        unsafe {
            self.device.device.cmd_copy_buffer(self.handle, src.handle(), dst.handle(), &[region])
        };
    }

    /// Copies one mip/layer from a staging buffer into `texture`, which
    /// must be in the copy-destination state. Pitches are in bytes and
    /// already aligned by the caller.
    pub fn update_subresource(
        &self,
        texture: &VulkanTexture,
        src: &VulkanBuffer,
        subresource: &crate::SubresourceDataDesc,
    ) {
        let region = buffer_image_copy(texture, subresource);
        unsafe {
            self.device.device.cmd_copy_buffer_to_image(
                self.handle,
                src.handle(),
                texture.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    /// Readback counterpart of `update_subresource`; the texture must be in
    /// the copy-source state.
    pub fn copy_subresource(
        &self,
        dst: &VulkanBuffer,
        texture: &VulkanTexture,
        subresource: &crate::SubresourceDataDesc,
    ) {
        let region = buffer_image_copy(texture, subresource);
        unsafe {
            self.device.device.cmd_copy_image_to_buffer(
                self.handle,
                texture.handle(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.handle(),
                &[region],
            );
        }
    }

    pub fn begin_debug_marker(&self, name: &str, color: [f32; 4]) {
        let Some(debug_utils) = &self.device.debug_utils else { return };
        let Ok(name) = std::ffi::CString::new(name) else { return };
        let label = vk::DebugUtilsLabelEXT::default().label_name(&name).color(color);
        unsafe { debug_utils.cmd_begin_debug_utils_label(self.handle, &label) };
    }

    pub fn add_debug_marker(&self, name: &str, color: [f32; 4]) {
        let Some(debug_utils) = &self.device.debug_utils else { return };
        let Ok(name) = std::ffi::CString::new(name) else { return };
        let label = vk::DebugUtilsLabelEXT::default().label_name(&name).color(color);
        unsafe { debug_utils.cmd_insert_debug_utils_label(self.handle, &label) };
    }

    pub fn end_debug_marker(&self) {
        let Some(debug_utils) = &self.device.debug_utils else { return };
        unsafe { debug_utils.cmd_end_debug_utils_label(self.handle) };
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}

impl Drop for VulkanCmd {
    fn drop(&mut self) {
        unsafe {
            self.device.device.free_command_buffers(self.pool_handle, &[self.handle]);
        }
    }
}

impl std::fmt::Debug for VulkanCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanCmd").field("queue_type", &self.queue_type).finish()
    }
}

/// Converts byte pitches into the texel-granular strides buffer-image
/// copies expect (whole blocks for compressed formats).
fn buffer_image_copy(
    texture: &VulkanTexture,
    subresource: &crate::SubresourceDataDesc,
) -> vk::BufferImageCopy {
    let format = texture.format();
    let block_bytes = format.byte_count().max(1);
    let row_length = subresource.row_pitch / block_bytes * format.block_width();
    let image_height = if subresource.row_pitch > 0 {
        subresource.slice_pitch / subresource.row_pitch * format.block_height()
    } else {
        0
    };
    let width = (texture.width() >> subresource.mip_level).max(1);
    let height = (texture.height() >> subresource.mip_level).max(1);
    let depth = (texture.depth() >> subresource.mip_level).max(1);
    vk::BufferImageCopy::default()
        .buffer_offset(subresource.src_offset)
        .buffer_row_length(row_length)
        .buffer_image_height(image_height)
        .image_subresource(
            vk::ImageSubresourceLayers::default()
                .aspect_mask(texture.aspect_mask() & !vk::ImageAspectFlags::STENCIL)
                .mip_level(subresource.mip_level)
                .base_array_layer(subresource.array_layer)
                .layer_count(1),
        )
        .image_extent(vk::Extent3D { width, height, depth })
}

/// One color or depth attachment to open a render pass over.
pub struct BindTargetDesc<'a> {
    pub render_target: &'a VulkanRenderTarget,
    pub load_action: LoadActionType,
    pub store_action: StoreActionType,
    /// Overrides the render target's optimized clear value.
    pub clear_value: Option<ClearValue>,
}

#[derive(Default)]
pub struct BindRenderTargetsDesc<'a> {
    pub color: Vec<BindTargetDesc<'a>>,
    pub depth_stencil: Option<BindTargetDesc<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uav_to_uav_emits_self_barrier() {
        let info = ImageBarrierState {
            current_state: ResourceState::UNORDERED_ACCESS,
            new_state: ResourceState::UNORDERED_ACCESS,
            ..Default::default()
        };
        let (src, dst, old_layout, new_layout) = barrier_access_and_layout(&info);
        assert_eq!(src, vk::AccessFlags::SHADER_WRITE);
        assert_eq!(dst, vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ);
        assert_eq!(old_layout, vk::ImageLayout::GENERAL);
        assert_eq!(new_layout, vk::ImageLayout::GENERAL);
    }

    #[test]
    fn copy_dest_to_shader_resource_maps_through_the_state_table() {
        let info = ImageBarrierState {
            current_state: ResourceState::COPY_DEST,
            new_state: ResourceState::SHADER_RESOURCE,
            ..Default::default()
        };
        let (src, dst, old_layout, new_layout) = barrier_access_and_layout(&info);
        assert_eq!(src, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(dst, vk::AccessFlags::SHADER_READ);
        assert_eq!(old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }
}
