//! Graphics pipeline construction: render-pass synthesis, stage assembly,
//! vertex-input accumulation, and fixed-function state realization.

use std::sync::Arc;

use ash::vk;

use crate::{
    BlendStateDesc, BlendStateTargets, DepthStateDesc, Format, PipelineType, RasterizerStateDesc,
    RhiError, ShaderStageFlags, MAX_VERTEX_ATTRIBS,
};

use super::super::convert;
use super::super::device::DeviceShared;
use super::{GraphicsPipelineDesc, VulkanPipeline};

/// Render pass describing attachment formats and actions only; actual
/// images arrive at bind time. Initial and final layouts stay in the
/// attachment-optimal layouts so surrounding barriers stay in control.
fn create_render_pass(
    device: &Arc<DeviceShared>,
    desc: &GraphicsPipelineDesc<'_>,
) -> Result<vk::RenderPass, RhiError> {
    let sample_count = convert::to_vk_sample_count(desc.sample_count);
    let mut attachments = Vec::new();
    let mut color_refs = Vec::new();

    for (i, &format) in desc.color_formats.iter().enumerate() {
        let load = desc
            .color_load_actions
            .as_ref()
            .and_then(|actions| actions.get(i).copied())
            .unwrap_or_default();
        let store = desc
            .color_store_actions
            .as_ref()
            .and_then(|actions| actions.get(i).copied())
            .unwrap_or_default();
        color_refs.push(
            vk::AttachmentReference::default()
                .attachment(attachments.len() as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
        attachments.push(
            vk::AttachmentDescription::default()
                .format(convert::to_vk_format(format))
                .samples(sample_count)
                .load_op(convert::to_vk_load_op(load))
                .store_op(convert::to_vk_store_op(store))
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
    }

    let has_depth = desc.depth_stencil_format != Format::Undefined;
    let mut depth_ref = vk::AttachmentReference::default();
    if has_depth {
        depth_ref = vk::AttachmentReference::default()
            .attachment(attachments.len() as u32)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        attachments.push(
            vk::AttachmentDescription::default()
                .format(convert::to_vk_format(desc.depth_stencil_format))
                .samples(sample_count)
                .load_op(convert::to_vk_load_op(desc.depth_load_action))
                .store_op(convert::to_vk_store_op(desc.depth_store_action))
                .stencil_load_op(convert::to_vk_load_op(desc.stencil_load_action))
                .stencil_store_op(convert::to_vk_store_op(desc.stencil_store_action))
                .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
    }

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if has_depth {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }
    let subpasses = [subpass];

    let create_info =
        vk::RenderPassCreateInfo::default().attachments(&attachments).subpasses(&subpasses);
    unsafe {
        device
            .device
            .create_render_pass(&create_info, None)
            .map_err(|e| RhiError::resource(format!("vkCreateRenderPass: {e:?}")))
    }
}

pub(super) fn create_graphics_pipeline(
    device: &Arc<DeviceShared>,
    desc: &GraphicsPipelineDesc<'_>,
) -> Result<VulkanPipeline, RhiError> {
    let shader = desc.shader;
    debug_assert!(shader.stages().intersects(ShaderStageFlags::VERT));

    let render_pass = create_render_pass(device, desc)?;
    let destroy_render_pass =
        || unsafe { device.device.destroy_render_pass(render_pass, None) };

    // Shader stages, carrying entry points and specialization constants.
    let specialization_info = shader.specialization().map(|(entries, data)| {
        vk::SpecializationInfo::default().map_entries(entries).data(data)
    });
    let mut stages = Vec::new();
    for stage_index in 0..ShaderStageFlags::COUNT {
        let stage = ShaderStageFlags::from_index(stage_index);
        if shader.module(stage) == vk::ShaderModule::null() {
            continue;
        }
        let Some(entry_point) = shader.entry_point(stage) else { continue };
        let mut stage_info = vk::PipelineShaderStageCreateInfo::default()
            .stage(convert::to_vk_stage_bit(stage))
            .module(shader.module(stage))
            .name(entry_point);
        if let Some(info) = specialization_info.as_ref() {
            stage_info = stage_info.specialization_info(info);
        }
        stages.push(stage_info);
    }

    // Vertex inputs: each attribute contributes a description; a new
    // binding starts with the attribute's byte count as stride, an existing
    // one accumulates and must agree on input rate.
    let mut input_bindings: Vec<vk::VertexInputBindingDescription> = Vec::new();
    let mut input_attributes: Vec<vk::VertexInputAttributeDescription> = Vec::new();
    if let Some(layout) = &desc.vertex_layout {
        if layout.attribs.len() > MAX_VERTEX_ATTRIBS {
            log::error!(
                "too many vertex attributes ({}, max {MAX_VERTEX_ATTRIBS})",
                layout.attribs.len()
            );
        }
        for attrib in layout.attribs.iter().take(MAX_VERTEX_ATTRIBS) {
            input_attributes.push(
                vk::VertexInputAttributeDescription::default()
                    .location(attrib.location)
                    .binding(attrib.binding)
                    .format(convert::to_vk_format(attrib.format))
                    .offset(attrib.offset),
            );
            let rate = convert::to_vk_vertex_input_rate(attrib.rate);
            match input_bindings.iter_mut().find(|b| b.binding == attrib.binding) {
                Some(binding) => {
                    binding.stride += attrib.format.byte_count();
                    if binding.input_rate != rate {
                        log::error!(
                            "vertex input rate mismatch on binding {} ({})",
                            attrib.binding,
                            attrib.semantic_name
                        );
                    }
                }
                None => input_bindings.push(
                    vk::VertexInputBindingDescription::default()
                        .binding(attrib.binding)
                        .stride(attrib.format.byte_count())
                        .input_rate(rate),
                ),
            }
        }
    }
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&input_bindings)
        .vertex_attribute_descriptions(&input_attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(convert::to_vk_topology(desc.primitive_topology))
        .primitive_restart_enable(false);

    let control_points = shader
        .reflection()
        .stage_reflection(ShaderStageFlags::TESC)
        .map(|refl| refl.control_point_count)
        .unwrap_or(0);
    let tessellation =
        vk::PipelineTessellationStateCreateInfo::default().patch_control_points(control_points);

    let viewport_state =
        vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(convert::to_vk_sample_count(desc.sample_count))
        .alpha_to_coverage_enable(false);

    let default_raster = RasterizerStateDesc::default();
    let raster_desc = desc.rasterizer_state.as_ref().unwrap_or(&default_raster);
    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(raster_desc.depth_clamp)
        .rasterizer_discard_enable(false)
        .polygon_mode(convert::to_vk_polygon_mode(raster_desc.fill_mode))
        .cull_mode(convert::to_vk_cull_mode(raster_desc.cull_mode))
        .front_face(convert::to_vk_front_face(raster_desc.front_face))
        .depth_bias_enable(raster_desc.depth_bias != 0)
        .depth_bias_constant_factor(raster_desc.depth_bias as f32)
        .depth_bias_slope_factor(raster_desc.slope_scaled_depth_bias)
        .line_width(1.0);

    let default_depth = DepthStateDesc::default();
    let depth_desc = desc.depth_state.as_ref().unwrap_or(&default_depth);
    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(depth_desc.depth_test)
        .depth_write_enable(depth_desc.depth_write)
        .depth_compare_op(convert::to_vk_compare_op(depth_desc.depth_func))
        .depth_bounds_test_enable(false)
        .stencil_test_enable(depth_desc.stencil_test)
        .front(
            vk::StencilOpState::default()
                .fail_op(convert::to_vk_stencil_op(depth_desc.stencil_front_fail))
                .pass_op(convert::to_vk_stencil_op(depth_desc.stencil_front_pass))
                .depth_fail_op(convert::to_vk_stencil_op(depth_desc.depth_front_fail))
                .compare_op(convert::to_vk_compare_op(depth_desc.stencil_front_func))
                .compare_mask(depth_desc.stencil_read_mask as u32)
                .write_mask(depth_desc.stencil_write_mask as u32),
        )
        .back(
            vk::StencilOpState::default()
                .fail_op(convert::to_vk_stencil_op(depth_desc.stencil_back_fail))
                .pass_op(convert::to_vk_stencil_op(depth_desc.stencil_back_pass))
                .depth_fail_op(convert::to_vk_stencil_op(depth_desc.depth_back_fail))
                .compare_op(convert::to_vk_compare_op(depth_desc.stencil_back_func))
                .compare_mask(depth_desc.stencil_read_mask as u32)
                .write_mask(depth_desc.stencil_write_mask as u32),
        )
        .min_depth_bounds(0.0)
        .max_depth_bounds(1.0);

    let default_blend = BlendStateDesc::default();
    let blend_desc = desc.blend_state.as_ref().unwrap_or(&default_blend);
    let mut blend_attachments = Vec::with_capacity(desc.color_formats.len());
    for i in 0..desc.color_formats.len() {
        let mut attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA);
        if blend_desc.target_mask.intersects(BlendStateTargets::from_bits_truncate(1 << i)) {
            // Without independent blend every target mirrors attachment 0.
            let target = &blend_desc.per_target[if blend_desc.independent_blend { i } else { 0 }];
            attachment = attachment
                .blend_enable(!target.is_blend_disabled())
                .src_color_blend_factor(convert::to_vk_blend_factor(target.src_factor))
                .dst_color_blend_factor(convert::to_vk_blend_factor(target.dst_factor))
                .color_blend_op(convert::to_vk_blend_op(target.blend_mode))
                .src_alpha_blend_factor(convert::to_vk_blend_factor(target.src_alpha_factor))
                .dst_alpha_blend_factor(convert::to_vk_blend_factor(target.dst_alpha_factor))
                .alpha_blend_op(convert::to_vk_blend_op(target.blend_alpha_mode))
                .color_write_mask(convert::to_vk_color_write_mask(target.write_mask));
        }
        blend_attachments.push(attachment);
    }
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&blend_attachments);

    let dynamic_states = [
        vk::DynamicState::VIEWPORT,
        vk::DynamicState::SCISSOR,
        vk::DynamicState::BLEND_CONSTANTS,
        vk::DynamicState::DEPTH_BOUNDS,
        vk::DynamicState::STENCIL_REFERENCE,
    ];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let mut create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic_state)
        .layout(desc.root_signature.pipeline_layout())
        .render_pass(render_pass)
        .subpass(0)
        .base_pipeline_index(-1);
    if shader.has_tessellation() {
        create_info = create_info.tessellation_state(&tessellation);
    }

    let pipelines = unsafe {
        device.device.create_graphics_pipelines(device.pipeline_cache, &[create_info], None)
    };
    let handle = match pipelines {
        Ok(pipelines) => pipelines[0],
        Err((_, e)) => {
            destroy_render_pass();
            return Err(RhiError::resource(format!("vkCreateGraphicsPipelines: {e:?}")));
        }
    };

    Ok(VulkanPipeline {
        device: Arc::clone(device),
        handle,
        render_pass,
        pipeline_type: PipelineType::Graphics,
        root_signature: Arc::clone(desc.root_signature),
    })
}
