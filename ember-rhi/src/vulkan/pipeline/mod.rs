//! Graphics and compute pipelines.

mod compute;
mod graphics;

use std::sync::Arc;

use ash::vk;

use crate::{
    BlendStateDesc, DepthStateDesc, Format, LoadActionType, PipelineType, PrimitiveTopology,
    RasterizerStateDesc, RhiError, SampleCount, StoreActionType, VertexLayout,
};

use super::device::DeviceShared;
use super::root_signature::VulkanRootSignature;
use super::shader::VulkanShader;

pub struct GraphicsPipelineDesc<'a> {
    pub shader: &'a VulkanShader,
    pub root_signature: &'a Arc<VulkanRootSignature>,
    pub vertex_layout: Option<VertexLayout>,
    pub blend_state: Option<BlendStateDesc>,
    pub depth_state: Option<DepthStateDesc>,
    pub rasterizer_state: Option<RasterizerStateDesc>,
    pub color_formats: Vec<Format>,
    pub depth_stencil_format: Format,
    pub sample_count: SampleCount,
    pub sample_quality: u32,
    pub primitive_topology: PrimitiveTopology,
    /// Per-attachment overrides; attachments default to don't-care.
    pub color_load_actions: Option<Vec<LoadActionType>>,
    pub color_store_actions: Option<Vec<StoreActionType>>,
    pub depth_load_action: LoadActionType,
    pub depth_store_action: StoreActionType,
    pub stencil_load_action: LoadActionType,
    pub stencil_store_action: StoreActionType,
}

pub struct ComputePipelineDesc<'a> {
    pub shader: &'a VulkanShader,
    pub root_signature: &'a Arc<VulkanRootSignature>,
}

pub enum PipelineDesc<'a> {
    Graphics(GraphicsPipelineDesc<'a>),
    Compute(ComputePipelineDesc<'a>),
}

pub struct VulkanPipeline {
    device: Arc<DeviceShared>,
    handle: vk::Pipeline,
    /// Render pass synthesized from the attachment description; owned by
    /// the pipeline.
    render_pass: vk::RenderPass,
    pipeline_type: PipelineType,
    /// Keeps the pipeline layout alive for the pipeline's lifetime.
    root_signature: Arc<VulkanRootSignature>,
}

impl VulkanPipeline {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &PipelineDesc<'_>) -> Result<VulkanPipeline, RhiError> {
        match desc {
            PipelineDesc::Graphics(graphics_desc) => graphics::create_graphics_pipeline(device, graphics_desc),
            PipelineDesc::Compute(compute_desc) => compute::create_compute_pipeline(device, compute_desc),
        }
    }

    pub fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    pub fn root_signature(&self) -> &Arc<VulkanRootSignature> {
        &self.root_signature
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_pipeline(self.handle, None);
            if self.render_pass != vk::RenderPass::null() {
                self.device.device.destroy_render_pass(self.render_pass, None);
            }
        }
    }
}

impl std::fmt::Debug for VulkanPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanPipeline").field("pipeline_type", &self.pipeline_type).finish()
    }
}
