//! Total mappings from the RHI data model onto Vulkan enumerations, plus
//! the access/layout/stage derivation used by barrier emission.

use ash::vk;

use crate::{
    AddressMode, BlendConstant, BlendMode, ColorWriteMask, CompareMode, CullMode, DescriptorType,
    FillMode, FilterType, Format, FrontFace, IndexType, LoadActionType, MipMapMode, PipelineType,
    PrimitiveTopology, QueueType, ResourceState, SampleCount, ShaderStageFlags, StencilOp,
    StoreActionType, VertexAttribRate,
};

pub fn to_vk_format(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8G8Unorm => vk::Format::R8G8_UNORM,
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
        Format::A2B10G10R10Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::R16Uint => vk::Format::R16_UINT,
        Format::R16Float => vk::Format::R16_SFLOAT,
        Format::R16G16Float => vk::Format::R16G16_SFLOAT,
        Format::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sint => vk::Format::R32_SINT,
        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::R32G32Float => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32Float => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::X8D24Unorm => vk::Format::X8_D24_UNORM_PACK32,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::S8Uint => vk::Format::S8_UINT,
        Format::D16UnormS8Uint => vk::Format::D16_UNORM_S8_UINT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
        Format::Bc1RgbaUnorm => vk::Format::BC1_RGBA_UNORM_BLOCK,
        Format::Bc1RgbaSrgb => vk::Format::BC1_RGBA_SRGB_BLOCK,
        Format::Bc2Unorm => vk::Format::BC2_UNORM_BLOCK,
        Format::Bc3Unorm => vk::Format::BC3_UNORM_BLOCK,
        Format::Bc3Srgb => vk::Format::BC3_SRGB_BLOCK,
        Format::Bc4Unorm => vk::Format::BC4_UNORM_BLOCK,
        Format::Bc5Unorm => vk::Format::BC5_UNORM_BLOCK,
        Format::Bc6hUfloat => vk::Format::BC6H_UFLOAT_BLOCK,
        Format::Bc7Unorm => vk::Format::BC7_UNORM_BLOCK,
        Format::Bc7Srgb => vk::Format::BC7_SRGB_BLOCK,
        Format::G8B8R8TwoPlane420Unorm => vk::Format::G8_B8R8_2PLANE_420_UNORM,
        Format::G8B8R8ThreePlane420Unorm => vk::Format::G8_B8_R8_3PLANE_420_UNORM,
    }
}

/// Inverse mapping for formats that can come back from the backend
/// (surface formats chiefly).
pub fn from_vk_format(format: vk::Format) -> Format {
    match format {
        vk::Format::R8_UNORM => Format::R8Unorm,
        vk::Format::R8G8_UNORM => Format::R8G8Unorm,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8Unorm,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8Srgb,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8Unorm,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8Srgb,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::A2B10G10R10Unorm,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16Float,
        vk::Format::D16_UNORM => Format::D16Unorm,
        vk::Format::D32_SFLOAT => Format::D32Float,
        vk::Format::D24_UNORM_S8_UINT => Format::D24UnormS8Uint,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32FloatS8Uint,
        _ => Format::Undefined,
    }
}

/// Access masks implied by a logical resource state.
pub fn resource_state_to_access_flags(state: ResourceState) -> vk::AccessFlags {
    let mut ret = vk::AccessFlags::empty();
    if state.intersects(ResourceState::COPY_SOURCE) {
        ret |= vk::AccessFlags::TRANSFER_READ;
    }
    if state.intersects(ResourceState::COPY_DEST) {
        ret |= vk::AccessFlags::TRANSFER_WRITE;
    }
    if state.intersects(ResourceState::VERTEX_AND_CONSTANT_BUFFER) {
        ret |= vk::AccessFlags::UNIFORM_READ | vk::AccessFlags::VERTEX_ATTRIBUTE_READ;
    }
    if state.intersects(ResourceState::INDEX_BUFFER) {
        ret |= vk::AccessFlags::INDEX_READ;
    }
    if state.intersects(ResourceState::UNORDERED_ACCESS) {
        ret |= vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE;
    }
    if state.intersects(ResourceState::INDIRECT_ARGUMENT) {
        ret |= vk::AccessFlags::INDIRECT_COMMAND_READ;
    }
    if state.intersects(ResourceState::RENDER_TARGET) {
        ret |= vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    }
    if state.intersects(ResourceState::DEPTH_WRITE) {
        ret |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    if state.intersects(ResourceState::SHADER_RESOURCE) {
        ret |= vk::AccessFlags::SHADER_READ;
    }
    if state.intersects(ResourceState::PRESENT) {
        ret |= vk::AccessFlags::MEMORY_READ;
    }
    if state.intersects(ResourceState::RAYTRACING_ACCELERATION_STRUCTURE) {
        ret |= vk::AccessFlags::ACCELERATION_STRUCTURE_READ_KHR
            | vk::AccessFlags::ACCELERATION_STRUCTURE_WRITE_KHR;
    }
    ret
}

/// Image layout implied by a logical resource state.
pub fn resource_state_to_image_layout(state: ResourceState) -> vk::ImageLayout {
    if state.intersects(ResourceState::COPY_SOURCE) {
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    } else if state.intersects(ResourceState::COPY_DEST) {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL
    } else if state.intersects(ResourceState::RENDER_TARGET) {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    } else if state.intersects(ResourceState::DEPTH_WRITE) {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    } else if state.intersects(ResourceState::UNORDERED_ACCESS) {
        vk::ImageLayout::GENERAL
    } else if state.intersects(ResourceState::SHADER_RESOURCE) {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    } else if state.intersects(ResourceState::PRESENT) {
        vk::ImageLayout::PRESENT_SRC_KHR
    } else if state == ResourceState::COMMON {
        vk::ImageLayout::GENERAL
    } else {
        vk::ImageLayout::UNDEFINED
    }
}

/// Inputs to pipeline-stage derivation for one side of a barrier batch.
#[derive(Debug, Clone, Copy)]
pub struct PipelineStageOption {
    pub access: vk::AccessFlags,
    pub queue_type: QueueType,
    pub geometry_shader_supported: bool,
    pub tessellation_supported: bool,
    pub raytracing_supported: bool,
}

/// Pipeline stages that can produce/consume the given combined access mask
/// on the given queue type.
pub fn determine_pipeline_stage_flags(option: PipelineStageOption) -> vk::PipelineStageFlags {
    let mut flags = vk::PipelineStageFlags::empty();
    let access = option.access;
    match option.queue_type {
        QueueType::Graphics => {
            if access.intersects(vk::AccessFlags::INDEX_READ | vk::AccessFlags::VERTEX_ATTRIBUTE_READ) {
                flags |= vk::PipelineStageFlags::VERTEX_INPUT;
            }
            if access.intersects(
                vk::AccessFlags::UNIFORM_READ | vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            ) {
                flags |= vk::PipelineStageFlags::VERTEX_SHADER;
                flags |= vk::PipelineStageFlags::FRAGMENT_SHADER;
                if option.geometry_shader_supported {
                    flags |= vk::PipelineStageFlags::GEOMETRY_SHADER;
                }
                if option.tessellation_supported {
                    flags |= vk::PipelineStageFlags::TESSELLATION_CONTROL_SHADER;
                    flags |= vk::PipelineStageFlags::TESSELLATION_EVALUATION_SHADER;
                }
                flags |= vk::PipelineStageFlags::COMPUTE_SHADER;
                if option.raytracing_supported {
                    flags |= vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR;
                }
            }
            if access.intersects(vk::AccessFlags::INPUT_ATTACHMENT_READ) {
                flags |= vk::PipelineStageFlags::FRAGMENT_SHADER;
            }
            if access.intersects(
                vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            ) {
                flags |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
            }
            if access.intersects(
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ) {
                flags |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
            }
        }
        QueueType::Compute => {
            // Graphics-only access on an async compute queue cannot be
            // expressed precisely; be pessimistic.
            if access.intersects(vk::AccessFlags::INDEX_READ | vk::AccessFlags::VERTEX_ATTRIBUTE_READ)
                || access.intersects(vk::AccessFlags::INPUT_ATTACHMENT_READ)
                || access.intersects(
                    vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                )
                || access.intersects(
                    vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                )
            {
                return vk::PipelineStageFlags::ALL_COMMANDS;
            }
            if access.intersects(
                vk::AccessFlags::UNIFORM_READ | vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            ) {
                flags |= vk::PipelineStageFlags::COMPUTE_SHADER;
            }
        }
        QueueType::Transfer => return vk::PipelineStageFlags::ALL_COMMANDS,
    }

    // Stages shared by compute and graphics queues.
    if access.intersects(vk::AccessFlags::INDIRECT_COMMAND_READ) {
        flags |= vk::PipelineStageFlags::DRAW_INDIRECT;
    }
    if access.intersects(vk::AccessFlags::TRANSFER_READ | vk::AccessFlags::TRANSFER_WRITE) {
        flags |= vk::PipelineStageFlags::TRANSFER;
    }
    if access.intersects(vk::AccessFlags::HOST_READ | vk::AccessFlags::HOST_WRITE) {
        flags |= vk::PipelineStageFlags::HOST;
    }
    if flags.is_empty() {
        flags = vk::PipelineStageFlags::TOP_OF_PIPE;
    }
    flags
}

/// Image aspects of a format, optionally including the stencil aspect of
/// combined depth/stencil formats.
pub fn aspect_mask_of_format(format: Format, include_stencil: bool) -> vk::ImageAspectFlags {
    if format.is_depth_and_stencil() {
        let mut mask = vk::ImageAspectFlags::DEPTH;
        if include_stencil {
            mask |= vk::ImageAspectFlags::STENCIL;
        }
        mask
    } else if format.has_depth() {
        vk::ImageAspectFlags::DEPTH
    } else if format.has_stencil() {
        vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub fn image_usage_to_format_feature(usage: vk::ImageUsageFlags) -> vk::FormatFeatureFlags {
    let mut result = vk::FormatFeatureFlags::empty();
    if usage.contains(vk::ImageUsageFlags::SAMPLED) {
        result |= vk::FormatFeatureFlags::SAMPLED_IMAGE;
    }
    if usage.contains(vk::ImageUsageFlags::STORAGE) {
        result |= vk::FormatFeatureFlags::STORAGE_IMAGE;
    }
    if usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT) {
        result |= vk::FormatFeatureFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT) {
        result |= vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    result
}

/// Buffer usage bits implied by the descriptor types a buffer can bind as.
/// Every buffer is transfer-source capable so readback and defragmentation
/// copies never need a recreate.
pub fn to_buffer_usage(descriptors: DescriptorType, typed: bool) -> vk::BufferUsageFlags {
    let mut result = vk::BufferUsageFlags::TRANSFER_SRC;
    if descriptors.intersects(DescriptorType::UNIFORM_BUFFER) {
        result |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if descriptors.intersects(DescriptorType::RW_BUFFER) {
        result |= vk::BufferUsageFlags::STORAGE_BUFFER;
        if typed {
            result |= vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER;
        }
    }
    if descriptors.intersects(DescriptorType::BUFFER) {
        result |= vk::BufferUsageFlags::STORAGE_BUFFER;
        if typed {
            result |= vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER;
        }
    }
    if descriptors.intersects(DescriptorType::INDEX_BUFFER) {
        result |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if descriptors.intersects(DescriptorType::VERTEX_BUFFER) {
        result |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if descriptors.intersects(DescriptorType::INDIRECT_BUFFER) {
        result |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if descriptors.intersects(DescriptorType::TEXEL_BUFFER) {
        result |= vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER;
    }
    if descriptors.intersects(DescriptorType::RW_TEXEL_BUFFER) {
        result |= vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER;
    }
    if descriptors.intersects(DescriptorType::ACCELERATION_STRUCTURE) {
        result |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR;
    }
    if descriptors.intersects(DescriptorType::ACCELERATION_STRUCTURE_BUILD_INPUT) {
        result |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR;
    }
    if descriptors.intersects(DescriptorType::SHADER_DEVICE_ADDRESS) {
        result |= vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    if descriptors.intersects(DescriptorType::SHADER_BINDING_TABLE) {
        result |= vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR;
    }
    result
}

pub fn to_image_usage(descriptors: DescriptorType) -> vk::ImageUsageFlags {
    let mut result = vk::ImageUsageFlags::empty();
    if descriptors.intersects(DescriptorType::TEXTURE) {
        result |= vk::ImageUsageFlags::SAMPLED;
    }
    if descriptors.intersects(DescriptorType::RW_TEXTURE) {
        result |= vk::ImageUsageFlags::STORAGE;
    }
    if descriptors.intersects(DescriptorType::INPUT_ATTACHMENT) {
        result |= vk::ImageUsageFlags::INPUT_ATTACHMENT;
    }
    result
}

pub fn to_pipeline_bind_point(pipeline_type: PipelineType) -> vk::PipelineBindPoint {
    match pipeline_type {
        PipelineType::Compute => vk::PipelineBindPoint::COMPUTE,
        PipelineType::Graphics => vk::PipelineBindPoint::GRAPHICS,
        PipelineType::Raytracing => vk::PipelineBindPoint::RAY_TRACING_KHR,
        PipelineType::Undefined => {
            debug_assert!(false, "undefined pipeline type");
            vk::PipelineBindPoint::GRAPHICS
        }
    }
}

pub fn to_vk_filter(filter: FilterType) -> vk::Filter {
    match filter {
        FilterType::Nearest => vk::Filter::NEAREST,
        FilterType::Linear => vk::Filter::LINEAR,
    }
}

pub fn to_vk_mipmap_mode(mode: MipMapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipMapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipMapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn to_vk_address_mode(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub fn to_vk_compare_op(mode: CompareMode) -> vk::CompareOp {
    match mode {
        CompareMode::Never => vk::CompareOp::NEVER,
        CompareMode::Less => vk::CompareOp::LESS,
        CompareMode::Equal => vk::CompareOp::EQUAL,
        CompareMode::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareMode::Greater => vk::CompareOp::GREATER,
        CompareMode::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareMode::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareMode::Always => vk::CompareOp::ALWAYS,
    }
}

/// Backend descriptor type of a single RHI descriptor kind. `None` for
/// kinds with no Vulkan descriptor (vertex/index buffers and friends).
pub fn to_vk_descriptor_type(descriptor: DescriptorType) -> Option<vk::DescriptorType> {
    if descriptor == DescriptorType::SAMPLER {
        Some(vk::DescriptorType::SAMPLER)
    } else if descriptor == DescriptorType::TEXTURE || descriptor == DescriptorType::TEXTURE_CUBE {
        Some(vk::DescriptorType::SAMPLED_IMAGE)
    } else if descriptor == DescriptorType::UNIFORM_BUFFER {
        Some(vk::DescriptorType::UNIFORM_BUFFER)
    } else if descriptor == DescriptorType::RW_TEXTURE {
        Some(vk::DescriptorType::STORAGE_IMAGE)
    } else if descriptor == DescriptorType::BUFFER
        || descriptor == DescriptorType::BUFFER_RAW
        || descriptor == DescriptorType::RW_BUFFER
        || descriptor == DescriptorType::RW_BUFFER_RAW
    {
        Some(vk::DescriptorType::STORAGE_BUFFER)
    } else if descriptor == DescriptorType::INPUT_ATTACHMENT {
        Some(vk::DescriptorType::INPUT_ATTACHMENT)
    } else if descriptor == DescriptorType::TEXEL_BUFFER {
        Some(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
    } else if descriptor == DescriptorType::RW_TEXEL_BUFFER {
        Some(vk::DescriptorType::STORAGE_TEXEL_BUFFER)
    } else if descriptor == DescriptorType::COMBINED_IMAGE_SAMPLER {
        Some(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
    } else if descriptor == DescriptorType::RAY_TRACING {
        Some(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
    } else {
        None
    }
}

pub fn to_vk_shader_stages(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut res = vk::ShaderStageFlags::empty();
    if stages.intersects(ShaderStageFlags::VERT) {
        res |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.intersects(ShaderStageFlags::TESC) {
        res |= vk::ShaderStageFlags::TESSELLATION_CONTROL;
    }
    if stages.intersects(ShaderStageFlags::TESE) {
        res |= vk::ShaderStageFlags::TESSELLATION_EVALUATION;
    }
    if stages.intersects(ShaderStageFlags::GEOM) {
        res |= vk::ShaderStageFlags::GEOMETRY;
    }
    if stages.intersects(ShaderStageFlags::FRAG) {
        res |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stages.intersects(ShaderStageFlags::COMP) {
        res |= vk::ShaderStageFlags::COMPUTE;
    }
    if stages.intersects(ShaderStageFlags::RAYTRACING) {
        res |= vk::ShaderStageFlags::RAYGEN_KHR
            | vk::ShaderStageFlags::ANY_HIT_KHR
            | vk::ShaderStageFlags::CLOSEST_HIT_KHR
            | vk::ShaderStageFlags::MISS_KHR
            | vk::ShaderStageFlags::INTERSECTION_KHR
            | vk::ShaderStageFlags::CALLABLE_KHR;
    }
    res
}

pub fn to_vk_stage_bit(stage: ShaderStageFlags) -> vk::ShaderStageFlags {
    if stage == ShaderStageFlags::VERT {
        vk::ShaderStageFlags::VERTEX
    } else if stage == ShaderStageFlags::TESC {
        vk::ShaderStageFlags::TESSELLATION_CONTROL
    } else if stage == ShaderStageFlags::TESE {
        vk::ShaderStageFlags::TESSELLATION_EVALUATION
    } else if stage == ShaderStageFlags::GEOM {
        vk::ShaderStageFlags::GEOMETRY
    } else if stage == ShaderStageFlags::FRAG {
        vk::ShaderStageFlags::FRAGMENT
    } else if stage == ShaderStageFlags::COMP {
        vk::ShaderStageFlags::COMPUTE
    } else {
        vk::ShaderStageFlags::ALL
    }
}

pub fn to_vk_sample_count(count: SampleCount) -> vk::SampleCountFlags {
    match count {
        SampleCount::Count1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::Count2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::Count4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::Count8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::Count16 => vk::SampleCountFlags::TYPE_16,
    }
}

pub fn to_vk_blend_factor(constant: BlendConstant) -> vk::BlendFactor {
    match constant {
        BlendConstant::Zero => vk::BlendFactor::ZERO,
        BlendConstant::One => vk::BlendFactor::ONE,
        BlendConstant::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendConstant::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendConstant::DstColor => vk::BlendFactor::DST_COLOR,
        BlendConstant::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendConstant::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendConstant::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendConstant::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendConstant::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendConstant::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
        BlendConstant::BlendFactor => vk::BlendFactor::CONSTANT_COLOR,
        BlendConstant::OneMinusBlendFactor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
    }
}

pub fn to_vk_blend_op(mode: BlendMode) -> vk::BlendOp {
    match mode {
        BlendMode::Add => vk::BlendOp::ADD,
        BlendMode::Subtract => vk::BlendOp::SUBTRACT,
        BlendMode::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendMode::Min => vk::BlendOp::MIN,
        BlendMode::Max => vk::BlendOp::MAX,
    }
}

pub fn to_vk_stencil_op(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::SetZero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::Invert => vk::StencilOp::INVERT,
        StencilOp::IncrSat => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOp::DecrSat => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOp::Incr => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOp::Decr => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub fn to_vk_topology(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::PatchList => vk::PrimitiveTopology::PATCH_LIST,
    }
}

pub fn to_vk_cull_mode(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Back => vk::CullModeFlags::BACK,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Both => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

pub fn to_vk_polygon_mode(mode: FillMode) -> vk::PolygonMode {
    match mode {
        FillMode::Solid => vk::PolygonMode::FILL,
        FillMode::Wireframe => vk::PolygonMode::LINE,
    }
}

pub fn to_vk_front_face(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Ccw => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Cw => vk::FrontFace::CLOCKWISE,
    }
}

pub fn to_vk_vertex_input_rate(rate: VertexAttribRate) -> vk::VertexInputRate {
    match rate {
        VertexAttribRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexAttribRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub fn to_vk_index_type(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub fn to_vk_load_op(action: LoadActionType) -> vk::AttachmentLoadOp {
    match action {
        LoadActionType::DontCare => vk::AttachmentLoadOp::DONT_CARE,
        LoadActionType::Load => vk::AttachmentLoadOp::LOAD,
        LoadActionType::Clear => vk::AttachmentLoadOp::CLEAR,
    }
}

pub fn to_vk_store_op(action: StoreActionType) -> vk::AttachmentStoreOp {
    match action {
        StoreActionType::DontCare => vk::AttachmentStoreOp::DONT_CARE,
        StoreActionType::Store => vk::AttachmentStoreOp::STORE,
    }
}

pub fn to_vk_color_write_mask(mask: ColorWriteMask) -> vk::ColorComponentFlags {
    let mut res = vk::ColorComponentFlags::empty();
    if mask.intersects(ColorWriteMask::RED) {
        res |= vk::ColorComponentFlags::R;
    }
    if mask.intersects(ColorWriteMask::GREEN) {
        res |= vk::ColorComponentFlags::G;
    }
    if mask.intersects(ColorWriteMask::BLUE) {
        res |= vk::ColorComponentFlags::B;
    }
    if mask.intersects(ColorWriteMask::ALPHA) {
        res |= vk::ColorComponentFlags::A;
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_to_access_and_layout_table() {
        let rows = [
            (
                ResourceState::COPY_SOURCE,
                vk::AccessFlags::TRANSFER_READ,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            ),
            (
                ResourceState::COPY_DEST,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            ),
            (
                ResourceState::VERTEX_AND_CONSTANT_BUFFER,
                vk::AccessFlags::UNIFORM_READ | vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
                vk::ImageLayout::UNDEFINED,
            ),
            (ResourceState::INDEX_BUFFER, vk::AccessFlags::INDEX_READ, vk::ImageLayout::UNDEFINED),
            (
                ResourceState::UNORDERED_ACCESS,
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
                vk::ImageLayout::GENERAL,
            ),
            (
                ResourceState::INDIRECT_ARGUMENT,
                vk::AccessFlags::INDIRECT_COMMAND_READ,
                vk::ImageLayout::UNDEFINED,
            ),
            (
                ResourceState::RENDER_TARGET,
                vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ),
            (
                ResourceState::DEPTH_WRITE,
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ),
            (
                ResourceState::SHADER_RESOURCE,
                vk::AccessFlags::SHADER_READ,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            ),
            (ResourceState::PRESENT, vk::AccessFlags::MEMORY_READ, vk::ImageLayout::PRESENT_SRC_KHR),
            (ResourceState::COMMON, vk::AccessFlags::empty(), vk::ImageLayout::GENERAL),
            (ResourceState::UNDEFINED, vk::AccessFlags::empty(), vk::ImageLayout::UNDEFINED),
        ];
        for (state, access, layout) in rows {
            assert_eq!(resource_state_to_access_flags(state), access, "{state:?}");
            assert_eq!(resource_state_to_image_layout(state), layout, "{state:?}");
        }
    }

    fn option(access: vk::AccessFlags, queue_type: QueueType) -> PipelineStageOption {
        PipelineStageOption {
            access,
            queue_type,
            geometry_shader_supported: false,
            tessellation_supported: false,
            raytracing_supported: false,
        }
    }

    #[test]
    fn graphics_stage_derivation() {
        let stages = determine_pipeline_stage_flags(option(
            vk::AccessFlags::SHADER_READ,
            QueueType::Graphics,
        ));
        assert!(stages.contains(vk::PipelineStageFlags::VERTEX_SHADER));
        assert!(stages.contains(vk::PipelineStageFlags::FRAGMENT_SHADER));
        assert!(stages.contains(vk::PipelineStageFlags::COMPUTE_SHADER));
        assert!(!stages.contains(vk::PipelineStageFlags::GEOMETRY_SHADER));

        let mut with_geom = option(vk::AccessFlags::SHADER_READ, QueueType::Graphics);
        with_geom.geometry_shader_supported = true;
        assert!(determine_pipeline_stage_flags(with_geom)
            .contains(vk::PipelineStageFlags::GEOMETRY_SHADER));

        assert_eq!(
            determine_pipeline_stage_flags(option(
                vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
                QueueType::Graphics,
            )),
            vk::PipelineStageFlags::VERTEX_INPUT,
        );
        assert_eq!(
            determine_pipeline_stage_flags(option(
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                QueueType::Graphics,
            )),
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        );
    }

    #[test]
    fn compute_queue_is_pessimistic_for_graphics_access() {
        assert_eq!(
            determine_pipeline_stage_flags(option(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                QueueType::Compute,
            )),
            vk::PipelineStageFlags::ALL_COMMANDS,
        );
        assert_eq!(
            determine_pipeline_stage_flags(option(vk::AccessFlags::SHADER_WRITE, QueueType::Compute)),
            vk::PipelineStageFlags::COMPUTE_SHADER,
        );
    }

    #[test]
    fn transfer_queue_uses_all_commands() {
        assert_eq!(
            determine_pipeline_stage_flags(option(vk::AccessFlags::TRANSFER_WRITE, QueueType::Transfer)),
            vk::PipelineStageFlags::ALL_COMMANDS,
        );
    }

    #[test]
    fn empty_access_falls_back_to_top_of_pipe() {
        assert_eq!(
            determine_pipeline_stage_flags(option(vk::AccessFlags::empty(), QueueType::Graphics)),
            vk::PipelineStageFlags::TOP_OF_PIPE,
        );
    }

    #[test]
    fn buffer_usage_derivation() {
        let usage = to_buffer_usage(DescriptorType::UNIFORM_BUFFER | DescriptorType::BUFFER, false);
        assert!(usage.contains(vk::BufferUsageFlags::TRANSFER_SRC));
        assert!(usage.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
        assert!(usage.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
        assert!(!usage.contains(vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER));

        let typed = to_buffer_usage(DescriptorType::BUFFER, true);
        assert!(typed.contains(vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER));
    }
}
