//! Ember RHI: a rendering hardware interface over explicit GPU backends.
//! This crate defines the backend-agnostic object model (enums, flag sets,
//! descriptors, shader reflection) and the Vulkan backend implementing it.

pub mod error;
pub mod format;
pub mod reflection;
pub mod shader_store;
pub mod spirv;

pub use error::RhiError;
pub use format::Format;

/// Capability ceilings shared by all backends.
pub const MAX_RENDER_TARGET_ATTACHMENTS: usize = 8;
pub const MAX_VERTEX_BINDINGS: usize = 15;
pub const MAX_VERTEX_ATTRIBS: usize = 15;
pub const MAX_SWAPCHAIN_IMAGES: usize = 3;
pub const MAX_ADAPTERS_PER_BACKEND: usize = 4;
pub const MAX_DEVICES_PER_ADAPTER: usize = 4;
pub const MAX_PLANE_COUNT: usize = 3;

/// Well-known PCI vendor ids used when interpreting driver versions.
pub const GPU_VENDOR_ID_NVIDIA: u32 = 0x10DE;
pub const GPU_VENDOR_ID_AMD: u32 = 0x1002;
pub const GPU_VENDOR_ID_INTEL: u32 = 0x8086;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
    Transfer,
}

impl QueueType {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        match self {
            QueueType::Graphics => 0,
            QueueType::Compute => 1,
            QueueType::Transfer => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePriority {
    #[default]
    Normal,
    High,
    GlobalRealtime,
}

/// Result of a non-blocking fence query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    Complete,
    Incomplete,
    NotSubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MipMapMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    Mirror,
    #[default]
    Repeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    #[default]
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleLocation {
    #[default]
    Cosited,
    Midpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerRange {
    #[default]
    Full,
    Narrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerModelConversion {
    #[default]
    RgbIdentity,
    YcbcrIdentity,
    Ycbcr709,
    Ycbcr601,
    Ycbcr2020,
}

bitflags::bitflags! {
    /// Logical resource states; translated per backend into access masks,
    /// image layouts, and pipeline stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceState: u32 {
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const RENDER_TARGET = 0x4;
        const UNORDERED_ACCESS = 0x8;
        const DEPTH_WRITE = 0x10;
        const DEPTH_READ = 0x20;
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        const PIXEL_SHADER_RESOURCE = 0x80;
        const SHADER_RESOURCE = 0x40 | 0x80;
        const STREAM_OUT = 0x100;
        const INDIRECT_ARGUMENT = 0x200;
        const COPY_DEST = 0x400;
        const COPY_SOURCE = 0x800;
        const GENERIC_READ = 0x1 | 0x2 | 0x40 | 0x80 | 0x200 | 0x800;
        const PRESENT = 0x1000;
        const COMMON = 0x2000;
        const RAYTRACING_ACCELERATION_STRUCTURE = 0x4000;
        const SHADING_RATE_SOURCE = 0x8000;
    }
}

impl ResourceState {
    /// The undefined state: contents and layout are unknown.
    pub const UNDEFINED: ResourceState = ResourceState::empty();
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureCreationFlags: u32 {
        /// Texture allocates its own dedicated memory (committed resource).
        const OWN_MEMORY = 0x1;
        /// Memory may be shared with other processes.
        const EXPORT = 0x2;
        /// Texture is imported from an external handle.
        const IMPORT = 0x4;
        /// Use lazily-allocated on-tile/transient memory when available.
        const ON_TILE = 0x8;
        /// Force 2D instead of deriving dimensionality from (w, h, d).
        const FORCE_2D = 0x10;
        /// Force 3D instead of deriving dimensionality from (w, h, d).
        const FORCE_3D = 0x20;
        const ALLOW_DISPLAY_TARGET = 0x40;
        const SRGB = 0x80;
        const FAST_CLEAR = 0x100;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferCreationFlags: u32 {
        /// Buffer allocates its own dedicated memory.
        const OWN_MEMORY = 0x1;
        /// Map the buffer at creation and keep the address for its lifetime.
        const PERSISTENT_MAP = 0x2;
        const HOST_VISIBLE = 0x4;
        const HOST_COHERENT = 0x8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SampleCount {
    #[default]
    Count1 = 1,
    Count2 = 2,
    Count4 = 4,
    Count8 = 8,
    Count16 = 16,
}

/// Texture dimensionality as seen by shaders. Indexes the device's
/// null-descriptor tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureDimension {
    Dim1D,
    #[default]
    Dim2D,
    Dim2DMS,
    Dim3D,
    DimCube,
    Dim1DArray,
    Dim2DArray,
    Dim2DMSArray,
    DimCubeArray,
    Undefined,
}

impl TextureDimension {
    /// Number of concrete dimensions (excludes `Undefined`).
    pub const COUNT: usize = 9;

    pub fn index(self) -> usize {
        match self {
            TextureDimension::Dim1D => 0,
            TextureDimension::Dim2D => 1,
            TextureDimension::Dim2DMS => 2,
            TextureDimension::Dim3D => 3,
            TextureDimension::DimCube => 4,
            TextureDimension::Dim1DArray => 5,
            TextureDimension::Dim2DArray => 6,
            TextureDimension::Dim2DMSArray => 7,
            TextureDimension::DimCubeArray => 8,
            TextureDimension::Undefined => usize::MAX,
        }
    }
}

bitflags::bitflags! {
    /// Descriptor kinds a resource can be bound as. Also drives buffer and
    /// image usage derivation at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DescriptorType: u32 {
        const SAMPLER = 0x1;
        /// SRV read-only texture.
        const TEXTURE = 0x2;
        /// UAV read-write texture.
        const RW_TEXTURE = 0x4;
        /// SRV read-only buffer.
        const BUFFER = 0x8;
        const BUFFER_RAW = 0x8 | 0x10;
        /// UAV read-write buffer.
        const RW_BUFFER = 0x20;
        const RW_BUFFER_RAW = 0x20 | 0x40;
        const UNIFORM_BUFFER = 0x80;
        /// Inline constant block passed via push constants.
        const ROOT_CONSTANT = 0x100;
        const VERTEX_BUFFER = 0x200;
        const INDEX_BUFFER = 0x400;
        const INDIRECT_BUFFER = 0x800;
        /// Cubemap SRV.
        const TEXTURE_CUBE = 0x2 | 0x1000;
        const RENDER_TARGET_MIP_SLICES = 0x2000;
        const RENDER_TARGET_ARRAY_SLICES = 0x4000;
        const RENDER_TARGET_DEPTH_SLICES = 0x8000;
        const RAY_TRACING = 0x10000;
        const INDIRECT_COMMAND_BUFFER = 0x20000;
        /// Subpass input (Vulkan only).
        const INPUT_ATTACHMENT = 0x40000;
        const TEXEL_BUFFER = 0x80000;
        const RW_TEXEL_BUFFER = 0x100000;
        const COMBINED_IMAGE_SAMPLER = 0x200000;
        const ACCELERATION_STRUCTURE = 0x400000;
        const ACCELERATION_STRUCTURE_BUILD_INPUT = 0x800000;
        const SHADER_DEVICE_ADDRESS = 0x1000000;
        const SHADER_BINDING_TABLE = 0x2000000;
    }
}

impl DescriptorType {
    pub const UNDEFINED: DescriptorType = DescriptorType::empty();
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERT = 0x1;
        const TESC = 0x2;
        const TESE = 0x4;
        const GEOM = 0x8;
        const FRAG = 0x10;
        const COMP = 0x20;
        const RAYTRACING = 0x40;
    }
}

impl Default for ShaderStageFlags {
    fn default() -> Self {
        ShaderStageFlags::empty()
    }
}

impl ShaderStageFlags {
    pub const COUNT: usize = 7;

    /// Index of a single-stage flag into per-stage arrays.
    pub fn index(self) -> usize {
        debug_assert_eq!(self.bits().count_ones(), 1);
        self.bits().trailing_zeros() as usize
    }

    pub fn from_index(index: usize) -> ShaderStageFlags {
        ShaderStageFlags::from_bits_truncate(1 << index)
    }

    pub fn is_single_stage(self) -> bool {
        self.bits().count_ones() == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ShaderModel {
    Sm5_1 = 0x51,
    Sm6_0 = 0x60,
    Sm6_1 = 0x61,
    Sm6_2 = 0x62,
    Sm6_3 = 0x63,
    Sm6_4 = 0x64,
    Sm6_5 = 0x65,
    Sm6_6 = 0x66,
    #[default]
    Sm6_7 = 0x67,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineType {
    #[default]
    Undefined,
    Compute,
    Graphics,
    Raytracing,
}

/// Descriptor update frequency. Equals the descriptor-set index a binding
/// lives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum UpdateFrequency {
    #[default]
    None = 0,
    PerFrame = 1,
    PerBatch = 2,
    PerDraw = 3,
}

impl UpdateFrequency {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_set(set: u32) -> UpdateFrequency {
        match set {
            0 => UpdateFrequency::None,
            1 => UpdateFrequency::PerFrame,
            2 => UpdateFrequency::PerBatch,
            _ => UpdateFrequency::PerDraw,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RootSignatureFlags: u32 {
        /// Local root signature, used mainly by raytracing shaders.
        const LOCAL = 0x1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterType {
    #[default]
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

/// Memory heap class a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceMemoryUsage {
    #[default]
    Unknown,
    /// Device local; not host visible.
    GpuOnly,
    /// Host visible; never read by the GPU directly.
    CpuOnly,
    /// Host visible upload heap (CPU writes, GPU reads).
    CpuToGpu,
    /// Readback heap (GPU writes, CPU reads).
    GpuToCpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexType {
    #[default]
    U32,
    U16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexAttribRate {
    #[default]
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    PatchList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendConstant {
    Zero,
    #[default]
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
    BlendFactor,
    OneMinusBlendFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    Back,
    Front,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    SetZero,
    Replace,
    Invert,
    IncrSat,
    DecrSat,
    Incr,
    Decr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadActionType {
    #[default]
    DontCare,
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreActionType {
    #[default]
    DontCare,
    Store,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorWriteMask: u32 {
        const RED = 0x1;
        const GREEN = 0x2;
        const BLUE = 0x4;
        const ALPHA = 0x8;
        const ALL = 0xF;
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        ColorWriteMask::ALL
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlendStateTargets: u32 {
        const TARGET_0 = 0x01;
        const TARGET_1 = 0x02;
        const TARGET_2 = 0x04;
        const TARGET_3 = 0x08;
        const TARGET_4 = 0x10;
        const TARGET_5 = 0x20;
        const TARGET_6 = 0x40;
        const TARGET_7 = 0x80;
        const ALL = 0xFF;
    }
}

impl Default for BlendStateTargets {
    fn default() -> Self {
        BlendStateTargets::ALL
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WaveOpsSupportFlags: u32 {
        const BASIC = 0x01;
        const VOTE = 0x02;
        const ARITHMETIC = 0x04;
        const BALLOT = 0x08;
        const SHUFFLE = 0x10;
        const SHUFFLE_RELATIVE = 0x20;
        const CLUSTERED = 0x40;
        const QUAD = 0x80;
        const PARTITIONED_NV = 0x100;
    }
}

/// Clear color or depth/stencil value attached to render targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color { r: f32, g: f32, b: f32, a: f32 },
    DepthStencil { depth: f32, stencil: u32 },
}

impl Default for ClearValue {
    fn default() -> Self {
        ClearValue::Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }
}

/// Vendor identity reported by the adapter, with the driver version decoded
/// per vendor convention.
#[derive(Debug, Clone, Default)]
pub struct GpuVendorPreset {
    pub vendor_id: u32,
    pub model_id: u32,
    pub revision_id: u32,
    pub gpu_name: String,
    pub gpu_driver_version: String,
}

/// Capabilities and limits of one adapter, probed once at enumeration.
#[derive(Debug, Clone, Default)]
pub struct GpuSettings {
    pub uniform_buffer_alignment: u64,
    pub upload_buffer_texture_alignment: u32,
    pub upload_buffer_texture_row_alignment: u32,
    pub max_vertex_input_bindings: u32,
    pub timestamp_period: f32,
    pub wave_lane_count: u32,
    pub wave_ops_support_flags: WaveOpsSupportFlags,
    pub multi_draw_indirect: bool,
    pub rovs_supported: bool,
    pub tessellation_supported: bool,
    pub geometry_shader_supported: bool,
    pub gpu_breadcrumbs: bool,
    pub hdr_supported: bool,
    pub gpu_vendor_preset: GpuVendorPreset,
}

impl Default for WaveOpsSupportFlags {
    fn default() -> Self {
        WaveOpsSupportFlags::empty()
    }
}

//////////////////////////////////////////////////////////////////////////////
// Object descriptors
//////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct BackendDesc {
    pub app_name: String,
}

impl Default for BackendDesc {
    fn default() -> Self {
        Self { app_name: "Untitled".to_string() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdapterDesc {
    /// Pick the best-ranked idle adapter (the only strategy today).
    pub select_best: bool,
}

#[derive(Debug, Clone)]
pub struct DeviceDesc {
    /// Create every queue each family advertises instead of one per family.
    pub request_all_available_queues: bool,
    pub shader_model: ShaderModel,
}

impl Default for DeviceDesc {
    fn default() -> Self {
        Self { request_all_available_queues: true, shader_model: ShaderModel::Sm6_7 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SemaphoreDesc {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct FenceDesc {
    pub name: String,
    pub signaled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QueueDesc {
    pub queue_type: Option<QueueType>,
    pub priority: QueuePriority,
}

impl QueueDesc {
    pub fn graphics() -> Self {
        Self { queue_type: Some(QueueType::Graphics), ..Default::default() }
    }

    pub fn transfer() -> Self {
        Self { queue_type: Some(QueueType::Transfer), ..Default::default() }
    }

    pub fn resolved_type(&self) -> QueueType {
        self.queue_type.unwrap_or(QueueType::Graphics)
    }
}

#[derive(Debug, Clone)]
pub struct SamplerConversionDesc {
    pub format: Format,
    pub model: SamplerModelConversion,
    pub range: SamplerRange,
    pub chroma_offset_x: SampleLocation,
    pub chroma_offset_y: SampleLocation,
    pub chroma_filter: FilterType,
    pub force_explicit_reconstruction: bool,
}

impl Default for SamplerConversionDesc {
    fn default() -> Self {
        Self {
            format: Format::Undefined,
            model: SamplerModelConversion::default(),
            range: SamplerRange::default(),
            chroma_offset_x: SampleLocation::default(),
            chroma_offset_y: SampleLocation::default(),
            chroma_filter: FilterType::default(),
            force_explicit_reconstruction: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SamplerDesc {
    pub min_filter: FilterType,
    pub mag_filter: FilterType,
    pub mipmap_mode: MipMapMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub mip_lod_bias: f32,
    /// Explicit (min, max) lod override; defaults derive from mipmap mode.
    pub lod_range: Option<(f32, f32)>,
    /// Anisotropic filtering is enabled iff this is greater than zero.
    pub max_anisotropy: f32,
    pub compare_func: CompareMode,
    pub conversion: SamplerConversionDesc,
}

#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub name: String,
    /// Raw backend image to wrap instead of allocating (swap-chain images).
    pub native_handle: Option<u64>,
    pub clear_value: ClearValue,
    pub flags: TextureCreationFlags,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub sample_count: SampleCount,
    pub sample_quality: u32,
    pub format: Format,
    pub start_state: ResourceState,
    pub descriptor_type: DescriptorType,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            native_handle: None,
            clear_value: ClearValue::default(),
            flags: TextureCreationFlags::empty(),
            width: 1,
            height: 1,
            depth: 1,
            array_size: 1,
            mip_levels: 1,
            sample_count: SampleCount::Count1,
            sample_quality: 0,
            format: Format::Undefined,
            start_state: ResourceState::UNDEFINED,
            descriptor_type: DescriptorType::UNDEFINED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Requested alignment in bytes; 0 defers to the backend.
    pub alignment: u64,
    pub memory_usage: ResourceMemoryUsage,
    pub flags: BufferCreationFlags,
    /// First element visible through SRV/UAV views.
    pub first_element: u64,
    pub element_count: u64,
    pub struct_stride: u64,
    pub start_state: ResourceState,
    /// Element format for typed (texel) buffer views.
    pub format: Format,
    pub descriptor_type: DescriptorType,
}

impl Default for BufferDesc {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            size: 0,
            alignment: 0,
            memory_usage: ResourceMemoryUsage::Unknown,
            flags: BufferCreationFlags::empty(),
            first_element: 0,
            element_count: 0,
            struct_stride: 0,
            start_state: ResourceState::UNDEFINED,
            format: Format::Undefined,
            descriptor_type: DescriptorType::UNDEFINED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub name: String,
    pub native_handle: Option<u64>,
    pub flags: TextureCreationFlags,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub sample_count: SampleCount,
    pub sample_quality: u32,
    pub format: Format,
    pub start_state: ResourceState,
    pub clear_value: ClearValue,
    pub descriptor_type: DescriptorType,
}

impl Default for RenderTargetDesc {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            native_handle: None,
            flags: TextureCreationFlags::empty(),
            width: 0,
            height: 0,
            depth: 1,
            array_size: 1,
            mip_levels: 1,
            sample_count: SampleCount::Count1,
            sample_quality: 0,
            format: Format::Undefined,
            start_state: ResourceState::UNDEFINED,
            clear_value: ClearValue::default(),
            descriptor_type: DescriptorType::UNDEFINED,
        }
    }
}

/// One shader stage: pre-compiled byte code is fetched from the shader
/// store by relative path.
#[derive(Debug, Clone)]
pub struct ShaderStageDesc {
    pub stage: ShaderStageFlags,
    pub path: String,
    pub entry_point: String,
}

impl Default for ShaderStageDesc {
    fn default() -> Self {
        Self { stage: ShaderStageFlags::empty(), path: String::new(), entry_point: "main".to_string() }
    }
}

/// Specialization constant blob (Vulkan only).
#[derive(Debug, Clone, Default)]
pub struct ShaderConstant {
    pub index: u32,
    pub blob: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderDesc {
    pub name: String,
    pub stages: Vec<ShaderStageDesc>,
    pub constants: Vec<ShaderConstant>,
    pub shader_model: ShaderModel,
}

/// Placement of one mip/layer inside a staging buffer during subresource
/// copies. Pitches are byte strides aligned to the adapter's upload
/// alignments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubresourceDataDesc {
    pub src_offset: u64,
    pub mip_level: u32,
    pub array_layer: u32,
    pub row_pitch: u32,
    pub slice_pitch: u32,
}

/// Range within a buffer bound through a descriptor update.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorDataRange {
    pub offset: u64,
    pub size: u64,
}

/// Per-attachment blend state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendTargetDesc {
    pub src_factor: BlendConstant,
    pub dst_factor: BlendConstant,
    pub src_alpha_factor: BlendConstant,
    pub dst_alpha_factor: BlendConstant,
    pub blend_mode: BlendMode,
    pub blend_alpha_mode: BlendMode,
    pub write_mask: ColorWriteMask,
}

impl BlendTargetDesc {
    /// Blending is disabled when the factors are the identity
    /// (ONE, ZERO, ONE, ZERO).
    pub fn is_blend_disabled(&self) -> bool {
        self.src_factor == BlendConstant::One
            && self.dst_factor == BlendConstant::Zero
            && self.src_alpha_factor == BlendConstant::One
            && self.dst_alpha_factor == BlendConstant::Zero
    }
}

#[derive(Debug, Clone)]
pub struct BlendStateDesc {
    pub per_target: [BlendTargetDesc; MAX_RENDER_TARGET_ATTACHMENTS],
    pub target_mask: BlendStateTargets,
    /// When false every attachment uses `per_target[0]`.
    pub independent_blend: bool,
}

impl Default for BlendStateDesc {
    fn default() -> Self {
        Self {
            per_target: [BlendTargetDesc::default(); MAX_RENDER_TARGET_ATTACHMENTS],
            target_mask: BlendStateTargets::ALL,
            independent_blend: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DepthStateDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareMode,
    pub stencil_test: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub stencil_front_func: CompareMode,
    pub stencil_front_fail: StencilOp,
    pub depth_front_fail: StencilOp,
    pub stencil_front_pass: StencilOp,
    pub stencil_back_func: CompareMode,
    pub stencil_back_fail: StencilOp,
    pub depth_back_fail: StencilOp,
    pub stencil_back_pass: StencilOp,
}

#[derive(Debug, Clone, Default)]
pub struct RasterizerStateDesc {
    pub cull_mode: CullMode,
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
    pub fill_mode: FillMode,
    pub front_face: FrontFace,
    pub depth_clamp: bool,
}

#[derive(Debug, Clone)]
pub struct VertexAttrib {
    pub semantic_name: String,
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
    pub rate: VertexAttribRate,
}

#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    pub attribs: Vec<VertexAttrib>,
}

/// Rounds `value` up to the next multiple of `alignment` (> 0).
pub fn round_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Row and slice alignments staging data must respect when uploading
/// `format` texels on the given adapter.
pub fn upload_alignments(settings: &GpuSettings, format: Format) -> (u32, u32) {
    let block_bytes = format.byte_count().max(1);
    let row_alignment = settings.upload_buffer_texture_row_alignment.max(1);
    let slice_alignment = round_up(
        round_up(settings.upload_buffer_texture_alignment.max(1) as u64, block_bytes as u64),
        row_alignment as u64,
    ) as u32;
    (row_alignment, slice_alignment)
}

#[cfg(feature = "vulkan")]
pub mod vulkan;

#[cfg(feature = "vulkan")]
pub use vulkan::{
    AllocatorStats, BindRenderTargetsDesc, BindTargetDesc, BufferBarrier, CmdDesc, CmdPoolDesc,
    ComputePipelineDesc, DescriptorData, DescriptorInfo, DescriptorResources, DescriptorSetDesc,
    FormatCaps, GraphicsPipelineDesc, ImageBarrierState, PipelineDesc, QueueSubmitDesc,
    RenderTargetBarrier, RootSignatureDesc, TextureBarrier, TextureUpdateDesc, VulkanAdapter,
    VulkanBackend, VulkanBuffer, VulkanCmd, VulkanCmdPool, VulkanDescriptorSet, VulkanDevice,
    VulkanFence, VulkanPipeline, VulkanQueue, VulkanRenderTarget, VulkanRootSignature,
    VulkanSampler, VulkanSemaphore, VulkanShader, VulkanTexture,
};

#[cfg(feature = "window")]
pub use vulkan::{QueuePresentDesc, SwapChainDesc, VulkanSwapChain};
