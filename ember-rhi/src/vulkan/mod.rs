//! Vulkan backend for Ember RHI.

mod adapter;
mod backend;
mod buffer;
mod cmd;
mod convert;
mod descriptor;
mod device;
mod memory;
mod pipeline;
mod queue;
mod render_target;
mod root_signature;
mod sampler;
mod shader;
mod sync;
mod texture;

#[cfg(feature = "window")]
mod swapchain;

pub use adapter::{FormatCaps, VulkanAdapter};
pub use backend::VulkanBackend;
pub use buffer::VulkanBuffer;
pub use cmd::{
    BindRenderTargetsDesc, BindTargetDesc, BufferBarrier, CmdDesc, CmdPoolDesc, ImageBarrierState,
    RenderTargetBarrier, TextureBarrier, VulkanCmd, VulkanCmdPool,
};
pub use descriptor::{DescriptorData, DescriptorResources, DescriptorSetDesc, VulkanDescriptorSet};
pub use device::VulkanDevice;
pub use memory::AllocatorStats;
pub use pipeline::{ComputePipelineDesc, GraphicsPipelineDesc, PipelineDesc, VulkanPipeline};
pub use queue::{QueueSubmitDesc, VulkanQueue};
pub use render_target::VulkanRenderTarget;
pub use root_signature::{DescriptorInfo, RootSignatureDesc, VulkanRootSignature};
pub use sampler::VulkanSampler;
pub use shader::VulkanShader;
pub use sync::{VulkanFence, VulkanSemaphore};
pub use texture::{TextureUpdateDesc, VulkanTexture};

#[cfg(feature = "window")]
pub use queue::QueuePresentDesc;
#[cfg(feature = "window")]
pub use swapchain::{SwapChainDesc, VulkanSwapChain};
