//! Logical device: creation with extension opt-in, the queue registry,
//! default ("null") resources, the empty descriptor set, object factories,
//! and debug-label tagging.

use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::{Arc, Mutex};

use ash::vk;

use crate::{
    BufferDesc, DescriptorType, DeviceDesc, FenceDesc, Format, LoadActionType, QueueDesc,
    QueueType, RenderTargetDesc, ResourceMemoryUsage, ResourceState, RhiError, SampleCount,
    SamplerDesc, SemaphoreDesc, ShaderDesc, ShaderModel, StoreActionType, TextureDesc,
    TextureDimension,
};

use super::adapter::VulkanAdapter;
use super::buffer::VulkanBuffer;
use super::cmd::{CmdDesc, CmdPoolDesc, ImageBarrierState, TextureBarrier, VulkanCmd, VulkanCmdPool};
use super::descriptor::{DescriptorSetDesc, VulkanDescriptorSet};
use super::memory::DeviceAllocator;
use super::pipeline::{PipelineDesc, VulkanPipeline};
use super::queue::{QueueSubmitDesc, VulkanQueue};
use super::render_target::VulkanRenderTarget;
use super::root_signature::{RootSignatureDesc, VulkanRootSignature};
use super::sampler::VulkanSampler;
use super::shader::VulkanShader;
use super::sync::{VulkanFence, VulkanSemaphore};
use super::texture::VulkanTexture;

#[cfg(feature = "window")]
use super::swapchain::{SwapChainDesc, VulkanSwapChain};

/// Bookkeeping for one queue family, keyed by its raw queue-flag bits.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueFamilyInfo {
    pub available: u32,
    pub used: u32,
    pub family_index: u8,
}

/// Result of a queue-family query: where the queue lives and whether a
/// request would consume a dedicated slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueSlot {
    pub family_index: u8,
    pub queue_index: u8,
    pub flag_key: u32,
    pub consume: bool,
}

#[derive(Hash, PartialEq, Eq, Clone)]
pub(crate) struct RenderPassCacheKey {
    pub color: Vec<(Format, LoadActionType, StoreActionType)>,
    pub depth: Option<(Format, LoadActionType, StoreActionType)>,
    pub sample_count: SampleCount,
}

#[derive(Hash, PartialEq, Eq, Clone)]
pub(crate) struct FramebufferCacheKey {
    pub render_pass: u64,
    pub width: u32,
    pub height: u32,
    pub attachments: Vec<u64>,
}

/// Device-level state shared by every child object through an `Arc`.
pub(crate) struct DeviceShared {
    pub adapter: Arc<VulkanAdapter>,
    pub device: ash::Device,
    pub allocator: DeviceAllocator,
    pub shader_model: ShaderModel,
    pub raytracing_supported: bool,
    pub external_memory_supported: bool,
    pub queue_infos: Mutex<HashMap<u32, QueueFamilyInfo>>,
    /// Preferred family per queue type, resolved once at creation.
    pub queue_family_indexes: [u8; QueueType::COUNT],
    /// One submit lock per queue family, shared by all queues in it.
    pub submit_mutexes: Vec<Arc<Mutex<()>>>,
    pub debug_utils: Option<ash::ext::debug_utils::Device>,
    /// Bound into set indices a pipeline layout skips; Vulkan requires
    /// every referenced set number to have a set bound.
    pub empty_descriptor_pool: vk::DescriptorPool,
    pub empty_descriptor_set_layout: vk::DescriptorSetLayout,
    pub empty_descriptor_set: vk::DescriptorSet,
    pub pipeline_cache: vk::PipelineCache,
    pub render_pass_cache: Mutex<HashMap<RenderPassCacheKey, vk::RenderPass>>,
    pub framebuffer_cache: Mutex<HashMap<FramebufferCacheKey, vk::Framebuffer>>,
}

/// Queue selection over the registry: among families covering the required
/// bit with free queues, pick the most specialized (fewest supported
/// types). Graphics always resolves to the same single queue. Falls back
/// to family 0 with a warning.
pub(crate) fn select_queue_slot(
    infos: &HashMap<u32, QueueFamilyInfo>,
    queue_type: QueueType,
) -> QueueSlot {
    let required = match queue_type {
        QueueType::Graphics => vk::QueueFlags::GRAPHICS,
        QueueType::Compute => vk::QueueFlags::COMPUTE,
        QueueType::Transfer => vk::QueueFlags::TRANSFER,
    };
    let all_supported = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;

    let mut keys: Vec<u32> = infos.keys().copied().collect();
    keys.sort_unstable();

    let mut found: Option<QueueSlot> = None;
    let mut min_support_count = u32::MAX;
    for key in keys {
        let info = infos[&key];
        let flags = vk::QueueFlags::from_raw(key);
        if !flags.intersects(required) || info.used >= info.available {
            continue;
        }
        let support_count = (flags & all_supported).as_raw().count_ones();
        if queue_type == QueueType::Graphics {
            // Keep a single graphics queue: always the same family, index 0.
            found = Some(QueueSlot {
                family_index: info.family_index,
                queue_index: 0,
                flag_key: key,
                consume: false,
            });
            break;
        }
        if support_count < min_support_count {
            min_support_count = support_count;
            found = Some(QueueSlot {
                family_index: info.family_index,
                queue_index: info.used as u8,
                flag_key: key,
                consume: true,
            });
            if min_support_count == 1 {
                break;
            }
        }
    }

    match found {
        Some(slot) => {
            log::info!(
                "found queue of {:?} (family={}, flags={:#x}, dedicated={}, index={})",
                queue_type,
                slot.family_index,
                slot.flag_key,
                min_support_count == 1,
                slot.queue_index,
            );
            slot
        }
        None => {
            let flag_key = infos
                .iter()
                .find(|(_, info)| info.family_index == 0)
                .map(|(&key, _)| key)
                .unwrap_or(0);
            log::warn!("no free queue of {queue_type:?}, using default one (family=0, index=0)");
            QueueSlot { family_index: 0, queue_index: 0, flag_key, consume: false }
        }
    }
}

impl DeviceShared {
    pub fn query_available_queue_index(&self, queue_type: QueueType) -> QueueSlot {
        select_queue_slot(&self.queue_infos.lock().unwrap(), queue_type)
    }

    /// Like `query_available_queue_index`, but consumes the chosen slot.
    pub fn request_queue_index(&self, queue_type: QueueType) -> QueueSlot {
        let slot = self.query_available_queue_index(queue_type);
        if slot.consume {
            let mut infos = self.queue_infos.lock().unwrap();
            if let Some(info) = infos.get_mut(&slot.flag_key) {
                info.used += 1;
            }
        }
        slot
    }

    pub fn release_queue_index(&self, flag_key: u32, consumed: bool) {
        if !consumed {
            return;
        }
        let mut infos = self.queue_infos.lock().unwrap();
        if let Some(info) = infos.get_mut(&flag_key) {
            debug_assert!(info.used > 0);
            info.used = info.used.saturating_sub(1);
        }
    }

    pub fn submit_mutex(&self, family_index: u8) -> Arc<Mutex<()>> {
        self.submit_mutexes
            .get(family_index as usize)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())))
    }

    /// Tags a backend object with a developer-facing label (debug builds).
    pub fn set_debug_name<H: vk::Handle + Copy>(&self, handle: H, name: &str) {
        if !cfg!(debug_assertions) || name.is_empty() {
            return;
        }
        let Some(debug_utils) = &self.debug_utils else { return };
        let Ok(name) = std::ffi::CString::new(name) else { return };
        let info = vk::DebugUtilsObjectNameInfoEXT::default().object_handle(handle).object_name(&name);
        unsafe {
            let _ = debug_utils.set_debug_utils_object_name(&info);
        }
    }

    pub fn get_or_create_render_pass(
        &self,
        key: &RenderPassCacheKey,
        clear_depth_stencil: Option<(LoadActionType, StoreActionType)>,
    ) -> Result<vk::RenderPass, RhiError> {
        let mut cache = self.render_pass_cache.lock().unwrap();
        if let Some(&render_pass) = cache.get(key) {
            return Ok(render_pass);
        }

        let sample_count = super::convert::to_vk_sample_count(key.sample_count);
        let mut attachments = Vec::new();
        let mut color_refs = Vec::new();
        for &(format, load, store) in &key.color {
            color_refs.push(
                vk::AttachmentReference::default()
                    .attachment(attachments.len() as u32)
                    .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
            attachments.push(
                vk::AttachmentDescription::default()
                    .format(super::convert::to_vk_format(format))
                    .samples(sample_count)
                    .load_op(super::convert::to_vk_load_op(load))
                    .store_op(super::convert::to_vk_store_op(store))
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(if load == LoadActionType::Load {
                        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
                    } else {
                        vk::ImageLayout::UNDEFINED
                    })
                    .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
        }

        let mut depth_ref = vk::AttachmentReference::default();
        let has_depth = key.depth.is_some();
        if let Some((format, load, store)) = key.depth {
            let (stencil_load, stencil_store) =
                clear_depth_stencil.unwrap_or((LoadActionType::DontCare, StoreActionType::DontCare));
            depth_ref = vk::AttachmentReference::default()
                .attachment(attachments.len() as u32)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
            attachments.push(
                vk::AttachmentDescription::default()
                    .format(super::convert::to_vk_format(format))
                    .samples(sample_count)
                    .load_op(super::convert::to_vk_load_op(load))
                    .store_op(super::convert::to_vk_store_op(store))
                    .stencil_load_op(super::convert::to_vk_load_op(stencil_load))
                    .stencil_store_op(super::convert::to_vk_store_op(stencil_store))
                    .initial_layout(if load == LoadActionType::Load {
                        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
                    } else {
                        vk::ImageLayout::UNDEFINED
                    })
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
        let render_pass = unsafe {
            self.device
                .create_render_pass(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateRenderPass: {e:?}")))?
        };
        cache.insert(key.clone(), render_pass);
        Ok(render_pass)
    }

    pub fn get_or_create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        views: &[vk::ImageView],
        width: u32,
        height: u32,
    ) -> Result<vk::Framebuffer, RhiError> {
        use ash::vk::Handle;
        let key = FramebufferCacheKey {
            render_pass: render_pass.as_raw(),
            width,
            height,
            attachments: views.iter().map(|v| v.as_raw()).collect(),
        };
        let mut cache = self.framebuffer_cache.lock().unwrap();
        if let Some(&framebuffer) = cache.get(&key) {
            return Ok(framebuffer);
        }
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(views)
            .width(width)
            .height(height)
            .layers(1);
        let framebuffer = unsafe {
            self.device
                .create_framebuffer(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateFramebuffer: {e:?}")))?
        };
        cache.insert(key, framebuffer);
        Ok(framebuffer)
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            for (_, framebuffer) in self.framebuffer_cache.lock().unwrap().drain() {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            for (_, render_pass) in self.render_pass_cache.lock().unwrap().drain() {
                self.device.destroy_render_pass(render_pass, None);
            }
            self.device.destroy_pipeline_cache(self.pipeline_cache, None);
            // The empty set is freed with its pool.
            self.device.destroy_descriptor_set_layout(self.empty_descriptor_set_layout, None);
            self.device.destroy_descriptor_pool(self.empty_descriptor_pool, None);
            self.device.destroy_device(None);
        }
    }
}

impl std::fmt::Debug for DeviceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceShared").finish_non_exhaustive()
    }
}

/// Default resources the device owns so un-updated bindings stay legal.
struct NullDescriptors {
    texture_srv: Vec<Option<VulkanTexture>>,
    texture_uav: Vec<Option<VulkanTexture>>,
    buffer_srv: VulkanBuffer,
    buffer_uav: VulkanBuffer,
    sampler: VulkanSampler,
}

/// One-shot bundle used to move freshly created resources into their
/// advertised start states.
struct InitialTransition {
    queue: VulkanQueue,
    cmd_pool: VulkanCmdPool,
    cmd: VulkanCmd,
    fence: VulkanFence,
}

/// The logical device: owner of every downstream object factory.
pub struct VulkanDevice {
    shared: Arc<DeviceShared>,
    nulls: NullDescriptors,
    initial_transition: Mutex<InitialTransition>,
}

/// Device extensions we opt into when present.
fn wanted_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,
        ash::ext::memory_priority::NAME,
        ash::ext::pageable_device_local_memory::NAME,
        ash::ext::fragment_shader_interlock::NAME,
        ash::khr::ray_tracing_pipeline::NAME,
        ash::khr::acceleration_structure::NAME,
        ash::khr::ray_query::NAME,
        ash::khr::deferred_host_operations::NAME,
        ash::khr::external_memory_win32::NAME,
    ]
}

impl VulkanDevice {
    pub(crate) fn new(adapter: Arc<VulkanAdapter>, desc: &DeviceDesc) -> Result<Arc<VulkanDevice>, RhiError> {
        let instance = &adapter.instance_shared().instance;
        let physical_device = adapter.handle();

        // Extension opt-in: wanted ∩ available.
        let available: Vec<std::ffi::CString> = unsafe {
            instance
                .enumerate_device_extension_properties(physical_device)
                .map_err(|e| RhiError::resource(format!("vkEnumerateDeviceExtensionProperties: {e:?}")))?
                .iter()
                .map(|p| CStr::from_ptr(p.extension_name.as_ptr()).to_owned())
                .collect()
        };
        let mut ready: Vec<&'static CStr> = Vec::new();
        for wanted in wanted_device_extensions() {
            if available.iter().any(|a| a.as_c_str() == wanted) {
                ready.push(wanted);
            }
        }
        let has = |name: &CStr| ready.iter().any(|&e| e == name);

        let raytracing_supported = has(ash::khr::ray_tracing_pipeline::NAME)
            && has(ash::khr::acceleration_structure::NAME)
            && has(ash::khr::ray_query::NAME)
            && has(ash::khr::deferred_host_operations::NAME);
        let external_memory_supported = has(ash::khr::external_memory_win32::NAME);

        // Feature chain; queried once, then handed to device creation.
        let mut descriptor_indexing = vk::PhysicalDeviceDescriptorIndexingFeatures::default();
        let mut ycbcr = vk::PhysicalDeviceSamplerYcbcrConversionFeatures::default();
        let mut buffer_device_address = vk::PhysicalDeviceBufferDeviceAddressFeatures::default();
        let mut interlock = vk::PhysicalDeviceFragmentShaderInterlockFeaturesEXT::default();
        let mut ray_tracing_pipeline = vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default();
        let mut acceleration_structure = vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default();
        let mut ray_query = vk::PhysicalDeviceRayQueryFeaturesKHR::default();

        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut descriptor_indexing)
            .push_next(&mut ycbcr)
            .push_next(&mut buffer_device_address);
        if has(ash::ext::fragment_shader_interlock::NAME) {
            features2 = features2.push_next(&mut interlock);
        }
        if raytracing_supported {
            features2 = features2
                .push_next(&mut ray_tracing_pipeline)
                .push_next(&mut acceleration_structure)
                .push_next(&mut ray_query);
        }
        unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };

        // One create-info per non-empty family; request every advertised
        // queue (or one) so async compute/transfer can be carved out later.
        let family_properties =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        const MAX_QUEUES_PER_FAMILY: usize = 64;
        let mut queue_infos = HashMap::new();
        let mut family_requests: Vec<(usize, usize)> = Vec::new();
        for (i, family) in family_properties.iter().enumerate() {
            if family.queue_count == 0 {
                continue;
            }
            let mut count =
                if desc.request_all_available_queues { family.queue_count as usize } else { 1 };
            if count > MAX_QUEUES_PER_FAMILY {
                log::warn!(
                    "queue family {i} advertises {count} queues, clamping to {MAX_QUEUES_PER_FAMILY}"
                );
                count = MAX_QUEUES_PER_FAMILY;
            }
            log::info!(
                "queue family [{i}/{}] flags {:?}: requesting {count}/{} queues",
                family_properties.len(),
                family.queue_flags,
                family.queue_count,
            );
            queue_infos.insert(
                family.queue_flags.as_raw(),
                QueueFamilyInfo { available: count as u32, used: 0, family_index: i as u8 },
            );
            family_requests.push((i, count));
        }
        let priorities: Vec<Vec<f32>> =
            family_requests.iter().map(|&(_, count)| vec![1.0; count]).collect();
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = family_requests
            .iter()
            .zip(&priorities)
            .map(|(&(family_index, _), priorities)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family_index as u32)
                    .queue_priorities(priorities)
            })
            .collect();

        let extension_ptrs: Vec<*const i8> = ready.iter().map(|e| e.as_ptr()).collect();
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .push_next(&mut features2);
        let device = unsafe {
            instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateDevice: {e:?}")))?
        };

        let debug_utils = adapter
            .instance_shared()
            .has_debug_utils()
            .then(|| ash::ext::debug_utils::Device::new(instance, &device));

        // Empty descriptor pool/layout/set for unused set indices. The pool
        // needs one dummy size; true empty pools are not allowed.
        let (empty_descriptor_pool, empty_descriptor_set_layout, empty_descriptor_set) = unsafe {
            let pool_sizes =
                [vk::DescriptorPoolSize::default().ty(vk::DescriptorType::SAMPLER).descriptor_count(1)];
            let pool_info = vk::DescriptorPoolCreateInfo::default().max_sets(1).pool_sizes(&pool_sizes);
            let pool = device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateDescriptorPool: {e:?}")))?;
            let layout_info = vk::DescriptorSetLayoutCreateInfo::default();
            let layout = device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateDescriptorSetLayout: {e:?}")))?;
            let layouts = [layout];
            let alloc_info =
                vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts);
            let sets = device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(|e| RhiError::resource(format!("vkAllocateDescriptorSets: {e:?}")))?;
            (pool, layout, sets[0])
        };

        let pipeline_cache = unsafe {
            device
                .create_pipeline_cache(&vk::PipelineCacheCreateInfo::default(), None)
                .unwrap_or(vk::PipelineCache::null())
        };

        let submit_mutexes =
            (0..family_properties.len()).map(|_| Arc::new(Mutex::new(()))).collect();

        let mut shared = DeviceShared {
            allocator: DeviceAllocator::new(*adapter.memory_properties()),
            adapter,
            device,
            shader_model: desc.shader_model,
            raytracing_supported,
            external_memory_supported,
            queue_infos: Mutex::new(queue_infos),
            queue_family_indexes: [0; QueueType::COUNT],
            submit_mutexes,
            debug_utils,
            empty_descriptor_pool,
            empty_descriptor_set_layout,
            empty_descriptor_set,
            pipeline_cache,
            render_pass_cache: Mutex::new(HashMap::new()),
            framebuffer_cache: Mutex::new(HashMap::new()),
        };
        for queue_type in [QueueType::Graphics, QueueType::Compute, QueueType::Transfer] {
            shared.queue_family_indexes[queue_type.index()] =
                shared.query_available_queue_index(queue_type).family_index;
        }
        let shared = Arc::new(shared);

        let nulls = Self::create_null_descriptors(&shared)?;

        let transition_queue = VulkanQueue::request(&shared, &QueueDesc::graphics())?;
        let transition_pool = VulkanCmdPool::create(
            &shared,
            &CmdPoolDesc { queue: &transition_queue, transient: false, allow_individual_reset: false },
        )?;
        let transition_cmd =
            VulkanCmd::create(&shared, &CmdDesc { pool: &transition_pool, secondary: false })?;
        let transition_fence =
            VulkanFence::create(&shared, &FenceDesc { name: "InitialTransitionFence".into(), signaled: false })?;

        let device = VulkanDevice {
            shared,
            nulls,
            initial_transition: Mutex::new(InitialTransition {
                queue: transition_queue,
                cmd_pool: transition_pool,
                cmd: transition_cmd,
                fence: transition_fence,
            }),
        };

        for dim_index in 0..TextureDimension::COUNT {
            if device.nulls.texture_srv[dim_index].is_some() {
                let texture = device.nulls.texture_srv[dim_index].as_ref().unwrap();
                device.initial_transition(texture, ResourceState::SHADER_RESOURCE);
            }
            if device.nulls.texture_uav[dim_index].is_some() {
                let texture = device.nulls.texture_uav[dim_index].as_ref().unwrap();
                device.initial_transition(texture, ResourceState::UNORDERED_ACCESS);
            }
        }

        Ok(Arc::new(device))
    }

    fn create_null_descriptors(shared: &Arc<DeviceShared>) -> Result<NullDescriptors, RhiError> {
        let mut texture_srv: Vec<Option<VulkanTexture>> = Vec::new();
        let mut texture_uav: Vec<Option<VulkanTexture>> = Vec::new();
        texture_srv.resize_with(TextureDimension::COUNT, || None);
        texture_uav.resize_with(TextureDimension::COUNT, || None);

        let base = TextureDesc {
            name: "NullTexture".to_string(),
            format: Format::R8G8B8A8Unorm,
            start_state: ResourceState::COMMON,
            ..Default::default()
        };
        // (dim, sample count, array size, w, h, d)
        let plans = [
            (TextureDimension::Dim1D, SampleCount::Count1, 1, 1, 1, 1),
            (TextureDimension::Dim1DArray, SampleCount::Count1, 2, 1, 1, 1),
            (TextureDimension::Dim2D, SampleCount::Count1, 1, 2, 2, 1),
            (TextureDimension::Dim2DArray, SampleCount::Count1, 2, 2, 2, 1),
            (TextureDimension::Dim2DMS, SampleCount::Count4, 1, 2, 2, 1),
            (TextureDimension::Dim2DMSArray, SampleCount::Count4, 2, 2, 2, 1),
            (TextureDimension::Dim3D, SampleCount::Count1, 1, 2, 2, 2),
        ];
        for (dim, sample_count, array_size, width, height, depth) in plans {
            let mut desc = TextureDesc {
                sample_count,
                array_size,
                width,
                height,
                depth,
                descriptor_type: DescriptorType::TEXTURE,
                ..base.clone()
            };
            if dim == TextureDimension::Dim3D {
                desc.flags |= crate::TextureCreationFlags::FORCE_3D;
            } else {
                desc.flags |= crate::TextureCreationFlags::FORCE_2D;
            }
            if matches!(dim, TextureDimension::Dim1D | TextureDimension::Dim1DArray) {
                desc.flags = crate::TextureCreationFlags::empty();
            }
            texture_srv[dim.index()] = Some(VulkanTexture::create(shared, &desc)?);

            if sample_count == SampleCount::Count1 {
                desc.descriptor_type = DescriptorType::RW_TEXTURE;
                texture_uav[dim.index()] = Some(VulkanTexture::create(shared, &desc)?);
            }
        }

        // Cubemaps only exist as SRVs.
        let mut cube = TextureDesc {
            width: 2,
            height: 2,
            depth: 1,
            array_size: 6,
            descriptor_type: DescriptorType::TEXTURE_CUBE,
            flags: crate::TextureCreationFlags::FORCE_2D,
            ..base.clone()
        };
        texture_srv[TextureDimension::DimCube.index()] = Some(VulkanTexture::create(shared, &cube)?);
        cube.array_size = 12;
        texture_srv[TextureDimension::DimCubeArray.index()] =
            Some(VulkanTexture::create(shared, &cube)?);

        let buffer_desc = BufferDesc {
            name: "NullBuffer".to_string(),
            size: std::mem::size_of::<u32>() as u64,
            memory_usage: ResourceMemoryUsage::GpuOnly,
            first_element: 0,
            element_count: 1,
            struct_stride: std::mem::size_of::<u32>() as u64,
            start_state: ResourceState::COMMON,
            format: Format::R32Uint,
            descriptor_type: DescriptorType::BUFFER | DescriptorType::UNIFORM_BUFFER,
            ..Default::default()
        };
        let buffer_srv = VulkanBuffer::create(shared, &buffer_desc)?;
        let buffer_uav = VulkanBuffer::create(
            shared,
            &BufferDesc { descriptor_type: DescriptorType::RW_BUFFER, ..buffer_desc },
        )?;

        let sampler = VulkanSampler::create(shared, &SamplerDesc::default())?;

        Ok(NullDescriptors { texture_srv, texture_uav, buffer_srv, buffer_uav, sampler })
    }

    /// Records and submits a one-shot barrier moving `texture` from the
    /// undefined state into `state`, then blocks until it lands. Serialized
    /// by an internal mutex.
    pub fn initial_transition(&self, texture: &VulkanTexture, state: ResourceState) {
        let bundle = self.initial_transition.lock().unwrap();
        bundle.cmd_pool.reset();
        bundle.cmd.begin();
        bundle.cmd.resource_barrier(
            &[TextureBarrier {
                texture,
                barrier: ImageBarrierState {
                    current_state: ResourceState::UNDEFINED,
                    new_state: state,
                    ..Default::default()
                },
                subresource_barrier: false,
                mip_level: 0,
                array_layer: 0,
            }],
            &[],
            &[],
        );
        bundle.cmd.end();
        let submit = QueueSubmitDesc {
            cmds: vec![&bundle.cmd],
            signal_fence: Some(&bundle.fence),
            ..Default::default()
        };
        bundle.queue.submit(&submit);
        bundle.fence.wait();
    }

    //////////////////////////////////////////////////////////////////////
    // Factories. Contract: allocate, create backend state, tag the debug
    // label, and only then hand the object to the caller. On failure all
    // partial state is destroyed before the error is returned.
    //////////////////////////////////////////////////////////////////////

    pub fn create_semaphore(&self, desc: &SemaphoreDesc) -> Result<VulkanSemaphore, RhiError> {
        let semaphore = VulkanSemaphore::create(&self.shared, desc)?;
        self.shared.set_debug_name(semaphore.handle(), &desc.name);
        Ok(semaphore)
    }

    pub fn destroy_semaphore(&self, semaphore: VulkanSemaphore) {
        drop(semaphore);
    }

    pub fn create_fence(&self, desc: &FenceDesc) -> Result<VulkanFence, RhiError> {
        let fence = VulkanFence::create(&self.shared, desc)?;
        self.shared.set_debug_name(fence.handle(), &desc.name);
        Ok(fence)
    }

    pub fn destroy_fence(&self, fence: VulkanFence) {
        drop(fence);
    }

    pub fn request_queue(&self, desc: &QueueDesc) -> Result<VulkanQueue, RhiError> {
        VulkanQueue::request(&self.shared, desc)
    }

    pub fn release_queue(&self, queue: VulkanQueue) {
        drop(queue);
    }

    #[cfg(feature = "window")]
    pub fn create_swap_chain(&self, desc: &SwapChainDesc<'_>) -> Result<VulkanSwapChain, RhiError> {
        VulkanSwapChain::create(self, desc)
    }

    #[cfg(feature = "window")]
    pub fn destroy_swap_chain(&self, swap_chain: VulkanSwapChain) {
        drop(swap_chain);
    }

    pub fn create_cmd_pool(&self, desc: &CmdPoolDesc<'_>) -> Result<VulkanCmdPool, RhiError> {
        VulkanCmdPool::create(&self.shared, desc)
    }

    pub fn destroy_cmd_pool(&self, cmd_pool: VulkanCmdPool) {
        drop(cmd_pool);
    }

    pub fn create_cmd(&self, desc: &CmdDesc<'_>) -> Result<VulkanCmd, RhiError> {
        VulkanCmd::create(&self.shared, desc)
    }

    pub fn destroy_cmd(&self, cmd: VulkanCmd) {
        drop(cmd);
    }

    pub fn create_sampler(&self, desc: &SamplerDesc) -> Result<VulkanSampler, RhiError> {
        let sampler = VulkanSampler::create(&self.shared, desc)?;
        Ok(sampler)
    }

    pub fn destroy_sampler(&self, sampler: VulkanSampler) {
        drop(sampler);
    }

    pub fn create_texture(&self, desc: &TextureDesc) -> Result<VulkanTexture, RhiError> {
        let texture = VulkanTexture::create(&self.shared, desc)?;
        self.shared.set_debug_name(texture.handle(), &desc.name);
        Ok(texture)
    }

    pub fn destroy_texture(&self, texture: VulkanTexture) {
        drop(texture);
    }

    pub fn create_buffer(&self, desc: &BufferDesc) -> Result<VulkanBuffer, RhiError> {
        let buffer = VulkanBuffer::create(&self.shared, desc)?;
        self.shared.set_debug_name(buffer.handle(), &desc.name);
        Ok(buffer)
    }

    pub fn destroy_buffer(&self, buffer: VulkanBuffer) {
        drop(buffer);
    }

    pub fn create_render_target(&self, desc: &RenderTargetDesc) -> Result<VulkanRenderTarget, RhiError> {
        VulkanRenderTarget::create(self, desc)
    }

    pub fn destroy_render_target(&self, render_target: VulkanRenderTarget) {
        drop(render_target);
    }

    pub fn create_shader(&self, desc: &ShaderDesc) -> Result<VulkanShader, RhiError> {
        VulkanShader::create(&self.shared, desc)
    }

    pub fn destroy_shader(&self, shader: VulkanShader) {
        drop(shader);
    }

    pub fn create_root_signature(
        &self,
        desc: &RootSignatureDesc<'_>,
    ) -> Result<Arc<VulkanRootSignature>, RhiError> {
        VulkanRootSignature::create(&self.shared, desc)
    }

    pub fn destroy_root_signature(&self, root_signature: Arc<VulkanRootSignature>) {
        drop(root_signature);
    }

    pub fn create_descriptor_set(&self, desc: &DescriptorSetDesc) -> Result<VulkanDescriptorSet, RhiError> {
        VulkanDescriptorSet::create(self, desc)
    }

    pub fn destroy_descriptor_set(&self, descriptor_set: VulkanDescriptorSet) {
        drop(descriptor_set);
    }

    pub fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<VulkanPipeline, RhiError> {
        VulkanPipeline::create(&self.shared, desc)
    }

    pub fn destroy_pipeline(&self, pipeline: VulkanPipeline) {
        drop(pipeline);
    }

    /// Blocks until all queues of the device are idle.
    pub fn wait_idle(&self) {
        let _ = unsafe { self.shared.device.device_wait_idle() };
    }

    pub fn adapter(&self) -> &Arc<VulkanAdapter> {
        &self.shared.adapter
    }

    pub fn shader_model(&self) -> ShaderModel {
        self.shared.shader_model
    }

    pub fn raytracing_supported(&self) -> bool {
        self.shared.raytracing_supported
    }

    pub fn external_memory_supported(&self) -> bool {
        self.shared.external_memory_supported
    }

    pub fn allocator_stats(&self) -> super::memory::AllocatorStats {
        self.shared.allocator.stats()
    }

    pub fn handle(&self) -> vk::Device {
        self.shared.device.handle()
    }

    pub(crate) fn shared(&self) -> &Arc<DeviceShared> {
        &self.shared
    }

    pub(crate) fn null_texture_srv(&self, dim: TextureDimension) -> Option<&VulkanTexture> {
        self.nulls.texture_srv.get(dim.index()).and_then(|t| t.as_ref())
    }

    pub(crate) fn null_texture_uav(&self, dim: TextureDimension) -> Option<&VulkanTexture> {
        self.nulls.texture_uav.get(dim.index()).and_then(|t| t.as_ref())
    }

    pub(crate) fn null_buffer_srv(&self) -> &VulkanBuffer {
        &self.nulls.buffer_srv
    }

    pub(crate) fn null_buffer_uav(&self) -> &VulkanBuffer {
        &self.nulls.buffer_uav
    }

    pub(crate) fn null_sampler(&self) -> &VulkanSampler {
        &self.nulls.sampler
    }
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("adapter", &self.shared.adapter.node_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infos(entries: &[(u32, u32, u32, u8)]) -> HashMap<u32, QueueFamilyInfo> {
        let mut map = HashMap::new();
        for &(flags, available, used, family_index) in entries {
            map.insert(flags, QueueFamilyInfo { available, used, family_index });
        }
        map
    }

    const GCT: u32 = 0b111; // graphics | compute | transfer
    const CT: u32 = 0b110;
    const T: u32 = 0b100;

    #[test]
    fn transfer_prefers_most_specialized_family() {
        let registry = infos(&[(GCT, 1, 0, 0), (CT, 2, 0, 1), (T, 2, 0, 2)]);
        let slot = select_queue_slot(&registry, QueueType::Transfer);
        assert_eq!(slot.family_index, 2);
        assert!(slot.consume);
    }

    #[test]
    fn graphics_always_lands_on_queue_zero_without_consuming() {
        let registry = infos(&[(GCT, 4, 0, 0), (T, 2, 0, 2)]);
        let slot = select_queue_slot(&registry, QueueType::Graphics);
        assert_eq!((slot.family_index, slot.queue_index), (0, 0));
        assert!(!slot.consume);
    }

    #[test]
    fn exhausted_dedicated_family_falls_through_to_shared() {
        let registry = infos(&[(GCT, 4, 0, 0), (T, 2, 2, 2)]);
        let slot = select_queue_slot(&registry, QueueType::Transfer);
        assert_eq!(slot.family_index, 0);
        assert!(slot.consume);
    }

    #[test]
    fn compute_queue_index_advances_with_usage() {
        let registry = infos(&[(CT, 4, 2, 1)]);
        let slot = select_queue_slot(&registry, QueueType::Compute);
        assert_eq!(slot.queue_index, 2);
    }

    #[test]
    fn all_consumed_falls_back_to_family_zero_with_warning() {
        let registry = infos(&[(CT, 1, 1, 1), (GCT, 1, 1, 0)]);
        let slot = select_queue_slot(&registry, QueueType::Compute);
        assert_eq!((slot.family_index, slot.queue_index), (0, 0));
        assert!(!slot.consume);
    }
}
