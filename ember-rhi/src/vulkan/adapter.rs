//! Per-GPU capability probing and device slot management.

use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::{
    AdapterType, DeviceDesc, Format, GpuSettings, QueueType, RhiError, WaveOpsSupportFlags,
    GPU_VENDOR_ID_NVIDIA, MAX_DEVICES_PER_ADAPTER,
};

use super::backend::InstanceShared;
use super::convert;
use super::device::VulkanDevice;

/// Per-format capability bits probed once at adapter construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatCaps {
    pub shader_readable: bool,
    pub shader_writable: bool,
    pub render_target_writable: bool,
}

/// One physical GPU exposed by the backend. Slot-pooled: `idle` toggles on
/// request/release, and all device slots must be empty at release.
pub struct VulkanAdapter {
    instance: Arc<InstanceShared>,
    physical_device: vk::PhysicalDevice,
    node_index: u8,
    properties: vk::PhysicalDeviceProperties,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    settings: GpuSettings,
    format_caps: HashMap<Format, FormatCaps>,
    support_graphics_queue: bool,
    support_compute_queue: bool,
    support_transfer_queue: bool,
    dedicated_compute_queue: bool,
    dedicated_transfer_queue: bool,
    idle: AtomicBool,
    active_devices: AtomicU32,
}

impl VulkanAdapter {
    /// A queue family is dedicated when it advertises exactly one of
    /// graphics/compute/transfer.
    pub fn is_dedicated_queue(flags: vk::QueueFlags) -> bool {
        let supported = flags
            & (vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER);
        supported.as_raw().count_ones() == 1
    }

    pub(crate) fn new(
        instance: Arc<InstanceShared>,
        physical_device: vk::PhysicalDevice,
        node_index: u8,
    ) -> VulkanAdapter {
        let inst = &instance.instance;

        let mut subgroup_properties = vk::PhysicalDeviceSubgroupProperties::default();
        let mut properties2 =
            vk::PhysicalDeviceProperties2::default().push_next(&mut subgroup_properties);
        unsafe { inst.get_physical_device_properties2(physical_device, &mut properties2) };
        let properties = properties2.properties;

        let mut interlock_features =
            vk::PhysicalDeviceFragmentShaderInterlockFeaturesEXT::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut interlock_features);
        unsafe { inst.get_physical_device_features2(physical_device, &mut features2) };
        let features = features2.features;

        let memory_properties =
            unsafe { inst.get_physical_device_memory_properties(physical_device) };

        // Per-format capability bits.
        let mut format_caps = HashMap::new();
        for &format in Format::ALL {
            let props = unsafe {
                inst.get_physical_device_format_properties(physical_device, convert::to_vk_format(format))
            };
            format_caps.insert(
                format,
                FormatCaps {
                    shader_readable: props
                        .optimal_tiling_features
                        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE),
                    shader_writable: props
                        .optimal_tiling_features
                        .contains(vk::FormatFeatureFlags::STORAGE_IMAGE),
                    render_target_writable: props.optimal_tiling_features.intersects(
                        vk::FormatFeatureFlags::COLOR_ATTACHMENT
                            | vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
                    ),
                },
            );
        }

        // Queue family summary.
        let family_properties =
            unsafe { inst.get_physical_device_queue_family_properties(physical_device) };
        let mut graphics_family = None;
        let mut compute_family = None;
        let mut transfer_family = None;
        for (i, family) in family_properties.iter().enumerate() {
            if family.queue_count == 0 {
                continue;
            }
            let dedicated = Self::is_dedicated_queue(family.queue_flags);
            if graphics_family.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics_family = Some(i);
            }
            if transfer_family.is_none()
                && dedicated
                && family.queue_flags.contains(vk::QueueFlags::TRANSFER)
            {
                transfer_family = Some(i);
            }
            if compute_family.is_none()
                && dedicated
                && family.queue_flags.contains(vk::QueueFlags::COMPUTE)
            {
                compute_family = Some(i);
            }
        }
        let dedicated_compute_queue = compute_family.is_some();
        let dedicated_transfer_queue = transfer_family.is_some();
        for (i, family) in family_properties.iter().enumerate() {
            if transfer_family.is_none() && family.queue_flags.contains(vk::QueueFlags::TRANSFER) {
                transfer_family = Some(i);
            }
            if compute_family.is_none() && family.queue_flags.contains(vk::QueueFlags::COMPUTE) {
                compute_family = Some(i);
            }
        }

        let mut wave_ops = WaveOpsSupportFlags::empty();
        let supported = subgroup_properties.supported_operations;
        let pairs = [
            (vk::SubgroupFeatureFlags::BASIC, WaveOpsSupportFlags::BASIC),
            (vk::SubgroupFeatureFlags::VOTE, WaveOpsSupportFlags::VOTE),
            (vk::SubgroupFeatureFlags::ARITHMETIC, WaveOpsSupportFlags::ARITHMETIC),
            (vk::SubgroupFeatureFlags::BALLOT, WaveOpsSupportFlags::BALLOT),
            (vk::SubgroupFeatureFlags::SHUFFLE, WaveOpsSupportFlags::SHUFFLE),
            (vk::SubgroupFeatureFlags::SHUFFLE_RELATIVE, WaveOpsSupportFlags::SHUFFLE_RELATIVE),
            (vk::SubgroupFeatureFlags::CLUSTERED, WaveOpsSupportFlags::CLUSTERED),
            (vk::SubgroupFeatureFlags::QUAD, WaveOpsSupportFlags::QUAD),
            (vk::SubgroupFeatureFlags::PARTITIONED_NV, WaveOpsSupportFlags::PARTITIONED_NV),
        ];
        for (vk_bit, flag) in pairs {
            if supported.contains(vk_bit) {
                wave_ops |= flag;
            }
        }

        let gpu_name = unsafe {
            CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy().into_owned()
        };
        let settings = GpuSettings {
            uniform_buffer_alignment: properties.limits.min_uniform_buffer_offset_alignment,
            upload_buffer_texture_alignment: properties.limits.optimal_buffer_copy_offset_alignment
                as u32,
            upload_buffer_texture_row_alignment: properties
                .limits
                .optimal_buffer_copy_row_pitch_alignment as u32,
            max_vertex_input_bindings: properties.limits.max_vertex_input_bindings,
            timestamp_period: properties.limits.timestamp_period,
            wave_lane_count: subgroup_properties.subgroup_size,
            wave_ops_support_flags: wave_ops,
            multi_draw_indirect: features.multi_draw_indirect == vk::TRUE,
            rovs_supported: interlock_features.fragment_shader_pixel_interlock == vk::TRUE,
            tessellation_supported: features.tessellation_shader == vk::TRUE,
            geometry_shader_supported: features.geometry_shader == vk::TRUE,
            gpu_breadcrumbs: false,
            hdr_supported: false,
            gpu_vendor_preset: crate::GpuVendorPreset {
                vendor_id: properties.vendor_id,
                model_id: properties.device_id,
                revision_id: 0,
                gpu_name,
                gpu_driver_version: decode_driver_version(
                    properties.vendor_id,
                    properties.driver_version,
                ),
            },
        };

        log::info!(
            "GPU[{}] detected. vendor id: {:#x}, model id: {:#x}, name: {}, driver: {}",
            node_index,
            settings.gpu_vendor_preset.vendor_id,
            settings.gpu_vendor_preset.model_id,
            settings.gpu_vendor_preset.gpu_name,
            settings.gpu_vendor_preset.gpu_driver_version,
        );

        VulkanAdapter {
            instance,
            physical_device,
            node_index,
            properties,
            memory_properties,
            settings,
            format_caps,
            support_graphics_queue: graphics_family.is_some(),
            support_compute_queue: compute_family.is_some(),
            support_transfer_queue: transfer_family.is_some(),
            dedicated_compute_queue,
            dedicated_transfer_queue,
            idle: AtomicBool::new(true),
            active_devices: AtomicU32::new(0),
        }
    }

    /// Ranking used to sort adapters best-first: graphics queue, then
    /// discrete type, then (same model) device-local VRAM, then dedicated
    /// compute for async workloads.
    pub fn is_better_gpu(a: &VulkanAdapter, b: &VulkanAdapter) -> bool {
        if a.support_graphics_queue != b.support_graphics_queue {
            return a.support_graphics_queue;
        }

        let a_discrete = a.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
        let b_discrete = b.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
        if a_discrete != b_discrete {
            return a_discrete;
        }

        if a.properties.vendor_id == b.properties.vendor_id
            && a.properties.device_id == b.properties.device_id
        {
            let vram = |adapter: &VulkanAdapter| -> u64 {
                let props = &adapter.memory_properties;
                (0..props.memory_heap_count as usize)
                    .filter(|&i| props.memory_heaps[i].flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
                    .map(|i| props.memory_heaps[i].size)
                    .sum()
            };
            return vram(a) > vram(b);
        }

        let a_async_compute = a.support_compute_queue && a.dedicated_compute_queue;
        let b_async_compute = b.support_compute_queue && b.dedicated_compute_queue;
        if a_async_compute != b_async_compute {
            return a_async_compute;
        }

        true
    }

    pub fn request_device(self: &Arc<Self>, desc: &DeviceDesc) -> Result<Arc<VulkanDevice>, RhiError> {
        if self.active_devices.load(Ordering::Acquire) as usize >= MAX_DEVICES_PER_ADAPTER {
            return Err(RhiError::config(format!(
                "device slot limit exceeded (max {MAX_DEVICES_PER_ADAPTER} per adapter)"
            )));
        }
        let device = VulkanDevice::new(Arc::clone(self), desc)?;
        self.active_devices.fetch_add(1, Ordering::AcqRel);
        Ok(device)
    }

    /// Releases a device created from this adapter; the caller's handle must
    /// be the last one alive.
    pub fn release_device(&self, device: Arc<VulkanDevice>) {
        debug_assert!(Arc::ptr_eq(&device.adapter().instance, &self.instance));
        drop(device);
        self.active_devices.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn gpu_settings(&self) -> &GpuSettings {
        &self.settings
    }

    pub fn adapter_type(&self) -> AdapterType {
        match self.properties.device_type {
            vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterType::IntegratedGpu,
            vk::PhysicalDeviceType::DISCRETE_GPU => AdapterType::DiscreteGpu,
            vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterType::VirtualGpu,
            vk::PhysicalDeviceType::CPU => AdapterType::Cpu,
            _ => AdapterType::Other,
        }
    }

    pub fn supports_queue(&self, queue_type: QueueType) -> bool {
        match queue_type {
            QueueType::Graphics => self.support_graphics_queue,
            QueueType::Compute => self.support_compute_queue,
            QueueType::Transfer => self.support_transfer_queue,
        }
    }

    pub fn has_dedicated_compute_queue(&self) -> bool {
        self.dedicated_compute_queue
    }

    pub fn has_dedicated_transfer_queue(&self) -> bool {
        self.dedicated_transfer_queue
    }

    pub fn format_caps(&self, format: Format) -> FormatCaps {
        self.format_caps.get(&format).copied().unwrap_or_default()
    }

    pub fn max_uniform_buffer_range(&self) -> u32 {
        self.properties.limits.max_uniform_buffer_range
    }

    pub fn max_storage_buffer_range(&self) -> u32 {
        self.properties.limits.max_storage_buffer_range
    }

    pub fn node_index(&self) -> u8 {
        self.node_index
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub(crate) fn instance_shared(&self) -> &Arc<InstanceShared> {
        &self.instance
    }

    pub(crate) fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    pub(crate) fn idle_to_busy(&self) -> bool {
        self.idle.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn busy_to_idle(&self) {
        self.idle.store(true, Ordering::Release);
    }

    pub(crate) fn active_device_count(&self) -> u32 {
        self.active_devices.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for VulkanAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanAdapter")
            .field("node_index", &self.node_index)
            .field("name", &self.settings.gpu_vendor_preset.gpu_name)
            .finish()
    }
}

/// NVIDIA packs its driver version as 10/8/8/6 bits; everything else uses
/// the standard Vulkan major.minor.patch encoding.
fn decode_driver_version(vendor_id: u32, version: u32) -> String {
    if vendor_id == GPU_VENDOR_ID_NVIDIA {
        let major = (version >> 22) & 0x3FF;
        let minor = (version >> 14) & 0xFF;
        let secondary = (version >> 6) & 0xFF;
        let tertiary = version & 0x3F;
        format!("{major}.{minor}.{secondary}.{tertiary}")
    } else {
        format!(
            "{}.{}.{}",
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedicated_queue_rule() {
        assert!(VulkanAdapter::is_dedicated_queue(vk::QueueFlags::TRANSFER));
        assert!(VulkanAdapter::is_dedicated_queue(
            vk::QueueFlags::COMPUTE | vk::QueueFlags::SPARSE_BINDING
        ));
        assert!(!VulkanAdapter::is_dedicated_queue(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER
        ));
        assert!(!VulkanAdapter::is_dedicated_queue(vk::QueueFlags::SPARSE_BINDING));
    }

    #[test]
    fn nvidia_driver_version_unpacks() {
        // 535.113.01.x style packing.
        let packed = (535 << 22) | (113 << 14) | (1 << 6) | 0;
        assert_eq!(decode_driver_version(GPU_VENDOR_ID_NVIDIA, packed), "535.113.1.0");
    }

    #[test]
    fn generic_driver_version_is_major_minor_patch() {
        let packed = vk::make_api_version(0, 2, 0, 302);
        assert_eq!(decode_driver_version(0x8086, packed), "2.0.302");
    }
}
