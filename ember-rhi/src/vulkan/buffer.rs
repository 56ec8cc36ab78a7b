//! GPU buffers: usage derivation from descriptor types, memory-class
//! placement, optional persistent mapping, and typed texel views.

use std::cell::Cell;
use std::ptr::NonNull;
use std::sync::Arc;

use ash::vk;

use crate::{
    BufferCreationFlags, BufferDesc, DescriptorType, Format, ResourceMemoryUsage, RhiError,
};

use super::convert;
use super::device::DeviceShared;
use super::memory::Allocation;

pub struct VulkanBuffer {
    device: Arc<DeviceShared>,
    handle: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    offset: u64,
    memory_usage: ResourceMemoryUsage,
    descriptor_type: DescriptorType,
    /// CPU address while mapped (persistently or via `map`).
    mapped_ptr: Cell<*mut u8>,
    persistently_mapped: bool,
    uniform_texel_view: vk::BufferView,
    storage_texel_view: vk::BufferView,
}

// The mapped pointer is owned exclusively by this buffer; host access goes
// through `mapped_address` under the map/unmap contract.
unsafe impl Send for VulkanBuffer {}
unsafe impl Sync for VulkanBuffer {}

impl VulkanBuffer {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &BufferDesc) -> Result<VulkanBuffer, RhiError> {
        debug_assert!(desc.size > 0);

        // Uniform buffers are bound at dynamic offsets that must respect the
        // device's uniform alignment.
        let mut alloc_size = desc.size;
        if desc.descriptor_type.intersects(DescriptorType::UNIFORM_BUFFER) {
            let alignment = device.adapter.gpu_settings().uniform_buffer_alignment.max(1);
            alloc_size = alloc_size.div_ceil(alignment) * alignment;
        }

        let typed = desc.format != Format::Undefined;
        let mut usage = convert::to_buffer_usage(desc.descriptor_type, typed);
        if matches!(desc.memory_usage, ResourceMemoryUsage::GpuOnly | ResourceMemoryUsage::GpuToCpu) {
            usage |= vk::BufferUsageFlags::TRANSFER_DST;
        }

        let create_info = vk::BufferCreateInfo::default()
            .size(alloc_size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let handle = unsafe {
            device
                .device
                .create_buffer(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateBuffer: {e:?}")))?
        };

        let requirements = unsafe { device.device.get_buffer_memory_requirements(handle) };
        let memory_usage = if desc.memory_usage == ResourceMemoryUsage::Unknown
            && desc
                .flags
                .intersects(BufferCreationFlags::HOST_VISIBLE | BufferCreationFlags::HOST_COHERENT)
        {
            ResourceMemoryUsage::CpuToGpu
        } else {
            desc.memory_usage
        };
        let persistent = desc.flags.intersects(BufferCreationFlags::PERSISTENT_MAP);
        // Allocations are always dedicated here, so OWN_MEMORY is the
        // default behavior rather than an opt-in.
        let allocation = match device.allocator.allocate(&device.device, requirements, memory_usage, persistent)
        {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.device.destroy_buffer(handle, None) };
                return Err(e);
            }
        };
        if let Err(e) = unsafe { device.device.bind_buffer_memory(handle, allocation.memory, 0) } {
            device.allocator.free(&device.device, allocation);
            unsafe { device.device.destroy_buffer(handle, None) };
            return Err(RhiError::resource(format!("vkBindBufferMemory: {e:?}")));
        }

        let mapped_ptr = allocation.mapped_ptr;
        let mut buffer = VulkanBuffer {
            device: Arc::clone(device),
            handle,
            allocation: Some(allocation),
            size: desc.size,
            offset: 0,
            memory_usage: desc.memory_usage,
            descriptor_type: desc.descriptor_type,
            mapped_ptr: Cell::new(mapped_ptr),
            persistently_mapped: persistent,
            uniform_texel_view: vk::BufferView::null(),
            storage_texel_view: vk::BufferView::null(),
        };

        if desc.descriptor_type.intersects(DescriptorType::BUFFER) {
            buffer.offset = desc.struct_stride * desc.first_element;
        }

        if typed {
            buffer.create_texel_views(desc, usage)?;
        }

        Ok(buffer)
    }

    fn create_texel_views(&mut self, desc: &BufferDesc, usage: vk::BufferUsageFlags) -> Result<(), RhiError> {
        let vk_format = convert::to_vk_format(desc.format);
        let format_props = unsafe {
            self.device
                .adapter
                .instance_shared()
                .instance
                .get_physical_device_format_properties(self.device.adapter.handle(), vk_format)
        };
        let range = if desc.element_count > 0 {
            desc.struct_stride * desc.element_count
        } else {
            vk::WHOLE_SIZE
        };
        let view_info = vk::BufferViewCreateInfo::default()
            .buffer(self.handle)
            .format(vk_format)
            .offset(desc.struct_stride * desc.first_element)
            .range(range);

        if usage.contains(vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER) {
            if !format_props.buffer_features.contains(vk::FormatFeatureFlags::UNIFORM_TEXEL_BUFFER) {
                log::warn!("format {:?} does not support uniform texel buffer views", desc.format);
            } else {
                self.uniform_texel_view = unsafe {
                    self.device
                        .device
                        .create_buffer_view(&view_info, None)
                        .map_err(|e| RhiError::resource(format!("vkCreateBufferView: {e:?}")))?
                };
            }
        }
        if usage.contains(vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER) {
            if !format_props.buffer_features.contains(vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER) {
                log::warn!("format {:?} does not support storage texel buffer views", desc.format);
            } else {
                self.storage_texel_view = unsafe {
                    self.device
                        .device
                        .create_buffer_view(&view_info, None)
                        .map_err(|e| RhiError::resource(format!("vkCreateBufferView: {e:?}")))?
                };
            }
        }
        Ok(())
    }

    /// Maps the buffer for host access. Forbidden for GPU-only memory and
    /// while a mapping is already active.
    pub fn map(&self) -> Result<NonNull<u8>, RhiError> {
        if self.memory_usage == ResourceMemoryUsage::GpuOnly {
            return Err(RhiError::state("cannot map a GPU-only buffer"));
        }
        if !self.mapped_ptr.get().is_null() {
            return Err(RhiError::state("buffer is already mapped"));
        }
        let allocation = self.allocation.as_ref().unwrap();
        let ptr = unsafe {
            self.device
                .device
                .map_memory(allocation.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .map_err(|e| RhiError::resource(format!("vkMapMemory: {e:?}")))?
        };
        self.mapped_ptr.set(ptr.cast());
        Ok(NonNull::new(ptr.cast()).unwrap())
    }

    pub fn unmap(&self) -> Result<(), RhiError> {
        if self.memory_usage == ResourceMemoryUsage::GpuOnly {
            return Err(RhiError::state("cannot unmap a GPU-only buffer"));
        }
        if self.mapped_ptr.get().is_null() {
            return Err(RhiError::state("buffer is not mapped"));
        }
        if self.persistently_mapped {
            return Err(RhiError::state("cannot unmap a persistently mapped buffer"));
        }
        unsafe { self.device.device.unmap_memory(self.allocation.as_ref().unwrap().memory) };
        self.mapped_ptr.set(std::ptr::null_mut());
        Ok(())
    }

    /// CPU address of the active mapping, if any.
    pub fn mapped_address(&self) -> Option<NonNull<u8>> {
        NonNull::new(self.mapped_ptr.get())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn memory_usage(&self) -> ResourceMemoryUsage {
        self.memory_usage
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    pub(crate) fn uniform_texel_view(&self) -> vk::BufferView {
        self.uniform_texel_view
    }

    pub(crate) fn storage_texel_view(&self) -> vk::BufferView {
        self.storage_texel_view
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.storage_texel_view != vk::BufferView::null() {
                self.device.device.destroy_buffer_view(self.storage_texel_view, None);
            }
            if self.uniform_texel_view != vk::BufferView::null() {
                self.device.device.destroy_buffer_view(self.uniform_texel_view, None);
            }
            self.device.device.destroy_buffer(self.handle, None);
        }
        if let Some(allocation) = self.allocation.take() {
            self.device.allocator.free(&self.device.device, allocation);
        }
    }
}

impl std::fmt::Debug for VulkanBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBuffer")
            .field("size", &self.size)
            .field("memory_usage", &self.memory_usage)
            .finish()
    }
}
