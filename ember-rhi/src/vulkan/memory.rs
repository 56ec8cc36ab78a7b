//! Device memory allocation: memory-type selection by usage class, with
//! alloc/free counters and leak detection. Every buffer and image
//! allocation in the backend routes through here.

use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;

use crate::{ResourceMemoryUsage, RhiError};

/// One device-memory block bound to a single resource.
pub(crate) struct Allocation {
    pub memory: vk::DeviceMemory,
    pub size: u64,
    pub mapped_ptr: *mut u8,
}

impl Allocation {
    pub fn is_mapped(&self) -> bool {
        !self.mapped_ptr.is_null()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorStats {
    pub allocation_count: u64,
    pub free_count: u64,
    pub allocated_bytes: u64,
    pub freed_bytes: u64,
}

impl AllocatorStats {
    pub fn is_balanced(&self) -> bool {
        self.allocation_count == self.free_count && self.allocated_bytes == self.freed_bytes
    }
}

/// Memory property flags to try, in order, for a usage class.
fn property_candidates(usage: ResourceMemoryUsage) -> [vk::MemoryPropertyFlags; 2] {
    match usage {
        ResourceMemoryUsage::GpuOnly | ResourceMemoryUsage::Unknown => {
            [vk::MemoryPropertyFlags::DEVICE_LOCAL, vk::MemoryPropertyFlags::empty()]
        }
        ResourceMemoryUsage::CpuOnly | ResourceMemoryUsage::CpuToGpu => [
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ],
        ResourceMemoryUsage::GpuToCpu => [
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_CACHED,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ],
    }
}

pub(crate) fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..properties.memory_type_count).find(|&i| {
        let suitable = type_bits & (1 << i) != 0;
        suitable && properties.memory_types[i as usize].property_flags.contains(required)
    })
}

pub(crate) struct DeviceAllocator {
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    allocation_count: AtomicU64,
    free_count: AtomicU64,
    allocated_bytes: AtomicU64,
    freed_bytes: AtomicU64,
}

impl DeviceAllocator {
    pub fn new(memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            memory_properties,
            allocation_count: AtomicU64::new(0),
            free_count: AtomicU64::new(0),
            allocated_bytes: AtomicU64::new(0),
            freed_bytes: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            free_count: self.free_count.load(Ordering::Relaxed),
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
            freed_bytes: self.freed_bytes.load(Ordering::Relaxed),
        }
    }

    /// Whether the device exposes a lazily-allocated (on-tile) memory type.
    pub fn has_lazily_allocated_memory(&self) -> bool {
        find_memory_type(
            &self.memory_properties,
            u32::MAX,
            vk::MemoryPropertyFlags::LAZILY_ALLOCATED,
        )
        .is_some()
    }

    pub fn memory_type_for(
        &self,
        type_bits: u32,
        usage: ResourceMemoryUsage,
    ) -> Result<u32, RhiError> {
        for required in property_candidates(usage) {
            if let Some(index) = find_memory_type(&self.memory_properties, type_bits, required) {
                return Ok(index);
            }
        }
        Err(RhiError::resource(format!("no suitable memory type for {usage:?}")))
    }

    /// Allocation from a lazily-allocated (on-tile) memory type, falling
    /// back to device-local when none matches the requirements.
    pub fn allocate_lazily(
        &self,
        device: &ash::Device,
        requirements: vk::MemoryRequirements,
    ) -> Result<Allocation, RhiError> {
        if let Some(index) = find_memory_type(
            &self.memory_properties,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::LAZILY_ALLOCATED,
        ) {
            return self.allocate_with_type(device, requirements.size, index, false);
        }
        self.allocate(device, requirements, ResourceMemoryUsage::GpuOnly, false)
    }

    pub fn allocate(
        &self,
        device: &ash::Device,
        requirements: vk::MemoryRequirements,
        usage: ResourceMemoryUsage,
        persistent_map: bool,
    ) -> Result<Allocation, RhiError> {
        let memory_type_index = self.memory_type_for(requirements.memory_type_bits, usage)?;
        self.allocate_with_type(device, requirements.size, memory_type_index, persistent_map)
    }

    pub fn allocate_with_type(
        &self,
        device: &ash::Device,
        size: u64,
        memory_type_index: u32,
        persistent_map: bool,
    ) -> Result<Allocation, RhiError> {
        let allocate_info =
            vk::MemoryAllocateInfo::default().allocation_size(size).memory_type_index(memory_type_index);
        let memory = unsafe {
            device
                .allocate_memory(&allocate_info, None)
                .map_err(|e| RhiError::resource(format!("vkAllocateMemory: {e:?}")))?
        };

        let mapped_ptr = if persistent_map {
            let ptr = unsafe {
                device.map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
            };
            match ptr {
                Ok(ptr) => ptr.cast::<u8>(),
                Err(e) => {
                    unsafe { device.free_memory(memory, None) };
                    return Err(RhiError::resource(format!("vkMapMemory: {e:?}")));
                }
            }
        } else {
            std::ptr::null_mut()
        };

        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        self.allocated_bytes.fetch_add(size, Ordering::Relaxed);
        Ok(Allocation { memory, size, mapped_ptr })
    }

    pub fn free(&self, device: &ash::Device, allocation: Allocation) {
        unsafe {
            if allocation.is_mapped() {
                device.unmap_memory(allocation.memory);
            }
            device.free_memory(allocation.memory, None);
        }
        self.free_count.fetch_add(1, Ordering::Relaxed);
        self.freed_bytes.fetch_add(allocation.size, Ordering::Relaxed);
    }
}

impl Drop for DeviceAllocator {
    fn drop(&mut self) {
        let stats = self.stats();
        if !stats.is_balanced() {
            log::error!(
                "device memory leak: {} allocations / {} frees, {} bytes allocated / {} freed",
                stats.allocation_count,
                stats.free_count,
                stats.allocated_bytes,
                stats.freed_bytes,
            );
        }
    }
}

impl std::fmt::Debug for DeviceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAllocator").field("stats", &self.stats()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = types.len() as u32;
        for (i, &flags) in types.iter().enumerate() {
            props.memory_types[i].property_flags = flags;
            props.memory_types[i].heap_index = 0;
        }
        props
    }

    #[test]
    fn picks_first_matching_type_within_mask() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        assert_eq!(find_memory_type(&props, 0b11, vk::MemoryPropertyFlags::DEVICE_LOCAL), Some(0));
        assert_eq!(
            find_memory_type(&props, 0b11, vk::MemoryPropertyFlags::HOST_VISIBLE),
            Some(1)
        );
        // Type 0 masked out.
        assert_eq!(find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL), None);
    }

    #[test]
    fn usage_classes_fall_back() {
        let allocator = DeviceAllocator::new(properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]));
        assert_eq!(allocator.memory_type_for(0b11, ResourceMemoryUsage::GpuOnly).unwrap(), 0);
        assert_eq!(allocator.memory_type_for(0b11, ResourceMemoryUsage::CpuOnly).unwrap(), 1);
        // No HOST_CACHED type: readback falls back to coherent host memory.
        assert_eq!(allocator.memory_type_for(0b11, ResourceMemoryUsage::GpuToCpu).unwrap(), 1);
    }

    #[test]
    fn stats_start_balanced() {
        let allocator = DeviceAllocator::new(properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]));
        assert!(allocator.stats().is_balanced());
    }
}
