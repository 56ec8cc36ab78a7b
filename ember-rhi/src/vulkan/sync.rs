//! GPU→CPU and GPU→GPU synchronization primitives with one-shot state bits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;

use crate::{FenceDesc, FenceStatus, RhiError, SemaphoreDesc};

use super::device::DeviceShared;

/// Binary CPU-visible signal. `submitted` flips on queue submit and clears
/// once the fence is observed complete.
pub struct VulkanFence {
    device: Arc<DeviceShared>,
    handle: vk::Fence,
    submitted: AtomicBool,
}

impl VulkanFence {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &FenceDesc) -> Result<VulkanFence, RhiError> {
        let create_info = vk::FenceCreateInfo::default().flags(if desc.signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        });
        let handle = unsafe {
            device
                .device
                .create_fence(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateFence: {e:?}")))?
        };
        Ok(VulkanFence { device: Arc::clone(device), handle, submitted: AtomicBool::new(false) })
    }

    /// Blocks the host until the fence signals, then resets it back to the
    /// not-submitted state. Returns immediately if nothing was submitted.
    pub fn wait(&self) {
        if !self.submitted.load(Ordering::Acquire) {
            return;
        }
        unsafe {
            match self.device.device.wait_for_fences(&[self.handle], true, u64::MAX) {
                Ok(()) => {
                    let _ = self.device.device.reset_fences(&[self.handle]);
                    self.submitted.store(false, Ordering::Release);
                }
                Err(e) => log::error!("vkWaitForFences failed: {e:?}"),
            }
        }
    }

    /// Non-blocking query. A completed fence resets to not-submitted.
    pub fn status(&self) -> FenceStatus {
        if !self.submitted.load(Ordering::Acquire) {
            return FenceStatus::NotSubmitted;
        }
        match unsafe { self.device.device.get_fence_status(self.handle) } {
            Ok(true) => {
                unsafe {
                    let _ = self.device.device.reset_fences(&[self.handle]);
                }
                self.submitted.store(false, Ordering::Release);
                FenceStatus::Complete
            }
            _ => FenceStatus::Incomplete,
        }
    }

    pub(crate) fn mark_submitted(&self, submitted: bool) {
        self.submitted.store(submitted, Ordering::Release);
    }

    pub(crate) fn reset_raw(&self) {
        unsafe {
            let _ = self.device.device.reset_fences(&[self.handle]);
        }
    }

    pub fn handle(&self) -> vk::Fence {
        self.handle
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_fence(self.handle, None);
        }
    }
}

impl std::fmt::Debug for VulkanFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanFence")
            .field("submitted", &self.submitted.load(Ordering::Relaxed))
            .finish()
    }
}

/// One-shot GPU→GPU signal. The `signaled` bit is mutated by queue
/// submit/present and swap-chain acquire: a wait consumes the signal, a
/// signal sets it, and an already signaled semaphore is never re-signaled.
pub struct VulkanSemaphore {
    device: Arc<DeviceShared>,
    handle: vk::Semaphore,
    signaled: AtomicBool,
}

impl VulkanSemaphore {
    pub(crate) fn create(
        device: &Arc<DeviceShared>,
        _desc: &SemaphoreDesc,
    ) -> Result<VulkanSemaphore, RhiError> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let handle = unsafe {
            device
                .device
                .create_semaphore(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateSemaphore: {e:?}")))?
        };
        Ok(VulkanSemaphore { device: Arc::clone(device), handle, signaled: AtomicBool::new(false) })
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    pub(crate) fn set_signaled(&self, signaled: bool) {
        self.signaled.store(signaled, Ordering::Release);
    }

    /// Consumes the signal if present; returns whether it was signaled.
    pub(crate) fn take_signaled(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_semaphore(self.handle, None);
        }
    }
}

impl std::fmt::Debug for VulkanSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSemaphore")
            .field("signaled", &self.signaled.load(Ordering::Relaxed))
            .finish()
    }
}
