//! Queue submission and presentation.

use std::sync::{Arc, Mutex};

use ash::vk;

use crate::{QueueDesc, QueueType, RhiError};

use super::cmd::VulkanCmd;
use super::device::DeviceShared;
use super::sync::{VulkanFence, VulkanSemaphore};

#[cfg(feature = "window")]
use super::swapchain::VulkanSwapChain;

#[derive(Default)]
pub struct QueueSubmitDesc<'a> {
    pub cmds: Vec<&'a VulkanCmd>,
    pub wait_semaphores: Vec<&'a VulkanSemaphore>,
    pub signal_semaphores: Vec<&'a VulkanSemaphore>,
    pub signal_fence: Option<&'a VulkanFence>,
}

#[cfg(feature = "window")]
pub struct QueuePresentDesc<'a> {
    pub swap_chain: &'a VulkanSwapChain,
    pub index: u32,
    pub wait_semaphores: Vec<&'a VulkanSemaphore>,
}

/// One backend queue. Submission is serialized with every other queue of
/// the same family through a shared mutex.
pub struct VulkanQueue {
    device: Arc<DeviceShared>,
    handle: vk::Queue,
    family_index: u8,
    queue_index: u8,
    queue_type: QueueType,
    timestamp_period: f32,
    flag_key: u32,
    consumed_slot: bool,
    submit_mutex: Arc<Mutex<()>>,
}

impl VulkanQueue {
    pub(crate) fn request(device: &Arc<DeviceShared>, desc: &QueueDesc) -> Result<VulkanQueue, RhiError> {
        let queue_type = desc.resolved_type();
        let slot = device.request_queue_index(queue_type);
        let handle = unsafe {
            device.device.get_device_queue(slot.family_index as u32, slot.queue_index as u32)
        };
        if handle == vk::Queue::null() {
            device.release_queue_index(slot.flag_key, slot.consume);
            return Err(RhiError::resource("vkGetDeviceQueue returned a null queue"));
        }
        Ok(VulkanQueue {
            submit_mutex: device.submit_mutex(slot.family_index),
            timestamp_period: device.adapter.gpu_settings().timestamp_period,
            device: Arc::clone(device),
            handle,
            family_index: slot.family_index,
            queue_index: slot.queue_index,
            queue_type,
            flag_key: slot.flag_key,
            consumed_slot: slot.consume,
        })
    }

    /// Submit command buffers. Wait semaphores are filtered to those
    /// currently signaled (consuming each); signal semaphores to those not
    /// yet signaled (setting each). The signal fence, if any, enters the
    /// submitted state.
    pub fn submit(&self, desc: &QueueSubmitDesc<'_>) {
        debug_assert!(!desc.cmds.is_empty());

        let wait_handles: Vec<vk::Semaphore> = desc
            .wait_semaphores
            .iter()
            .filter(|s| s.take_signaled())
            .map(|s| s.handle())
            .collect();
        let wait_masks =
            vec![vk::PipelineStageFlags::ALL_COMMANDS; wait_handles.len()];

        let signal_handles: Vec<vk::Semaphore> = desc
            .signal_semaphores
            .iter()
            .filter(|s| !s.is_signaled())
            .map(|s| {
                s.set_signaled(true);
                s.handle()
            })
            .collect();

        let cmd_handles: Vec<vk::CommandBuffer> = desc.cmds.iter().map(|c| c.handle()).collect();

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_handles)
            .wait_dst_stage_mask(&wait_masks)
            .command_buffers(&cmd_handles)
            .signal_semaphores(&signal_handles);

        // Many setups expose a single family; the shared mutex keeps
        // concurrent submitters off the same VkQueue.
        let fence = desc.signal_fence.map(|f| f.handle()).unwrap_or(vk::Fence::null());
        let guard = self.submit_mutex.lock().unwrap();
        let result = unsafe { self.device.device.queue_submit(self.handle, &[submit_info], fence) };
        drop(guard);

        match result {
            Ok(()) => {
                if let Some(fence) = desc.signal_fence {
                    fence.mark_submitted(true);
                }
            }
            Err(e) => log::error!("vkQueueSubmit failed: {e:?}"),
        }
    }

    /// Present a swap-chain image, targeting the swap chain's resolved
    /// present queue when it differs from this one. Suboptimal and
    /// out-of-date results are logged, never fatal.
    #[cfg(feature = "window")]
    pub fn present(&self, desc: &QueuePresentDesc<'_>) {
        let wait_handles: Vec<vk::Semaphore> = desc
            .wait_semaphores
            .iter()
            .filter(|s| s.take_signaled())
            .map(|s| s.handle())
            .collect();

        let swapchains = [desc.swap_chain.handle()];
        let image_indices = [desc.index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_handles)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let queue = desc.swap_chain.present_queue_handle().unwrap_or(self.handle);
        let guard = self.submit_mutex.lock().unwrap();
        let result = unsafe { desc.swap_chain.loader().queue_present(queue, &present_info) };
        drop(guard);

        match result {
            Ok(false) => {}
            Ok(true) => log::warn!("vkQueuePresentKHR returned SUBOPTIMAL_KHR"),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::error!("vkQueuePresentKHR returned ERROR_OUT_OF_DATE_KHR; swap chain needs a reload")
            }
            Err(e) => log::error!("vkQueuePresentKHR failed: {e:?}"),
        }
    }

    /// Blocks until every submission on this queue retires.
    pub fn wait_idle(&self) {
        let _guard = self.submit_mutex.lock().unwrap();
        let _ = unsafe { self.device.device.queue_wait_idle(self.handle) };
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn family_index(&self) -> u8 {
        self.family_index
    }

    pub fn queue_index(&self) -> u8 {
        self.queue_index
    }

    pub fn timestamp_period(&self) -> f32 {
        self.timestamp_period
    }

    pub fn handle(&self) -> vk::Queue {
        self.handle
    }
}

impl Drop for VulkanQueue {
    fn drop(&mut self) {
        self.device.release_queue_index(self.flag_key, self.consumed_slot);
    }
}

impl std::fmt::Debug for VulkanQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanQueue")
            .field("queue_type", &self.queue_type)
            .field("family_index", &self.family_index)
            .field("queue_index", &self.queue_index)
            .finish()
    }
}
