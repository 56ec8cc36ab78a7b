//! The upload engine: a request channel feeding one background worker that
//! rotates through a ring of resource sets (fence, semaphore, cmd pool,
//! cmd, persistent-mapped staging buffer).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use ember_rhi::{
    round_up, upload_alignments, BufferCreationFlags, BufferDesc, CmdDesc, CmdPoolDesc,
    DescriptorType, FenceDesc, Format, QueueDesc, QueueSubmitDesc, ResourceMemoryUsage,
    ResourceState, RhiError, SampleCount, SemaphoreDesc, TextureCreationFlags, TextureDesc,
    TextureUpdateDesc, VulkanBuffer, VulkanCmd, VulkanCmdPool, VulkanDevice, VulkanFence,
    VulkanQueue, VulkanSemaphore, VulkanTexture,
};

use crate::image::Image;

pub struct ResourceLoaderDesc {
    /// Byte size of each ring slot's pre-allocated staging buffer.
    pub staging_buffer_size: u64,
    /// Ring length; uploads overlap across slots.
    pub staging_buffer_count: u32,
}

impl Default for ResourceLoaderDesc {
    fn default() -> Self {
        Self { staging_buffer_size: 16 * 1024 * 1024, staging_buffer_count: 2 }
    }
}

pub struct UpdateBufferDesc {
    pub buffer: Arc<VulkanBuffer>,
    pub offset: u64,
    pub data: Vec<u8>,
}

pub struct UpdateTextureDesc {
    pub texture: Arc<VulkanTexture>,
    pub image: Box<dyn Image>,
}

enum Request {
    UpdateBuffer(UpdateBufferDesc),
    UpdateTexture(UpdateTextureDesc),
}

/// One ring slot. Temp buffers cover requests that outgrow the
/// pre-allocated staging buffer; they are freed when the slot is destroyed.
struct ResourceSet {
    fence: Arc<VulkanFence>,
    semaphore: Arc<VulkanSemaphore>,
    cmd_pool: VulkanCmdPool,
    cmd: VulkanCmd,
    buffer: VulkanBuffer,
    temp_buffers: Vec<VulkanBuffer>,
    recording: bool,
}

struct Worker {
    device: Arc<VulkanDevice>,
    queue: VulkanQueue,
    sets: Vec<ResourceSet>,
    next_set: usize,
    receiver: Receiver<Request>,
    pending: Arc<AtomicU64>,
}

/// Bytes one subresource run occupies in staging at upload alignments.
fn required_upload_size(
    format: Format,
    width: u32,
    height: u32,
    depth: u32,
    row_alignment: u32,
    slice_alignment: u32,
    mip_levels: u32,
    array_layers: u32,
) -> u64 {
    let mut required = 0u64;
    for _layer in 0..array_layers {
        let mut w = width;
        let mut h = height;
        let mut d = depth;
        for _mip in 0..mip_levels {
            let Some((_, row_bytes, num_rows)) = format.surface_info(w, h) else {
                return 0;
            };
            let row_pitch = round_up(row_bytes as u64, row_alignment as u64);
            let slice_pitch = round_up(row_pitch * num_rows as u64, slice_alignment as u64);
            required += d as u64 * slice_pitch;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            d = (d / 2).max(1);
        }
    }
    required
}

impl Worker {
    fn run(mut self) {
        while let Ok(request) = self.receiver.recv() {
            match request {
                Request::UpdateBuffer(desc) => self.update_buffer(desc),
                Request::UpdateTexture(desc) => self.update_texture(desc),
            }
            self.pending.fetch_sub(1, Ordering::AcqRel);

            // Submit once the request queue drains so bursts share one
            // submission per slot.
            if self.receiver.is_empty() {
                self.flush_recording_sets();
            }
        }
        // Channel disconnected: the loader is shutting down.
        self.flush_recording_sets();
        self.queue.wait_idle();
        for set in &self.sets {
            set.fence.wait();
        }
    }

    fn flush_recording_sets(&mut self) {
        for set in &mut self.sets {
            if !set.recording {
                continue;
            }
            set.cmd.end();
            set.recording = false;
            self.queue.submit(&QueueSubmitDesc {
                cmds: vec![&set.cmd],
                signal_semaphores: vec![&set.semaphore],
                signal_fence: Some(&set.fence),
                ..Default::default()
            });
        }
    }

    /// Rotate to the next ring slot and make sure its command buffer is
    /// recording (waiting out any in-flight submission first).
    fn begin_active_set(&mut self) -> usize {
        let index = self.next_set;
        self.next_set = (self.next_set + 1) % self.sets.len();
        let set = &mut self.sets[index];
        if !set.recording {
            set.fence.wait();
            set.cmd_pool.reset();
            set.cmd.begin();
            set.recording = true;
            // In-flight copies from the previous use of this slot are done.
            for temp in set.temp_buffers.drain(..) {
                self.device.destroy_buffer(temp);
            }
        }
        index
    }

    fn create_temp_staging(&self, size: u64, alignment: u64) -> Result<VulkanBuffer, RhiError> {
        self.device.create_buffer(&BufferDesc {
            name: "TempStagingBuffer".to_string(),
            size,
            alignment,
            memory_usage: ResourceMemoryUsage::CpuOnly,
            flags: BufferCreationFlags::PERSISTENT_MAP,
            ..Default::default()
        })
    }

    fn update_buffer(&mut self, desc: UpdateBufferDesc) {
        if desc.data.is_empty() {
            return;
        }
        if desc.offset + desc.data.len() as u64 > desc.buffer.size() {
            log::error!(
                "invalid buffer update: offset {} + size {} exceeds buffer size {}",
                desc.offset,
                desc.data.len(),
                desc.buffer.size()
            );
            return;
        }

        let memory_usage = desc.buffer.memory_usage();
        let needs_gpu_copy = matches!(
            memory_usage,
            ResourceMemoryUsage::GpuOnly | ResourceMemoryUsage::GpuToCpu
        );

        if !needs_gpu_copy {
            // Host-visible target: write straight through its mapping.
            let (address, mapped_here) = match desc.buffer.mapped_address() {
                Some(address) => (address, false),
                None => match desc.buffer.map() {
                    Ok(address) => (address, true),
                    Err(e) => {
                        log::error!("failed to map buffer for update: {e}");
                        return;
                    }
                },
            };
            unsafe {
                std::ptr::copy_nonoverlapping(
                    desc.data.as_ptr(),
                    address.as_ptr().add(desc.offset as usize),
                    desc.data.len(),
                );
            }
            if mapped_here {
                let _ = desc.buffer.unmap();
            }
            return;
        }

        let set_index = self.begin_active_set();
        // GPU-only destinations (and anything larger than the ring slot)
        // stage through a dedicated CPU-only temp buffer inside the set.
        const DEFAULT_BUFFER_ALIGNMENT: u64 = 4;
        let staging = match self.create_temp_staging(desc.data.len() as u64, DEFAULT_BUFFER_ALIGNMENT) {
            Ok(staging) => staging,
            Err(e) => {
                log::error!("failed to create temp staging buffer: {e}");
                return;
            }
        };
        let address = staging.mapped_address().expect("persistent-mapped staging buffer");
        unsafe {
            std::ptr::copy_nonoverlapping(desc.data.as_ptr(), address.as_ptr(), desc.data.len());
        }

        let set = &mut self.sets[set_index];
        set.cmd.copy_buffer(&desc.buffer, &staging, 0, desc.offset, desc.data.len() as u64);
        set.temp_buffers.push(staging);
    }

    fn update_texture(&mut self, desc: UpdateTextureDesc) {
        let image = desc.image;
        let format = image.format();
        let (row_alignment, slice_alignment) =
            upload_alignments(self.device.adapter().gpu_settings(), format);
        let layer_count =
            if image.is_cubemap() { image.array_size() * 6 } else { image.array_size() };
        let required = required_upload_size(
            format,
            image.width(),
            image.height(),
            image.depth(),
            row_alignment,
            slice_alignment,
            image.mip_levels(),
            layer_count,
        );
        if required == 0 {
            log::error!("cannot size upload for format {format:?}");
            return;
        }

        let set_index = self.begin_active_set();

        let use_temp = required > self.sets[set_index].buffer.size()
            || self.sets[set_index].buffer.mapped_address().is_none();
        let temp = if use_temp {
            log::warn!(
                "staging buffer too small for upload (need {required}, have {}), allocating temp",
                self.sets[set_index].buffer.size()
            );
            match self.create_temp_staging(required, slice_alignment as u64) {
                Ok(temp) => Some(temp),
                Err(e) => {
                    log::error!("failed to create temp staging buffer: {e}");
                    return;
                }
            }
        } else {
            None
        };

        {
            let set = &self.sets[set_index];
            let staging = temp.as_ref().unwrap_or(&set.buffer);
            let base = staging.mapped_address().expect("staging buffer is persistently mapped");

            // Pack mips at the aligned pitches the copy reads back.
            let mut offset = 0u64;
            for layer in 0..layer_count {
                for mip in 0..image.mip_levels() {
                    let w = (image.width() >> mip).max(1);
                    let h = (image.height() >> mip).max(1);
                    let d = (image.depth() >> mip).max(1);
                    let Some((_, row_bytes, num_rows)) = format.surface_info(w, h) else {
                        return;
                    };
                    let row_pitch = round_up(row_bytes as u64, row_alignment as u64);
                    let slice_pitch = round_up(row_pitch * num_rows as u64, slice_alignment as u64);

                    let data = image.mip_data(mip);
                    let layer_bytes = data.len() / layer_count as usize;
                    let layer_data = &data[layer as usize * layer_bytes..][..layer_bytes];
                    for slice in 0..d as usize {
                        for row in 0..num_rows as usize {
                            let src_start = slice * (row_bytes as usize * num_rows as usize)
                                + row * row_bytes as usize;
                            let src_end = (src_start + row_bytes as usize).min(layer_data.len());
                            if src_start >= src_end {
                                break;
                            }
                            let dst = offset
                                + slice as u64 * slice_pitch
                                + row as u64 * row_pitch;
                            unsafe {
                                std::ptr::copy_nonoverlapping(
                                    layer_data[src_start..src_end].as_ptr(),
                                    base.as_ptr().add(dst as usize),
                                    src_end - src_start,
                                );
                            }
                        }
                    }
                    offset += d as u64 * slice_pitch;
                }
            }

            let update = TextureUpdateDesc {
                src_buffer: staging,
                cmd: &set.cmd,
                base_mip_level: 0,
                mip_levels: image.mip_levels(),
                base_array_layer: 0,
                layer_count,
            };
            if let Err(e) = desc.texture.update(&update) {
                log::error!("texture update failed: {e}");
            }
        }

        if let Some(temp) = temp {
            self.sets[set_index].temp_buffers.push(temp);
        }
    }
}

/// Background CPU→GPU upload engine. Producers enqueue requests from any
/// thread; a single worker owns the transfer queue and the staging ring.
pub struct ResourceLoader {
    device: Arc<VulkanDevice>,
    sender: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
    fences: Vec<Arc<VulkanFence>>,
    semaphores: Vec<Arc<VulkanSemaphore>>,
    pending: Arc<AtomicU64>,
}

impl ResourceLoader {
    pub fn new(device: Arc<VulkanDevice>, desc: &ResourceLoaderDesc) -> Result<ResourceLoader, RhiError> {
        debug_assert!(desc.staging_buffer_size > 32, "tiny staging buffers are pointless");
        debug_assert!(desc.staging_buffer_count > 0);
        let staging_size = desc.staging_buffer_size.max(32);

        let queue = device.request_queue(&QueueDesc::transfer())?;

        let mut sets = Vec::with_capacity(desc.staging_buffer_count as usize);
        let mut fences = Vec::new();
        let mut semaphores = Vec::new();
        for _ in 0..desc.staging_buffer_count {
            let fence = Arc::new(device.create_fence(&FenceDesc {
                name: "CopyEngineFence".to_string(),
                signaled: false,
            })?);
            let semaphore = Arc::new(
                device.create_semaphore(&SemaphoreDesc { name: "CopyCompletedSemaphore".to_string() })?,
            );
            let cmd_pool = device.create_cmd_pool(&CmdPoolDesc {
                queue: &queue,
                transient: false,
                allow_individual_reset: false,
            })?;
            let cmd = device.create_cmd(&CmdDesc { pool: &cmd_pool, secondary: false })?;
            let buffer = device.create_buffer(&BufferDesc {
                name: "CopyEngineBuffer".to_string(),
                size: staging_size,
                memory_usage: ResourceMemoryUsage::CpuOnly,
                flags: BufferCreationFlags::PERSISTENT_MAP,
                ..Default::default()
            })?;

            fences.push(Arc::clone(&fence));
            semaphores.push(Arc::clone(&semaphore));
            sets.push(ResourceSet {
                fence,
                semaphore,
                cmd_pool,
                cmd,
                buffer,
                temp_buffers: Vec::new(),
                recording: false,
            });
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        let pending = Arc::new(AtomicU64::new(0));
        let worker = Worker {
            device: Arc::clone(&device),
            queue,
            sets,
            next_set: 0,
            receiver,
            pending: Arc::clone(&pending),
        };
        let handle = std::thread::Builder::new()
            .name("ResourceLoader".to_string())
            .spawn(move || worker.run())
            .map_err(|e| RhiError::resource(format!("failed to spawn loader thread: {e}")))?;

        Ok(ResourceLoader {
            device,
            sender: Some(sender),
            worker: Some(handle),
            fences,
            semaphores,
            pending,
        })
    }

    fn push(&self, request: Request) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Some(sender) = &self.sender {
            if sender.send(request).is_err() {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                log::error!("resource loader worker is gone; request dropped");
            }
        }
    }

    /// Enqueue a raw byte update of `buffer`.
    pub fn push_update_buffer(&self, desc: UpdateBufferDesc) {
        debug_assert!(!desc.data.is_empty());
        self.push(Request::UpdateBuffer(desc));
    }

    /// Enqueue a full-surface upload of `image` into `texture`.
    pub fn push_update_texture(&self, desc: UpdateTextureDesc) {
        self.push(Request::UpdateTexture(desc));
    }

    /// Create a texture shaped like `image` and enqueue its upload.
    pub fn load_texture(&self, image: Box<dyn Image>, name: &str) -> Result<Arc<VulkanTexture>, RhiError> {
        let mut array_size = image.array_size();
        let mut descriptor_type = DescriptorType::TEXTURE;
        if image.is_cubemap() {
            descriptor_type |= DescriptorType::TEXTURE_CUBE;
            array_size *= 6;
        }
        let texture = Arc::new(self.device.create_texture(&TextureDesc {
            name: name.to_string(),
            flags: TextureCreationFlags::empty(),
            width: image.width(),
            height: image.height(),
            depth: image.depth(),
            array_size,
            mip_levels: image.mip_levels(),
            sample_count: SampleCount::Count1,
            format: image.format(),
            start_state: ResourceState::COMMON,
            descriptor_type,
            ..Default::default()
        })?);
        self.push_update_texture(UpdateTextureDesc { texture: Arc::clone(&texture), image });
        Ok(texture)
    }

    /// Create a buffer and enqueue `data` into it.
    pub fn load_buffer(&self, desc: &BufferDesc, data: Vec<u8>) -> Result<Arc<VulkanBuffer>, RhiError> {
        debug_assert!(!data.is_empty());
        let mut adjusted = desc.clone();
        if adjusted.memory_usage == ResourceMemoryUsage::GpuOnly {
            adjusted.start_state = ResourceState::COMMON;
        }
        let buffer = Arc::new(self.device.create_buffer(&adjusted)?);
        self.push_update_buffer(UpdateBufferDesc { buffer: Arc::clone(&buffer), offset: 0, data });
        Ok(buffer)
    }

    /// Semaphore signaled when ring slot `index` finishes its copies; chain
    /// it into a submit's wait list to gate rendering on uploads.
    pub fn copy_semaphore(&self, index: usize) -> Option<&Arc<VulkanSemaphore>> {
        self.semaphores.get(index)
    }

    pub fn set_count(&self) -> usize {
        self.fences.len()
    }

    /// Blocks until every pushed request has been consumed, submitted, and
    /// retired on the GPU.
    pub fn wait_idle(&self) {
        while self.pending.load(Ordering::Acquire) > 0 {
            std::thread::yield_now();
        }
        for fence in &self.fences {
            fence.wait();
        }
    }
}

impl Drop for ResourceLoader {
    fn drop(&mut self) {
        self.wait_idle();
        // Disconnect the channel; the worker drains and exits.
        drop(self.sender.take());
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader").field("sets", &self.fences.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_size_accounts_for_alignment() {
        // 64x64 RGBA8, single mip: rows of 256 bytes already match a
        // 256-byte row alignment; slices align up to 4 KiB granularity.
        let size = required_upload_size(Format::R8G8B8A8Unorm, 64, 64, 1, 256, 512, 1, 1);
        assert_eq!(size, round_up(256 * 64, 512));

        // Unaligned rows pad out per row.
        let size = required_upload_size(Format::R8G8B8A8Unorm, 60, 4, 1, 256, 256, 1, 1);
        assert_eq!(size, 256 * 4);
    }

    #[test]
    fn required_size_walks_the_mip_chain() {
        let size = required_upload_size(Format::R8G8B8A8Unorm, 4, 4, 1, 1, 1, 3, 1);
        // 4x4, 2x2, 1x1 at 4 bytes per texel.
        assert_eq!(size, 64 + 16 + 4);
    }

    #[test]
    fn required_size_scales_with_layers() {
        let one = required_upload_size(Format::R8G8B8A8Unorm, 8, 8, 1, 1, 1, 1, 1);
        let six = required_upload_size(Format::R8G8B8A8Unorm, 8, 8, 1, 1, 1, 1, 6);
        assert_eq!(six, one * 6);
    }

    #[test]
    fn undefined_format_cannot_be_sized() {
        assert_eq!(required_upload_size(Format::Undefined, 4, 4, 1, 1, 1, 1, 1), 0);
    }
}
