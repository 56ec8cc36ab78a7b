//! Descriptor sets: pool-per-layout allocation, null-descriptor pre-fill,
//! and typed updates.

use std::sync::Arc;

use ash::vk;

use crate::{DescriptorDataRange, DescriptorType, RhiError, UpdateFrequency};

use super::buffer::VulkanBuffer;
use super::device::{DeviceShared, VulkanDevice};
use super::root_signature::{DescriptorInfo, VulkanRootSignature};
use super::sampler::VulkanSampler;
use super::texture::VulkanTexture;

pub struct DescriptorSetDesc {
    pub root_signature: Arc<VulkanRootSignature>,
    pub update_frequency: UpdateFrequency,
    /// Number of sets allocated against the tier's layout.
    pub max_sets: u32,
}

/// Resources carried by one update parameter; the variant must match the
/// descriptor's kind.
pub enum DescriptorResources<'a> {
    None,
    Textures(Vec<&'a VulkanTexture>),
    Samplers(Vec<&'a VulkanSampler>),
    Buffers(Vec<&'a VulkanBuffer>),
}

impl<'a> DescriptorResources<'a> {
    fn len(&self) -> usize {
        match self {
            DescriptorResources::None => 0,
            DescriptorResources::Textures(v) => v.len(),
            DescriptorResources::Samplers(v) => v.len(),
            DescriptorResources::Buffers(v) => v.len(),
        }
    }
}

/// One descriptor update parameter, addressed by cached index or by name.
pub struct DescriptorData<'a> {
    pub name: Option<&'a str>,
    /// Index into the root signature's descriptor table; avoids the string
    /// lookup on hot paths.
    pub index: Option<u32>,
    /// First array element to update.
    pub array_offset: u32,
    /// Bind the stencil-only view of a depth/stencil texture.
    pub bind_stencil_resource: bool,
    /// Per-resource buffer sub-ranges.
    pub ranges: Option<Vec<DescriptorDataRange>>,
    /// Mip to bind for RW textures.
    pub uav_mip_slice: u32,
    /// Bind every mip of the first texture as a UAV array.
    pub bind_mip_chain: bool,
    pub resources: DescriptorResources<'a>,
}

impl<'a> Default for DescriptorData<'a> {
    fn default() -> Self {
        Self {
            name: None,
            index: None,
            array_offset: 0,
            bind_stencil_resource: false,
            ranges: None,
            uav_mip_slice: 0,
            bind_mip_chain: false,
            resources: DescriptorResources::None,
        }
    }
}

/// A pool of `max_sets` descriptor sets over one update-frequency tier of a
/// root signature. Every binding starts pre-filled with the device's null
/// descriptor of the matching kind.
pub struct VulkanDescriptorSet {
    device: Arc<DeviceShared>,
    root_signature: Arc<VulkanRootSignature>,
    pool: vk::DescriptorPool,
    handles: Vec<vk::DescriptorSet>,
    update_frequency: UpdateFrequency,
    dynamic_offsets: Vec<u32>,
}

impl VulkanDescriptorSet {
    pub(crate) fn create(device: &VulkanDevice, desc: &DescriptorSetDesc) -> Result<VulkanDescriptorSet, RhiError> {
        let shared = device.shared();
        let tier = desc.update_frequency.index();
        let root_signature = Arc::clone(&desc.root_signature);

        let layout = root_signature.set_layout(tier);
        if layout == vk::DescriptorSetLayout::null() {
            return Err(RhiError::state(format!(
                "root signature has no descriptor-set layout at update frequency {:?}",
                desc.update_frequency
            )));
        }

        let pool_sizes: Vec<vk::DescriptorPoolSize> = root_signature
            .tier_pool_sizes(tier)
            .iter()
            .map(|&(ty, count)| {
                vk::DescriptorPoolSize::default().ty(ty).descriptor_count(count * desc.max_sets)
            })
            .collect();
        let pool_info =
            vk::DescriptorPoolCreateInfo::default().max_sets(desc.max_sets).pool_sizes(&pool_sizes);
        let pool = unsafe {
            shared
                .device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateDescriptorPool: {e:?}")))?
        };

        let layouts = vec![layout; desc.max_sets as usize];
        let alloc_info =
            vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts);
        let handles = match unsafe { shared.device.allocate_descriptor_sets(&alloc_info) } {
            Ok(handles) => handles,
            Err(e) => {
                unsafe { shared.device.destroy_descriptor_pool(pool, None) };
                return Err(RhiError::resource(format!("vkAllocateDescriptorSets: {e:?}")));
            }
        };

        let set = VulkanDescriptorSet {
            device: Arc::clone(shared),
            dynamic_offsets: vec![0; root_signature.dynamic_descriptor_count(tier) as usize],
            root_signature,
            pool,
            handles,
            update_frequency: desc.update_frequency,
        };
        set.fill_null_descriptors(device);
        Ok(set)
    }

    /// First update for every binding in the tier so an un-updated binding
    /// still reads defined data.
    fn fill_null_descriptors(&self, device: &VulkanDevice) {
        for info in self.root_signature.descriptors() {
            if info.update_frequency != self.update_frequency
                || info.is_root_descriptor
                || info.is_static_sampler
            {
                continue;
            }

            let count = info.size as usize;
            let mut image_infos = Vec::new();
            let mut buffer_infos = Vec::new();
            let mut texel_views = Vec::new();

            if info.vk_type == vk::DescriptorType::SAMPLER {
                image_infos = vec![
                    vk::DescriptorImageInfo::default().sampler(device.null_sampler().handle());
                    count
                ];
            } else if info.vk_type == vk::DescriptorType::SAMPLED_IMAGE {
                let Some(texture) = device.null_texture_srv(info.dim) else { continue };
                image_infos = vec![
                    vk::DescriptorImageInfo::default()
                        .image_view(texture.srv_view())
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                    count
                ];
            } else if info.vk_type == vk::DescriptorType::COMBINED_IMAGE_SAMPLER {
                let Some(texture) = device.null_texture_srv(info.dim) else { continue };
                image_infos = vec![
                    vk::DescriptorImageInfo::default()
                        .sampler(device.null_sampler().handle())
                        .image_view(texture.srv_view())
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                    count
                ];
            } else if info.vk_type == vk::DescriptorType::STORAGE_IMAGE {
                let Some(texture) = device.null_texture_uav(info.dim) else { continue };
                image_infos = vec![
                    vk::DescriptorImageInfo::default()
                        .image_view(texture.uav_view(0))
                        .image_layout(vk::ImageLayout::GENERAL);
                    count
                ];
            } else if info.vk_type == vk::DescriptorType::INPUT_ATTACHMENT {
                let Some(texture) = device.null_texture_srv(info.dim) else { continue };
                image_infos = vec![
                    vk::DescriptorImageInfo::default()
                        .image_view(texture.srv_view())
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                    count
                ];
            } else if info.vk_type == vk::DescriptorType::UNIFORM_BUFFER
                || info.vk_type == vk::DescriptorType::STORAGE_BUFFER
            {
                let buffer = if info.vk_type == vk::DescriptorType::STORAGE_BUFFER
                    && info.descriptor_type.intersects(DescriptorType::RW_BUFFER)
                {
                    device.null_buffer_uav()
                } else {
                    device.null_buffer_srv()
                };
                buffer_infos = vec![
                    vk::DescriptorBufferInfo::default()
                        .buffer(buffer.handle())
                        .offset(0)
                        .range(vk::WHOLE_SIZE);
                    count
                ];
            } else if info.vk_type == vk::DescriptorType::UNIFORM_TEXEL_BUFFER {
                texel_views = vec![device.null_buffer_srv().uniform_texel_view(); count];
            } else if info.vk_type == vk::DescriptorType::STORAGE_TEXEL_BUFFER {
                texel_views = vec![device.null_buffer_uav().storage_texel_view(); count];
            } else {
                log::debug!("no null descriptor for {:?}, binding {} starts empty", info.vk_type, info.name);
                continue;
            }

            for &handle in &self.handles {
                let mut write = vk::WriteDescriptorSet::default()
                    .dst_set(handle)
                    .dst_binding(info.binding)
                    .dst_array_element(0)
                    .descriptor_type(info.vk_type);
                if !image_infos.is_empty() {
                    write = write.image_info(&image_infos);
                } else if !buffer_infos.is_empty() {
                    write = write.buffer_info(&buffer_infos);
                } else {
                    write = write.texel_buffer_view(&texel_views);
                }
                unsafe { self.device.device.update_descriptor_sets(&[write], &[]) };
            }
        }
    }

    fn resolve_info<'rs>(&'rs self, param: &DescriptorData<'_>) -> Option<&'rs DescriptorInfo> {
        let index = match (param.index, param.name) {
            (Some(index), _) => Some(index),
            (None, Some(name)) => self.root_signature.descriptor_index(name),
            (None, None) => None,
        };
        match index.and_then(|i| self.root_signature.descriptors().get(i as usize)) {
            Some(info) => Some(info),
            None => {
                log::error!(
                    "failed to find descriptor param (index={:?}, name={:?})",
                    param.index,
                    param.name
                );
                None
            }
        }
    }

    /// Apply typed writes to set `index`. Violations (frequency mismatch,
    /// static samplers, root descriptors, oversized ranges) are logged and
    /// the parameter is skipped.
    pub fn update(&self, index: u32, params: &[DescriptorData<'_>]) {
        let Some(&set_handle) = self.handles.get(index as usize) else {
            log::error!("descriptor set index {index} out of range");
            return;
        };

        for param in params {
            let Some(info) = self.resolve_info(param) else { continue };

            if info.update_frequency != self.update_frequency {
                log::error!("descriptor {}: update frequency mismatch", info.name);
                continue;
            }
            if param.resources.len() == 0 {
                log::error!("descriptor {}: no resources to bind", info.name);
                continue;
            }
            if info.is_static_sampler {
                log::error!("descriptor {}: static samplers cannot be updated", info.name);
                continue;
            }

            let write = vk::WriteDescriptorSet::default()
                .dst_set(set_handle)
                .dst_binding(info.binding)
                .dst_array_element(param.array_offset)
                .descriptor_type(info.vk_type);

            if info.vk_type == vk::DescriptorType::SAMPLER {
                let DescriptorResources::Samplers(samplers) = &param.resources else {
                    log::error!("descriptor {}: expected samplers", info.name);
                    continue;
                };
                let image_infos: Vec<vk::DescriptorImageInfo> = samplers
                    .iter()
                    .map(|s| vk::DescriptorImageInfo::default().sampler(s.handle()))
                    .collect();
                let write = write.image_info(&image_infos);
                unsafe { self.device.device.update_descriptor_sets(&[write], &[]) };
            } else if info.vk_type == vk::DescriptorType::COMBINED_IMAGE_SAMPLER
                || info.vk_type == vk::DescriptorType::SAMPLED_IMAGE
                || info.vk_type == vk::DescriptorType::INPUT_ATTACHMENT
            {
                let DescriptorResources::Textures(textures) = &param.resources else {
                    log::error!("descriptor {}: expected textures", info.name);
                    continue;
                };
                let image_infos: Vec<vk::DescriptorImageInfo> = textures
                    .iter()
                    .map(|t| {
                        let view = if param.bind_stencil_resource {
                            t.srv_stencil_view()
                        } else {
                            t.srv_view()
                        };
                        vk::DescriptorImageInfo::default()
                            .image_view(view)
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    })
                    .collect();
                let write = write.image_info(&image_infos);
                unsafe { self.device.device.update_descriptor_sets(&[write], &[]) };
            } else if info.vk_type == vk::DescriptorType::STORAGE_IMAGE {
                let DescriptorResources::Textures(textures) = &param.resources else {
                    log::error!("descriptor {}: expected textures", info.name);
                    continue;
                };
                let image_infos: Vec<vk::DescriptorImageInfo> = if param.bind_mip_chain {
                    if param.array_offset != 0 {
                        log::error!(
                            "descriptor {}: array offset must be 0 when binding a mip chain",
                            info.name
                        );
                        continue;
                    }
                    let texture = textures[0];
                    (0..texture.uav_view_count())
                        .map(|mip| {
                            vk::DescriptorImageInfo::default()
                                .image_view(texture.uav_view(mip))
                                .image_layout(vk::ImageLayout::GENERAL)
                        })
                        .collect()
                } else {
                    textures
                        .iter()
                        .map(|t| {
                            vk::DescriptorImageInfo::default()
                                .image_view(t.uav_view(param.uav_mip_slice))
                                .image_layout(vk::ImageLayout::GENERAL)
                        })
                        .collect()
                };
                let write = write.image_info(&image_infos);
                unsafe { self.device.device.update_descriptor_sets(&[write], &[]) };
            } else if info.vk_type == vk::DescriptorType::UNIFORM_BUFFER
                || info.vk_type == vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                || info.vk_type == vk::DescriptorType::STORAGE_BUFFER
            {
                if info.is_root_descriptor {
                    log::error!(
                        "descriptor {}: root cbvs are bound through dynamic offsets, not set updates",
                        info.name
                    );
                    continue;
                }
                let DescriptorResources::Buffers(buffers) = &param.resources else {
                    log::error!("descriptor {}: expected buffers", info.name);
                    continue;
                };
                let max_range = if info.vk_type == vk::DescriptorType::UNIFORM_BUFFER {
                    self.device.adapter.max_uniform_buffer_range() as u64
                } else {
                    self.device.adapter.max_storage_buffer_range() as u64
                };
                let mut valid = true;
                let buffer_infos: Vec<vk::DescriptorBufferInfo> = buffers
                    .iter()
                    .enumerate()
                    .map(|(i, b)| {
                        let (offset, range) = match param.ranges.as_ref().and_then(|r| r.get(i)) {
                            Some(range) => (range.offset, range.size),
                            None => (b.offset(), vk::WHOLE_SIZE),
                        };
                        if range != vk::WHOLE_SIZE && (range == 0 || range > max_range) {
                            log::error!(
                                "descriptor {}: range size {} outside [1, {max_range}]",
                                info.name,
                                range
                            );
                            valid = false;
                        }
                        vk::DescriptorBufferInfo::default()
                            .buffer(b.handle())
                            .offset(offset)
                            .range(range)
                    })
                    .collect();
                if !valid {
                    continue;
                }
                let write = write.buffer_info(&buffer_infos);
                unsafe { self.device.device.update_descriptor_sets(&[write], &[]) };
            } else if info.vk_type == vk::DescriptorType::UNIFORM_TEXEL_BUFFER
                || info.vk_type == vk::DescriptorType::STORAGE_TEXEL_BUFFER
            {
                let DescriptorResources::Buffers(buffers) = &param.resources else {
                    log::error!("descriptor {}: expected buffers", info.name);
                    continue;
                };
                let views: Vec<vk::BufferView> = buffers
                    .iter()
                    .map(|b| {
                        if info.vk_type == vk::DescriptorType::UNIFORM_TEXEL_BUFFER {
                            b.uniform_texel_view()
                        } else {
                            b.storage_texel_view()
                        }
                    })
                    .collect();
                let write = write.texel_buffer_view(&views);
                unsafe { self.device.device.update_descriptor_sets(&[write], &[]) };
            } else {
                log::error!("descriptor {}: unsupported descriptor type for update", info.name);
            }
        }
    }

    /// Byte offset for one dynamic uniform slot, applied at bind time.
    pub fn set_dynamic_offset(&mut self, slot: u32, offset: u32) {
        if let Some(entry) = self.dynamic_offsets.get_mut(slot as usize) {
            *entry = offset;
        }
    }

    pub fn max_sets(&self) -> u32 {
        self.handles.len() as u32
    }

    pub fn update_frequency(&self) -> UpdateFrequency {
        self.update_frequency
    }

    pub fn root_signature(&self) -> &Arc<VulkanRootSignature> {
        &self.root_signature
    }

    pub(crate) fn handle(&self, index: u32) -> vk::DescriptorSet {
        self.handles.get(index as usize).copied().unwrap_or(vk::DescriptorSet::null())
    }

    pub(crate) fn dynamic_offsets(&self) -> &[u32] {
        &self.dynamic_offsets
    }
}

impl Drop for VulkanDescriptorSet {
    fn drop(&mut self) {
        // Sets allocated from the pool are returned with it.
        unsafe {
            self.device.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

impl std::fmt::Debug for VulkanDescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDescriptorSet")
            .field("update_frequency", &self.update_frequency)
            .field("max_sets", &self.handles.len())
            .finish()
    }
}
