//! Root signatures: unify shader reflections into descriptor-set layouts
//! over the four update-frequency tiers, push-constant ranges, immutable
//! samplers, and the pipeline layout.

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;

use crate::reflection::ShaderResource;
use crate::{
    DescriptorType, PipelineType, RhiError, RootSignatureFlags, ShaderStageFlags,
    TextureDimension, UpdateFrequency,
};

use super::convert;
use super::device::DeviceShared;
use super::sampler::VulkanSampler;
use super::shader::VulkanShader;

pub struct RootSignatureDesc<'a> {
    pub shaders: Vec<&'a VulkanShader>,
    /// Samplers baked into the layout by resource name; their bindings are
    /// skipped by descriptor-set updates.
    pub static_samplers: Vec<(String, &'a VulkanSampler)>,
    pub max_bindless_textures: u32,
    pub flags: RootSignatureFlags,
}

impl<'a> Default for RootSignatureDesc<'a> {
    fn default() -> Self {
        Self {
            shaders: Vec::new(),
            static_samplers: Vec::new(),
            max_bindless_textures: 0,
            flags: RootSignatureFlags::empty(),
        }
    }
}

/// One descriptor as the root signature sees it.
#[derive(Debug, Clone)]
pub struct DescriptorInfo {
    pub name: String,
    pub descriptor_type: DescriptorType,
    /// Backend descriptor type; may be retyped (dynamic uniform buffers).
    pub vk_type: vk::DescriptorType,
    /// Array element count; byte count for root constants.
    pub size: u32,
    /// Flat index within the tier (root constants: index into the
    /// push-constant ranges).
    pub handle_index: u32,
    pub dim: TextureDimension,
    pub update_frequency: UpdateFrequency,
    pub is_root_descriptor: bool,
    pub is_static_sampler: bool,
    pub binding: u32,
    pub vk_stages: vk::ShaderStageFlags,
}

/// How one update-frequency tier materializes in the pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TierKind {
    /// No layout; the tier is past the last used set.
    None,
    /// Empty layout created only to keep set numbers contiguous.
    Hole,
    /// Real layout with bindings.
    Bindings,
}

#[derive(Debug, Clone)]
pub(crate) struct PlannedBinding {
    pub binding: u32,
    pub vk_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
    pub immutable_sampler: vk::Sampler,
    pub descriptor_index: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct TierPlan {
    pub kind: TierKind,
    pub bindings: Vec<PlannedBinding>,
    pub pool_sizes: Vec<(vk::DescriptorType, u32)>,
    pub dynamic_count: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct PushConstantPlan {
    pub descriptor_index: usize,
    pub stages: vk::ShaderStageFlags,
    pub size: u32,
}

#[derive(Debug)]
pub(crate) struct RootSignaturePlan {
    pub pipeline_type: PipelineType,
    pub descriptors: Vec<DescriptorInfo>,
    pub tiers: Vec<TierPlan>,
    pub push_constants: Vec<PushConstantPlan>,
    pub name_to_index: HashMap<String, u32>,
}

/// Collect the unique resources across all contributing shaders and derive
/// the pipeline type. Two resources are the same when their names match, or
/// when their (type, stage, set, binding) coordinates match — the latter
/// silently aliases differently named resources, which is surfaced as a
/// warning. A name reused at a different (set, binding) is fatal.
pub(crate) fn collect_shader_resources(
    shaders: &[&crate::reflection::PipelineReflection],
) -> Result<(PipelineType, Vec<ShaderResource>), RhiError> {
    let mut pipeline_type = PipelineType::Undefined;
    let mut resources: Vec<ShaderResource> = Vec::new();

    for reflection in shaders {
        if reflection.stages.intersects(ShaderStageFlags::COMP) {
            debug_assert!(reflection.stages.is_single_stage(), "compute shaders stand alone");
            pipeline_type = PipelineType::Compute;
        } else if reflection.stages.intersects(ShaderStageFlags::RAYTRACING) {
            debug_assert!(reflection.stages.is_single_stage(), "raytracing shaders stand alone");
            pipeline_type = PipelineType::Raytracing;
        } else {
            pipeline_type = PipelineType::Graphics;
        }

        for resource in &reflection.resources {
            let by_name = resources.iter().position(|r| r.name == resource.name);
            let by_location = resources.iter().position(|r| {
                r.descriptor_type == resource.descriptor_type
                    && r.used_stages == resource.used_stages
                    && r.set == resource.set
                    && r.binding == resource.binding
            });

            match (by_name, by_location) {
                (Some(index), _) => {
                    let existing = &mut resources[index];
                    if existing.set != resource.set || existing.binding != resource.binding {
                        return Err(RhiError::reflect(format!(
                            "shared shader resource {} has mismatching set or binding",
                            resource.name
                        )));
                    }
                    existing.used_stages |= resource.used_stages;
                }
                (None, Some(index)) => {
                    log::warn!(
                        "resources {} and {} alias the same binding (set={}, binding={}); merging",
                        resources[index].name,
                        resource.name,
                        resource.set,
                        resource.binding,
                    );
                    resources[index].used_stages |= resource.used_stages;
                }
                (None, None) => resources.push(resource.clone()),
            }
        }
    }

    Ok((pipeline_type, resources))
}

/// Build the tier layouts, pool tallies, push-constant ranges, and the
/// name→index map from the unique resource list.
pub(crate) fn build_root_signature_plan(
    pipeline_type: PipelineType,
    resources: &[ShaderResource],
    static_samplers: &HashMap<String, vk::Sampler>,
) -> Result<RootSignaturePlan, RhiError> {
    let mut descriptors: Vec<DescriptorInfo> = Vec::with_capacity(resources.len());
    let mut tiers: Vec<TierPlan> = (0..UpdateFrequency::COUNT)
        .map(|_| TierPlan { kind: TierKind::None, bindings: Vec::new(), pool_sizes: Vec::new(), dynamic_count: 0 })
        .collect();
    let mut push_constants: Vec<PushConstantPlan> = Vec::new();

    for resource in resources {
        let mut info = DescriptorInfo {
            name: resource.name.clone(),
            descriptor_type: resource.descriptor_type,
            vk_type: vk::DescriptorType::SAMPLER,
            size: resource.size,
            handle_index: 0,
            dim: resource.dim,
            update_frequency: UpdateFrequency::None,
            is_root_descriptor: false,
            is_static_sampler: false,
            binding: resource.binding,
            vk_stages: convert::to_vk_shader_stages(resource.used_stages),
        };

        if resource.descriptor_type == DescriptorType::ROOT_CONSTANT {
            log::info!("descriptor {}: user specified push constant", info.name);
            info.is_root_descriptor = true;
            info.handle_index = push_constants.len() as u32;
            push_constants.push(PushConstantPlan {
                descriptor_index: descriptors.len(),
                stages: info.vk_stages,
                size: resource.size,
            });
            descriptors.push(info);
            continue;
        }

        let Some(mut vk_type) = convert::to_vk_descriptor_type(resource.descriptor_type) else {
            log::warn!(
                "descriptor {} has no backend binding kind ({:?}), skipping",
                info.name,
                resource.descriptor_type
            );
            descriptors.push(info);
            continue;
        };

        // "rootcbv" names request a dynamic uniform buffer bound per frame
        // without descriptor updates; arrays cannot be dynamic.
        if info.name.contains("rootcbv") {
            if resource.size == 1 {
                vk_type = vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC;
                log::info!("descriptor {}: user specified dynamic uniform buffer", info.name);
            } else {
                log::error!(
                    "descriptor {}: dynamic uniform buffers cannot be arrays (size {})",
                    info.name,
                    resource.size
                );
            }
        }

        let tier = UpdateFrequency::from_set(resource.set);
        debug_assert!((resource.set as usize) < UpdateFrequency::COUNT);
        info.vk_type = vk_type;
        info.update_frequency = tier;

        let immutable_sampler = static_samplers.get(&info.name).copied();
        if immutable_sampler.is_some() {
            log::info!("descriptor {}: user specified static sampler", info.name);
            // Combined image samplers stay updatable so the image half can
            // still be written.
            if vk_type != vk::DescriptorType::COMBINED_IMAGE_SAMPLER {
                info.is_static_sampler = true;
            }
        }
        if vk_type == vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC {
            info.is_root_descriptor = true;
        }

        let tier_plan = &mut tiers[tier.index()];
        tier_plan.bindings.push(PlannedBinding {
            binding: resource.binding,
            vk_type,
            count: resource.size,
            stages: info.vk_stages,
            immutable_sampler: immutable_sampler.unwrap_or(vk::Sampler::null()),
            descriptor_index: descriptors.len(),
        });

        match tier_plan.pool_sizes.iter_mut().find(|(ty, _)| *ty == vk_type) {
            Some((_, count)) => *count += resource.size,
            None => tier_plan.pool_sizes.push((vk_type, resource.size)),
        }

        descriptors.push(info);
    }

    // Name → index map for O(1) lookup during descriptor updates.
    let mut name_to_index = HashMap::with_capacity(descriptors.len());
    for (index, info) in descriptors.iter().enumerate() {
        if name_to_index.insert(info.name.clone(), index as u32).is_some() {
            log::error!("descriptor {}: duplicate descriptor name", info.name);
        }
    }

    // Least frequently changed tiers first; holes between used tiers get
    // empty layouts so set numbers stay contiguous.
    for tier_index in (0..UpdateFrequency::COUNT).rev() {
        let higher_used = tiers[tier_index + 1..].iter().any(|t| t.kind != TierKind::None);
        let tier = &mut tiers[tier_index];
        tier.kind = if !tier.bindings.is_empty() {
            TierKind::Bindings
        } else if higher_used {
            TierKind::Hole
        } else {
            TierKind::None
        };
        if tier.bindings.is_empty() {
            continue;
        }

        tier.bindings.sort_by(|a, b| {
            b.vk_type
                .as_raw()
                .cmp(&a.vk_type.as_raw())
                .then(a.binding.cmp(&b.binding))
        });

        // Flat handle indexes: cumulative element counts in sorted order.
        let mut cumulative = 0;
        for binding in &tier.bindings {
            let info = &mut descriptors[binding.descriptor_index];
            if !info.is_root_descriptor && !info.is_static_sampler {
                info.handle_index = cumulative;
                cumulative += binding.count;
            }
        }

        // Dynamic offsets are supplied in binding order at bind time.
        let mut dynamic: Vec<usize> = tier
            .bindings
            .iter()
            .filter(|b| b.vk_type == vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
            .map(|b| b.descriptor_index)
            .collect();
        dynamic.sort_by_key(|&index| descriptors[index].binding);
        tier.dynamic_count = dynamic.len() as u32;
        for (slot, descriptor_index) in dynamic.into_iter().enumerate() {
            descriptors[descriptor_index].handle_index = slot as u32;
        }
    }

    Ok(RootSignaturePlan { pipeline_type, descriptors, tiers, push_constants, name_to_index })
}

/// References its device; owns the pipeline layout, the per-tier set
/// layouts, the descriptor table, and the name→index map.
pub struct VulkanRootSignature {
    device: Arc<DeviceShared>,
    pipeline_layout: vk::PipelineLayout,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    tier_kinds: Vec<TierKind>,
    pool_sizes: Vec<Vec<(vk::DescriptorType, u32)>>,
    dynamic_descriptor_counts: Vec<u32>,
    descriptors: Vec<DescriptorInfo>,
    name_to_index: HashMap<String, u32>,
    push_constants: Vec<PushConstantPlan>,
    pipeline_type: PipelineType,
}

impl VulkanRootSignature {
    pub(crate) fn create(
        device: &Arc<DeviceShared>,
        desc: &RootSignatureDesc<'_>,
    ) -> Result<Arc<VulkanRootSignature>, RhiError> {
        let reflections: Vec<&crate::reflection::PipelineReflection> =
            desc.shaders.iter().map(|s| s.reflection()).collect();
        let (pipeline_type, resources) = collect_shader_resources(&reflections)?;

        let static_samplers: HashMap<String, vk::Sampler> = desc
            .static_samplers
            .iter()
            .map(|(name, sampler)| (name.clone(), sampler.handle()))
            .collect();

        let plan = build_root_signature_plan(pipeline_type, &resources, &static_samplers)?;

        let mut set_layouts = vec![vk::DescriptorSetLayout::null(); UpdateFrequency::COUNT];
        for (tier_index, tier) in plan.tiers.iter().enumerate() {
            if tier.kind == TierKind::None {
                continue;
            }
            // Immutable sampler pointers must stay alive across the create
            // call, hence the parallel array.
            let sampler_slots: Vec<[vk::Sampler; 1]> =
                tier.bindings.iter().map(|b| [b.immutable_sampler]).collect();
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = tier
                .bindings
                .iter()
                .zip(&sampler_slots)
                .map(|(planned, samplers)| {
                    let mut binding = vk::DescriptorSetLayoutBinding::default()
                        .binding(planned.binding)
                        .descriptor_type(planned.vk_type)
                        .stage_flags(planned.stages);
                    if planned.immutable_sampler != vk::Sampler::null() {
                        binding = binding.immutable_samplers(samplers);
                    }
                    binding.descriptor_count(planned.count)
                })
                .collect();
            let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let layout = unsafe {
                device.device.create_descriptor_set_layout(&create_info, None).map_err(|e| {
                    destroy_layouts(device, &set_layouts);
                    RhiError::resource(format!("vkCreateDescriptorSetLayout: {e:?}"))
                })?
            };
            set_layouts[tier_index] = layout;
        }

        let push_constant_ranges: Vec<vk::PushConstantRange> = plan
            .push_constants
            .iter()
            .map(|pc| vk::PushConstantRange::default().stage_flags(pc.stages).offset(0).size(pc.size))
            .collect();
        let used_layouts: Vec<vk::DescriptorSetLayout> =
            set_layouts.iter().copied().filter(|l| *l != vk::DescriptorSetLayout::null()).collect();
        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&used_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let pipeline_layout = unsafe {
            match device.device.create_pipeline_layout(&layout_info, None) {
                Ok(layout) => layout,
                Err(e) => {
                    destroy_layouts(device, &set_layouts);
                    return Err(RhiError::resource(format!("vkCreatePipelineLayout: {e:?}")));
                }
            }
        };

        Ok(Arc::new(VulkanRootSignature {
            device: Arc::clone(device),
            pipeline_layout,
            set_layouts,
            tier_kinds: plan.tiers.iter().map(|t| t.kind).collect(),
            pool_sizes: plan.tiers.iter().map(|t| t.pool_sizes.clone()).collect(),
            dynamic_descriptor_counts: plan.tiers.iter().map(|t| t.dynamic_count).collect(),
            descriptors: plan.descriptors,
            name_to_index: plan.name_to_index,
            push_constants: plan.push_constants,
            pipeline_type: plan.pipeline_type,
        }))
    }

    pub fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    pub fn descriptors(&self) -> &[DescriptorInfo] {
        &self.descriptors
    }

    pub fn descriptor_index(&self, name: &str) -> Option<u32> {
        self.name_to_index.get(name).copied()
    }

    /// Stage flags and byte size of a push-constant block, by name.
    pub(crate) fn push_constant_range(&self, name: &str) -> Option<(vk::ShaderStageFlags, u32)> {
        let index = self.descriptor_index(name)? as usize;
        let info = self.descriptors.get(index)?;
        if info.descriptor_type != DescriptorType::ROOT_CONSTANT {
            return None;
        }
        self.push_constants
            .get(info.handle_index as usize)
            .map(|pc| (pc.stages, pc.size))
    }

    pub(crate) fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub(crate) fn set_layout(&self, tier: usize) -> vk::DescriptorSetLayout {
        self.set_layouts[tier]
    }

    pub(crate) fn tier_kind(&self, tier: usize) -> TierKind {
        self.tier_kinds[tier]
    }

    pub(crate) fn tier_pool_sizes(&self, tier: usize) -> &[(vk::DescriptorType, u32)] {
        &self.pool_sizes[tier]
    }

    pub(crate) fn dynamic_descriptor_count(&self, tier: usize) -> u32 {
        self.dynamic_descriptor_counts[tier]
    }
}

fn destroy_layouts(device: &Arc<DeviceShared>, layouts: &[vk::DescriptorSetLayout]) {
    for &layout in layouts {
        if layout != vk::DescriptorSetLayout::null() {
            unsafe { device.device.destroy_descriptor_set_layout(layout, None) };
        }
    }
}

impl Drop for VulkanRootSignature {
    fn drop(&mut self) {
        unsafe {
            for &layout in &self.set_layouts {
                if layout != vk::DescriptorSetLayout::null() {
                    self.device.device.destroy_descriptor_set_layout(layout, None);
                }
            }
            self.device.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}

impl std::fmt::Debug for VulkanRootSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanRootSignature")
            .field("pipeline_type", &self.pipeline_type)
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{PipelineReflection, ShaderReflection};

    fn resource(
        name: &str,
        descriptor_type: DescriptorType,
        stages: ShaderStageFlags,
        set: u32,
        binding: u32,
        size: u32,
    ) -> ShaderResource {
        ShaderResource {
            name: name.to_string(),
            used_stages: stages,
            dim: TextureDimension::Undefined,
            descriptor_type,
            set,
            binding,
            size,
        }
    }

    fn pipeline_reflection(stages: ShaderStageFlags, resources: Vec<ShaderResource>) -> PipelineReflection {
        PipelineReflection {
            stages,
            stage_reflections: vec![ShaderReflection { stage: stages, ..Default::default() }],
            resources,
            variables: Vec::new(),
        }
    }

    #[test]
    fn name_reused_at_other_binding_is_fatal() {
        let vert = pipeline_reflection(
            ShaderStageFlags::VERT,
            vec![resource("cam", DescriptorType::UNIFORM_BUFFER, ShaderStageFlags::VERT, 1, 0, 1)],
        );
        let frag = pipeline_reflection(
            ShaderStageFlags::FRAG,
            vec![resource("cam", DescriptorType::UNIFORM_BUFFER, ShaderStageFlags::FRAG, 2, 1, 1)],
        );
        assert!(collect_shader_resources(&[&vert, &frag]).is_err());
    }

    #[test]
    fn shared_resource_merges_stage_masks() {
        let vert = pipeline_reflection(
            ShaderStageFlags::VERT,
            vec![resource("cam", DescriptorType::UNIFORM_BUFFER, ShaderStageFlags::VERT, 1, 0, 1)],
        );
        let frag = pipeline_reflection(
            ShaderStageFlags::FRAG,
            vec![resource("cam", DescriptorType::UNIFORM_BUFFER, ShaderStageFlags::FRAG, 1, 0, 1)],
        );
        let (pipeline_type, resources) = collect_shader_resources(&[&vert, &frag]).unwrap();
        assert_eq!(pipeline_type, PipelineType::Graphics);
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].used_stages, ShaderStageFlags::VERT | ShaderStageFlags::FRAG);
    }

    #[test]
    fn compute_reflection_selects_compute_pipeline() {
        let comp = pipeline_reflection(ShaderStageFlags::COMP, vec![]);
        let (pipeline_type, _) = collect_shader_resources(&[&comp]).unwrap();
        assert_eq!(pipeline_type, PipelineType::Compute);
    }

    #[test]
    fn rootcbv_of_size_one_becomes_dynamic_uniform() {
        let resources = vec![resource(
            "rootcbv_cam",
            DescriptorType::UNIFORM_BUFFER,
            ShaderStageFlags::VERT,
            0,
            0,
            1,
        )];
        let plan =
            build_root_signature_plan(PipelineType::Graphics, &resources, &HashMap::new()).unwrap();
        let info = &plan.descriptors[0];
        assert!(info.is_root_descriptor);
        assert_eq!(info.vk_type, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC);
        assert_eq!(plan.tiers[0].dynamic_count, 1);
    }

    #[test]
    fn rootcbv_array_keeps_plain_uniform_type() {
        let resources = vec![resource(
            "rootcbv_lights",
            DescriptorType::UNIFORM_BUFFER,
            ShaderStageFlags::FRAG,
            0,
            0,
            4,
        )];
        let plan =
            build_root_signature_plan(PipelineType::Graphics, &resources, &HashMap::new()).unwrap();
        assert_eq!(plan.descriptors[0].vk_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert!(!plan.descriptors[0].is_root_descriptor);
    }

    #[test]
    fn empty_tier_between_used_tiers_becomes_a_hole() {
        let resources = vec![
            resource("per_none", DescriptorType::TEXTURE, ShaderStageFlags::FRAG, 0, 0, 1),
            resource("per_batch", DescriptorType::TEXTURE, ShaderStageFlags::FRAG, 2, 0, 1),
        ];
        let plan =
            build_root_signature_plan(PipelineType::Graphics, &resources, &HashMap::new()).unwrap();
        assert_eq!(plan.tiers[0].kind, TierKind::Bindings);
        assert_eq!(plan.tiers[1].kind, TierKind::Hole);
        assert_eq!(plan.tiers[2].kind, TierKind::Bindings);
        assert_eq!(plan.tiers[3].kind, TierKind::None);
    }

    #[test]
    fn root_constants_become_push_constant_ranges() {
        let resources = vec![resource(
            "draw_constants",
            DescriptorType::ROOT_CONSTANT,
            ShaderStageFlags::VERT | ShaderStageFlags::FRAG,
            u32::MAX,
            u32::MAX,
            32,
        )];
        let plan =
            build_root_signature_plan(PipelineType::Graphics, &resources, &HashMap::new()).unwrap();
        assert_eq!(plan.push_constants.len(), 1);
        assert_eq!(plan.push_constants[0].size, 32);
        assert!(plan.descriptors[0].is_root_descriptor);
        assert!(plan.tiers.iter().all(|t| t.bindings.is_empty()));
    }

    #[test]
    fn static_sampler_is_marked_and_combined_stays_updatable() {
        let resources = vec![
            resource("point_clamp", DescriptorType::SAMPLER, ShaderStageFlags::FRAG, 0, 0, 1),
            resource("albedo", DescriptorType::COMBINED_IMAGE_SAMPLER, ShaderStageFlags::FRAG, 0, 1, 1),
        ];
        let mut samplers = HashMap::new();
        samplers.insert("point_clamp".to_string(), vk::Sampler::null());
        samplers.insert("albedo".to_string(), vk::Sampler::null());
        let plan = build_root_signature_plan(PipelineType::Graphics, &resources, &samplers).unwrap();
        assert!(plan.descriptors[0].is_static_sampler);
        assert!(!plan.descriptors[1].is_static_sampler);
    }

    #[test]
    fn bindings_sort_by_type_then_binding_and_pool_sizes_tally() {
        let resources = vec![
            resource("tex_b", DescriptorType::TEXTURE, ShaderStageFlags::FRAG, 1, 3, 2),
            resource("cam", DescriptorType::UNIFORM_BUFFER, ShaderStageFlags::VERT, 1, 0, 1),
            resource("tex_a", DescriptorType::TEXTURE, ShaderStageFlags::FRAG, 1, 1, 1),
        ];
        let plan =
            build_root_signature_plan(PipelineType::Graphics, &resources, &HashMap::new()).unwrap();
        let tier = &plan.tiers[UpdateFrequency::PerFrame.index()];
        // Descending type order keeps buffers and images grouped; binding
        // ascends within a group.
        let order: Vec<u32> = tier.bindings.iter().map(|b| b.binding).collect();
        assert_eq!(order, vec![0, 1, 3]);
        assert!(tier
            .pool_sizes
            .iter()
            .any(|&(ty, count)| ty == vk::DescriptorType::SAMPLED_IMAGE && count == 3));
        assert!(tier
            .pool_sizes
            .iter()
            .any(|&(ty, count)| ty == vk::DescriptorType::UNIFORM_BUFFER && count == 1));
    }
}
