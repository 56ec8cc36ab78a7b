//! Shader reflection data model and the per-stage → per-pipeline merge.

use crate::{DescriptorType, RhiError, ShaderStageFlags, TextureDimension};

/// A vertex-stage input attribute and its byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub size: u32,
}

/// One shader-visible resource (binding) discovered by reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub name: String,
    pub used_stages: ShaderStageFlags,
    pub dim: TextureDimension,
    pub descriptor_type: DescriptorType,
    pub set: u32,
    pub binding: u32,
    /// Array element count; byte size for root constants.
    pub size: u32,
}

impl ShaderResource {
    /// Two reflected resources refer to the same binding when name, set,
    /// binding, and type all agree (stage masks may differ).
    pub fn same_resource(&self, other: &ShaderResource) -> bool {
        self.name == other.name
            && self.set == other.set
            && self.binding == other.binding
            && self.descriptor_type == other.descriptor_type
    }
}

/// A struct member of a uniform buffer or root constant block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariable {
    pub name: String,
    /// Index of the owning resource in the surrounding reflection.
    pub parent_index: u32,
    pub offset: u32,
    pub size: u32,
}

impl ShaderVariable {
    pub fn same_variable(&self, other: &ShaderVariable) -> bool {
        self.name == other.name && self.offset == other.offset && self.size == other.size
    }
}

/// Reflection of a single shader stage.
#[derive(Debug, Clone, Default)]
pub struct ShaderReflection {
    pub stage: ShaderStageFlags,
    pub entry_point: String,
    pub vertex_inputs: Vec<VertexInput>,
    pub resources: Vec<ShaderResource>,
    pub variables: Vec<ShaderVariable>,
    /// Compute local work-group size.
    pub thread_group_size: [u32; 3],
    /// Tessellation-control output vertex count.
    pub control_point_count: u32,
}

/// Union of the per-stage reflections contributing to one pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineReflection {
    pub stages: ShaderStageFlags,
    pub stage_reflections: Vec<ShaderReflection>,
    pub resources: Vec<ShaderResource>,
    pub variables: Vec<ShaderVariable>,
}

impl PipelineReflection {
    pub fn stage_reflection(&self, stage: ShaderStageFlags) -> Option<&ShaderReflection> {
        self.stage_reflections.iter().find(|r| r.stage == stage)
    }
}

/// Merge per-stage reflections into one pipeline reflection: OR stage masks,
/// unify resources by (name, set, binding, type), unify variables by
/// (name, offset, size), and rewire variable parents into the merged
/// resource list.
pub fn create_pipeline_reflection(
    reflections: Vec<ShaderReflection>,
) -> Result<PipelineReflection, RhiError> {
    if reflections.is_empty() {
        return Err(RhiError::reflect("no shader reflections to merge"));
    }

    let mut stages = ShaderStageFlags::empty();
    for refl in &reflections {
        if !refl.stage.is_single_stage() {
            return Err(RhiError::reflect(format!(
                "reflection must cover exactly one stage, got {:?}",
                refl.stage
            )));
        }
        if stages.intersects(refl.stage) {
            return Err(RhiError::reflect(format!(
                "duplicate shader stage {:?} in reflection array",
                refl.stage
            )));
        }
        stages |= refl.stage;
    }

    let mut resources: Vec<ShaderResource> = Vec::new();
    let mut variables: Vec<ShaderVariable> = Vec::new();
    // Parent resource of each merged variable, kept for index rewiring once
    // the merged resource list is final.
    let mut variable_parents: Vec<ShaderResource> = Vec::new();

    for refl in &reflections {
        for res in &refl.resources {
            match resources.iter_mut().find(|existing| existing.same_resource(res)) {
                Some(existing) => existing.used_stages |= res.used_stages,
                None => resources.push(res.clone()),
            }
        }

        for var in &refl.variables {
            if !variables.iter().any(|existing| existing.same_variable(var)) {
                variable_parents.push(refl.resources[var.parent_index as usize].clone());
                variables.push(var.clone());
            }
        }
    }

    for (var, parent) in variables.iter_mut().zip(&variable_parents) {
        if let Some(index) = resources.iter().position(|r| r.same_resource(parent)) {
            var.parent_index = index as u32;
        }
    }

    Ok(PipelineReflection { stages, stage_reflections: reflections, resources, variables })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, stage: ShaderStageFlags, set: u32, binding: u32) -> ShaderResource {
        ShaderResource {
            name: name.to_string(),
            used_stages: stage,
            dim: TextureDimension::Undefined,
            descriptor_type: DescriptorType::UNIFORM_BUFFER,
            set,
            binding,
            size: 1,
        }
    }

    fn stage_reflection(stage: ShaderStageFlags, resources: Vec<ShaderResource>) -> ShaderReflection {
        ShaderReflection { stage, entry_point: "main".to_string(), resources, ..Default::default() }
    }

    #[test]
    fn merging_single_reflection_is_identity() {
        let refl = stage_reflection(
            ShaderStageFlags::VERT,
            vec![resource("cam", ShaderStageFlags::VERT, 1, 0)],
        );
        let merged = create_pipeline_reflection(vec![refl.clone()]).unwrap();
        assert_eq!(merged.stages, ShaderStageFlags::VERT);
        assert_eq!(merged.resources, refl.resources);
    }

    #[test]
    fn shared_resource_ors_stage_masks() {
        let vert = stage_reflection(
            ShaderStageFlags::VERT,
            vec![resource("cam", ShaderStageFlags::VERT, 1, 0)],
        );
        let frag = stage_reflection(
            ShaderStageFlags::FRAG,
            vec![resource("cam", ShaderStageFlags::FRAG, 1, 0)],
        );
        let merged = create_pipeline_reflection(vec![vert, frag]).unwrap();
        assert_eq!(merged.resources.len(), 1);
        assert_eq!(merged.resources[0].used_stages, ShaderStageFlags::VERT | ShaderStageFlags::FRAG);
    }

    #[test]
    fn distinct_resources_are_kept_apart() {
        let vert = stage_reflection(
            ShaderStageFlags::VERT,
            vec![resource("cam", ShaderStageFlags::VERT, 1, 0)],
        );
        let frag = stage_reflection(
            ShaderStageFlags::FRAG,
            vec![resource("material", ShaderStageFlags::FRAG, 2, 0)],
        );
        let merged = create_pipeline_reflection(vec![vert, frag]).unwrap();
        assert_eq!(merged.resources.len(), 2);
    }

    #[test]
    fn duplicate_stage_is_rejected() {
        let a = stage_reflection(ShaderStageFlags::VERT, vec![]);
        let b = stage_reflection(ShaderStageFlags::VERT, vec![]);
        assert!(create_pipeline_reflection(vec![a, b]).is_err());
    }

    #[test]
    fn variable_parents_are_rewired_into_merged_list() {
        let mut vert = stage_reflection(
            ShaderStageFlags::VERT,
            vec![
                resource("cam", ShaderStageFlags::VERT, 1, 0),
                resource("object", ShaderStageFlags::VERT, 3, 0),
            ],
        );
        vert.variables.push(ShaderVariable {
            name: "world".to_string(),
            parent_index: 1,
            offset: 0,
            size: 64,
        });
        let frag = stage_reflection(
            ShaderStageFlags::FRAG,
            vec![resource("cam", ShaderStageFlags::FRAG, 1, 0)],
        );
        let merged = create_pipeline_reflection(vec![vert, frag]).unwrap();
        let var = &merged.variables[0];
        assert_eq!(merged.resources[var.parent_index as usize].name, "object");
    }
}
