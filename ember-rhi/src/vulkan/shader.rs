//! Shader programs: per-stage byte-code lookup, SPIR-V reflection, module
//! creation, and specialization constants.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;

use crate::reflection::{create_pipeline_reflection, PipelineReflection};
use crate::{shader_store, spirv, RhiError, ShaderDesc, ShaderStageFlags};

use super::device::DeviceShared;

pub struct VulkanShader {
    device: Arc<DeviceShared>,
    modules: [vk::ShaderModule; ShaderStageFlags::COUNT],
    entry_points: Vec<Option<CString>>,
    specialization_entries: Vec<vk::SpecializationMapEntry>,
    specialization_data: Vec<u8>,
    reflection: PipelineReflection,
    stages: ShaderStageFlags,
}

impl VulkanShader {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &ShaderDesc) -> Result<VulkanShader, RhiError> {
        if desc.shader_model > device.shader_model {
            return Err(RhiError::config(format!(
                "requested shader model {:?} exceeds the device's {:?}",
                desc.shader_model, device.shader_model
            )));
        }

        let mut modules = [vk::ShaderModule::null(); ShaderStageFlags::COUNT];
        let mut entry_points: Vec<Option<CString>> = vec![None; ShaderStageFlags::COUNT];
        let mut reflections = Vec::with_capacity(desc.stages.len());
        let mut stages = ShaderStageFlags::empty();

        // Undo partial creation if any stage fails.
        let destroy_modules = |modules: &[vk::ShaderModule]| {
            for &module in modules {
                if module != vk::ShaderModule::null() {
                    unsafe { device.device.destroy_shader_module(module, None) };
                }
            }
        };

        for stage_desc in &desc.stages {
            let stage = stage_desc.stage;
            if !stage.is_single_stage() {
                destroy_modules(&modules);
                return Err(RhiError::reflect(format!(
                    "shader stage desc must name exactly one stage, got {stage:?}"
                )));
            }

            let byte_code = match shader_store::get_spv_byte_code(&stage_desc.path) {
                Some(byte_code) => byte_code,
                None => {
                    destroy_modules(&modules);
                    return Err(RhiError::resource(format!(
                        "no SPIR-V byte code registered for {}",
                        stage_desc.path
                    )));
                }
            };

            let reflection = match spirv::reflect_shader(&byte_code, stage, &stage_desc.path) {
                Ok(reflection) => reflection,
                Err(e) => {
                    destroy_modules(&modules);
                    return Err(e);
                }
            };
            reflections.push(reflection);

            if byte_code.len() % 4 != 0 {
                destroy_modules(&modules);
                return Err(RhiError::reflect(format!("{}: SPIR-V is not 4-byte aligned", stage_desc.path)));
            }
            let code: Vec<u32> = byte_code
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
            let module = match unsafe { device.device.create_shader_module(&create_info, None) } {
                Ok(module) => module,
                Err(e) => {
                    destroy_modules(&modules);
                    return Err(RhiError::resource(format!(
                        "vkCreateShaderModule ({}): {e:?}",
                        stage_desc.path
                    )));
                }
            };

            let index = stage.index();
            modules[index] = module;
            entry_points[index] = Some(
                CString::new(stage_desc.entry_point.as_str())
                    .unwrap_or_else(|_| CString::new("main").unwrap()),
            );
            stages |= stage;
        }

        let reflection = match create_pipeline_reflection(reflections) {
            Ok(reflection) => reflection,
            Err(e) => {
                destroy_modules(&modules);
                return Err(e);
            }
        };

        // Specialization constants: one tightly packed blob, one map entry
        // per constant.
        let mut specialization_entries = Vec::with_capacity(desc.constants.len());
        let mut specialization_data = Vec::new();
        for constant in &desc.constants {
            specialization_entries.push(
                vk::SpecializationMapEntry::default()
                    .constant_id(constant.index)
                    .offset(specialization_data.len() as u32)
                    .size(constant.blob.len()),
            );
            specialization_data.extend_from_slice(&constant.blob);
        }

        Ok(VulkanShader {
            device: Arc::clone(device),
            modules,
            entry_points,
            specialization_entries,
            specialization_data,
            reflection,
            stages,
        })
    }

    pub fn stages(&self) -> ShaderStageFlags {
        self.stages
    }

    pub fn contains_stage(&self, stage: ShaderStageFlags) -> bool {
        self.stages.intersects(stage)
    }

    pub fn has_tessellation(&self) -> bool {
        self.stages.intersects(ShaderStageFlags::TESC | ShaderStageFlags::TESE)
    }

    pub fn reflection(&self) -> &PipelineReflection {
        &self.reflection
    }

    pub(crate) fn module(&self, stage: ShaderStageFlags) -> vk::ShaderModule {
        self.modules[stage.index()]
    }

    pub(crate) fn entry_point(&self, stage: ShaderStageFlags) -> Option<&std::ffi::CStr> {
        self.entry_points[stage.index()].as_deref()
    }

    pub(crate) fn specialization(&self) -> Option<(&[vk::SpecializationMapEntry], &[u8])> {
        if self.specialization_entries.is_empty() {
            None
        } else {
            Some((&self.specialization_entries, &self.specialization_data))
        }
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        for module in self.modules {
            if module != vk::ShaderModule::null() {
                unsafe { self.device.device.destroy_shader_module(module, None) };
            }
        }
    }
}

impl std::fmt::Debug for VulkanShader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanShader").field("stages", &self.stages).finish()
    }
}
