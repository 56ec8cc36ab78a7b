//! SPIR-V reflection: a small word-stream decoder extracting exactly what
//! pipeline assembly needs (entry point, execution modes, descriptor
//! bindings, block members, vertex inputs) without a full IR.

use std::collections::{HashMap, HashSet};

use num_traits::FromPrimitive;
use spirv_headers::{Decoration, Dim, ExecutionMode, Op, StorageClass};

use crate::reflection::{ShaderReflection, ShaderResource, ShaderVariable, VertexInput};
use crate::{DescriptorType, RhiError, ShaderStageFlags, TextureDimension};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// `OpTypeAccelerationStructureKHR` (aliases the NV opcode); matched by raw
/// value because header crates disagree on the canonical variant name.
const OP_TYPE_ACCELERATION_STRUCTURE: u16 = 5341;

#[derive(Debug, Clone)]
enum SpvType {
    Void,
    Bool,
    Int { width: u32 },
    Float { width: u32 },
    Vector { component: u32, count: u32 },
    Matrix { column: u32, columns: u32 },
    Image { dim: Dim, arrayed: bool, ms: bool, sampled: u32 },
    Sampler,
    SampledImage { image: u32 },
    Array { element: u32, length_id: u32 },
    RuntimeArray,
    Struct { members: Vec<u32> },
    Pointer { pointee: u32 },
    AccelerationStructure,
    Opaque,
}

#[derive(Debug, Default, Clone)]
struct Decorations {
    set: Option<u32>,
    binding: Option<u32>,
    location: Option<u32>,
    block: bool,
    buffer_block: bool,
    builtin: bool,
}

#[derive(Debug, Clone)]
struct Variable {
    pointer_type: u32,
    storage: StorageClass,
}

struct EntryPoint {
    execution_model: u32,
    name: String,
    interface: Vec<u32>,
}

/// Parsed reflection view over one SPIR-V module.
struct Module {
    names: HashMap<u32, String>,
    member_names: HashMap<(u32, u32), String>,
    decorations: HashMap<u32, Decorations>,
    member_offsets: HashMap<(u32, u32), u32>,
    array_strides: HashMap<u32, u32>,
    types: HashMap<u32, SpvType>,
    constants: HashMap<u32, u32>,
    variables: HashMap<u32, Variable>,
    entry_points: Vec<EntryPoint>,
    execution_modes: Vec<(u32, ExecutionMode, Vec<u32>)>,
    /// Ids of global variables referenced from function bodies or listed in
    /// an entry point's interface. Operand words inside functions are
    /// treated as ids, so literal collisions can only over-approximate use.
    used_ids: HashSet<u32>,
}

fn parse_string(words: &[u32]) -> (String, usize) {
    let mut bytes = Vec::new();
    let mut consumed = 0;
    'outer: for word in words {
        consumed += 1;
        for byte in word.to_le_bytes() {
            if byte == 0 {
                break 'outer;
            }
            bytes.push(byte);
        }
    }
    (String::from_utf8_lossy(&bytes).into_owned(), consumed)
}

impl Module {
    fn parse(byte_code: &[u8]) -> Result<Module, RhiError> {
        if byte_code.len() < 20 || byte_code.len() % 4 != 0 {
            return Err(RhiError::reflect("SPIR-V blob is truncated or not 4-byte aligned"));
        }
        let words: Vec<u32> = byte_code
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if words[0] != SPIRV_MAGIC {
            return Err(RhiError::reflect(format!("bad SPIR-V magic {:#010x}", words[0])));
        }

        let mut module = Module {
            names: HashMap::new(),
            member_names: HashMap::new(),
            decorations: HashMap::new(),
            member_offsets: HashMap::new(),
            array_strides: HashMap::new(),
            types: HashMap::new(),
            constants: HashMap::new(),
            variables: HashMap::new(),
            entry_points: Vec::new(),
            execution_modes: Vec::new(),
            used_ids: HashSet::new(),
        };

        let mut cursor = 5;
        let mut in_function = false;
        let mut function_operand_words: Vec<u32> = Vec::new();
        while cursor < words.len() {
            let first = words[cursor];
            let word_count = (first >> 16) as usize;
            let opcode = (first & 0xFFFF) as u16;
            if word_count == 0 || cursor + word_count > words.len() {
                return Err(RhiError::reflect("malformed SPIR-V instruction stream"));
            }
            let operands = &words[cursor + 1..cursor + word_count];

            if opcode == OP_TYPE_ACCELERATION_STRUCTURE {
                module.types.insert(operands[0], SpvType::AccelerationStructure);
                cursor += word_count;
                continue;
            }

            match Op::from_u16(opcode) {
                Some(Op::Name) => {
                    let (name, _) = parse_string(&operands[1..]);
                    module.names.insert(operands[0], name);
                }
                Some(Op::MemberName) => {
                    let (name, _) = parse_string(&operands[2..]);
                    module.member_names.insert((operands[0], operands[1]), name);
                }
                Some(Op::EntryPoint) => {
                    let (name, consumed) = parse_string(&operands[2..]);
                    let interface = operands[2 + consumed..].to_vec();
                    module.entry_points.push(EntryPoint {
                        execution_model: operands[0],
                        name,
                        interface,
                    });
                }
                Some(Op::ExecutionMode) => {
                    if let Some(mode) = ExecutionMode::from_u32(operands[1]) {
                        module.execution_modes.push((operands[0], mode, operands[2..].to_vec()));
                    }
                }
                Some(Op::Decorate) => match Decoration::from_u32(operands[1]) {
                    Some(Decoration::DescriptorSet) => {
                        module.decorations.entry(operands[0]).or_default().set = Some(operands[2]);
                    }
                    Some(Decoration::Binding) => {
                        module.decorations.entry(operands[0]).or_default().binding = Some(operands[2]);
                    }
                    Some(Decoration::Location) => {
                        module.decorations.entry(operands[0]).or_default().location = Some(operands[2]);
                    }
                    Some(Decoration::Block) => {
                        module.decorations.entry(operands[0]).or_default().block = true;
                    }
                    Some(Decoration::BufferBlock) => {
                        module.decorations.entry(operands[0]).or_default().buffer_block = true;
                    }
                    Some(Decoration::BuiltIn) => {
                        module.decorations.entry(operands[0]).or_default().builtin = true;
                    }
                    Some(Decoration::ArrayStride) => {
                        module.array_strides.insert(operands[0], operands[2]);
                    }
                    _ => {}
                },
                Some(Op::MemberDecorate) => match Decoration::from_u32(operands[2]) {
                    Some(Decoration::Offset) => {
                        module.member_offsets.insert((operands[0], operands[1]), operands[3]);
                    }
                    Some(Decoration::BuiltIn) => {
                        module.decorations.entry(operands[0]).or_default().builtin = true;
                    }
                    _ => {}
                },
                Some(Op::TypeVoid) => {
                    module.types.insert(operands[0], SpvType::Void);
                }
                Some(Op::TypeBool) => {
                    module.types.insert(operands[0], SpvType::Bool);
                }
                Some(Op::TypeInt) => {
                    module.types.insert(operands[0], SpvType::Int { width: operands[1] });
                }
                Some(Op::TypeFloat) => {
                    module.types.insert(operands[0], SpvType::Float { width: operands[1] });
                }
                Some(Op::TypeVector) => {
                    module
                        .types
                        .insert(operands[0], SpvType::Vector { component: operands[1], count: operands[2] });
                }
                Some(Op::TypeMatrix) => {
                    module
                        .types
                        .insert(operands[0], SpvType::Matrix { column: operands[1], columns: operands[2] });
                }
                Some(Op::TypeImage) => {
                    module.types.insert(
                        operands[0],
                        SpvType::Image {
                            dim: Dim::from_u32(operands[2]).unwrap_or(Dim::Dim2D),
                            arrayed: operands[4] != 0,
                            ms: operands[5] != 0,
                            sampled: operands[6],
                        },
                    );
                }
                Some(Op::TypeSampler) => {
                    module.types.insert(operands[0], SpvType::Sampler);
                }
                Some(Op::TypeSampledImage) => {
                    module.types.insert(operands[0], SpvType::SampledImage { image: operands[1] });
                }
                Some(Op::TypeArray) => {
                    module
                        .types
                        .insert(operands[0], SpvType::Array { element: operands[1], length_id: operands[2] });
                }
                Some(Op::TypeRuntimeArray) => {
                    module.types.insert(operands[0], SpvType::RuntimeArray);
                }
                Some(Op::TypeStruct) => {
                    module.types.insert(operands[0], SpvType::Struct { members: operands[1..].to_vec() });
                }
                Some(Op::TypePointer) => {
                    module.types.insert(operands[0], SpvType::Pointer { pointee: operands[2] });
                }
                Some(Op::TypeOpaque) => {
                    module.types.insert(operands[0], SpvType::Opaque);
                }
                Some(Op::Constant) | Some(Op::SpecConstant) => {
                    // Scalar value in the first literal word; wide constants
                    // keep only the low word, which suffices for lengths.
                    if operands.len() >= 3 {
                        module.constants.insert(operands[1], operands[2]);
                    }
                }
                Some(Op::Variable) => {
                    if !in_function {
                        let storage = StorageClass::from_u32(operands[2]).unwrap_or(StorageClass::Private);
                        module
                            .variables
                            .insert(operands[1], Variable { pointer_type: operands[0], storage });
                    }
                }
                Some(Op::Function) => in_function = true,
                Some(Op::FunctionEnd) => in_function = false,
                _ => {
                    if in_function {
                        function_operand_words.extend_from_slice(operands);
                    }
                }
            }
            cursor += word_count;
        }

        for word in function_operand_words {
            if module.variables.contains_key(&word) {
                module.used_ids.insert(word);
            }
        }
        for entry in &module.entry_points {
            for &id in &entry.interface {
                module.used_ids.insert(id);
            }
        }

        Ok(module)
    }

    fn type_size(&self, id: u32) -> u32 {
        match self.types.get(&id) {
            Some(SpvType::Int { width }) | Some(SpvType::Float { width }) => width / 8,
            Some(SpvType::Bool) => 4,
            Some(SpvType::Vector { component, count }) => self.type_size(*component) * count,
            Some(SpvType::Matrix { column, columns }) => self.type_size(*column) * columns,
            Some(SpvType::Array { element, length_id }) => {
                let length = self.constants.get(length_id).copied().unwrap_or(1);
                match self.array_strides.get(&id) {
                    Some(stride) => stride * length,
                    None => self.type_size(*element) * length,
                }
            }
            Some(SpvType::Struct { members }) => {
                let mut size = 0;
                for (index, &member) in members.iter().enumerate() {
                    let offset = self
                        .member_offsets
                        .get(&(id, index as u32))
                        .copied()
                        .unwrap_or(size);
                    size = size.max(offset + self.type_size(member));
                }
                size
            }
            _ => 0,
        }
    }

    /// Resolve a global variable down to (pointee type id, array element
    /// count). An outer array models binding arrays like `texture2D tex[4]`.
    fn pointee_of(&self, var: &Variable) -> (u32, u32) {
        let mut type_id = match self.types.get(&var.pointer_type) {
            Some(SpvType::Pointer { pointee }) => *pointee,
            _ => var.pointer_type,
        };
        let mut array_size = 1;
        if let Some(SpvType::Array { element, length_id }) = self.types.get(&type_id) {
            array_size = self.constants.get(length_id).copied().unwrap_or(1);
            type_id = *element;
        }
        (type_id, array_size)
    }

    fn resource_name(&self, id: u32, type_id: u32) -> String {
        match self.names.get(&id).filter(|n| !n.is_empty()) {
            Some(name) => name.clone(),
            None => self
                .names
                .get(&type_id)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("unnamed_{id}")),
        }
    }

    fn decoration(&self, id: u32) -> Decorations {
        self.decorations.get(&id).cloned().unwrap_or_default()
    }

    fn image_dimension(&self, type_id: u32) -> TextureDimension {
        match self.types.get(&type_id) {
            Some(SpvType::Image { dim, arrayed, ms, .. }) => to_texture_dimension(*dim, *arrayed, *ms),
            Some(SpvType::SampledImage { image }) => self.image_dimension(*image),
            _ => TextureDimension::Undefined,
        }
    }
}

fn to_texture_dimension(dim: Dim, arrayed: bool, ms: bool) -> TextureDimension {
    match dim {
        Dim::Dim1D => {
            if arrayed { TextureDimension::Dim1DArray } else { TextureDimension::Dim1D }
        }
        Dim::Dim2D => match (ms, arrayed) {
            (true, true) => TextureDimension::Dim2DMSArray,
            (true, false) => TextureDimension::Dim2DMS,
            (false, true) => TextureDimension::Dim2DArray,
            (false, false) => TextureDimension::Dim2D,
        },
        Dim::Dim3D => TextureDimension::Dim3D,
        Dim::DimCube => {
            if arrayed { TextureDimension::DimCubeArray } else { TextureDimension::DimCube }
        }
        _ => TextureDimension::Undefined,
    }
}

/// Shader stage implied by an entry point's execution model. Raytracing
/// models are matched by raw value range (KHR aliases the NV enumerants).
fn expected_stage(execution_model: u32) -> Option<ShaderStageFlags> {
    match execution_model {
        0 => Some(ShaderStageFlags::VERT),
        1 => Some(ShaderStageFlags::TESC),
        2 => Some(ShaderStageFlags::TESE),
        3 => Some(ShaderStageFlags::GEOM),
        4 => Some(ShaderStageFlags::FRAG),
        5 => Some(ShaderStageFlags::COMP),
        5313..=5318 => Some(ShaderStageFlags::RAYTRACING),
        _ => None,
    }
}

/// Reflect one shader stage out of a SPIR-V blob. `path` is used only for
/// diagnostics.
pub fn reflect_shader(
    byte_code: &[u8],
    stage: ShaderStageFlags,
    path: &str,
) -> Result<ShaderReflection, RhiError> {
    if !stage.is_single_stage() {
        return Err(RhiError::reflect("cannot reflect multiple shader stages at a time"));
    }
    let module = Module::parse(byte_code)?;
    let entry = module
        .entry_points
        .first()
        .ok_or_else(|| RhiError::reflect(format!("{path}: no entry point")))?;

    match expected_stage(entry.execution_model) {
        Some(expected) if expected == stage => {}
        Some(expected) => {
            return Err(RhiError::reflect(format!(
                "{path}: execution model implies {expected:?} but stage {stage:?} was requested"
            )))
        }
        None => return Err(RhiError::reflect(format!("{path}: unsupported execution model"))),
    }

    let mut reflection =
        ShaderReflection { stage, entry_point: entry.name.clone(), ..Default::default() };

    // Stable iteration keeps reflection output deterministic across runs.
    let mut variable_ids: Vec<u32> = module.variables.keys().copied().collect();
    variable_ids.sort_unstable();

    if stage == ShaderStageFlags::COMP {
        for (_, mode, literals) in &module.execution_modes {
            if *mode == ExecutionMode::LocalSize && literals.len() >= 3 {
                reflection.thread_group_size = [literals[0], literals[1], literals[2]];
            }
        }
    } else if stage == ShaderStageFlags::TESC {
        for (_, mode, literals) in &module.execution_modes {
            if *mode == ExecutionMode::OutputVertices && !literals.is_empty() {
                reflection.control_point_count = literals[0];
            }
        }
    } else if stage == ShaderStageFlags::VERT {
        let mut inputs: Vec<(u32, VertexInput)> = Vec::new();
        for &id in &variable_ids {
            let var = &module.variables[&id];
            if var.storage != StorageClass::Input || !module.used_ids.contains(&id) {
                continue;
            }
            let (type_id, _) = module.pointee_of(var);
            let deco = module.decoration(id);
            if deco.builtin || module.decoration(type_id).builtin {
                continue;
            }
            inputs.push((
                deco.location.unwrap_or(u32::MAX),
                VertexInput {
                    name: module.resource_name(id, type_id),
                    size: module.type_size(type_id),
                },
            ));
        }
        inputs.sort_by_key(|(location, _)| *location);
        reflection.vertex_inputs = inputs.into_iter().map(|(_, input)| input).collect();
    }

    for &id in &variable_ids {
        let var = &module.variables[&id];
        let (type_id, array_size) = module.pointee_of(var);
        let storage = var.storage;

        if !matches!(
            storage,
            StorageClass::Uniform | StorageClass::UniformConstant | StorageClass::StorageBuffer
                | StorageClass::PushConstant
        ) {
            continue;
        }

        if !module.used_ids.contains(&id) {
            log::warn!("{} is not used in {}", module.resource_name(id, type_id), path);
            continue;
        }

        let deco = module.decoration(id);
        let mut push = |descriptor_type: DescriptorType, dim: TextureDimension, size: u32| {
            let is_root_constant = descriptor_type == DescriptorType::ROOT_CONSTANT;
            reflection.resources.push(ShaderResource {
                name: module.resource_name(id, type_id),
                used_stages: stage,
                dim,
                descriptor_type,
                set: if is_root_constant { u32::MAX } else { deco.set.unwrap_or(0) },
                binding: if is_root_constant { u32::MAX } else { deco.binding.unwrap_or(0) },
                size,
            });
        };

        match storage {
            StorageClass::PushConstant => {
                push(
                    DescriptorType::ROOT_CONSTANT,
                    TextureDimension::Undefined,
                    module.type_size(type_id),
                );
                extract_members(&module, &mut reflection, type_id);
            }
            StorageClass::StorageBuffer => {
                push(DescriptorType::RW_BUFFER, TextureDimension::Undefined, array_size);
            }
            StorageClass::Uniform => {
                if module.decoration(type_id).buffer_block {
                    push(DescriptorType::RW_BUFFER, TextureDimension::Undefined, array_size);
                } else {
                    push(DescriptorType::UNIFORM_BUFFER, TextureDimension::Undefined, array_size);
                    extract_members(&module, &mut reflection, type_id);
                }
            }
            StorageClass::UniformConstant => match module.types.get(&type_id) {
                Some(SpvType::Image { dim, sampled, .. }) => {
                    let (descriptor_type, tex_dim) = match (*dim, *sampled) {
                        (Dim::DimBuffer, 2) => {
                            (DescriptorType::RW_TEXEL_BUFFER, TextureDimension::Undefined)
                        }
                        (Dim::DimBuffer, _) => {
                            (DescriptorType::TEXEL_BUFFER, TextureDimension::Undefined)
                        }
                        (Dim::DimSubpassData, _) => {
                            (DescriptorType::INPUT_ATTACHMENT, TextureDimension::Dim2D)
                        }
                        (_, 2) => (DescriptorType::RW_TEXTURE, module.image_dimension(type_id)),
                        _ => (DescriptorType::TEXTURE, module.image_dimension(type_id)),
                    };
                    push(descriptor_type, tex_dim, array_size);
                }
                Some(SpvType::SampledImage { .. }) => {
                    push(
                        DescriptorType::COMBINED_IMAGE_SAMPLER,
                        module.image_dimension(type_id),
                        array_size,
                    );
                }
                Some(SpvType::Sampler) => {
                    push(DescriptorType::SAMPLER, TextureDimension::Undefined, array_size);
                }
                Some(SpvType::AccelerationStructure) => {
                    push(DescriptorType::RAY_TRACING, TextureDimension::Undefined, array_size);
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(reflection)
}

fn extract_members(module: &Module, reflection: &mut ShaderReflection, struct_id: u32) {
    let parent_index = (reflection.resources.len() - 1) as u32;
    let parent_name = reflection.resources[parent_index as usize].name.clone();
    if let Some(SpvType::Struct { members }) = module.types.get(&struct_id) {
        for (index, &member) in members.iter().enumerate() {
            let name = module
                .member_names
                .get(&(struct_id, index as u32))
                .cloned()
                .unwrap_or_else(|| format!("{parent_name}_{index}"));
            reflection.variables.push(ShaderVariable {
                name,
                parent_index,
                offset: module.member_offsets.get(&(struct_id, index as u32)).copied().unwrap_or(0),
                size: module.type_size(member),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(op: u16, operands: &[u32]) -> Vec<u32> {
        let mut words = vec![((operands.len() as u32 + 1) << 16) | op as u32];
        words.extend_from_slice(operands);
        words
    }

    fn string_words(s: &str) -> Vec<u32> {
        let mut bytes: Vec<u8> = s.as_bytes().to_vec();
        bytes.push(0);
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    const OP_NAME: u16 = 5;
    const OP_MEMBER_NAME: u16 = 6;
    const OP_MEMORY_MODEL: u16 = 14;
    const OP_ENTRY_POINT: u16 = 15;
    const OP_EXECUTION_MODE: u16 = 16;
    const OP_CAPABILITY: u16 = 17;
    const OP_TYPE_VOID: u16 = 19;
    const OP_TYPE_FLOAT: u16 = 22;
    const OP_TYPE_VECTOR: u16 = 23;
    const OP_TYPE_IMAGE: u16 = 25;
    const OP_TYPE_SAMPLER: u16 = 26;
    const OP_TYPE_SAMPLED_IMAGE: u16 = 27;
    const OP_TYPE_STRUCT: u16 = 30;
    const OP_TYPE_POINTER: u16 = 32;
    const OP_TYPE_FUNCTION: u16 = 33;
    const OP_FUNCTION: u16 = 54;
    const OP_FUNCTION_END: u16 = 56;
    const OP_VARIABLE: u16 = 59;
    const OP_LOAD: u16 = 61;
    const OP_DECORATE: u16 = 71;
    const OP_MEMBER_DECORATE: u16 = 72;
    const OP_LABEL: u16 = 248;
    const OP_RETURN: u16 = 253;

    const EXEC_FRAGMENT: u32 = 4;
    const MODE_ORIGIN_UPPER_LEFT: u32 = 7;
    const SC_UNIFORM: u32 = 2;
    const SC_UNIFORM_CONSTANT: u32 = 0;
    const DECO_BLOCK: u32 = 2;
    const DECO_BINDING: u32 = 33;
    const DECO_SET: u32 = 34;
    const DECO_OFFSET: u32 = 35;
    const DIM_2D: u32 = 1;

    fn name_inst(id: u32, s: &str) -> Vec<u32> {
        let mut ops = vec![id];
        ops.extend(string_words(s));
        inst(OP_NAME, &ops)
    }

    /// Assembles a fragment shader with a uniform buffer `Camera` at
    /// (set=1, binding=0) carrying two vec4 members, a combined image
    /// sampler `albedo` at (set=0, binding=2), and an unused sampler at
    /// (set=0, binding=3).
    fn fragment_module() -> Vec<u8> {
        let (void_t, fn_t, float_t, vec4_t, cam_struct, cam_ptr, cam_var) = (1, 2, 3, 4, 5, 6, 7);
        let (image_t, sampled_image_t, tex_ptr, tex_var) = (8, 9, 10, 11);
        let (sampler_t, sampler_ptr, sampler_var) = (12, 13, 14);
        let (main_fn, label, loaded) = (15, 16, 17);
        let bound = 32;

        let mut words = vec![SPIRV_MAGIC, 0x0001_0000, 0, bound, 0];
        words.extend(inst(OP_CAPABILITY, &[1]));
        words.extend(inst(OP_MEMORY_MODEL, &[0, 1]));
        let mut entry = vec![EXEC_FRAGMENT, main_fn];
        entry.extend(string_words("main"));
        words.extend(inst(OP_ENTRY_POINT, &entry));
        words.extend(inst(OP_EXECUTION_MODE, &[main_fn, MODE_ORIGIN_UPPER_LEFT]));

        words.extend(name_inst(cam_var, "Camera"));
        words.extend(name_inst(tex_var, "albedo"));
        words.extend(name_inst(sampler_var, "unused_sampler"));
        let mut member_ops = vec![cam_struct, 0];
        member_ops.extend(string_words("view_proj"));
        words.extend(inst(OP_MEMBER_NAME, &member_ops));
        let mut member_ops = vec![cam_struct, 1];
        member_ops.extend(string_words("eye"));
        words.extend(inst(OP_MEMBER_NAME, &member_ops));

        words.extend(inst(OP_DECORATE, &[cam_struct, DECO_BLOCK]));
        words.extend(inst(OP_DECORATE, &[cam_var, DECO_SET, 1]));
        words.extend(inst(OP_DECORATE, &[cam_var, DECO_BINDING, 0]));
        words.extend(inst(OP_DECORATE, &[tex_var, DECO_SET, 0]));
        words.extend(inst(OP_DECORATE, &[tex_var, DECO_BINDING, 2]));
        words.extend(inst(OP_DECORATE, &[sampler_var, DECO_SET, 0]));
        words.extend(inst(OP_DECORATE, &[sampler_var, DECO_BINDING, 3]));
        words.extend(inst(OP_MEMBER_DECORATE, &[cam_struct, 0, DECO_OFFSET, 0]));
        words.extend(inst(OP_MEMBER_DECORATE, &[cam_struct, 1, DECO_OFFSET, 64]));

        words.extend(inst(OP_TYPE_VOID, &[void_t]));
        words.extend(inst(OP_TYPE_FUNCTION, &[fn_t, void_t]));
        words.extend(inst(OP_TYPE_FLOAT, &[float_t, 32]));
        words.extend(inst(OP_TYPE_VECTOR, &[vec4_t, float_t, 4]));
        words.extend(inst(OP_TYPE_STRUCT, &[cam_struct, vec4_t, vec4_t]));
        words.extend(inst(OP_TYPE_POINTER, &[cam_ptr, SC_UNIFORM, cam_struct]));
        words.extend(inst(OP_VARIABLE, &[cam_ptr, cam_var, SC_UNIFORM]));
        words.extend(inst(OP_TYPE_IMAGE, &[image_t, float_t, DIM_2D, 0, 0, 0, 1, 0]));
        words.extend(inst(OP_TYPE_SAMPLED_IMAGE, &[sampled_image_t, image_t]));
        words.extend(inst(OP_TYPE_POINTER, &[tex_ptr, SC_UNIFORM_CONSTANT, sampled_image_t]));
        words.extend(inst(OP_VARIABLE, &[tex_ptr, tex_var, SC_UNIFORM_CONSTANT]));
        words.extend(inst(OP_TYPE_SAMPLER, &[sampler_t]));
        words.extend(inst(OP_TYPE_POINTER, &[sampler_ptr, SC_UNIFORM_CONSTANT, sampler_t]));
        words.extend(inst(OP_VARIABLE, &[sampler_ptr, sampler_var, SC_UNIFORM_CONSTANT]));

        words.extend(inst(OP_FUNCTION, &[void_t, main_fn, 0, fn_t]));
        words.extend(inst(OP_LABEL, &[label]));
        words.extend(inst(OP_LOAD, &[sampled_image_t, loaded, tex_var]));
        words.extend(inst(OP_LOAD, &[cam_struct, loaded + 1, cam_var]));
        words.extend(inst(OP_RETURN, &[]));
        words.extend(inst(OP_FUNCTION_END, &[]));

        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn reflects_bindings_and_members() {
        let refl = reflect_shader(&fragment_module(), ShaderStageFlags::FRAG, "test.frag").unwrap();
        assert_eq!(refl.entry_point, "main");
        assert_eq!(refl.stage, ShaderStageFlags::FRAG);

        let cam = refl.resources.iter().find(|r| r.name == "Camera").unwrap();
        assert_eq!(cam.descriptor_type, DescriptorType::UNIFORM_BUFFER);
        assert_eq!((cam.set, cam.binding, cam.size), (1, 0, 1));

        let tex = refl.resources.iter().find(|r| r.name == "albedo").unwrap();
        assert_eq!(tex.descriptor_type, DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!((tex.set, tex.binding), (0, 2));
        assert_eq!(tex.dim, TextureDimension::Dim2D);

        // The unused sampler is skipped.
        assert!(refl.resources.iter().all(|r| r.name != "unused_sampler"));

        let view_proj = refl.variables.iter().find(|v| v.name == "view_proj").unwrap();
        assert_eq!((view_proj.offset, view_proj.size), (0, 16));
        let eye = refl.variables.iter().find(|v| v.name == "eye").unwrap();
        assert_eq!((eye.offset, eye.size), (64, 16));
        assert_eq!(refl.resources[eye.parent_index as usize].name, "Camera");
    }

    #[test]
    fn stage_mismatch_is_rejected() {
        assert!(reflect_shader(&fragment_module(), ShaderStageFlags::VERT, "test.frag").is_err());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut blob = fragment_module();
        blob[0] = 0xFF;
        assert!(reflect_shader(&blob, ShaderStageFlags::FRAG, "test.frag").is_err());
    }
}
