//! Statically used uniforms and attributes of a module, in the OpenGL reflection model.
use crate::reflect::{LiveAttribute, Uniform};
use rspirv::dr::{Instruction, Module, Operand};
use rspirv::spirv::{Decoration, Dim, Op, StorageClass, Word};
use shadert_common::map::{FastHashMap, FastHashSet};

const GL_FLOAT: u32 = 0x1406;
const GL_FLOAT_VEC2: u32 = 0x8B50;
const GL_INT: u32 = 0x1404;
const GL_INT_VEC2: u32 = 0x8B53;
const GL_UNSIGNED_INT: u32 = 0x1405;
const GL_UNSIGNED_INT_VEC2: u32 = 0x8DC6;
const GL_BOOL: u32 = 0x8B56;
const GL_BOOL_VEC2: u32 = 0x8B57;
const GL_DOUBLE: u32 = 0x140A;
const GL_DOUBLE_VEC2: u32 = 0x8FFC;
const GL_FLOAT_MAT2: u32 = 0x8B5A;
const GL_FLOAT_MAT2X3: u32 = 0x8B65;
const GL_FLOAT_MAT2X4: u32 = 0x8B66;
const GL_FLOAT_MAT3X2: u32 = 0x8B67;
const GL_FLOAT_MAT3X4: u32 = 0x8B68;
const GL_FLOAT_MAT4X2: u32 = 0x8B69;
const GL_FLOAT_MAT4X3: u32 = 0x8B6A;
const GL_SAMPLER_1D: u32 = 0x8B5D;
const GL_SAMPLER_2D: u32 = 0x8B5E;
const GL_SAMPLER_3D: u32 = 0x8B5F;
const GL_SAMPLER_CUBE: u32 = 0x8B60;
const GL_SAMPLER_2D_SHADOW: u32 = 0x8B62;
const GL_SAMPLER_2D_ARRAY: u32 = 0x8DC1;
const GL_IMAGE_2D: u32 = 0x904D;

/// The block relaxed Vulkan rules gather loose uniforms into.
const DEFAULT_UNIFORM_BLOCK: &str = "gl_DefaultUniformBlock";

/// Lookup tables over the global section of a module.
struct Globals<'a> {
    names: FastHashMap<Word, &'a str>,
    member_names: FastHashMap<(Word, u32), &'a str>,
    member_offsets: FastHashMap<(Word, u32), u32>,
    array_strides: FastHashMap<Word, u32>,
    decorations: FastHashMap<Word, Vec<Decoration>>,
    member_builtins: FastHashSet<Word>,
    locations: FastHashMap<Word, u32>,
    definitions: FastHashMap<Word, &'a Instruction>,
}

impl<'a> Globals<'a> {
    fn new(module: &'a Module) -> Self {
        let mut names = FastHashMap::default();
        let mut member_names = FastHashMap::default();
        for op in &module.debug_names {
            match (op.class.opcode, op.operands.as_slice()) {
                (Op::Name, [Operand::IdRef(target), Operand::LiteralString(name)]) => {
                    names.insert(*target, name.as_str());
                }
                (
                    Op::MemberName,
                    [
                        Operand::IdRef(target),
                        Operand::LiteralInt32(member),
                        Operand::LiteralString(name),
                    ],
                ) => {
                    member_names.insert((*target, *member), name.as_str());
                }
                _ => {}
            }
        }

        let mut member_offsets = FastHashMap::default();
        let mut array_strides = FastHashMap::default();
        let mut decorations: FastHashMap<Word, Vec<Decoration>> = FastHashMap::default();
        let mut member_builtins = FastHashSet::default();
        let mut locations = FastHashMap::default();
        for op in &module.annotations {
            match (op.class.opcode, op.operands.as_slice()) {
                (
                    Op::Decorate,
                    [Operand::IdRef(target), Operand::Decoration(decoration), rest @ ..],
                ) => {
                    decorations.entry(*target).or_default().push(*decoration);
                    match (decoration, rest) {
                        (Decoration::Location, [Operand::LiteralInt32(location)]) => {
                            locations.insert(*target, *location);
                        }
                        (Decoration::ArrayStride, [Operand::LiteralInt32(stride)]) => {
                            array_strides.insert(*target, *stride);
                        }
                        _ => {}
                    }
                }
                (
                    Op::MemberDecorate,
                    [
                        Operand::IdRef(target),
                        Operand::LiteralInt32(member),
                        Operand::Decoration(decoration),
                        rest @ ..,
                    ],
                ) => match (decoration, rest) {
                    (Decoration::Offset, [Operand::LiteralInt32(offset)]) => {
                        member_offsets.insert((*target, *member), *offset);
                    }
                    (Decoration::BuiltIn, _) => {
                        member_builtins.insert(*target);
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        let definitions = module
            .types_global_values
            .iter()
            .filter_map(|op| Some((op.result_id?, op)))
            .collect();

        Globals {
            names,
            member_names,
            member_offsets,
            array_strides,
            decorations,
            member_builtins,
            locations,
            definitions,
        }
    }

    fn has_decoration(&self, id: Word, decoration: Decoration) -> bool {
        self.decorations
            .get(&id)
            .is_some_and(|d| d.contains(&decoration))
    }

    fn name(&self, id: Word) -> String {
        self.names.get(&id).map(|s| s.to_string()).unwrap_or_default()
    }

    fn member_name(&self, ty: Word, member: u32) -> &str {
        self.member_names.get(&(ty, member)).copied().unwrap_or_default()
    }

    fn member_count(&self, ty: Word) -> u32 {
        self.definitions
            .get(&ty)
            .map_or(0, |def| def.operands.len() as u32)
    }

    fn id_operand(&self, id: Word, index: usize) -> Option<Word> {
        match self.definitions.get(&id)?.operands.get(index) {
            Some(&Operand::IdRef(id)) => Some(id),
            _ => None,
        }
    }

    fn literal_operand(&self, id: Word, index: usize) -> Option<u32> {
        match self.definitions.get(&id)?.operands.get(index) {
            Some(&Operand::LiteralInt32(value)) => Some(value),
            _ => None,
        }
    }

    fn opcode(&self, id: Word) -> Option<Op> {
        self.definitions.get(&id).map(|op| op.class.opcode)
    }

    /// The value of an integer constant.
    fn constant(&self, id: Word) -> Option<u32> {
        match self.opcode(id)? {
            Op::Constant => self.literal_operand(id, 0),
            _ => None,
        }
    }

    /// Strip arrays from a type, returning the element type and the element count.
    fn unwrap_array(&self, ty: Word) -> (Word, u32) {
        match self.opcode(ty) {
            Some(Op::TypeArray) => {
                let element = self.id_operand(ty, 0).unwrap_or(ty);
                let length = self
                    .id_operand(ty, 1)
                    .and_then(|c| self.constant(c))
                    .unwrap_or(1);
                let (element, inner) = self.unwrap_array(element);
                (element, length * inner)
            }
            Some(Op::TypeRuntimeArray) => {
                let element = self.id_operand(ty, 0).unwrap_or(ty);
                (element, 0)
            }
            _ => (ty, 1),
        }
    }

    /// The OpenGL type enumerant of a type, or zero if there is none.
    fn gl_type(&self, ty: Word) -> u32 {
        let Some(op) = self.opcode(ty) else {
            return 0;
        };
        match op {
            Op::TypeBool => GL_BOOL,
            Op::TypeFloat => match self.literal_operand(ty, 0) {
                Some(64) => GL_DOUBLE,
                _ => GL_FLOAT,
            },
            Op::TypeInt => match self.literal_operand(ty, 1) {
                Some(0) => GL_UNSIGNED_INT,
                _ => GL_INT,
            },
            Op::TypeVector => {
                let Some(count) = self.literal_operand(ty, 1).filter(|c| (2..=4).contains(c)) else {
                    return 0;
                };
                let component = self.id_operand(ty, 0).map_or(0, |c| self.gl_type(c));
                let base = match component {
                    GL_FLOAT => GL_FLOAT_VEC2,
                    GL_DOUBLE => GL_DOUBLE_VEC2,
                    GL_INT => GL_INT_VEC2,
                    GL_UNSIGNED_INT => GL_UNSIGNED_INT_VEC2,
                    GL_BOOL => GL_BOOL_VEC2,
                    _ => return 0,
                };
                base + count - 2
            }
            Op::TypeMatrix => {
                let columns = self.literal_operand(ty, 1).unwrap_or(0);
                let column = self.id_operand(ty, 0).unwrap_or(0);
                let rows = self.literal_operand(column, 1).unwrap_or(0);
                match (columns, rows) {
                    (2, 2) | (3, 3) | (4, 4) => GL_FLOAT_MAT2 + columns - 2,
                    (2, 3) => GL_FLOAT_MAT2X3,
                    (2, 4) => GL_FLOAT_MAT2X4,
                    (3, 2) => GL_FLOAT_MAT3X2,
                    (3, 4) => GL_FLOAT_MAT3X4,
                    (4, 2) => GL_FLOAT_MAT4X2,
                    (4, 3) => GL_FLOAT_MAT4X3,
                    _ => 0,
                }
            }
            Op::TypeSampledImage => self
                .id_operand(ty, 0)
                .map_or(0, |image| self.gl_sampler(image)),
            Op::TypeImage => match self.definitions.get(&ty).and_then(|op| op.operands.get(5)) {
                Some(Operand::LiteralInt32(2)) => GL_IMAGE_2D,
                _ => self.gl_sampler(ty),
            },
            _ => 0,
        }
    }

    /// Push a block member, expanding structs into one uniform per leaf member.
    ///
    /// Arrays of structs are expanded per element as `name[i].field`.
    fn push_member(&self, uniforms: &mut Vec<Uniform>, name: String, ty: Word, offset: i32) {
        let (element, array_size) = self.unwrap_array(ty);
        if self.opcode(element) != Some(Op::TypeStruct) {
            uniforms.push(Uniform {
                name,
                array_size,
                buffer_offset: offset,
                declared_type: self.gl_type(element),
            });
            return;
        }

        let instances: Vec<(String, i32)> = if element == ty {
            vec![(name, offset)]
        } else {
            let stride = self.array_strides.get(&ty).copied().unwrap_or(0) as i32;
            (0..array_size)
                .map(|i| (format!("{name}[{i}]"), offset + i as i32 * stride))
                .collect()
        };

        for (instance, base) in instances {
            for field in 0..self.member_count(element) {
                let Some(field_type) = self.id_operand(element, field as usize) else {
                    continue;
                };
                let field_offset = self
                    .member_offsets
                    .get(&(element, field))
                    .map_or(0, |&offset| offset as i32);
                self.push_member(
                    uniforms,
                    format!("{instance}.{}", self.member_name(element, field)),
                    field_type,
                    base + field_offset,
                );
            }
        }
    }

    fn gl_sampler(&self, image: Word) -> u32 {
        let Some(def) = self.definitions.get(&image) else {
            return 0;
        };
        let depth = matches!(def.operands.get(2), Some(Operand::LiteralInt32(1)));
        let arrayed = matches!(def.operands.get(3), Some(Operand::LiteralInt32(1)));
        match (def.operands.get(1), depth, arrayed) {
            (Some(Operand::Dim(Dim::Dim1D)), _, _) => GL_SAMPLER_1D,
            (Some(Operand::Dim(Dim::Dim2D)), true, false) => GL_SAMPLER_2D_SHADOW,
            (Some(Operand::Dim(Dim::Dim2D)), false, true) => GL_SAMPLER_2D_ARRAY,
            (Some(Operand::Dim(Dim::Dim2D)), _, _) => GL_SAMPLER_2D,
            (Some(Operand::Dim(Dim::Dim3D)), _, _) => GL_SAMPLER_3D,
            (Some(Operand::Dim(Dim::DimCube)), _, _) => GL_SAMPLER_CUBE,
            _ => 0,
        }
    }
}

fn id_ref(op: &Operand) -> Option<Word> {
    match *op {
        Operand::IdRef(id) => Some(id),
        _ => None,
    }
}

/// A global variable of the module.
struct Variable {
    id: Word,
    storage: StorageClass,
    pointee: Word,
}

fn variables(module: &Module, globals: &Globals) -> Vec<Variable> {
    module
        .types_global_values
        .iter()
        .filter(|op| op.class.opcode == Op::Variable)
        .filter_map(|op| {
            let Some(&Operand::StorageClass(storage)) = op.operands.first() else {
                return None;
            };
            let pointer = op.result_type?;
            Some(Variable {
                id: op.result_id?,
                storage,
                pointee: globals.id_operand(pointer, 1)?,
            })
        })
        .collect()
}

/// How the function bodies of a module use its global variables.
#[derive(Default)]
struct Usage {
    /// Variables referenced other than as the base of an access chain.
    whole: FastHashSet<Word>,
    /// Block members selected by access chains, by variable.
    members: FastHashMap<Word, FastHashSet<u32>>,
    /// Variables referenced as the base of an access chain with a non-constant member index.
    dynamic: FastHashSet<Word>,
}

impl Usage {
    fn new(module: &Module, globals: &Globals, blocks: &FastHashMap<Word, bool>) -> Self {
        let mut usage = Usage::default();
        let instructions = module
            .functions
            .iter()
            .flat_map(|f| f.blocks.iter())
            .flat_map(|b| b.instructions.iter());

        for inst in instructions {
            let chain = matches!(
                inst.class.opcode,
                Op::AccessChain | Op::InBoundsAccessChain | Op::PtrAccessChain
            );
            if chain {
                if let Some(&Operand::IdRef(base)) = inst.operands.first() {
                    if let Some(&is_array) = blocks.get(&base) {
                        let member_operand = if is_array { 2 } else { 1 };
                        match inst.operands.get(member_operand) {
                            Some(&Operand::IdRef(index)) => match globals.constant(index) {
                                Some(member) => {
                                    usage.members.entry(base).or_default().insert(member);
                                }
                                None => {
                                    usage.dynamic.insert(base);
                                }
                            },
                            _ => {
                                usage.whole.insert(base);
                            }
                        }
                        for op in &inst.operands[1..] {
                            if let Some(id) = id_ref(op) {
                                usage.whole.insert(id);
                            }
                        }
                        continue;
                    }
                }
            }

            for op in &inst.operands {
                if let Some(id) = id_ref(op) {
                    usage.whole.insert(id);
                }
            }
        }
        usage
    }

    fn is_used(&self, id: Word) -> bool {
        self.whole.contains(&id) || self.dynamic.contains(&id) || self.members.contains_key(&id)
    }

    fn member_used(&self, id: Word, member: u32) -> bool {
        self.whole.contains(&id)
            || self.dynamic.contains(&id)
            || self.members.get(&id).is_some_and(|m| m.contains(&member))
    }
}

/// Whether a variable with the given storage and pointee is a uniform block.
fn is_uniform_block(globals: &Globals, storage: StorageClass, block_type: Word) -> bool {
    match storage {
        StorageClass::Uniform => {
            globals.has_decoration(block_type, Decoration::Block)
                && !globals.has_decoration(block_type, Decoration::BufferBlock)
        }
        StorageClass::PushConstant => true,
        _ => false,
    }
}

/// Harvest the statically used uniforms and stage inputs of a module.
///
/// Block members are named `Block.member`, or `Block[i].member` for arrays of blocks.
/// Loose uniforms keep their own names. Storage buffers are not uniforms. Built-in
/// inputs are not attributes.
pub(crate) fn harvest(module: &Module) -> (Vec<Uniform>, Vec<LiveAttribute>) {
    let globals = Globals::new(module);
    let variables = variables(module, &globals);

    // block variable id -> whether the variable is an array of blocks
    let blocks: FastHashMap<Word, bool> = variables
        .iter()
        .filter_map(|var| {
            let (block_type, _) = globals.unwrap_array(var.pointee);
            is_uniform_block(&globals, var.storage, block_type)
                .then_some((var.id, block_type != var.pointee))
        })
        .collect();

    let usage = Usage::new(module, &globals, &blocks);

    let mut uniforms = Vec::new();
    let mut attributes = Vec::new();
    for var in &variables {
        if !usage.is_used(var.id) {
            continue;
        }

        match var.storage {
            StorageClass::UniformConstant => {
                let (element, array_size) = globals.unwrap_array(var.pointee);
                uniforms.push(Uniform {
                    name: globals.name(var.id),
                    array_size,
                    buffer_offset: -1,
                    declared_type: globals.gl_type(element),
                });
            }
            StorageClass::Uniform | StorageClass::PushConstant if blocks.contains_key(&var.id) => {
                let (block_type, block_count) = globals.unwrap_array(var.pointee);
                let block_name = globals.name(block_type);
                let prefixes: Vec<String> = if block_name == DEFAULT_UNIFORM_BLOCK {
                    vec![String::new()]
                } else if block_type != var.pointee {
                    (0..block_count)
                        .map(|i| format!("{block_name}[{i}]."))
                        .collect()
                } else {
                    vec![format!("{block_name}.")]
                };

                for member in 0..globals.member_count(block_type) {
                    if !usage.member_used(var.id, member) {
                        continue;
                    }
                    let Some(member_type) = globals.id_operand(block_type, member as usize) else {
                        continue;
                    };
                    let offset = globals
                        .member_offsets
                        .get(&(block_type, member))
                        .map_or(-1, |&offset| offset as i32);
                    for prefix in &prefixes {
                        globals.push_member(
                            &mut uniforms,
                            format!("{prefix}{}", globals.member_name(block_type, member)),
                            member_type,
                            offset,
                        );
                    }
                }
            }
            StorageClass::Input => {
                let (element, _) = globals.unwrap_array(var.pointee);
                if globals.has_decoration(var.id, Decoration::BuiltIn)
                    || globals.member_builtins.contains(&element)
                {
                    continue;
                }
                attributes.push(LiveAttribute {
                    name: globals.name(var.id),
                    location: globals.locations.get(&var.id).copied(),
                });
            }
            _ => {}
        }
    }

    (uniforms, attributes)
}
