use crate::error::ShaderReflectError;
use crate::reflect::Resource;
use crate::spirv::SpirvModule;
use rspirv::dr::{Module, Operand};
use rspirv::spirv::{Decoration, ExecutionMode, Op, StorageClass, Word};
use shadert_common::map::FastHashMap;

/// Interface information that spirv-cross does not report.
#[derive(Debug, Default)]
pub struct InterfaceScan {
    locations: FastHashMap<Word, u32>,
    pub acceleration_structures: Vec<Resource>,
    pub compute_dim: [u32; 3],
}

impl InterfaceScan {
    pub fn new(module: &SpirvModule) -> Result<Self, ShaderReflectError> {
        let module = module.load()?;
        Ok(InterfaceScan {
            locations: find_locations(&module),
            acceleration_structures: find_acceleration_structures(&module),
            compute_dim: find_local_size(&module),
        })
    }

    /// The `Location` decoration of the variable with the given result id.
    pub fn location(&self, id: Word) -> Option<u32> {
        self.locations.get(&id).copied()
    }
}

fn find_locations(module: &Module) -> FastHashMap<Word, u32> {
    module
        .annotations
        .iter()
        .filter_map(|op| {
            if op.class.opcode != Op::Decorate {
                return None;
            }

            let Some(Operand::Decoration(Decoration::Location)) = op.operands.get(1) else {
                return None;
            };

            let Some(&Operand::IdRef(target)) = op.operands.first() else {
                return None;
            };

            let Some(&Operand::LiteralInt32(location)) = op.operands.get(2) else {
                return None;
            };
            Some((target, location))
        })
        .collect()
}

fn find_names(module: &Module) -> FastHashMap<Word, &str> {
    module
        .debug_names
        .iter()
        .filter(|op| op.class.opcode == Op::Name)
        .filter_map(|op| match (op.operands.first(), op.operands.get(1)) {
            (Some(&Operand::IdRef(target)), Some(Operand::LiteralString(name))) => {
                Some((target, name.as_str()))
            }
            _ => None,
        })
        .collect()
}

fn find_acceleration_structures(module: &Module) -> Vec<Resource> {
    let types: FastHashMap<Word, Op> = module
        .types_global_values
        .iter()
        .filter_map(|op| Some((op.result_id?, op.class.opcode)))
        .collect();

    // pointer id -> pointee id
    let pointers: FastHashMap<Word, Word> = module
        .types_global_values
        .iter()
        .filter(|op| op.class.opcode == Op::TypePointer)
        .filter_map(|op| match (op.result_id, op.operands.get(1)) {
            (Some(id), Some(&Operand::IdRef(pointee))) => Some((id, pointee)),
            _ => None,
        })
        .collect();

    let names = find_names(module);
    let is_acceleration_structure = |ty: Word| {
        types
            .get(&ty)
            .is_some_and(|&op| op == Op::TypeAccelerationStructureKHR)
    };

    module
        .types_global_values
        .iter()
        .filter(|op| {
            op.class.opcode == Op::Variable
                && op.operands.first()
                    == Some(&Operand::StorageClass(StorageClass::UniformConstant))
        })
        .filter_map(|op| {
            let id = op.result_id?;
            let type_id = op.result_type?;
            let base_type_id = *pointers.get(&type_id)?;
            is_acceleration_structure(base_type_id).then(|| Resource {
                id,
                type_id,
                base_type_id,
                name: names.get(&id).map(|s| s.to_string()).unwrap_or_default(),
                location: None,
            })
        })
        .collect()
}

fn find_local_size(module: &Module) -> [u32; 3] {
    module
        .execution_modes
        .iter()
        .find_map(|op| {
            if op.class.opcode != Op::ExecutionMode {
                return None;
            }
            let Some(Operand::ExecutionMode(ExecutionMode::LocalSize)) = op.operands.get(1) else {
                return None;
            };
            match op.operands.get(2..5)? {
                [Operand::LiteralInt32(x), Operand::LiteralInt32(y), Operand::LiteralInt32(z)] => {
                    Some([*x, *y, *z])
                }
                _ => None,
            }
        })
        .unwrap_or([0, 0, 0])
}
