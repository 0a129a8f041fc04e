use crate::error::{ShaderCompileError, ShaderReflectError};
use rspirv::binary::Assemble;
use rspirv::dr::{Instruction, Module, Operand};
use rspirv::spirv::{ExecutionModel, Op};
use shadert_common::ShaderStage;

/// An owned SPIR-V module.
///
/// Every transformation returns a new module instead of editing the words in place.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SpirvModule(Vec<u32>);

/// An entry point declared by a module.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryPoint {
    pub name: String,
    pub execution_model: ExecutionModel,
    /// The number of interface variables listed by the entry point.
    pub interface_count: usize,
}

impl SpirvModule {
    pub fn new(words: Vec<u32>) -> Self {
        SpirvModule(words)
    }

    /// Read a module from little-endian bytes. Trailing bytes that do not form a
    /// whole word are ignored.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        SpirvModule(
            bytes
                .chunks_exact(4)
                .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
                .collect(),
        )
    }

    pub fn as_words(&self) -> &[u32] {
        &self.0
    }

    pub fn into_words(self) -> Vec<u32> {
        self.0
    }

    /// The module serialized as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Parse the module into an instruction tree.
    pub fn load(&self) -> Result<Module, ShaderReflectError> {
        Ok(rspirv::dr::load_words(&self.0)?)
    }

    pub(crate) fn from_module(module: &Module) -> Self {
        SpirvModule(module.assemble())
    }

    /// The entry points declared by the module.
    pub fn entry_points(&self) -> Result<Vec<EntryPoint>, ShaderReflectError> {
        let module = self.load()?;
        Ok(module
            .entry_points
            .iter()
            .filter_map(|inst| {
                let Some(&Operand::ExecutionModel(execution_model)) = inst.operands.first() else {
                    return None;
                };
                let Some(Operand::LiteralString(name)) = inst.operands.get(2) else {
                    return None;
                };
                Some(EntryPoint {
                    name: name.clone(),
                    execution_model,
                    interface_count: inst.operands.len().saturating_sub(3),
                })
            })
            .collect())
    }

    /// Rename the single entry point of the module.
    ///
    /// Debug names referring to the entry point function follow the rename.
    pub fn with_entry_point(&self, name: &str) -> Result<SpirvModule, ShaderCompileError> {
        let mut module = self.load()?;
        if module.entry_points.len() != 1 {
            return Err(ShaderCompileError::InvalidEntryPointCount(
                module.entry_points.len(),
            ));
        }

        let entry = &mut module.entry_points[0];
        let Some(&Operand::IdRef(function)) = entry.operands.get(1) else {
            return Err(ShaderCompileError::InvalidEntryPointCount(0));
        };
        let Some(Operand::LiteralString(old)) = entry.operands.get_mut(2) else {
            return Err(ShaderCompileError::InvalidEntryPointCount(0));
        };
        if old.as_str() == name {
            return Ok(self.clone());
        }
        *old = name.to_string();

        for debug_name in module
            .debug_names
            .iter_mut()
            .filter(|inst| inst.class.opcode == Op::Name)
        {
            if debug_name.operands.first() == Some(&Operand::IdRef(function)) {
                debug_name.operands[1] = Operand::LiteralString(name.to_string());
            }
        }

        Ok(SpirvModule::from_module(&module))
    }

    /// Remove source-level debug information.
    ///
    /// Source text, file names, line information and processing records are dropped.
    /// Identifier names are kept.
    pub fn strip_debug_info(&self) -> Result<SpirvModule, ShaderReflectError> {
        let mut module = self.load()?;
        module.debug_string_source.clear();
        module.debug_module_processed.clear();
        module.types_global_values.retain(|inst| !is_line_info(inst));
        for function in module.functions.iter_mut() {
            for block in function.blocks.iter_mut() {
                block.instructions.retain(|inst| !is_line_info(inst));
            }
        }
        Ok(SpirvModule::from_module(&module))
    }

    /// Whether the module carries any source-level debug information.
    pub fn has_debug_info(&self) -> Result<bool, ShaderReflectError> {
        let module = self.load()?;
        Ok(!module.debug_string_source.is_empty()
            || !module.debug_module_processed.is_empty()
            || module.types_global_values.iter().any(is_line_info)
            || module
                .functions
                .iter()
                .flat_map(|f| f.blocks.iter())
                .flat_map(|b| b.instructions.iter())
                .any(is_line_info))
    }
}

fn is_line_info(inst: &Instruction) -> bool {
    matches!(inst.class.opcode, Op::Line | Op::NoLine)
}

impl AsRef<[u32]> for SpirvModule {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for SpirvModule {
    fn from(words: Vec<u32>) -> Self {
        SpirvModule(words)
    }
}

/// The execution model a shader stage is compiled to.
pub const fn execution_model(stage: ShaderStage) -> ExecutionModel {
    match stage {
        ShaderStage::Vertex => ExecutionModel::Vertex,
        ShaderStage::Fragment => ExecutionModel::Fragment,
        ShaderStage::TessControl => ExecutionModel::TessellationControl,
        ShaderStage::TessEval => ExecutionModel::TessellationEvaluation,
        ShaderStage::Geometry => ExecutionModel::Geometry,
        ShaderStage::Compute => ExecutionModel::GLCompute,
    }
}

/// The shader stage of an execution model.
pub fn shader_stage(model: ExecutionModel) -> Result<ShaderStage, ShaderReflectError> {
    Ok(match model {
        ExecutionModel::Vertex => ShaderStage::Vertex,
        ExecutionModel::Fragment => ShaderStage::Fragment,
        ExecutionModel::TessellationControl => ShaderStage::TessControl,
        ExecutionModel::TessellationEvaluation => ShaderStage::TessEval,
        ExecutionModel::Geometry => ShaderStage::Geometry,
        ExecutionModel::GLCompute => ShaderStage::Compute,
        other => {
            return Err(ShaderReflectError::UnmappedExecutionModel(format!(
                "{other:?}"
            )))
        }
    })
}

#[cfg(test)]
mod test {
    use crate::spirv::{execution_model, shader_stage, SpirvModule};
    use rspirv::spirv::ExecutionModel;
    use shadert_common::ShaderStage;

    #[test]
    pub fn stages_map_to_execution_models() {
        for stage in ShaderStage::ALL {
            assert_eq!(stage, shader_stage(execution_model(stage)).unwrap());
        }
        assert!(shader_stage(ExecutionModel::Kernel).is_err());
    }

    #[test]
    pub fn le_bytes_round_trip() {
        let module = SpirvModule::new(vec![0x0723_0203, 0x0001_0300]);
        assert_eq!(&module.to_le_bytes()[..4], &[0x03, 0x02, 0x23, 0x07]);
        assert_eq!(SpirvModule::from_le_bytes(&module.to_le_bytes()), module);
    }

    #[test]
    pub fn garbage_does_not_parse() {
        let module = SpirvModule::new(vec![0xdead_beef, 1, 2]);
        assert!(module.load().is_err());
    }
}
