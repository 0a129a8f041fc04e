use crate::reflect::{LiveAttribute, Uniform};
use crate::spirv::SpirvModule;
use shadert_common::ShaderStage;

mod glslang;
mod live;

pub use self::glslang::{compile_spirv, create_compiler, TEXTURE_BINDING_OFFSET};

/// The GLSL compiler driving the front end.
pub use ::glslang::Compiler as GlslCompiler;

/// A shader compiled to SPIR-V, with the uniforms and attributes the front end
/// found to be statically used.
#[derive(Debug, Clone)]
pub struct SpirvCompilation {
    pub module: SpirvModule,
    pub stage: ShaderStage,
    pub uniforms: Vec<Uniform>,
    pub attributes: Vec<LiveAttribute>,
}

impl SpirvCompilation {
    /// The same compilation with its single entry point renamed.
    pub fn with_entry_point(
        self,
        name: &str,
    ) -> Result<SpirvCompilation, crate::error::ShaderCompileError> {
        Ok(SpirvCompilation {
            module: self.module.with_entry_point(name)?,
            ..self
        })
    }
}
