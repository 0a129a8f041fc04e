use crate::back::targets::SPIRV;
use crate::back::{CompileShader, CompilerBackend, FromCompilation, ShaderCompilerOutput};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::cross::GlslReflect;
use crate::reflect::{ReflectData, ReflectShader};
use crate::spirv::SpirvModule;

/// The Vulkan passthrough. The module is written out as is, and reflected through a
/// GLSL decompiler that never emits source.
pub struct WriteSpirV {
    pub(crate) reflect: GlslReflect,
    pub(crate) module: SpirvModule,
}

impl FromCompilation<SpirvCompilation> for SPIRV {
    type Target = SPIRV;
    type Options = ();
    type Context = ();
    type Output = WriteSpirV;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        let reflect = GlslReflect::try_from(&compile)?;
        Ok(CompilerBackend {
            backend: WriteSpirV {
                reflect,
                module: compile.module,
            },
        })
    }
}

impl ReflectShader for WriteSpirV {
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError> {
        self.reflect.reflect()
    }
}

impl CompileShader<SPIRV> for WriteSpirV {
    type Options = ();
    type Context = ();

    fn compile(
        self,
        _options: Self::Options,
    ) -> Result<ShaderCompilerOutput<Vec<u32>, Self::Context>, ShaderCompileError> {
        Ok(ShaderCompilerOutput {
            artifact: self.module.into_words(),
            context: (),
        })
    }
}
