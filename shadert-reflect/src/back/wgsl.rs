use crate::back::targets::WGSL;
use crate::back::{CompileShader, CompilerBackend, FromCompilation, ShaderCompilerOutput};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::cross::GlslReflect;
use crate::reflect::{ReflectData, ReflectShader};
use crate::spirv::SpirvModule;
use naga::back::wgsl::WriterFlags;
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// WGSL output via naga's SPIR-V front end.
pub struct NagaWgsl {
    // naga has no reflection of its own that matches the other targets.
    pub(crate) reflect: GlslReflect,
    pub(crate) module: SpirvModule,
}

impl FromCompilation<SpirvCompilation> for WGSL {
    type Target = WGSL;
    type Options = ();
    type Context = ();
    type Output = NagaWgsl;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        Ok(CompilerBackend {
            backend: NagaWgsl {
                reflect: GlslReflect::try_from(&compile)?,
                module: compile.module,
            },
        })
    }
}

impl ReflectShader for NagaWgsl {
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError> {
        self.reflect.reflect()
    }
}

impl CompileShader<WGSL> for NagaWgsl {
    type Options = ();
    type Context = ();

    fn compile(
        self,
        _options: Self::Options,
    ) -> Result<ShaderCompilerOutput<String, Self::Context>, ShaderCompileError> {
        let module = naga::front::spv::parse_u8_slice(
            &self.module.to_le_bytes(),
            &naga::front::spv::Options {
                adjust_coordinate_space: false,
                ..Default::default()
            },
        )?;

        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        let info = validator.validate(&module)?;
        let wgsl = naga::back::wgsl::write_string(&module, &info, WriterFlags::EXPLICIT_TYPES)?;

        Ok(ShaderCompilerOutput {
            artifact: wgsl,
            context: (),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::back::targets::WGSL;
    use crate::back::{CompileShader, FromCompilation};
    use crate::front::{compile_spirv, create_compiler};
    use shadert_common::ShaderStage;
    use shadert_preprocess::ShaderSource;

    #[test]
    pub fn writes_wgsl_compute() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/local_size.comp", &[]).unwrap();
        let spirv = compile_spirv(&compiler, &source, ShaderStage::Compute, false).unwrap();

        let wgsl = WGSL::from_compilation(spirv).unwrap();
        let compiled = wgsl.compile(()).unwrap();
        assert!(compiled.artifact.contains("@compute"));
        assert!(compiled.artifact.contains("@workgroup_size(8, 4, 1)"));
    }
}
