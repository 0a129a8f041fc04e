use crate::back::targets::{GLSL, HLSL};
use crate::back::{CompileShader, ShaderCompilerOutput};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::rspirv::InterfaceScan;
use crate::reflect::{sort_by_location, ReflectData, ReflectShader, Resource};
use crate::spirv::SpirvModule;
use shadert_common::ShaderStage;
use spirv_cross::spirv::{Ast, Module};
use spirv_cross::{glsl, hlsl};

/// MSL compilation via spirv-cross.
pub mod msl;

/// A SPIR-V module parsed by spirv-cross for the target `T`.
pub struct CrossReflect<T>
where
    T: spirv_cross::spirv::Target,
{
    pub(crate) ast: Ast<T>,
    pub(crate) module: SpirvModule,
    pub(crate) stage: ShaderStage,
}

pub type GlslReflect = CrossReflect<glsl::Target>;
pub type HlslReflect = CrossReflect<hlsl::Target>;

impl<T> TryFrom<&SpirvCompilation> for CrossReflect<T>
where
    T: spirv_cross::spirv::Target,
    Ast<T>: spirv_cross::spirv::Compile<T>,
    Ast<T>: spirv_cross::spirv::Parse<T>,
{
    type Error = ShaderReflectError;

    fn try_from(value: &SpirvCompilation) -> Result<Self, Self::Error> {
        let module = Module::from_words(value.module.as_words());
        let ast = Ast::parse(&module)?;

        Ok(CrossReflect {
            ast,
            module: value.module.clone(),
            stage: value.stage,
        })
    }
}

fn resources(list: Vec<spirv_cross::spirv::Resource>) -> Vec<Resource> {
    list.into_iter()
        .map(|r| Resource {
            id: r.id,
            type_id: r.type_id,
            base_type_id: r.base_type_id,
            name: r.name,
            location: None,
        })
        .collect()
}

fn interface(list: Vec<spirv_cross::spirv::Resource>, scan: &InterfaceScan) -> Vec<Resource> {
    let mut interface = resources(list);
    for variable in interface.iter_mut() {
        variable.location = scan.location(variable.id);
    }
    sort_by_location(&mut interface);
    interface
}

impl<T> ReflectShader for CrossReflect<T>
where
    T: spirv_cross::spirv::Target,
    Ast<T>: spirv_cross::spirv::Compile<T>,
    Ast<T>: spirv_cross::spirv::Parse<T>,
{
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError> {
        let res = self.ast.get_shader_resources()?;
        let scan = InterfaceScan::new(&self.module)?;

        Ok(ReflectData {
            stage_inputs: interface(res.stage_inputs, &scan),
            stage_outputs: interface(res.stage_outputs, &scan),
            uniform_buffers: resources(res.uniform_buffers),
            storage_buffers: resources(res.storage_buffers),
            subpass_inputs: resources(res.subpass_inputs),
            storage_images: resources(res.storage_images),
            sampled_images: resources(res.sampled_images),
            atomic_counters: resources(res.atomic_counters),
            push_constant_buffers: resources(res.push_constant_buffers),
            separate_images: resources(res.separate_images),
            separate_samplers: resources(res.separate_samplers),
            compute_dim: if self.stage == ShaderStage::Compute {
                scan.compute_dim
            } else {
                [0, 0, 0]
            },
            acceleration_structures: scan.acceleration_structures,
        })
    }
}

fn is_es(version: glsl::Version) -> bool {
    matches!(version, glsl::Version::V1_00Es | glsl::Version::V3_00Es)
}

impl CompileShader<GLSL> for CrossReflect<glsl::Target> {
    type Options = glsl::Version;
    type Context = ();

    fn compile(
        mut self,
        version: Self::Options,
    ) -> Result<ShaderCompilerOutput<String>, ShaderCompileError> {
        let mut options: glsl::CompilerOptions = Default::default();
        options.version = version;
        options.vulkan_semantics = false;
        options.emit_uniform_buffer_as_plain_uniforms = true;
        options.emit_push_constant_as_uniform_buffer = false;
        if is_es(version) {
            options.fragment.default_float_precision = glsl::Precision::High;
        }

        self.ast.set_compiler_options(&options)?;

        Ok(ShaderCompilerOutput {
            artifact: self.ast.compile()?,
            context: (),
        })
    }
}

impl CompileShader<HLSL> for CrossReflect<hlsl::Target> {
    type Options = hlsl::ShaderModel;
    type Context = ();

    fn compile(
        mut self,
        shader_model: Self::Options,
    ) -> Result<ShaderCompilerOutput<String>, ShaderCompileError> {
        let mut options = hlsl::CompilerOptions::default();
        options.shader_model = shader_model;
        options.point_size_compat = true;

        self.ast.set_compiler_options(&options)?;

        Ok(ShaderCompilerOutput {
            artifact: self.ast.compile()?,
            context: (),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::back::targets::GLSL;
    use crate::back::{CompileShader, FromCompilation};
    use crate::front::{compile_spirv, create_compiler};
    use crate::reflect::ReflectShader;
    use shadert_common::ShaderStage;
    use shadert_preprocess::ShaderSource;
    use spirv_cross::glsl::Version;

    #[test]
    pub fn reflects_out_of_order_inputs() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/out_of_order.vert", &[]).unwrap();
        let spirv = compile_spirv(&compiler, &source, ShaderStage::Vertex, false).unwrap();

        let mut glsl = GLSL::from_compilation(spirv).unwrap();
        let reflection = glsl.reflect().unwrap();
        let inputs: Vec<_> = reflection
            .stage_inputs
            .iter()
            .map(|r| (r.name.as_str(), r.location))
            .collect();
        assert_eq!(inputs, [("b", Some(0)), ("a", Some(1))]);

        let compiled = glsl.compile(Version::V3_30).unwrap();
        assert!(compiled.artifact.contains("#version 330"));
    }

    #[test]
    pub fn reflects_compute_local_size() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/local_size.comp", &[]).unwrap();
        let spirv = compile_spirv(&compiler, &source, ShaderStage::Compute, false).unwrap();

        let mut glsl = GLSL::from_compilation(spirv).unwrap();
        let reflection = glsl.reflect().unwrap();
        assert_eq!(reflection.compute_dim, [8, 4, 1]);
        assert_eq!(reflection.storage_buffers.len(), 1);
    }
}
