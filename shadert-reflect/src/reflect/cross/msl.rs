use crate::back::msl::{CrossMslContext, MslOptions, MslPushConstantBinding};
use crate::back::targets::MSL;
use crate::back::{CompileShader, ShaderCompilerOutput};
use crate::error::ShaderCompileError;
use crate::reflect::cross::CrossReflect;
use crate::spirv::execution_model;
use shadert_common::ShaderStage;
use spirv_cross::msl;
use spirv_cross::msl::{ResourceBinding, ResourceBindingLocation};
use spirv_cross::spirv::{Ast, Decoration, ExecutionModel};
use std::collections::BTreeMap;

pub type MslReflect = CrossReflect<msl::Target>;

/// The descriptor set spirv-cross reserves for push constant buffers.
const PUSH_CONSTANT_DESCRIPTOR_SET: u32 = u32::MAX;

fn cross_execution_model(stage: ShaderStage) -> ExecutionModel {
    match stage {
        ShaderStage::Vertex => ExecutionModel::Vertex,
        ShaderStage::Fragment => ExecutionModel::Fragment,
        ShaderStage::TessControl => ExecutionModel::TessellationControl,
        ShaderStage::TessEval => ExecutionModel::TessellationEvaluation,
        ShaderStage::Geometry => ExecutionModel::Geometry,
        ShaderStage::Compute => ExecutionModel::GlCompute,
    }
}

/// Pin every buffer and texture to the Metal index of its declared binding.
fn pin_bindings(
    ast: &Ast<msl::Target>,
    stage: ExecutionModel,
    binding_map: &mut BTreeMap<ResourceBindingLocation, ResourceBinding>,
) -> Result<(), ShaderCompileError> {
    let resources = ast.get_shader_resources()?;
    let bound = resources
        .uniform_buffers
        .iter()
        .chain(resources.storage_buffers.iter())
        .chain(resources.sampled_images.iter())
        .chain(resources.separate_images.iter())
        .chain(resources.separate_samplers.iter())
        .chain(resources.storage_images.iter());

    for resource in bound {
        let binding = ast.get_decoration(resource.id, Decoration::Binding)?;
        let location = ResourceBindingLocation {
            stage,
            desc_set: ast.get_decoration(resource.id, Decoration::DescriptorSet)?,
            binding,
        };

        let overridden = ResourceBinding {
            buffer_id: binding,
            texture_id: binding,
            sampler_id: binding,
            count: 0,
        };

        binding_map.insert(location, overridden);
    }
    Ok(())
}

impl CompileShader<MSL> for CrossReflect<msl::Target> {
    type Options = MslOptions;
    type Context = CrossMslContext;

    fn compile(
        mut self,
        options: Self::Options,
    ) -> Result<ShaderCompilerOutput<String, CrossMslContext>, ShaderCompileError> {
        let stage = cross_execution_model(self.stage);
        let mut compiler_options = msl::CompilerOptions::default();
        compiler_options.version = options.version;
        compiler_options.platform = options.platform;

        pin_bindings(
            &self.ast,
            stage,
            &mut compiler_options.resource_binding_overrides,
        )?;

        let resources = self.ast.get_shader_resources()?;
        if options.uniform_buffer.rename_buffer {
            if let Some(buffer) = resources.uniform_buffers.first() {
                self.ast
                    .set_name(buffer.id, &options.uniform_buffer.new_buffer_name)?;
            }
        }

        let mut push_constants = Vec::new();
        for (index, buffer) in resources.push_constant_buffers.iter().enumerate() {
            let msl_buffer = options.push_constants.first_index as u32 + index as u32;
            compiler_options.resource_binding_overrides.insert(
                ResourceBindingLocation {
                    stage,
                    desc_set: PUSH_CONSTANT_DESCRIPTOR_SET,
                    binding: 0,
                },
                ResourceBinding {
                    buffer_id: msl_buffer,
                    texture_id: 0,
                    sampler_id: 0,
                    count: 0,
                },
            );
            push_constants.push(MslPushConstantBinding {
                name: buffer.name.clone(),
                stage: execution_model(self.stage),
                msl_buffer,
            });
        }

        self.ast.set_compiler_options(&compiler_options)?;

        Ok(ShaderCompilerOutput {
            artifact: self.ast.compile()?,
            context: CrossMslContext { push_constants },
        })
    }
}

#[cfg(test)]
mod test {
    use crate::back::msl::MslOptions;
    use crate::back::targets::MSL;
    use crate::back::{CompileShader, FromCompilation};
    use crate::front::{compile_spirv, create_compiler};
    use crate::reflect::ReflectShader;
    use shadert_common::{PushConstantSettings, ShaderStage, UniformBufferSettings};
    use shadert_preprocess::ShaderSource;

    #[test]
    pub fn push_constants_start_at_first_index() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/push_constant.frag", &[]).unwrap();
        let spirv = compile_spirv(&compiler, &source, ShaderStage::Fragment, false).unwrap();

        let mut msl = MSL::from_compilation(spirv).unwrap();
        let reflection = msl.reflect().unwrap();
        assert_eq!(reflection.push_constant_buffers.len(), 1);

        let compiled = msl
            .compile(MslOptions {
                push_constants: PushConstantSettings { first_index: 5 },
                uniform_buffer: UniformBufferSettings {
                    rename_buffer: true,
                    new_buffer_name: String::from("Renamed"),
                },
                ..Default::default()
            })
            .unwrap();

        assert_eq!(compiled.context.push_constants.len(), 1);
        assert_eq!(compiled.context.push_constants[0].msl_buffer, 5);
        assert!(compiled.artifact.contains("[[buffer(5)]]"));
        assert!(compiled.artifact.contains("Renamed"));
    }
}
