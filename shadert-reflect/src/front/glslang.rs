use crate::error::{FrontendStage, ShaderCompileError};
use crate::front::{live, SpirvCompilation};
use crate::optimize::{run_passes, PassSet};
use crate::spirv::SpirvModule;
use glslang::error::GlslangError;
use glslang::include::{IncludeHandler, IncludeResult, IncludeType};
use glslang::{
    CompilerOptions, GlslProfile, ResourceType, ShaderInput, ShaderMessage, ShaderOptions,
    SourceLanguage, SpirvVersion, Target, VulkanVersion,
};
use shadert_common::ShaderStage;
use shadert_preprocess::{IncludeKind, IncludeResolver, ShaderSource};

/// The binding shift applied to textures, samplers and images.
///
/// Every texture, sampler and image binding is moved up by this amount, including
/// bindings given with an explicit `binding` qualifier: `layout(binding = 1)` on a
/// sampler is emitted as binding 17. Buffers are not shifted, so a texture never
/// shares a binding with a buffer of the same index. The shift applies to every
/// descriptor set and is not configurable.
pub const TEXTURE_BINDING_OFFSET: u32 = 16;

const DEFAULT_VERSION: i32 = 460;

/// Acquire the process-wide GLSL compiler.
pub fn create_compiler() -> Result<&'static glslang::Compiler, ShaderCompileError> {
    glslang::Compiler::acquire().ok_or(ShaderCompileError::CompilerInitError)
}

const fn glslang_stage(stage: ShaderStage) -> glslang::ShaderStage {
    match stage {
        ShaderStage::Vertex => glslang::ShaderStage::Vertex,
        ShaderStage::Fragment => glslang::ShaderStage::Fragment,
        ShaderStage::TessControl => glslang::ShaderStage::TesselationControl,
        ShaderStage::TessEval => glslang::ShaderStage::TesselationEvaluation,
        ShaderStage::Geometry => glslang::ShaderStage::Geometry,
        ShaderStage::Compute => glslang::ShaderStage::Compute,
    }
}

/// Answers `#include` requests from an [`IncludeResolver`].
struct Includes<'a> {
    resolver: &'a IncludeResolver,
}

impl IncludeHandler for Includes<'_> {
    fn include(
        &mut self,
        ty: IncludeType,
        header_name: &str,
        includer_name: &str,
        include_depth: usize,
    ) -> Option<IncludeResult> {
        let kind = match ty {
            IncludeType::Local => IncludeKind::Relative,
            IncludeType::System => IncludeKind::Standard,
        };

        match self
            .resolver
            .resolve(header_name, kind, includer_name, include_depth)
        {
            Ok(resolved) => Some(IncludeResult {
                name: resolved.resolved_name,
                data: resolved.content,
            }),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        }
    }
}

fn compiler_options(source: &ShaderSource, debug: bool) -> CompilerOptions {
    let mut messages = ShaderMessage::SPV_RULES | ShaderMessage::VULKAN_RULES;
    if debug {
        messages |= ShaderMessage::DEBUG_INFO;
    }

    CompilerOptions {
        source_language: SourceLanguage::GLSL,
        target: Target::Vulkan {
            version: VulkanVersion::Vulkan1_2,
            spirv_version: SpirvVersion::SPIRV1_3,
        },
        version_profile: (!source.has_version_directive())
            .then_some((DEFAULT_VERSION, GlslProfile::None)),
        messages,
    }
}

fn source_error(err: GlslangError) -> ShaderCompileError {
    let (stage, log) = match err {
        GlslangError::PreprocessError(log) => (FrontendStage::Preprocess, log.log),
        GlslangError::ParseError(log) => (FrontendStage::Parse, log.log),
        GlslangError::LinkError(log) => (FrontendStage::Link, log.log),
        err => (FrontendStage::Parse, err.to_string()),
    };
    ShaderCompileError::Source { stage, log }
}

/// Compile GLSL source into SPIR-V.
///
/// The source is parsed under relaxed Vulkan rules, so loose uniforms, atomic counters
/// and other OpenGL-only constructs are accepted. Loose uniforms are gathered into
/// `gl_DefaultUniformBlock`. Bindings and locations are assigned automatically.
///
/// Live uniforms and attributes are gathered before release processing. Unless `debug`
/// is set, the module is then optimized and stripped of source-level debug information.
pub fn compile_spirv(
    compiler: &glslang::Compiler,
    source: &ShaderSource,
    stage: ShaderStage,
    debug: bool,
) -> Result<SpirvCompilation, ShaderCompileError> {
    let options = compiler_options(source, debug);
    let mut includes = Includes {
        resolver: &source.includes,
    };

    let text = glslang::ShaderSource::from(source.text.as_str());
    let input = ShaderInput::new(
        &text,
        glslang_stage(stage),
        &options,
        None,
        Some(&mut includes),
    )
    .map_err(source_error)?;

    let mut shader = glslang::Shader::new(compiler, input);
    shader.options(
        ShaderOptions::AUTO_MAP_BINDINGS
            | ShaderOptions::AUTO_MAP_LOCATIONS
            | ShaderOptions::VULKAN_RULES_RELAXED,
    );
    for resource in [ResourceType::Texture, ResourceType::Sampler, ResourceType::Image] {
        shader.shift_binding(resource, TEXTURE_BINDING_OFFSET);
    }
    let shader = shader.parse().map_err(source_error)?;

    let words = shader.compile().map_err(source_error)?;

    let module = SpirvModule::new(words);
    let (uniforms, attributes) = live::harvest(&module.load()?);

    let module = if debug {
        module
    } else {
        run_passes(
            &module,
            spirv_tools::TargetEnv::Universal_1_3,
            PassSet::Performance,
        )?
        .strip_debug_info()?
    };

    log::debug!(
        "compiled {} shader {} to {} words",
        stage,
        source.name,
        module.as_words().len()
    );

    Ok(SpirvCompilation {
        module,
        stage,
        uniforms,
        attributes,
    })
}

#[cfg(test)]
mod test {
    use crate::error::{FrontendStage, ShaderCompileError};
    use crate::front::glslang::{compile_spirv, create_compiler};
    use shadert_common::ShaderStage;
    use shadert_preprocess::ShaderSource;

    #[test]
    pub fn compile_shader() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/basic.vert", &[]).unwrap();
        let compilation = compile_spirv(compiler, &source, ShaderStage::Vertex, false).unwrap();
        assert!(!compilation.module.has_debug_info().unwrap());
        assert_eq!(compilation.attributes.len(), 2);
    }

    #[test]
    pub fn missing_version_defaults_to_460() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::from_memory(
            "layout(location = 0) out vec4 color;\nvoid main() { color = vec4(1.0); }",
            &[],
        )
        .unwrap();
        compile_spirv(compiler, &source, ShaderStage::Fragment, false).unwrap();
    }

    #[test]
    pub fn loose_uniforms_are_accepted() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/loose_uniform.frag", &[]).unwrap();
        let compilation = compile_spirv(compiler, &source, ShaderStage::Fragment, false).unwrap();

        let brightness = compilation
            .uniforms
            .iter()
            .find(|u| u.name == "brightness")
            .unwrap();
        assert_eq!(brightness.declared_type, 0x1406);
        assert_eq!(brightness.buffer_offset, 0);
    }

    #[test]
    pub fn malformed_source_reports_log() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/malformed.frag", &[]).unwrap();
        let err = compile_spirv(compiler, &source, ShaderStage::Fragment, false).unwrap_err();
        let ShaderCompileError::Source { stage, log } = err else {
            panic!("expected a source error, got {err:?}");
        };
        assert_eq!(stage, FrontendStage::Parse);
        assert!(!log.is_empty());
    }

    #[test]
    pub fn unresolved_include_fails_preprocessing() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::from_memory(
            "#version 450\n#extension GL_GOOGLE_include_directive : require\n\
             #include \"missing.glsl\"\nvoid main() {}",
            &[],
        )
        .unwrap();
        let err = compile_spirv(compiler, &source, ShaderStage::Fragment, false).unwrap_err();
        assert!(matches!(
            err,
            ShaderCompileError::Source {
                stage: FrontendStage::Preprocess,
                ..
            }
        ));
    }

    #[test]
    pub fn nested_includes_resolve() {
        let compiler = create_compiler().unwrap();
        let source =
            ShaderSource::load("../test/include/main.frag", &["../test/include/a".into()])
                .unwrap();
        compile_spirv(compiler, &source, ShaderStage::Fragment, true).unwrap();
    }

    #[test]
    pub fn live_uniforms_are_reported() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/textures.frag", &[]).unwrap();
        let compilation = compile_spirv(compiler, &source, ShaderStage::Fragment, false).unwrap();

        let names: Vec<_> = compilation.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert!(names.contains(&"Source"), "{names:?}");
        assert!(names.contains(&"Params.tint"), "{names:?}");
        assert!(!names.contains(&"Params.unused"), "{names:?}");

        let tint = compilation
            .uniforms
            .iter()
            .find(|u| u.name == "Params.tint")
            .unwrap();
        assert_eq!(tint.declared_type, 0x8B52);
        assert_eq!(tint.buffer_offset, 16);

        let source_tex = compilation
            .uniforms
            .iter()
            .find(|u| u.name == "Source")
            .unwrap();
        assert_eq!(source_tex.declared_type, 0x8B5E);
        assert_eq!(source_tex.buffer_offset, -1);
        assert_eq!(source_tex.array_size, 1);
    }

    #[test]
    pub fn nested_struct_members_are_expanded() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/nested_struct.frag", &[]).unwrap();
        let compilation = compile_spirv(compiler, &source, ShaderStage::Fragment, false).unwrap();

        let find = |name: &str| {
            compilation
                .uniforms
                .iter()
                .find(|u| u.name == name)
                .unwrap_or_else(|| panic!("{name} missing from {:?}", compilation.uniforms))
        };

        let intensity = find("Lights.key.intensity");
        assert_eq!(intensity.declared_type, 0x1406);
        assert_eq!(intensity.buffer_offset, 16);

        let fill = find("Lights.fill[1].color");
        assert_eq!(fill.declared_type, 0x8B52);
        assert_eq!(fill.buffer_offset, 64);
        assert!(compilation.uniforms.iter().all(|u| u.declared_type != 0));
    }
}
