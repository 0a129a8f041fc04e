pub mod cross;
pub mod dxil;
#[cfg(feature = "metal-binary")]
pub mod metallib;
pub mod msl;
pub mod spirv;
pub mod targets;
pub mod wgsl;

use crate::back::msl::MslPushConstantBinding;
use crate::back::targets::OutputTarget;
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::optimize;
use crate::reflect::{verify_interface, ReflectData, ReflectShader};
use shadert_common::{Options, TargetApi};

/// The output of a shader compiler.
#[derive(Debug)]
pub struct ShaderCompilerOutput<T, Context = ()> {
    /// The compiled shader.
    pub artifact: T,
    /// Additional context from the compiler.
    pub context: Context,
}

/// A trait for objects that can be compiled into a shader.
pub trait CompileShader<T: OutputTarget> {
    /// Options provided to the compiler.
    type Options;
    /// Additional context returned by the compiler after compilation.
    type Context;

    /// Consume the object and return the compiled output of the shader.
    fn compile(
        self,
        options: Self::Options,
    ) -> Result<ShaderCompilerOutput<T::Output, Self::Context>, ShaderCompileError>;
}

impl<T, E> CompileShader<E> for CompilerBackend<T>
where
    T: CompileShader<E>,
    E: OutputTarget,
{
    type Options = T::Options;
    type Context = T::Context;

    fn compile(
        self,
        options: Self::Options,
    ) -> Result<ShaderCompilerOutput<E::Output, Self::Context>, ShaderCompileError> {
        self.backend.compile(options)
    }
}

/// A trait for reflectable compilations that can be transformed into an object ready for
/// reflection or compilation.
pub trait FromCompilation<T> {
    /// The target that the transformed object is expected to compile for.
    type Target: OutputTarget;
    /// Options provided to the compiler.
    type Options;
    /// Additional context returned by the compiler after compilation.
    type Context;
    /// The output type after conversion.
    type Output: CompileShader<Self::Target, Options = Self::Options, Context = Self::Context>
        + ReflectShader;

    /// Tries to convert the input object into an object ready for compilation.
    fn from_compilation(compile: T) -> Result<CompilerBackend<Self::Output>, ShaderReflectError>;
}

/// A wrapper for a compiler backend.
pub struct CompilerBackend<T> {
    pub(crate) backend: T,
}

impl<T> ReflectShader for CompilerBackend<T>
where
    T: ReflectShader,
{
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError> {
        self.backend.reflect()
    }
}

/// A compiled shader artifact.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ShaderArtifact {
    /// Shader source text.
    Source(String),
    /// A binary blob.
    Binary(Vec<u8>),
}

impl ShaderArtifact {
    /// The source text, if the artifact is text.
    pub fn as_source(&self) -> Option<&str> {
        match self {
            ShaderArtifact::Source(source) => Some(source),
            ShaderArtifact::Binary(_) => None,
        }
    }

    /// The binary blob, if the artifact is binary.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            ShaderArtifact::Source(_) => None,
            ShaderArtifact::Binary(binary) => Some(binary),
        }
    }
}

/// The output of a backend: the artifact and its reflection.
#[derive(Debug, Clone)]
pub struct BackendOutput {
    pub artifact: ShaderArtifact,
    pub reflection: ReflectData,
    /// The Metal buffer indices assigned to push constant buffers. Empty for other targets.
    pub msl_push_constants: Vec<MslPushConstantBinding>,
}

/// The backend generators.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Backend {
    /// SPIR-V for Vulkan.
    Spirv,
    /// GLSL and GLSL ES.
    Glsl,
    Hlsl,
    Msl,
    Wgsl,
    /// HLSL compiled by a Direct3D toolchain.
    Dxil,
    /// MSL compiled by the Metal toolchain.
    MetalLib,
}

fn reflect_and_compile<T>(
    compilation: SpirvCompilation,
    options: T::Options,
) -> Result<
    (
        ReflectData,
        ShaderCompilerOutput<<T::Target as OutputTarget>::Output, T::Context>,
    ),
    ShaderCompileError,
>
where
    T: FromCompilation<SpirvCompilation>,
{
    let mut backend = T::from_compilation(compilation)?;
    let reflection = backend.reflect()?;
    let output = CompileShader::<T::Target>::compile(backend, options)?;
    Ok((reflection, output))
}

impl Backend {
    /// Select the backend for a target API.
    ///
    /// Targets that are unavailable in this build fail with
    /// [`ShaderCompileError::CapabilityUnavailable`].
    pub fn for_target(api: TargetApi) -> Result<Backend, ShaderCompileError> {
        if !api.is_available() {
            return Err(ShaderCompileError::CapabilityUnavailable(api));
        }

        Ok(match api {
            TargetApi::OpenGL | TargetApi::OpenGLES => Backend::Glsl,
            TargetApi::Vulkan => Backend::Spirv,
            TargetApi::HLSL => Backend::Hlsl,
            TargetApi::Metal => Backend::Msl,
            TargetApi::MetalBinary => Backend::MetalLib,
            TargetApi::DXIL => Backend::Dxil,
            TargetApi::WGSL => Backend::Wgsl,
        })
    }

    /// Compile a SPIR-V compilation for the backend's target.
    ///
    /// The single entry point is renamed to `options.entry_point` first. GLSL and HLSL
    /// source still name their entry function `main`, as their toolchains expect.
    /// The reflection is taken from the backend's own compiler, and must contain every
    /// live attribute the front end reported.
    pub fn compile(
        &self,
        compilation: SpirvCompilation,
        options: &Options,
    ) -> Result<BackendOutput, ShaderCompileError> {
        let compilation = compilation.with_entry_point(&options.entry_point)?;
        let attributes = compilation.attributes.clone();
        log::debug!("compiling {} shader with {:?} backend", compilation.stage, self);

        let output = match self {
            Backend::Spirv => {
                let compilation = if options.debug {
                    compilation
                } else {
                    SpirvCompilation {
                        module: optimize::optimize(&compilation.module, options.version)?,
                        ..compilation
                    }
                };
                let (reflection, output) =
                    reflect_and_compile::<targets::SPIRV>(compilation, ())?;
                BackendOutput {
                    artifact: ShaderArtifact::Binary(
                        output.artifact.iter().flat_map(|w| w.to_le_bytes()).collect(),
                    ),
                    reflection,
                    msl_push_constants: Vec::new(),
                }
            }
            Backend::Glsl => {
                let version = cross::glsl_version(options.version, options.mobile)?;
                let (reflection, output) =
                    reflect_and_compile::<targets::GLSL>(compilation, version)?;
                BackendOutput {
                    artifact: ShaderArtifact::Source(output.artifact),
                    reflection,
                    msl_push_constants: Vec::new(),
                }
            }
            Backend::Hlsl => {
                let shader_model = cross::shader_model(TargetApi::HLSL, options.version)?;
                let (reflection, output) =
                    reflect_and_compile::<targets::HLSL>(compilation, shader_model)?;
                BackendOutput {
                    artifact: ShaderArtifact::Source(output.artifact),
                    reflection,
                    msl_push_constants: Vec::new(),
                }
            }
            Backend::Msl => {
                let msl_options = msl::MslOptions::new(options)?;
                let (reflection, output) =
                    reflect_and_compile::<targets::MSL>(compilation, msl_options)?;
                BackendOutput {
                    artifact: ShaderArtifact::Source(output.artifact),
                    reflection,
                    msl_push_constants: output.context.push_constants,
                }
            }
            Backend::Wgsl => {
                let (reflection, output) =
                    reflect_and_compile::<targets::WGSL>(compilation, ())?;
                BackendOutput {
                    artifact: ShaderArtifact::Source(output.artifact),
                    reflection,
                    msl_push_constants: Vec::new(),
                }
            }
            Backend::Dxil => {
                let dxil_options = dxil::DxilOptions {
                    version: options.version,
                    debug: options.debug,
                };
                let (reflection, output) =
                    reflect_and_compile::<targets::DXIL>(compilation, dxil_options)?;
                BackendOutput {
                    artifact: ShaderArtifact::Binary(output.artifact),
                    reflection,
                    msl_push_constants: Vec::new(),
                }
            }
            #[cfg(feature = "metal-binary")]
            Backend::MetalLib => {
                let metallib_options = metallib::MetalLibOptions {
                    msl: msl::MslOptions::new(options)?,
                    debug: options.debug,
                };
                let (reflection, output) =
                    reflect_and_compile::<targets::MetalLib>(compilation, metallib_options)?;
                BackendOutput {
                    artifact: ShaderArtifact::Binary(output.artifact),
                    reflection,
                    msl_push_constants: output.context.push_constants,
                }
            }
            #[cfg(not(feature = "metal-binary"))]
            Backend::MetalLib => {
                return Err(ShaderCompileError::CapabilityUnavailable(
                    TargetApi::MetalBinary,
                ))
            }
        };

        verify_interface(&output.reflection, &attributes)?;
        log::debug!(
            "{:?} backend produced {} reflected inputs",
            self,
            output.reflection.stage_inputs.len()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod test {
    use crate::back::Backend;
    use crate::error::{ShaderCompileError, ShaderReflectError};
    use crate::front::{compile_spirv, create_compiler};
    use crate::reflect::LiveAttribute;
    use shadert_common::{Options, ShaderStage, TargetApi};
    use shadert_preprocess::ShaderSource;

    #[test]
    pub fn selects_backend_for_target() {
        assert_eq!(Backend::for_target(TargetApi::OpenGLES).unwrap(), Backend::Glsl);
        assert_eq!(Backend::for_target(TargetApi::Vulkan).unwrap(), Backend::Spirv);
        assert_eq!(Backend::for_target(TargetApi::WGSL).unwrap(), Backend::Wgsl);
    }

    #[test]
    #[cfg(not(feature = "dxil"))]
    pub fn unavailable_target_fails_fast() {
        assert!(matches!(
            Backend::for_target(TargetApi::DXIL),
            Err(ShaderCompileError::CapabilityUnavailable(TargetApi::DXIL))
        ));
    }

    #[test]
    pub fn attribute_missing_from_backend_fails() {
        let compiler = create_compiler().unwrap();
        let source = ShaderSource::load("../test/basic.vert", &[]).unwrap();
        let mut compilation =
            compile_spirv(compiler, &source, ShaderStage::Vertex, false).unwrap();
        compilation.attributes[0].location = Some(7);

        for backend in [Backend::Glsl, Backend::Spirv, Backend::Msl] {
            let options = Options::with_version(match backend {
                Backend::Glsl => 330,
                Backend::Msl => 20,
                _ => 13,
            });
            let err = backend.compile(compilation.clone(), &options).unwrap_err();
            assert!(
                matches!(
                    err,
                    ShaderCompileError::ReflectError(ShaderReflectError::InterfaceMismatch {
                        location: 7,
                        ..
                    })
                ),
                "{backend:?}: {err:?}"
            );
        }

        for name in ["Ghost", "Extra"] {
            compilation.attributes.push(LiveAttribute {
                name: String::from(name),
                location: None,
            });
        }
        let err = Backend::Glsl
            .compile(compilation, &Options::with_version(330))
            .unwrap_err();
        assert!(matches!(
            err,
            ShaderCompileError::ReflectError(ShaderReflectError::InterfaceCountMismatch { .. })
        ));
    }
}
