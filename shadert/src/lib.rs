#![forbid(missing_docs)]
//! GLSL shader transpiler.
//!
//! shadert compiles a single GLSL shader into SPIR-V once, then retargets that SPIR-V to
//! the shading language or binary format of a graphics API. Every result carries
//! reflection metadata taken from the compiler that produced it, along with the
//! uniforms and attributes the GLSL front end found to be live.
//!
//! ## Usage
//! The core object is the [`ShaderTranspiler`]. Build a [`CompileTask`] naming a file or
//! in-memory source and its stage, then call [`ShaderTranspiler::compile_to`] with the
//! [`TargetApi`] and [`Options`] for the request. A transpiler is `Send + Sync` and can
//! be shared between threads.
//!
//! ## Targets
//! | **API**       | **Output**              | **`shadert` feature** |
//! |---------------|-------------------------|-----------------------|
//! | OpenGL (ES)   | GLSL source             |                       |
//! | Vulkan        | SPIR-V binary           |                       |
//! | HLSL          | HLSL source             |                       |
//! | Metal         | MSL source              |                       |
//! | WGSL          | WGSL source             |                       |
//! | DXIL          | DXIL or DXBC binary     | `dxil`                |
//! | Metal binary  | `.metallib` binary      | `metal-binary`        |
//!
//! Feature-gated targets also depend on the build platform. Check
//! [`TargetApi::is_available`] before selecting one.

mod error;

pub use error::{ErrorCategory, TranspileError};

/// Loading of shader source files and resolution of `#include` directives.
pub mod preprocess {
    pub use shadert_preprocess::*;
}

/// Shader compilation and reflection.
pub mod reflect {
    /// Supported shader compiler targets.
    pub mod targets {
        pub use shadert_reflect::back::targets::*;
    }

    pub use shadert_reflect::error::*;

    pub use shadert_reflect::reflect::{
        verify_interface, LiveAttribute, ReflectData, ReflectShader, Resource, Uniform,
    };

    pub use shadert_reflect::back::{
        Backend, BackendOutput, CompileShader, CompilerBackend, FromCompilation,
        ShaderArtifact, ShaderCompilerOutput,
    };

    pub use shadert_reflect::back::msl::MslPushConstantBinding;
    pub use shadert_reflect::front::{SpirvCompilation, TEXTURE_BINDING_OFFSET};
    pub use shadert_reflect::spirv::SpirvModule;

    /// SPIR-V optimization.
    pub mod optimize {
        pub use shadert_reflect::optimize::*;
    }

    /// Native Direct3D shader compilation.
    pub mod dxil {
        pub use shadert_reflect::back::dxil::{profile, DxilOptions, Toolchain};
    }
}

pub use shadert_common::{
    capabilities, Options, PushConstantSettings, ShaderStage, TargetApi, UniformBufferSettings,
};

use shadert_preprocess::ShaderSource;
use shadert_reflect::back::msl::MslPushConstantBinding;
use shadert_reflect::back::{Backend, ShaderArtifact};
use once_cell::sync::OnceCell;
use shadert_reflect::front::{compile_spirv, create_compiler, GlslCompiler};
use shadert_reflect::reflect::{LiveAttribute, ReflectData, Uniform};
use std::path::PathBuf;

/// A shader to compile.
#[derive(Debug, Clone)]
pub enum CompileTask {
    /// A shader read from disk. The file's directory is searched for includes after
    /// every listed include directory.
    File {
        /// The path to the shader.
        path: PathBuf,
        /// Directories searched for `#include`, in order.
        include_paths: Vec<PathBuf>,
        /// The stage of the shader.
        stage: ShaderStage,
    },
    /// A shader held in memory.
    Memory {
        /// The GLSL source text.
        source: String,
        /// Directories searched for `#include`, in order.
        include_paths: Vec<PathBuf>,
        /// The stage of the shader.
        stage: ShaderStage,
    },
}

impl CompileTask {
    /// The stage of the shader.
    pub fn stage(&self) -> ShaderStage {
        match self {
            CompileTask::File { stage, .. } | CompileTask::Memory { stage, .. } => *stage,
        }
    }

    fn load(&self) -> Result<ShaderSource, TranspileError> {
        Ok(match self {
            CompileTask::File {
                path,
                include_paths,
                ..
            } => ShaderSource::load(path, include_paths)?,
            CompileTask::Memory {
                source,
                include_paths,
                ..
            } => ShaderSource::from_memory(source.as_str(), include_paths)?,
        })
    }
}

/// The result of a compilation.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// The compiled shader, as source text or a binary blob depending on the target.
    pub artifact: ShaderArtifact,
    /// Reflection taken from the target's compiler.
    pub reflection: ReflectData,
    /// Uniforms the GLSL front end found to be live.
    pub uniforms: Vec<Uniform>,
    /// Vertex attributes the GLSL front end found to be live.
    pub attributes: Vec<LiveAttribute>,
    /// The Metal buffer indices assigned to push constant buffers. Empty for other targets.
    pub msl_push_constants: Vec<MslPushConstantBinding>,
}

/// Compiles GLSL shaders for any available target.
///
/// The GLSL front end is initialized on first use, exactly once even when the first
/// requests arrive concurrently.
#[derive(Default)]
pub struct ShaderTranspiler {
    compiler: OnceCell<&'static GlslCompiler>,
    #[cfg(test)]
    initializations: std::sync::atomic::AtomicUsize,
}

impl ShaderTranspiler {
    /// Create a transpiler. No compiler is initialized until the first request.
    pub fn new() -> Self {
        Self::default()
    }

    fn compiler(&self) -> Result<&'static GlslCompiler, TranspileError> {
        self.compiler
            .get_or_try_init(|| {
                #[cfg(test)]
                self.initializations
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                log::debug!("initializing GLSL front end");
                create_compiler().map_err(TranspileError::from)
            })
            .copied()
    }

    /// Compile a shader for the given API.
    pub fn compile_to(
        &self,
        task: &CompileTask,
        api: TargetApi,
        options: &Options,
    ) -> Result<CompileResult, TranspileError> {
        let backend = Backend::for_target(api)?;
        let source = task.load()?;
        let compilation = compile_spirv(self.compiler()?, &source, task.stage(), options.debug)?;

        let uniforms = compilation.uniforms.clone();
        let attributes = compilation.attributes.clone();
        log::debug!("{} routed to {api}", source.name);

        let output = backend.compile(compilation, options)?;
        Ok(CompileResult {
            artifact: output.artifact,
            reflection: output.reflection,
            uniforms,
            attributes,
            msl_push_constants: output.msl_push_constants,
        })
    }

    /// Compile a shader file for the given API.
    pub fn compile_file(
        &self,
        path: impl Into<PathBuf>,
        include_paths: &[PathBuf],
        stage: ShaderStage,
        api: TargetApi,
        options: &Options,
    ) -> Result<CompileResult, TranspileError> {
        self.compile_to(
            &CompileTask::File {
                path: path.into(),
                include_paths: include_paths.to_vec(),
                stage,
            },
            api,
            options,
        )
    }

    /// Compile in-memory shader source for the given API.
    pub fn compile_memory(
        &self,
        source: impl Into<String>,
        include_paths: &[PathBuf],
        stage: ShaderStage,
        api: TargetApi,
        options: &Options,
    ) -> Result<CompileResult, TranspileError> {
        self.compile_to(
            &CompileTask::Memory {
                source: source.into(),
                include_paths: include_paths.to_vec(),
                stage,
            },
            api,
            options,
        )
    }
}

#[cfg(test)]
mod test {
    use crate::ShaderTranspiler;
    use std::sync::atomic::Ordering;
    use std::sync::Barrier;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    pub fn transpiler_is_send_sync() {
        assert_send_sync::<ShaderTranspiler>();
    }

    #[test]
    pub fn compiler_is_initialized_once() {
        let transpiler = ShaderTranspiler::new();
        let barrier = Barrier::new(8);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    transpiler.compiler().unwrap();
                });
            }
        });

        assert_eq!(transpiler.initializations.load(Ordering::SeqCst), 1);
        transpiler.compiler().unwrap();
        assert_eq!(transpiler.initializations.load(Ordering::SeqCst), 1);
    }
}
