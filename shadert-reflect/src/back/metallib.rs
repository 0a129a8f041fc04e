use crate::back::msl::{CrossMslContext, MslOptions};
use crate::back::targets::{MetalLib, MSL};
use crate::back::{CompileShader, CompilerBackend, FromCompilation, ShaderCompilerOutput};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::cross::msl::MslReflect;
use crate::reflect::{ReflectData, ReflectShader};
use spirv_cross::msl::Platform;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Options for compiling MSL into a native Metal library.
#[derive(Debug, Clone, Default)]
pub struct MetalLibOptions {
    pub msl: MslOptions,
    /// Keep line tables and sources in the library.
    pub debug: bool,
}

/// MSL emitted by spirv-cross, then handed to the Metal toolchain.
pub struct MetalLibBackend {
    pub(crate) msl: MslReflect,
}

impl FromCompilation<SpirvCompilation> for MetalLib {
    type Target = MetalLib;
    type Options = MetalLibOptions;
    type Context = CrossMslContext;
    type Output = MetalLibBackend;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        Ok(CompilerBackend {
            backend: MetalLibBackend {
                msl: MslReflect::try_from(&compile)?,
            },
        })
    }
}

impl ReflectShader for MetalLibBackend {
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError> {
        self.msl.reflect()
    }
}

impl CompileShader<MetalLib> for MetalLibBackend {
    type Options = MetalLibOptions;
    type Context = CrossMslContext;

    fn compile(
        self,
        options: Self::Options,
    ) -> Result<ShaderCompilerOutput<Vec<u8>, Self::Context>, ShaderCompileError> {
        let mobile = matches!(options.msl.platform, Platform::iOS);
        let msl = CompileShader::<MSL>::compile(self.msl, options.msl)?;

        Ok(ShaderCompilerOutput {
            artifact: compile(&msl.artifact, mobile, options.debug)?,
            context: msl.context,
        })
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ShaderCompileError {
    ShaderCompileError::ToolchainError(format!("{}: {err}", path.display()))
}

fn xcrun(sdk: &str, args: &[&Path], tool: &str, flags: &[&str]) -> Result<(), ShaderCompileError> {
    let output = Command::new("xcrun")
        .arg("-sdk")
        .arg(sdk)
        .arg(tool)
        .args(flags)
        .args(args)
        .output()
        .map_err(|e| ShaderCompileError::ToolchainError(format!("xcrun {tool}: {e}")))?;

    if !output.status.success() {
        return Err(ShaderCompileError::ToolchainError(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(())
}

fn build(dir: &Path, msl: &str, sdk: &str, debug: bool) -> Result<Vec<u8>, ShaderCompileError> {
    let source = dir.join("shader.metal");
    let air = dir.join("shader.air");
    let library = dir.join("shader.metallib");

    std::fs::write(&source, msl).map_err(|e| io_error(&source, e))?;

    let compile_flags: &[&str] = if debug {
        &["-c", "-gline-tables-only", "-frecord-sources"]
    } else {
        &["-c"]
    };
    xcrun(sdk, &[&source, Path::new("-o"), &air], "metal", compile_flags)?;
    xcrun(sdk, &[&air, Path::new("-o"), &library], "metallib", &[])?;

    std::fs::read(&library).map_err(|e| io_error(&library, e))
}

/// Compile MSL source into a native Metal library with `xcrun`.
///
/// The SDK is `iphoneos` when `mobile` is set, and `macosx` otherwise.
pub fn compile(msl: &str, mobile: bool, debug: bool) -> Result<Vec<u8>, ShaderCompileError> {
    let sdk = if mobile { "iphoneos" } else { "macosx" };
    let dir: PathBuf = std::env::temp_dir().join(format!("shadert-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;

    let result = build(&dir, msl, sdk, debug);
    if let Err(e) = std::fs::remove_dir_all(&dir) {
        log::warn!("could not remove {}: {e}", dir.display());
    }
    result
}
