use crate::back::cross::shader_model;
use crate::back::targets::{DXIL, HLSL};
use crate::back::{CompileShader, CompilerBackend, FromCompilation, ShaderCompilerOutput};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::cross::HlslReflect;
use crate::reflect::{ReflectData, ReflectShader};
use shadert_common::{capabilities, ShaderStage, TargetApi};

/// Options for compiling HLSL into a Direct3D shader blob.
#[derive(Debug, Clone)]
pub struct DxilOptions {
    /// The shader model times ten.
    pub version: u32,
    /// Compile with debug information and without optimization.
    pub debug: bool,
}

/// The native toolchain used to compile HLSL.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Toolchain {
    /// The legacy `D3DCompile` compiler, emitting DXBC.
    Fxc,
    /// The DirectX shader compiler, emitting DXIL.
    Dxc,
}

impl Toolchain {
    /// The toolchain for a shader model times ten.
    pub const fn for_version(version: u32) -> Toolchain {
        if version <= 50 {
            Toolchain::Fxc
        } else {
            Toolchain::Dxc
        }
    }
}

/// The target profile for a stage and shader model times ten.
///
/// FXC always compiles against shader model 5.0.
pub fn profile(stage: ShaderStage, version: u32) -> Result<String, ShaderCompileError> {
    let prefix = match stage {
        ShaderStage::Vertex => "vs",
        ShaderStage::Fragment => "ps",
        ShaderStage::Compute => "cs",
        _ => {
            return Err(ShaderCompileError::UnsupportedStage {
                target: TargetApi::DXIL,
                stage,
            })
        }
    };

    match (Toolchain::for_version(version), version) {
        (Toolchain::Fxc, _) => Ok(format!("{prefix}_5_0")),
        (Toolchain::Dxc, 60..=66) => Ok(format!("{prefix}_{}_{}", version / 10, version % 10)),
        (Toolchain::Dxc, _) => Err(ShaderCompileError::UnsupportedStage {
            target: TargetApi::DXIL,
            stage,
        }),
    }
}

/// HLSL emitted by spirv-cross, then handed to a native toolchain.
pub struct DxilBackend {
    pub(crate) hlsl: HlslReflect,
    pub(crate) stage: ShaderStage,
}

impl FromCompilation<SpirvCompilation> for DXIL {
    type Target = DXIL;
    type Options = DxilOptions;
    type Context = ();
    type Output = DxilBackend;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        Ok(CompilerBackend {
            backend: DxilBackend {
                hlsl: HlslReflect::try_from(&compile)?,
                stage: compile.stage,
            },
        })
    }
}

impl ReflectShader for DxilBackend {
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError> {
        self.hlsl.reflect()
    }
}

impl CompileShader<DXIL> for DxilBackend {
    type Options = DxilOptions;
    type Context = ();

    fn compile(
        self,
        options: Self::Options,
    ) -> Result<ShaderCompilerOutput<Vec<u8>, Self::Context>, ShaderCompileError> {
        let profile = profile(self.stage, options.version)?;
        let toolchain = Toolchain::for_version(options.version);
        if toolchain == Toolchain::Fxc && !capabilities::DXIL_LEGACY {
            return Err(ShaderCompileError::CapabilityUnavailable(TargetApi::DXIL));
        }

        let model = shader_model(TargetApi::DXIL, options.version)?;
        let hlsl = CompileShader::<HLSL>::compile(self.hlsl, model)?.artifact;

        // spirv-cross always wraps the renamed entry point in a `main` function that
        // carries the stage semantics.
        let entry = "main";

        log::debug!("compiling {profile} with {toolchain:?}");
        let artifact = match toolchain {
            Toolchain::Fxc => fxc::compile(&hlsl, entry, &profile, options.debug)?,
            Toolchain::Dxc => dxc::compile(&hlsl, entry, &profile, options.debug)?,
        };

        Ok(ShaderCompilerOutput {
            artifact,
            context: (),
        })
    }
}

#[cfg(feature = "dxil")]
mod dxc {
    use crate::error::ShaderCompileError;
    use hassle_rs::Dxc;

    fn toolchain_error(err: impl std::fmt::Display) -> ShaderCompileError {
        ShaderCompileError::ToolchainError(err.to_string())
    }

    pub fn compile(
        hlsl: &str,
        entry: &str,
        profile: &str,
        debug: bool,
    ) -> Result<Vec<u8>, ShaderCompileError> {
        let dxc = Dxc::new(None).map_err(toolchain_error)?;
        let compiler = dxc.create_compiler().map_err(toolchain_error)?;
        let library = dxc.create_library().map_err(toolchain_error)?;

        let blob = library
            .create_blob_with_encoding_from_str(hlsl)
            .map_err(toolchain_error)?;

        let args: &[&str] = if debug { &["-Zi", "-Od"] } else { &[] };
        match compiler.compile(&blob, "shader.hlsl", entry, profile, args, None, &[]) {
            Ok(result) => Ok(result.get_result().map_err(toolchain_error)?.to_vec()),
            Err(result) => {
                let errors = result.0.get_error_buffer().map_err(toolchain_error)?;
                Err(ShaderCompileError::ToolchainError(
                    library
                        .get_blob_as_string(&errors.into())
                        .map_err(toolchain_error)?,
                ))
            }
        }
    }
}

#[cfg(not(feature = "dxil"))]
mod dxc {
    use crate::error::ShaderCompileError;
    use shadert_common::TargetApi;

    pub fn compile(
        _hlsl: &str,
        _entry: &str,
        _profile: &str,
        _debug: bool,
    ) -> Result<Vec<u8>, ShaderCompileError> {
        Err(ShaderCompileError::CapabilityUnavailable(TargetApi::DXIL))
    }
}

#[cfg(all(feature = "dxil", windows))]
mod fxc {
    use crate::error::ShaderCompileError;
    use std::ffi::CString;
    use windows::core::PCSTR;
    use windows::Win32::Graphics::Direct3D::Fxc::{
        D3DCompile, D3DCOMPILE_DEBUG, D3DCOMPILE_SKIP_OPTIMIZATION,
    };
    use windows::Win32::Graphics::Direct3D::ID3DBlob;

    unsafe fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
        std::slice::from_raw_parts(blob.GetBufferPointer().cast(), blob.GetBufferSize())
    }

    fn c_string(value: &str) -> Result<CString, ShaderCompileError> {
        CString::new(value).map_err(|e| ShaderCompileError::ToolchainError(e.to_string()))
    }

    pub fn compile(
        hlsl: &str,
        entry: &str,
        profile: &str,
        debug: bool,
    ) -> Result<Vec<u8>, ShaderCompileError> {
        let entry = c_string(entry)?;
        let profile = c_string(profile)?;

        unsafe {
            let mut blob = None;
            let mut errors = None;
            let result = D3DCompile(
                hlsl.as_ptr().cast(),
                hlsl.len(),
                None,
                None,
                None,
                PCSTR(entry.as_ptr().cast()),
                PCSTR(profile.as_ptr().cast()),
                if debug {
                    D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
                } else {
                    0
                },
                0,
                &mut blob,
                Some(&mut errors),
            );

            if let Err(e) = result {
                let log = errors
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(blob_bytes(b)).into_owned())
                    .unwrap_or_else(|| e.to_string());
                return Err(ShaderCompileError::ToolchainError(log));
            }

            match blob {
                Some(blob) => Ok(blob_bytes(&blob).to_vec()),
                None => Err(ShaderCompileError::ToolchainError(
                    "D3DCompile produced no bytecode".into(),
                )),
            }
        }
    }
}

#[cfg(not(all(feature = "dxil", windows)))]
mod fxc {
    use crate::error::ShaderCompileError;
    use shadert_common::TargetApi;

    pub fn compile(
        _hlsl: &str,
        _entry: &str,
        _profile: &str,
        _debug: bool,
    ) -> Result<Vec<u8>, ShaderCompileError> {
        Err(ShaderCompileError::CapabilityUnavailable(TargetApi::DXIL))
    }
}

#[cfg(test)]
mod test {
    use crate::back::dxil::{profile, Toolchain};
    use crate::error::ShaderCompileError;
    use shadert_common::ShaderStage;

    #[test]
    pub fn selects_profile_by_version() {
        assert_eq!(Toolchain::for_version(50), Toolchain::Fxc);
        assert_eq!(profile(ShaderStage::Compute, 50).unwrap(), "cs_5_0");
        assert_eq!(Toolchain::for_version(61), Toolchain::Dxc);
        assert_eq!(profile(ShaderStage::Compute, 61).unwrap(), "cs_6_1");
        assert_eq!(profile(ShaderStage::Fragment, 40).unwrap(), "ps_5_0");
        assert_eq!(profile(ShaderStage::Vertex, 66).unwrap(), "vs_6_6");
    }

    #[test]
    pub fn rejects_unsupported_stages() {
        assert!(matches!(
            profile(ShaderStage::Geometry, 50),
            Err(ShaderCompileError::UnsupportedStage {
                stage: ShaderStage::Geometry,
                ..
            })
        ));
        assert!(matches!(
            profile(ShaderStage::Vertex, 51),
            Err(ShaderCompileError::UnsupportedStage { .. })
        ));
    }
}
