use crate::back::targets::MSL;
use crate::back::{CompilerBackend, FromCompilation};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::cross::msl::MslReflect;
use rspirv::spirv::ExecutionModel;
use shadert_common::{Options, PushConstantSettings, TargetApi, UniformBufferSettings};
use spirv_cross::msl::{Platform, Version};

/// Compiler options for MSL.
#[derive(Debug, Clone)]
pub struct MslOptions {
    pub version: Version,
    pub platform: Platform,
    pub uniform_buffer: UniformBufferSettings,
    pub push_constants: PushConstantSettings,
}

impl Default for MslOptions {
    fn default() -> Self {
        MslOptions {
            version: Version::V2_0,
            platform: Platform::macOS,
            uniform_buffer: UniformBufferSettings::default(),
            push_constants: PushConstantSettings::default(),
        }
    }
}

impl MslOptions {
    /// MSL options for compiler options. The version is `major * 10 + minor`.
    pub fn new(options: &Options) -> Result<Self, ShaderCompileError> {
        Ok(MslOptions {
            version: msl_version(options.version)?,
            platform: if options.mobile {
                Platform::iOS
            } else {
                Platform::macOS
            },
            uniform_buffer: options.uniform_buffer_settings.clone(),
            push_constants: options.push_constant_settings,
        })
    }
}

/// The MSL language version for `major * 10 + minor`.
pub fn msl_version(version: u32) -> Result<Version, ShaderCompileError> {
    Ok(match (version / 10, version % 10) {
        (1, 0) => Version::V1_0,
        (1, 1) => Version::V1_1,
        (1, 2) => Version::V1_2,
        (2, 0) => Version::V2_0,
        (2, 1) => Version::V2_1,
        (2, 2) => Version::V2_2,
        _ => {
            return Err(ShaderCompileError::UnsupportedVersion {
                target: TargetApi::Metal,
                version,
            })
        }
    })
}

/// The Metal buffer a push constant buffer was assigned to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MslPushConstantBinding {
    pub name: String,
    pub stage: ExecutionModel,
    pub msl_buffer: u32,
}

/// The context for a MSL compilation via spirv-cross.
#[derive(Debug, Default)]
pub struct CrossMslContext {
    /// Push constant buffer assignments, in declaration order.
    pub push_constants: Vec<MslPushConstantBinding>,
}

impl FromCompilation<SpirvCompilation> for MSL {
    type Target = MSL;
    type Options = MslOptions;
    type Context = CrossMslContext;
    type Output = MslReflect;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        Ok(CompilerBackend {
            backend: MslReflect::try_from(&compile)?,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::back::msl::msl_version;

    #[test]
    pub fn maps_msl_versions() {
        for version in [10, 11, 12, 20, 21, 22] {
            assert!(msl_version(version).is_ok(), "{version}");
        }
        assert!(msl_version(23).is_err());
        assert!(msl_version(3).is_err());
    }
}
