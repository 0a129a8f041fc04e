use crate::back::targets::{GLSL, HLSL};
use crate::back::{CompilerBackend, FromCompilation};
use crate::error::{ShaderCompileError, ShaderReflectError};
use crate::front::SpirvCompilation;
use crate::reflect::cross::{GlslReflect, HlslReflect};
use shadert_common::TargetApi;
use spirv_cross::glsl::Version as GlslVersion;
use spirv_cross::hlsl::ShaderModel;

/// The GLSL version for a version number, or the GLSL ES version if `mobile` is set.
///
/// ES 1.00 and 3.00 are the only ES versions available.
pub fn glsl_version(version: u32, mobile: bool) -> Result<GlslVersion, ShaderCompileError> {
    let target = if mobile {
        TargetApi::OpenGLES
    } else {
        TargetApi::OpenGL
    };

    Ok(match (version, mobile) {
        (100, true) => GlslVersion::V1_00Es,
        (300, true) => GlslVersion::V3_00Es,
        (110, false) => GlslVersion::V1_10,
        (120, false) => GlslVersion::V1_20,
        (130, false) => GlslVersion::V1_30,
        (140, false) => GlslVersion::V1_40,
        (150, false) => GlslVersion::V1_50,
        (330, false) => GlslVersion::V3_30,
        (400, false) => GlslVersion::V4_00,
        (410, false) => GlslVersion::V4_10,
        (420, false) => GlslVersion::V4_20,
        (430, false) => GlslVersion::V4_30,
        (440, false) => GlslVersion::V4_40,
        (450, false) => GlslVersion::V4_50,
        (460, false) => GlslVersion::V4_60,
        _ => return Err(ShaderCompileError::UnsupportedVersion { target, version }),
    })
}

/// The HLSL shader model for a shader model number times ten.
///
/// Shader model 6.0 source is emitted for every version from 60 up.
pub fn shader_model(target: TargetApi, version: u32) -> Result<ShaderModel, ShaderCompileError> {
    Ok(match version {
        30 => ShaderModel::V3_0,
        40 => ShaderModel::V4_0,
        41 => ShaderModel::V4_1,
        50 => ShaderModel::V5_0,
        51 => ShaderModel::V5_1,
        v if v >= 60 => ShaderModel::V6_0,
        _ => return Err(ShaderCompileError::UnsupportedVersion { target, version }),
    })
}

impl FromCompilation<SpirvCompilation> for GLSL {
    type Target = GLSL;
    type Options = GlslVersion;
    type Context = ();
    type Output = GlslReflect;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        Ok(CompilerBackend {
            backend: GlslReflect::try_from(&compile)?,
        })
    }
}

impl FromCompilation<SpirvCompilation> for HLSL {
    type Target = HLSL;
    type Options = ShaderModel;
    type Context = ();
    type Output = HlslReflect;

    fn from_compilation(
        compile: SpirvCompilation,
    ) -> Result<CompilerBackend<Self::Output>, ShaderReflectError> {
        Ok(CompilerBackend {
            backend: HlslReflect::try_from(&compile)?,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::back::cross::{glsl_version, shader_model};
    use crate::error::ShaderCompileError;
    use shadert_common::TargetApi;
    use spirv_cross::glsl::Version;
    use spirv_cross::hlsl::ShaderModel;

    #[test]
    pub fn maps_glsl_versions() {
        assert!(matches!(glsl_version(330, false), Ok(Version::V3_30)));
        assert!(matches!(glsl_version(300, true), Ok(Version::V3_00Es)));
        assert!(matches!(
            glsl_version(300, false),
            Err(ShaderCompileError::UnsupportedVersion {
                target: TargetApi::OpenGL,
                version: 300
            })
        ));
        assert!(matches!(
            glsl_version(310, true),
            Err(ShaderCompileError::UnsupportedVersion {
                target: TargetApi::OpenGLES,
                ..
            })
        ));
    }

    #[test]
    pub fn maps_shader_models() {
        assert!(matches!(
            shader_model(TargetApi::HLSL, 50),
            Ok(ShaderModel::V5_0)
        ));
        assert!(matches!(
            shader_model(TargetApi::HLSL, 66),
            Ok(ShaderModel::V6_0)
        ));
        assert!(shader_model(TargetApi::HLSL, 45).is_err());
    }
}
