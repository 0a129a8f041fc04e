//! Common types shared between the shadert crates.

/// Build-time capability flags.
pub mod capabilities;
/// Hash map aliases.
pub mod map;
/// Per-request compiler options.
pub mod options;

pub use options::{Options, PushConstantSettings, UniformBufferSettings};

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stage or target name can not be parsed.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("unknown {kind} `{name}`")]
pub struct ParseNameError {
    kind: &'static str,
    name: String,
}

/// The pipeline stage a shader is compiled for.
///
/// Every stage maps to exactly one SPIR-V execution model.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ShaderStage {
    Vertex = 0,
    Fragment,
    TessControl,
    TessEval,
    Geometry,
    Compute,
}

impl ShaderStage {
    /// All stages, in pipeline order.
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    /// The conventional file extension for a GLSL source of this stage.
    pub const fn extension(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::TessControl => "tesc",
            ShaderStage::TessEval => "tese",
            ShaderStage::Geometry => "geom",
            ShaderStage::Compute => "comp",
        }
    }
}

impl FromStr for ShaderStage {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "vert" | "vertex" => ShaderStage::Vertex,
            "frag" | "fragment" => ShaderStage::Fragment,
            "tesc" | "tess_control" => ShaderStage::TessControl,
            "tese" | "tess_eval" => ShaderStage::TessEval,
            "geom" | "geometry" => ShaderStage::Geometry,
            "comp" | "compute" => ShaderStage::Compute,
            _ => {
                return Err(ParseNameError {
                    kind: "shader stage",
                    name: s.to_string(),
                })
            }
        })
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// The graphics API a shader is compiled for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TargetApi {
    /// Desktop GLSL.
    OpenGL,
    /// GLSL ES.
    OpenGLES,
    /// SPIR-V, optimized unless compiling for debug.
    Vulkan,
    /// HLSL source.
    HLSL,
    /// Metal Shading Language source.
    Metal,
    /// A native Metal library. Only available on Apple targets with the `metal-binary` feature.
    MetalBinary,
    /// A compiled Direct3D shader blob. Only available with the `dxil` feature.
    DXIL,
    /// WGSL source.
    WGSL,
}

impl TargetApi {
    /// Whether this target can be compiled for in the current build configuration.
    pub const fn is_available(&self) -> bool {
        match self {
            TargetApi::DXIL => capabilities::DXIL,
            TargetApi::MetalBinary => capabilities::METAL_BINARY,
            _ => true,
        }
    }
}

impl FromStr for TargetApi {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "opengl" | "gl" => TargetApi::OpenGL,
            "opengl_es" | "gles" => TargetApi::OpenGLES,
            "vulkan" | "spirv" => TargetApi::Vulkan,
            "hlsl" => TargetApi::HLSL,
            "metal" | "msl" => TargetApi::Metal,
            "metal_binary" | "metallib" => TargetApi::MetalBinary,
            "dxil" => TargetApi::DXIL,
            "wgsl" => TargetApi::WGSL,
            _ => {
                return Err(ParseNameError {
                    kind: "target api",
                    name: s.to_string(),
                })
            }
        })
    }
}

impl Display for TargetApi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TargetApi::OpenGL => "OpenGL",
            TargetApi::OpenGLES => "OpenGL ES",
            TargetApi::Vulkan => "Vulkan",
            TargetApi::HLSL => "HLSL",
            TargetApi::Metal => "Metal",
            TargetApi::MetalBinary => "Metal (binary)",
            TargetApi::DXIL => "DXIL",
            TargetApi::WGSL => "WGSL",
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{ShaderStage, TargetApi};

    #[test]
    pub fn stage_names_round_trip() {
        for stage in ShaderStage::ALL {
            assert_eq!(stage, stage.extension().parse().unwrap());
        }
        assert!("mesh".parse::<ShaderStage>().is_err());
    }

    #[test]
    pub fn portable_targets_are_available() {
        for api in [
            TargetApi::OpenGL,
            TargetApi::OpenGLES,
            TargetApi::Vulkan,
            TargetApi::HLSL,
            TargetApi::Metal,
            TargetApi::WGSL,
        ] {
            assert!(api.is_available(), "{api} should always be available");
        }
        assert_eq!(TargetApi::DXIL.is_available(), cfg!(feature = "dxil"));
    }
}
