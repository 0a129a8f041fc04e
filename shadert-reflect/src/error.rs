use shadert_common::{ShaderStage, TargetApi};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The front end step a source error was raised in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrontendStage {
    /// Macro and include expansion.
    Preprocess,
    /// Parsing and lowering to SPIR-V.
    Parse,
    /// Single-stage program linking.
    Link,
}

impl Display for FrontendStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FrontendStage::Preprocess => "preprocessing",
            FrontendStage::Parse => "parsing",
            FrontendStage::Link => "linking",
        })
    }
}

/// Error type for shader compilation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ShaderCompileError {
    /// The GLSL front end rejected the source.
    #[error("shader {stage} failed:\n{log}")]
    Source { stage: FrontendStage, log: String },

    /// Error when initializing the glslang compiler.
    #[error("glslang init")]
    CompilerInitError,

    /// The SPIR-V optimizer reported an error.
    #[error("optimizer: {0}")]
    OptimizerError(String),

    /// The requested version has no equivalent for the target.
    #[error("version {version} is not supported for {target}")]
    UnsupportedVersion { target: TargetApi, version: u32 },

    /// The target has no profile for the shader stage.
    #[error("{stage} shaders are not supported for {target}")]
    UnsupportedStage { target: TargetApi, stage: ShaderStage },

    /// The module did not have exactly one entry point.
    #[error("expected exactly one entry point, found {0}")]
    InvalidEntryPointCount(usize),

    /// The target is not available in this build.
    #[error("{0} is not available in this build")]
    CapabilityUnavailable(TargetApi),

    /// Error when transpiling from spirv-cross.
    #[error("cross: {0:?}")]
    SpirvCrossCompileError(spirv_cross::ErrorCode),

    /// Error when parsing SPIR-V with naga.
    #[error("naga: {0}")]
    NagaCompileError(#[from] naga::front::spv::Error),

    /// Error when validating a naga module.
    #[error("naga validation: {0}")]
    NagaValidationError(#[from] naga::WithSpan<naga::valid::ValidationError>),

    /// Error when writing WGSL with naga.
    #[error("naga wgsl: {0}")]
    NagaWgslError(#[from] naga::back::wgsl::Error),

    /// A native toolchain failed. The diagnostics are reported verbatim.
    #[error("{0}")]
    ToolchainError(String),

    /// Reflection failed while compiling.
    #[error("reflect: {0}")]
    ReflectError(#[from] ShaderReflectError),
}

impl From<spirv_cross::ErrorCode> for ShaderCompileError {
    fn from(err: spirv_cross::ErrorCode) -> Self {
        ShaderCompileError::SpirvCrossCompileError(err)
    }
}

/// Error type for shader reflection.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ShaderReflectError {
    /// The module could not be parsed as SPIR-V.
    #[error("spirv parse: {0}")]
    SpirvParseError(#[from] rspirv::binary::ParseState),

    /// Reflection error from spirv-cross.
    #[error("spirv: {0:?}")]
    SpirvCrossError(#[from] spirv_cross::ErrorCode),

    /// A live attribute reported by the front end is missing from the backend's inputs.
    #[error("attribute `{name}` at location {location} is missing from the stage inputs")]
    InterfaceMismatch { name: String, location: u32 },

    /// The backend reflected fewer stage inputs than the front end found live.
    #[error("{live} live attributes but only {reflected} stage inputs")]
    InterfaceCountMismatch { live: usize, reflected: usize },

    /// The module's execution model has no corresponding shader stage.
    #[error("execution model {0} has no shader stage")]
    UnmappedExecutionModel(String),
}
