use shadert_preprocess::PreprocessError;
use shadert_reflect::error::{ShaderCompileError, ShaderReflectError};
use thiserror::Error;

/// The class of failure a [`TranspileError`] belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorCategory {
    /// The source could not be loaded, preprocessed, parsed or linked.
    Source,
    /// The SPIR-V optimizer rejected the module.
    Optimization,
    /// The reflected interface could not be recovered or did not match.
    Reflection,
    /// The target does not support the request, or its toolchain failed.
    Backend,
}

/// Error type for a transpile request.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TranspileError {
    /// Loading the shader source failed.
    #[error("preprocess: {0}")]
    Preprocess(#[from] PreprocessError),
    /// Compiling the shader failed.
    #[error("compile: {0}")]
    Compile(#[from] ShaderCompileError),
    /// Reflecting the shader failed.
    #[error("reflect: {0}")]
    Reflect(#[from] ShaderReflectError),
}

impl TranspileError {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranspileError::Preprocess(_) => ErrorCategory::Source,
            TranspileError::Reflect(_) => ErrorCategory::Reflection,
            TranspileError::Compile(err) => match err {
                ShaderCompileError::Source { .. } => ErrorCategory::Source,
                ShaderCompileError::OptimizerError(_) => ErrorCategory::Optimization,
                ShaderCompileError::ReflectError(_) => ErrorCategory::Reflection,
                _ => ErrorCategory::Backend,
            },
        }
    }

    /// Whether the same request may succeed with `Options::debug` set, which skips
    /// optimization.
    pub fn is_retryable_in_debug(&self) -> bool {
        self.category() == ErrorCategory::Optimization
    }
}

#[cfg(test)]
mod test {
    use crate::error::{ErrorCategory, TranspileError};
    use shadert_preprocess::PreprocessError;
    use shadert_reflect::error::{FrontendStage, ShaderCompileError, ShaderReflectError};

    #[test]
    pub fn classifies_errors() {
        let source: TranspileError = ShaderCompileError::Source {
            stage: FrontendStage::Parse,
            log: String::new(),
        }
        .into();
        assert_eq!(source.category(), ErrorCategory::Source);
        assert!(!source.is_retryable_in_debug());

        let empty: TranspileError = PreprocessError::EmptySource.into();
        assert_eq!(empty.category(), ErrorCategory::Source);

        let optimizer: TranspileError =
            ShaderCompileError::OptimizerError(String::from("bad")).into();
        assert_eq!(optimizer.category(), ErrorCategory::Optimization);
        assert!(optimizer.is_retryable_in_debug());

        let mismatch: TranspileError = ShaderReflectError::InterfaceMismatch {
            name: String::from("a"),
            location: 0,
        }
        .into();
        assert_eq!(mismatch.category(), ErrorCategory::Reflection);

        let nested: TranspileError = ShaderCompileError::ReflectError(
            ShaderReflectError::UnmappedExecutionModel(String::from("Kernel")),
        )
        .into();
        assert_eq!(nested.category(), ErrorCategory::Reflection);

        let toolchain: TranspileError =
            ShaderCompileError::ToolchainError(String::from("fxc")).into();
        assert_eq!(toolchain.category(), ErrorCategory::Backend);
    }
}
