use std::path::PathBuf;
use thiserror::Error;

/// Error type for source loading and include resolution.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// The file could not be read.
    #[error("could not read {0}: {1}")]
    IOError(PathBuf, std::io::Error),
    /// No include directory contained the requested file.
    #[error("could not resolve include `{name}` requested by `{requested_by}`")]
    IncludeNotFound { name: String, requested_by: String },
    /// The shader source was empty.
    #[error("the shader source was empty")]
    EmptySource,
}
