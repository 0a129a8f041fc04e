//! Shader source loading for shadert.
//!
//! Macro expansion itself is performed by the GLSL front end. This crate reads
//! shader text and resolves the files named by `#include` directives.
mod error;
mod include;

pub use error::*;
pub use include::{IncludeKind, IncludeResolver, ResolvedInclude};

use std::path::{Path, PathBuf};

/// Shader text ready to be handed to the front end.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    /// The GLSL source text.
    pub text: String,
    /// The name used for the source in diagnostics.
    pub name: String,
    /// The resolver for `#include` directives in this source.
    pub includes: IncludeResolver,
}

impl ShaderSource {
    /// Load a shader from disk. The shader's directory is searched for includes after
    /// every listed include directory.
    pub fn load(
        path: impl AsRef<Path>,
        include_paths: &[PathBuf],
    ) -> Result<ShaderSource, PreprocessError> {
        let path = path.as_ref();
        let text = include::read_file(path)?;
        if text.trim().is_empty() {
            return Err(PreprocessError::EmptySource);
        }

        Ok(ShaderSource {
            text,
            name: path.to_string_lossy().into_owned(),
            includes: IncludeResolver::for_file(path, include_paths),
        })
    }

    /// Wrap in-memory shader text.
    pub fn from_memory(
        source: impl Into<String>,
        include_paths: &[PathBuf],
    ) -> Result<ShaderSource, PreprocessError> {
        let text = source.into();
        if text.trim().is_empty() {
            return Err(PreprocessError::EmptySource);
        }

        Ok(ShaderSource {
            text,
            name: String::from("shader"),
            includes: IncludeResolver::new(include_paths.iter().cloned()),
        })
    }

    /// Whether the source declares its own `#version`.
    pub fn has_version_directive(&self) -> bool {
        self.text
            .lines()
            .any(|line| line.trim_start().starts_with("#version"))
    }
}
