use crate::PreprocessError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// How an include was spelled in the source.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IncludeKind {
    /// `#include "file"`
    Relative,
    /// `#include <file>`
    Standard,
}

/// An include resolved to a file on disk.
#[derive(Debug, Clone)]
pub struct ResolvedInclude {
    /// The canonical name the include is known by in diagnostics and nested includes.
    pub resolved_name: String,
    pub content: String,
}

/// Resolves `#include` directives against an ordered list of directories.
///
/// Quoted includes made from an included file first search that file's directory,
/// then the listed directories in order. Quoted includes in the top-level source
/// search only the listed directories, so a shader's own directory appended by
/// [`IncludeResolver::for_file`] is searched last. Angle-bracket includes search only
/// the listed directories.
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    search_paths: Vec<PathBuf>,
}

impl IncludeResolver {
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        IncludeResolver {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a resolver for a shader on disk. The shader's own directory is searched
    /// after every listed directory.
    pub fn for_file(path: impl AsRef<Path>, search_paths: &[PathBuf]) -> Self {
        let mut resolver = Self::new(search_paths.iter().cloned());
        if let Some(parent) = path.as_ref().parent() {
            resolver.search_paths.push(parent.to_path_buf());
        }
        resolver
    }

    /// The directories searched, in order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolve `requested`, included from the file named `requesting`.
    ///
    /// `depth` is 1 for includes in the top-level source and grows by one for each
    /// level of nesting.
    pub fn resolve(
        &self,
        requested: &str,
        kind: IncludeKind,
        requesting: &str,
        depth: usize,
    ) -> Result<ResolvedInclude, PreprocessError> {
        let local = match kind {
            IncludeKind::Relative if depth > 1 => Path::new(requesting)
                .parent()
                .filter(|p| !p.as_os_str().is_empty() && p.is_dir()),
            _ => None,
        };

        let candidate = local
            .into_iter()
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(requested))
            .find(|path| path.is_file());

        let Some(path) = candidate else {
            return Err(PreprocessError::IncludeNotFound {
                name: requested.to_string(),
                requested_by: requesting.to_string(),
            });
        };

        let content = read_file(&path)?;
        log::trace!("resolved include {requested} to {}", path.display());
        Ok(ResolvedInclude {
            resolved_name: path.to_string_lossy().into_owned(),
            content,
        })
    }
}

pub(crate) fn read_file(path: impl AsRef<Path>) -> Result<String, PreprocessError> {
    let path = path.as_ref();
    let mut source = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut source))
        .map_err(|e| PreprocessError::IOError(path.to_path_buf(), e))?;
    Ok(source)
}

#[cfg(test)]
mod test {
    use crate::{IncludeKind, IncludeResolver, PreprocessError};
    use std::path::PathBuf;

    #[test]
    pub fn resolves_in_listed_order() {
        let resolver = IncludeResolver::new(["../test/include/a", "../test/include/b"]);
        let resolved = resolver
            .resolve("common.glsl", IncludeKind::Standard, "shader.frag", 1)
            .unwrap();
        assert!(resolved.content.contains("INCLUDE_A"));
    }

    #[test]
    pub fn falls_back_to_later_directory() {
        let resolver = IncludeResolver::new(["../test/include/a", "../test/include/b"]);
        let resolved = resolver
            .resolve("only_b.glsl", IncludeKind::Relative, "shader.frag", 1)
            .unwrap();
        assert!(resolved.content.contains("INCLUDE_B"));
    }

    #[test]
    pub fn nested_quoted_include_prefers_includer_directory() {
        let resolver = IncludeResolver::new(["../test/include/a"]);
        let requesting = PathBuf::from("../test/include/b/only_b.glsl");
        let requesting = requesting.to_string_lossy();

        let resolved = resolver
            .resolve("common.glsl", IncludeKind::Relative, &requesting, 2)
            .unwrap();
        assert!(resolved.content.contains("INCLUDE_B"));

        let resolved = resolver
            .resolve("common.glsl", IncludeKind::Standard, &requesting, 2)
            .unwrap();
        assert!(resolved.content.contains("INCLUDE_A"));
    }

    #[test]
    pub fn file_directory_is_searched_last() {
        let resolver =
            IncludeResolver::for_file("../test/include/b/main.frag", &["../test/include/a".into()]);
        assert_eq!(
            resolver.search_paths(),
            &[
                PathBuf::from("../test/include/a"),
                PathBuf::from("../test/include/b")
            ]
        );

        // Both directories hold a common.glsl. The listed one wins.
        let resolved = resolver
            .resolve(
                "common.glsl",
                IncludeKind::Relative,
                "../test/include/b/main.frag",
                1,
            )
            .unwrap();
        assert!(resolved.content.contains("INCLUDE_A"), "{}", resolved.resolved_name);

        // Files only in the shader's own directory still resolve.
        let resolved = resolver
            .resolve(
                "only_b.glsl",
                IncludeKind::Relative,
                "../test/include/b/main.frag",
                1,
            )
            .unwrap();
        assert!(resolved.content.contains("INCLUDE_B"));
    }

    #[test]
    pub fn missing_include_is_an_error() {
        let resolver = IncludeResolver::new(["../test/include/a"]);
        let err = resolver
            .resolve("nope.glsl", IncludeKind::Relative, "shader.frag", 1)
            .unwrap_err();
        assert!(matches!(err, PreprocessError::IncludeNotFound { .. }));
    }
}
