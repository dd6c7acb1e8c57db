//! Structural parsing of Java source using tree-sitter
//!
//! Turns raw source text into an addressable model (compilation units,
//! type declarations, members) with exact byte offsets, so the merger can
//! splice generated comments without re-parsing.

mod java;

pub use java::parse_source;

use crate::models::{CompilationUnit, SourceFile};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file-scoped parse failure. One bad file never aborts the run; the
/// pipeline records the error and moves on.
#[derive(Error, Debug, Clone)]
#[error("failed to parse {}{}: {}", path.display(), line.map(|l| format!(":{l}")).unwrap_or_default(), message)]
pub struct ParseError {
    pub path: PathBuf,
    /// Best-effort line number of the first syntax error
    pub line: Option<u32>,
    pub message: String,
}

/// Read and parse a single Java file.
///
/// `relative` is the repository-relative path recorded as the file's
/// identity throughout the run.
pub fn parse_file(root: &Path, relative: &Path) -> Result<(SourceFile, CompilationUnit), ParseError> {
    let text = std::fs::read_to_string(root.join(relative)).map_err(|e| ParseError {
        path: relative.to_path_buf(),
        line: None,
        message: format!("read failed: {e}"),
    })?;

    let source = SourceFile::new(relative, text);
    let unit = parse_source(&source)?;
    Ok((source, unit))
}
