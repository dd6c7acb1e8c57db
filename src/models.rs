//! Core data models for Comprehender
//!
//! The structural model is built once per run by the parser and treated as
//! immutable afterwards: the dependency graph builder and the task
//! partitioner both read from it, nothing writes back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A source file loaded for one run.
///
/// Identity is the repository-relative path. The raw text is kept verbatim
/// so the merger can splice annotations without re-reading from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the repository root
    pub path: PathBuf,
    /// Raw UTF-8 source text
    pub text: String,
    /// Byte offset of the start of each line, for offset -> line lookups
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            path: path.into(),
            text,
            line_starts,
        }
    }

    /// 1-based line number containing the given byte offset.
    pub fn line_of(&self, offset: usize) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i as u32 + 1,
            Err(i) => i as u32,
        }
    }

    /// Byte offset of the start of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        let line = self.line_of(offset) as usize;
        self.line_starts[line - 1]
    }

    /// Byte offset just past the end of the line containing `offset`,
    /// excluding the trailing newline.
    pub fn line_end(&self, offset: usize) -> usize {
        let line = self.line_of(offset) as usize;
        match self.line_starts.get(line) {
            Some(&next) => next - 1,
            None => self.text.len(),
        }
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn indent_at(&self, offset: usize) -> &str {
        let start = self.line_start(offset);
        let line = &self.text[start..self.line_end(offset)];
        let end = line.len() - line.trim_start().len();
        &line[..end]
    }
}

/// Kind of a top-level or nested type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKind::Class => write!(f, "class"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Enum => write!(f, "enum"),
            TypeKind::Annotation => write!(f, "annotation"),
            TypeKind::Record => write!(f, "record"),
        }
    }
}

/// Kind of a type member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
}

/// A method, constructor, or field inside a type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    /// Declaration text up to (not including) the body
    pub signature: String,
    /// Exact byte offsets of the declaration in the original source,
    /// including modifiers and annotations
    pub start: usize,
    pub end: usize,
    pub line: u32,
    /// Length in bytes of the body, 0 for fields and abstract methods
    pub body_len: usize,
    /// Raw, unresolved type names referenced by the declaration and body
    pub referenced: Vec<String>,
    /// Whether a Javadoc block immediately precedes the declaration
    pub has_javadoc: bool,
}

/// A class, interface, enum, annotation, or record declaration.
///
/// Nested types form a tree following source lexical order; they are never
/// flattened so the comment insertion point stays correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Simple name, dotted for nested types (`Outer.Inner`)
    pub name: String,
    /// Package-qualified name
    pub qualified_name: String,
    pub kind: TypeKind,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    /// Superclass and implemented/extended interfaces, raw names
    pub supertypes: Vec<String>,
    pub members: Vec<Member>,
    pub nested: Vec<TypeDeclaration>,
    /// Raw type names referenced anywhere in this type's extent, excluding
    /// nested type declarations (those carry their own lists). One entry per
    /// textual occurrence so edge multiplicities stay deterministic.
    pub referenced: Vec<String>,
    pub has_javadoc: bool,
}

impl TypeDeclaration {
    /// This type and all nested types, depth first.
    pub fn iter_with_nested(&self) -> Vec<&TypeDeclaration> {
        let mut out = vec![self];
        for nested in &self.nested {
            out.extend(nested.iter_with_nested());
        }
        out
    }
}

/// The parsed structure of one source file.
///
/// Package name and import list are derived once at parse time and never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub path: PathBuf,
    /// Empty string for the default package
    pub package: String,
    /// Import paths as written, wildcard imports keep their `.*`
    pub imports: Vec<String>,
    /// Top-level type declarations in source order
    pub types: Vec<TypeDeclaration>,
    /// Whether the file already opens with a block comment
    pub has_header_comment: bool,
    /// Byte offset where a file-level comment should be inserted
    /// (after the package declaration, or 0)
    pub header_insert_offset: usize,
}

impl CompilationUnit {
    /// All type declarations in the unit, nested included, depth first.
    pub fn all_types(&self) -> Vec<&TypeDeclaration> {
        self.types.iter().flat_map(|t| t.iter_with_nested()).collect()
    }

    /// Qualify a simple name with this unit's package.
    pub fn qualify(&self, name: &str) -> String {
        if self.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.package, name)
        }
    }
}

/// Build the output path for a merged file: `<stem><suffix>.java` under
/// `out_root`, mirroring the input's relative directory structure.
pub fn output_path(out_root: &Path, relative: &Path, suffix: &str) -> PathBuf {
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = relative
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("java");
    let file_name = format!("{stem}{suffix}.{ext}");
    match relative.parent() {
        Some(parent) => out_root.join(parent).join(file_name),
        None => out_root.join(file_name),
    }
}
