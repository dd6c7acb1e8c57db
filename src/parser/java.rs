//! Java structural extraction using tree-sitter
//!
//! Extracts packages, imports, type declarations (nested included), members,
//! and raw referenced-type names from Java source. Every declaration records
//! its exact byte range in the original text.

use crate::models::{
    CompilationUnit, Member, MemberKind, SourceFile, TypeDeclaration, TypeKind,
};
use crate::parser::ParseError;
use tree_sitter::{Node, Parser};

/// Parse Java source into a compilation unit.
///
/// Files with syntax errors are rejected with a best-effort line number;
/// the caller is expected to skip them and continue with the rest of the run.
pub fn parse_source(source: &SourceFile) -> Result<CompilationUnit, ParseError> {
    let mut parser = Parser::new();
    let language = tree_sitter_java::LANGUAGE;
    parser
        .set_language(&language.into())
        .map_err(|e| ParseError {
            path: source.path.clone(),
            line: None,
            message: format!("failed to load Java grammar: {e}"),
        })?;

    let tree = parser.parse(&source.text, None).ok_or_else(|| ParseError {
        path: source.path.clone(),
        line: None,
        message: "tree-sitter returned no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseError {
            path: source.path.clone(),
            line: first_error_line(&root),
            message: "syntax error".to_string(),
        });
    }

    let bytes = source.text.as_bytes();
    let package = extract_package(&root, bytes);
    let imports = extract_imports(&root, bytes);

    let mut types = Vec::new();
    for child in root.children(&mut root.walk()) {
        if let Some(decl) = parse_type_node(&child, bytes, &package, None) {
            types.push(decl);
        }
    }

    Ok(CompilationUnit {
        path: source.path.clone(),
        package,
        imports,
        types,
        has_header_comment: has_header_comment(&root),
        header_insert_offset: header_insert_offset(&root, source),
    })
}

/// Line of the first ERROR node, if any
fn first_error_line(root: &Node) -> Option<u32> {
    let mut cursor = root.walk();
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.is_error() {
            return Some(node.start_position().row as u32 + 1);
        }
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    None
}

fn extract_package(root: &Node, source: &[u8]) -> String {
    for child in root.children(&mut root.walk()) {
        if child.kind() == "package_declaration" {
            if let Ok(text) = child.utf8_text(source) {
                return text
                    .trim_start_matches("package")
                    .trim_end_matches(';')
                    .trim()
                    .to_string();
            }
        }
    }
    String::new()
}

/// Import paths as written; wildcard imports keep their trailing `.*` and
/// static imports their `static ` prefix.
fn extract_imports(root: &Node, source: &[u8]) -> Vec<String> {
    let mut imports = Vec::new();
    for child in root.children(&mut root.walk()) {
        if child.kind() == "import_declaration" {
            if let Ok(text) = child.utf8_text(source) {
                let path = text
                    .trim_start_matches("import")
                    .trim_end_matches(';')
                    .trim()
                    .to_string();
                imports.push(path);
            }
        }
    }
    imports
}

/// Whether the file opens with a block comment before any declaration
fn has_header_comment(root: &Node) -> bool {
    for child in root.children(&mut root.walk()) {
        match child.kind() {
            "block_comment" => return true,
            "line_comment" => continue,
            _ => return false,
        }
    }
    false
}

/// Insertion point for a file-level comment: the line after the package
/// declaration, or the top of the file.
fn header_insert_offset(root: &Node, source: &SourceFile) -> usize {
    for child in root.children(&mut root.walk()) {
        if child.kind() == "package_declaration" {
            let end = source.line_end(child.end_byte());
            return (end + 1).min(source.text.len());
        }
    }
    0
}

fn type_kind(node_kind: &str) -> Option<TypeKind> {
    match node_kind {
        "class_declaration" => Some(TypeKind::Class),
        "interface_declaration" => Some(TypeKind::Interface),
        "enum_declaration" => Some(TypeKind::Enum),
        "annotation_type_declaration" => Some(TypeKind::Annotation),
        "record_declaration" => Some(TypeKind::Record),
        _ => None,
    }
}

/// Parse one type declaration node, recursing into nested types.
fn parse_type_node(
    node: &Node,
    source: &[u8],
    package: &str,
    parent: Option<&str>,
) -> Option<TypeDeclaration> {
    let kind = type_kind(node.kind())?;
    let name_node = node.child_by_field_name("name")?;
    let simple = name_node.utf8_text(source).ok()?.to_string();

    let name = match parent {
        Some(parent_name) => format!("{parent_name}.{simple}"),
        None => simple,
    };
    let qualified_name = if package.is_empty() {
        name.clone()
    } else {
        format!("{package}.{name}")
    };

    let supertypes = extract_supertypes(node, source);
    let mut members = Vec::new();
    let mut nested = Vec::new();

    if let Some(body) = node.child_by_field_name("body") {
        collect_body(&body, source, package, &name, &mut members, &mut nested);
    }

    let mut referenced = Vec::new();
    collect_type_refs(node, source, &mut referenced);

    Some(TypeDeclaration {
        name,
        qualified_name,
        kind,
        start: node.start_byte(),
        end: node.end_byte(),
        line: node.start_position().row as u32 + 1,
        supertypes,
        members,
        nested,
        referenced,
        has_javadoc: has_preceding_javadoc(node, source),
    })
}

/// Superclass plus implemented/extended interfaces, raw names
fn extract_supertypes(node: &Node, source: &[u8]) -> Vec<String> {
    let mut supertypes = Vec::new();

    if let Some(superclass) = node.child_by_field_name("superclass") {
        for child in superclass.children(&mut superclass.walk()) {
            if is_type_name(child.kind()) {
                if let Ok(text) = child.utf8_text(source) {
                    supertypes.push(base_name(text));
                }
            }
        }
    }

    for child in node.children(&mut node.walk()) {
        if child.kind() == "super_interfaces" || child.kind() == "extends_interfaces" {
            collect_interface_names(&child, source, &mut supertypes);
        }
    }

    supertypes
}

fn collect_interface_names(node: &Node, source: &[u8], out: &mut Vec<String>) {
    for child in node.children(&mut node.walk()) {
        if is_type_name(child.kind()) {
            if let Ok(text) = child.utf8_text(source) {
                out.push(base_name(text));
            }
        } else if child.kind() == "type_list" {
            collect_interface_names(&child, source, out);
        }
    }
}

fn is_type_name(kind: &str) -> bool {
    kind == "type_identifier" || kind == "generic_type" || kind == "scoped_type_identifier"
}

/// Strip generic arguments: `Map<String, Foo>` -> `Map`
fn base_name(text: &str) -> String {
    match text.find('<') {
        Some(i) => text[..i].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Walk a type body collecting members and nested type declarations.
///
/// Enum bodies nest their members inside an `enum_body_declarations` node,
/// so recurse through that level too.
fn collect_body(
    body: &Node,
    source: &[u8],
    package: &str,
    type_name: &str,
    members: &mut Vec<Member>,
    nested: &mut Vec<TypeDeclaration>,
) {
    for child in body.children(&mut body.walk()) {
        match child.kind() {
            "method_declaration" => {
                if let Some(member) = parse_method_node(&child, source, MemberKind::Method) {
                    members.push(member);
                }
            }
            "constructor_declaration" => {
                if let Some(member) = parse_method_node(&child, source, MemberKind::Constructor) {
                    members.push(member);
                }
            }
            "field_declaration" | "constant_declaration" => {
                if let Some(member) = parse_field_node(&child, source) {
                    members.push(member);
                }
            }
            // `@interface` elements look like bodyless methods
            "annotation_type_element_declaration" => {
                if let Some(member) = parse_method_node(&child, source, MemberKind::Method) {
                    members.push(member);
                }
            }
            "enum_body_declarations" => {
                collect_body(&child, source, package, type_name, members, nested);
            }
            _ => {
                if let Some(decl) = parse_type_node(&child, source, package, Some(type_name)) {
                    nested.push(decl);
                }
            }
        }
    }
}

fn parse_method_node(node: &Node, source: &[u8], kind: MemberKind) -> Option<Member> {
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(source).ok()?.to_string();

    let body = node.child_by_field_name("body");
    let signature_end = body.map(|b| b.start_byte()).unwrap_or_else(|| node.end_byte());
    let signature = std::str::from_utf8(&source[node.start_byte()..signature_end])
        .ok()?
        .trim_end()
        .trim_end_matches(';')
        .trim_end()
        .to_string();

    let mut referenced = Vec::new();
    collect_type_refs(node, source, &mut referenced);

    Some(Member {
        name,
        kind,
        signature,
        start: node.start_byte(),
        end: node.end_byte(),
        line: node.start_position().row as u32 + 1,
        body_len: body.map(|b| b.byte_range().len()).unwrap_or(0),
        referenced,
        has_javadoc: has_preceding_javadoc(node, source),
    })
}

/// One member per field declaration. Multi-declarator fields
/// (`int a, b;`) keep the first declarator's name; the byte range covers
/// the whole declaration either way.
fn parse_field_node(node: &Node, source: &[u8]) -> Option<Member> {
    let mut name = None;
    for child in node.children(&mut node.walk()) {
        if child.kind() == "variable_declarator" {
            if let Some(name_node) = child.child_by_field_name("name") {
                if let Ok(text) = name_node.utf8_text(source) {
                    name = Some(text.to_string());
                    break;
                }
            }
        }
    }

    let signature = std::str::from_utf8(&source[node.byte_range()])
        .ok()?
        .trim_end()
        .to_string();

    let mut referenced = Vec::new();
    collect_type_refs(node, source, &mut referenced);

    Some(Member {
        name: name?,
        kind: MemberKind::Field,
        signature,
        start: node.start_byte(),
        end: node.end_byte(),
        line: node.start_position().row as u32 + 1,
        body_len: 0,
        referenced,
        has_javadoc: has_preceding_javadoc(node, source),
    })
}

/// Collect raw referenced type names in a subtree: every `type_identifier`
/// occurrence plus `new` expressions, skipping nested type declarations
/// (those get their own node in the graph).
///
/// Occurrences are kept one-per-mention so the graph builder can count
/// multiplicities deterministically.
fn collect_type_refs(node: &Node, source: &[u8], out: &mut Vec<String>) {
    for child in node.children(&mut node.walk()) {
        if type_kind(child.kind()).is_some() && child.id() != node.id() {
            continue;
        }
        if child.kind() == "type_identifier" {
            if let Ok(text) = child.utf8_text(source) {
                out.push(text.to_string());
            }
            continue;
        }
        collect_type_refs(&child, source, out);
    }
}

/// Whether a Javadoc block (`/** ... */`) immediately precedes a declaration.
/// Regular `/* */` and `//` comments don't count.
fn has_preceding_javadoc(node: &Node, source: &[u8]) -> bool {
    let mut sibling = node.prev_sibling();
    while let Some(sib) = sibling {
        match sib.kind() {
            "block_comment" => {
                return sib
                    .utf8_text(source)
                    .map(|t| t.starts_with("/**"))
                    .unwrap_or(false);
            }
            "line_comment" => {
                sibling = sib.prev_sibling();
            }
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CompilationUnit {
        let sf = SourceFile::new("Test.java", source);
        parse_source(&sf).expect("should parse Java source")
    }

    #[test]
    fn test_parse_simple_class() {
        let unit = parse(
            r#"
package com.example;

public class HelloWorld {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#,
        );
        assert_eq!(unit.package, "com.example");
        assert_eq!(unit.types.len(), 1);
        let class = &unit.types[0];
        assert_eq!(class.name, "HelloWorld");
        assert_eq!(class.qualified_name, "com.example.HelloWorld");
        assert_eq!(class.kind, TypeKind::Class);
        assert_eq!(class.members.len(), 1);
        assert_eq!(class.members[0].name, "main");
        assert_eq!(class.members[0].kind, MemberKind::Method);
    }

    #[test]
    fn test_offsets_match_source() {
        let source = "package p;\n\npublic class Foo {\n    int x;\n}\n";
        let unit = parse(source);
        let class = &unit.types[0];
        assert_eq!(&source[class.start..class.start + 6], "public");
        let field = &class.members[0];
        assert_eq!(&source[field.start..field.end], "int x;");
    }

    #[test]
    fn test_imports_and_wildcards() {
        let unit = parse(
            "import java.util.List;\nimport java.io.*;\nimport static java.lang.Math.PI;\nclass T {}\n",
        );
        assert_eq!(
            unit.imports,
            vec!["java.util.List", "java.io.*", "static java.lang.Math.PI"]
        );
    }

    #[test]
    fn test_nested_types_form_tree() {
        let unit = parse(
            r#"
public class Outer {
    private int count;

    public static class Inner {
        void run() {}
    }
}
"#,
        );
        assert_eq!(unit.types.len(), 1);
        let outer = &unit.types[0];
        assert_eq!(outer.nested.len(), 1);
        assert_eq!(outer.nested[0].name, "Outer.Inner");
        assert_eq!(outer.nested[0].members.len(), 1);
        // Nested member refs stay out of the outer type's member list
        assert_eq!(outer.members.len(), 1);
    }

    #[test]
    fn test_supertypes() {
        let unit = parse(
            "public class Child extends Parent implements Runnable, Comparable<Child> {}\n",
        );
        let class = &unit.types[0];
        assert!(class.supertypes.contains(&"Parent".to_string()));
        assert!(class.supertypes.contains(&"Runnable".to_string()));
        assert!(class.supertypes.contains(&"Comparable".to_string()));
    }

    #[test]
    fn test_referenced_type_names() {
        let unit = parse(
            r#"
class Service {
    private Repository repo;

    Result handle(Request request) {
        Helper h = new Helper();
        return h.process(request);
    }
}
"#,
        );
        let class = &unit.types[0];
        for name in ["Repository", "Result", "Request", "Helper"] {
            assert!(
                class.referenced.iter().any(|r| r == name),
                "missing reference to {name}, got {:?}",
                class.referenced
            );
        }
        let method = class.members.iter().find(|m| m.name == "handle").unwrap();
        assert!(method.referenced.iter().any(|r| r == "Helper"));
    }

    #[test]
    fn test_javadoc_detection() {
        let unit = parse(
            r#"
/**
 * Documented.
 */
class Documented {
    /** Field doc. */
    int x;

    void bare() {}
}
"#,
        );
        let class = &unit.types[0];
        assert!(class.has_javadoc);
        let field = class.members.iter().find(|m| m.name == "x").unwrap();
        assert!(field.has_javadoc);
        let method = class.members.iter().find(|m| m.name == "bare").unwrap();
        assert!(!method.has_javadoc);
    }

    #[test]
    fn test_header_comment_and_insert_offset() {
        let source = "package p;\nclass A {}\n";
        let unit = parse(source);
        assert!(!unit.has_header_comment);
        // Insert point is the line after the package declaration
        assert_eq!(unit.header_insert_offset, source.find("class").unwrap());

        let unit = parse("/* header */\npackage p;\nclass A {}\n");
        assert!(unit.has_header_comment);
    }

    #[test]
    fn test_syntax_error_is_file_scoped() {
        let sf = SourceFile::new("Broken.java", "class { nope");
        let err = parse_source(&sf).unwrap_err();
        assert_eq!(err.path, std::path::PathBuf::from("Broken.java"));
    }

    #[test]
    fn test_enum_members() {
        let unit = parse(
            r#"
public enum Status {
    OPEN, CLOSED;

    public boolean isOpen() {
        return this == OPEN;
    }
}
"#,
        );
        let decl = &unit.types[0];
        assert_eq!(decl.kind, TypeKind::Enum);
        assert!(decl.members.iter().any(|m| m.name == "isOpen"));
    }

    #[test]
    fn test_annotation_type_members() {
        let unit = parse(
            r#"
public @interface Marker {
    String value();
    int priority() default 0;
}
"#,
        );
        let decl = &unit.types[0];
        assert_eq!(decl.kind, TypeKind::Annotation);
        assert_eq!(decl.members.len(), 2);
        assert!(decl.members.iter().any(|m| m.name == "value"));
        assert!(decl.members.iter().any(|m| m.name == "priority"));
    }

    #[test]
    fn test_method_signature_excludes_body() {
        let unit = parse("class C { int add(int a, int b) { return a + b; } }\n");
        let method = &unit.types[0].members[0];
        assert_eq!(method.signature, "int add(int a, int b)");
        assert!(method.body_len > 0);
    }
}
