//! Type dependency graph
//!
//! Pure Rust implementation on petgraph. Built once per run from the
//! immutable structural model, then read-only for cycle detection and
//! export.

pub mod cycles;
pub mod export;

pub use cycles::find_cycles;
pub use export::GraphExport;

use crate::models::{CompilationUnit, TypeDeclaration, TypeKind};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

/// A node in the dependency graph: one type declaration.
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub qualified_name: String,
    pub kind: TypeKind,
    pub package: String,
    pub file: std::path::PathBuf,
}

/// Directed graph of type-to-type references. Edge weights count textual
/// occurrences of the reference; edges are aggregated, never duplicated.
pub struct DependencyGraph {
    graph: DiGraph<TypeNode, u32>,
    /// Qualified name -> node index
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from all compilation units of a run.
    ///
    /// Raw referenced names resolve by simple-name matching against explicit
    /// imports and same-package types; anything unresolvable is dropped
    /// silently (it is a gap, not an error). The build is order-independent
    /// and idempotent: nodes are keyed by qualified name and edge counts
    /// are accumulated per aggregated pair.
    pub fn build(units: &[CompilationUnit]) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        // First pass: one node per declared type, nested types included.
        for unit in units {
            for decl in unit.all_types() {
                add_node(&mut graph, &mut index, unit, decl);
            }
        }

        // Second pass: resolve references and aggregate edge counts.
        // BTreeMap keeps accumulation order deterministic.
        let mut counts: BTreeMap<(String, String), u32> = BTreeMap::new();
        for unit in units {
            let resolver = Resolver::new(unit, &index);
            for decl in unit.all_types() {
                for raw in &decl.referenced {
                    if let Some(target) = resolver.resolve(raw) {
                        *counts
                            .entry((decl.qualified_name.clone(), target))
                            .or_insert(0) += 1;
                    }
                }
            }
        }

        for ((from, to), count) in counts {
            let a = index[&from];
            let b = index[&to];
            graph.add_edge(a, b, count);
        }

        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.index.contains_key(qualified_name)
    }

    /// Edge multiplicity between two qualified names, if an edge exists.
    pub fn edge_weight(&self, from: &str, to: &str) -> Option<u32> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        self.graph
            .edges(a)
            .find(|e| e.target() == b)
            .map(|e| *e.weight())
    }

    /// All nodes, sorted by qualified name for deterministic output.
    pub fn nodes(&self) -> Vec<&TypeNode> {
        let mut nodes: Vec<&TypeNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        nodes
    }

    /// All edges as (from, to, count), sorted for deterministic output.
    pub fn edges(&self) -> Vec<(String, String, u32)> {
        let mut edges: Vec<(String, String, u32)> = self
            .graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].qualified_name.clone(),
                    self.graph[e.target()].qualified_name.clone(),
                    *e.weight(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    /// Successor qualified names of a node, sorted.
    pub fn successors(&self, qualified_name: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(qualified_name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].qualified_name.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

fn add_node(
    graph: &mut DiGraph<TypeNode, u32>,
    index: &mut HashMap<String, NodeIndex>,
    unit: &CompilationUnit,
    decl: &TypeDeclaration,
) {
    if index.contains_key(&decl.qualified_name) {
        return;
    }
    let idx = graph.add_node(TypeNode {
        qualified_name: decl.qualified_name.clone(),
        kind: decl.kind,
        package: unit.package.clone(),
        file: unit.path.clone(),
    });
    index.insert(decl.qualified_name.clone(), idx);
}

/// Resolves raw simple names for one compilation unit.
///
/// Resolution order mirrors Java's: explicit import, then same package.
/// Wildcard imports are tried against every known type in the named
/// package. No full type inference.
struct Resolver<'a> {
    unit: &'a CompilationUnit,
    known: &'a HashMap<String, NodeIndex>,
}

impl<'a> Resolver<'a> {
    fn new(unit: &'a CompilationUnit, known: &'a HashMap<String, NodeIndex>) -> Self {
        Self { unit, known }
    }

    fn resolve(&self, raw: &str) -> Option<String> {
        // Already qualified and known
        if raw.contains('.') && self.known.contains_key(raw) {
            return Some(raw.to_string());
        }

        // Explicit import ending in the simple name
        for import in &self.unit.imports {
            let import = import.trim_start_matches("static ").trim_end_matches(".*");
            if import.rsplit('.').next() == Some(raw) && self.known.contains_key(import) {
                return Some(import.to_string());
            }
        }

        // Wildcard imports
        for import in &self.unit.imports {
            if let Some(pkg) = import.strip_suffix(".*") {
                let candidate = format!("{pkg}.{raw}");
                if self.known.contains_key(&candidate) {
                    return Some(candidate);
                }
            }
        }

        // Same package (or default package)
        let candidate = self.unit.qualify(raw);
        if self.known.contains_key(&candidate) {
            return Some(candidate);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceFile;
    use crate::parser::parse_source;

    fn unit(path: &str, source: &str) -> CompilationUnit {
        parse_source(&SourceFile::new(path, source)).expect("parse")
    }

    #[test]
    fn test_same_package_resolution() {
        let units = vec![
            unit("Foo.java", "package p;\nclass Foo { Bar bar; }\n"),
            unit("Bar.java", "package p;\nclass Bar {}\n"),
        ];
        let graph = DependencyGraph::build(&units);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.edge_weight("p.Foo", "p.Bar").is_some());
    }

    #[test]
    fn test_import_resolution_across_packages() {
        let units = vec![
            unit(
                "a/Foo.java",
                "package a;\nimport b.Bar;\nclass Foo { Bar bar; }\n",
            ),
            unit("b/Bar.java", "package b;\nclass Bar {}\n"),
        ];
        let graph = DependencyGraph::build(&units);
        assert!(graph.edge_weight("a.Foo", "b.Bar").is_some());
    }

    #[test]
    fn test_wildcard_import_resolution() {
        let units = vec![
            unit(
                "a/Foo.java",
                "package a;\nimport b.*;\nclass Foo { Bar bar; }\n",
            ),
            unit("b/Bar.java", "package b;\nclass Bar {}\n"),
        ];
        let graph = DependencyGraph::build(&units);
        assert!(graph.edge_weight("a.Foo", "b.Bar").is_some());
    }

    #[test]
    fn test_unresolved_references_dropped() {
        let units = vec![unit(
            "Foo.java",
            "package p;\nimport java.util.List;\nclass Foo { List<String> xs; }\n",
        )];
        let graph = DependencyGraph::build(&units);
        // List and String are not declared in the run, so no edges at all
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_edge_multiplicity_counts_occurrences() {
        let units = vec![
            unit(
                "Foo.java",
                "package p;\nclass Foo { Bar a; Bar b; Bar get() { return a; } }\n",
            ),
            unit("Bar.java", "package p;\nclass Bar {}\n"),
        ];
        let graph = DependencyGraph::build(&units);
        assert_eq!(graph.edge_weight("p.Foo", "p.Bar"), Some(3));
    }

    #[test]
    fn test_build_is_idempotent() {
        let units = vec![
            unit("Foo.java", "package p;\nclass Foo { Bar bar; Baz baz; }\n"),
            unit("Bar.java", "package p;\nclass Bar { Foo owner; }\n"),
            unit("Baz.java", "package p;\nclass Baz {}\n"),
        ];
        let a = DependencyGraph::build(&units);
        let b = DependencyGraph::build(&units);
        assert_eq!(
            a.nodes()
                .iter()
                .map(|n| n.qualified_name.clone())
                .collect::<Vec<_>>(),
            b.nodes()
                .iter()
                .map(|n| n.qualified_name.clone())
                .collect::<Vec<_>>()
        );
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn test_nested_types_are_nodes() {
        let units = vec![unit(
            "Outer.java",
            "package p;\nclass Outer { static class Inner {} }\n",
        )];
        let graph = DependencyGraph::build(&units);
        assert!(graph.contains("p.Outer"));
        assert!(graph.contains("p.Outer.Inner"));
    }
}
