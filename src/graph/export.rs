//! Rendering-agnostic graph export
//!
//! Serializable description of the dependency graph: nodes, aggregated
//! edges, cycles, per-package rollups, and run statistics. Turning this
//! into an image is a collaborator's job.

use crate::graph::DependencyGraph;
use crate::models::TypeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExport {
    pub qualified_name: String,
    pub kind: TypeKind,
    pub package: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeExport {
    pub from: String,
    pub to: String,
    pub count: u32,
}

/// Per-package rollup: class count plus which packages this one depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageExport {
    pub name: String,
    pub types: usize,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_types: usize,
    pub total_edges: usize,
    pub total_packages: usize,
    pub cycles_found: usize,
}

/// The full export. Field order is stable and all lists are sorted, so two
/// runs over the same input serialize identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
    /// Elementary cycles as ordered lists of qualified names
    pub cycles: Vec<Vec<String>>,
    pub packages: Vec<PackageExport>,
    pub stats: GraphStats,
}

impl GraphExport {
    pub fn from_graph(graph: &DependencyGraph, cycles: Vec<Vec<String>>) -> Self {
        let nodes: Vec<NodeExport> = graph
            .nodes()
            .iter()
            .map(|n| NodeExport {
                qualified_name: n.qualified_name.clone(),
                kind: n.kind,
                package: n.package.clone(),
                file: n.file.display().to_string(),
            })
            .collect();

        let edges: Vec<EdgeExport> = graph
            .edges()
            .into_iter()
            .map(|(from, to, count)| EdgeExport { from, to, count })
            .collect();

        // Package rollup from nodes and edges
        let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut package_of: BTreeMap<String, String> = BTreeMap::new();
        for node in &nodes {
            *type_counts.entry(node.package.clone()).or_insert(0) += 1;
            package_of.insert(node.qualified_name.clone(), node.package.clone());
        }
        let mut package_deps: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for edge in &edges {
            let (Some(from_pkg), Some(to_pkg)) =
                (package_of.get(&edge.from), package_of.get(&edge.to))
            else {
                continue;
            };
            if from_pkg != to_pkg {
                let deps = package_deps.entry(from_pkg.clone()).or_default();
                if !deps.contains(to_pkg) {
                    deps.push(to_pkg.clone());
                }
            }
        }
        let packages: Vec<PackageExport> = type_counts
            .iter()
            .map(|(name, &types)| {
                let mut depends_on = package_deps.remove(name).unwrap_or_default();
                depends_on.sort();
                PackageExport {
                    name: name.clone(),
                    types,
                    depends_on,
                }
            })
            .collect();

        let stats = GraphStats {
            total_types: nodes.len(),
            total_edges: edges.len(),
            total_packages: packages.len(),
            cycles_found: cycles.len(),
        };

        Self {
            nodes,
            edges,
            cycles,
            packages,
            stats,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::find_cycles;
    use crate::models::SourceFile;
    use crate::parser::parse_source;

    fn export(sources: &[(&str, &str)]) -> GraphExport {
        let units: Vec<_> = sources
            .iter()
            .map(|(path, src)| parse_source(&SourceFile::new(*path, *src)).expect("parse"))
            .collect();
        let graph = DependencyGraph::build(&units);
        let cycles = find_cycles(&graph, 8);
        GraphExport::from_graph(&graph, cycles)
    }

    #[test]
    fn test_export_shape() {
        let export = export(&[
            ("a/Foo.java", "package a;\nimport b.Bar;\nclass Foo { Bar bar; }\n"),
            ("b/Bar.java", "package b;\nclass Bar {}\n"),
        ]);
        assert_eq!(export.stats.total_types, 2);
        assert_eq!(export.stats.total_packages, 2);
        assert_eq!(export.edges.len(), 1);
        assert_eq!(export.edges[0].from, "a.Foo");
        assert_eq!(export.edges[0].to, "b.Bar");

        let pkg_a = export.packages.iter().find(|p| p.name == "a").unwrap();
        assert_eq!(pkg_a.depends_on, vec!["b".to_string()]);
    }

    #[test]
    fn test_export_is_deterministic() {
        let sources = [
            ("Foo.java", "package p;\nclass Foo { Bar bar; }\n"),
            ("Bar.java", "package p;\nclass Bar { Foo foo; }\n"),
        ];
        let a = export(&sources).to_json().unwrap();
        let b = export(&sources).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cycles_included() {
        let export = export(&[
            ("Foo.java", "package p;\nclass Foo { Bar bar; }\n"),
            ("Bar.java", "package p;\nclass Bar { Foo foo; }\n"),
        ]);
        assert_eq!(export.stats.cycles_found, 1);
        assert_eq!(export.cycles[0], vec!["p.Bar", "p.Foo"]);
    }
}
