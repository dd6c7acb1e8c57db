//! Elementary-cycle detection
//!
//! Depth-first search with recursion-stack membership, bounded by a maximum
//! cycle length so cost stays manageable on large graphs. Each elementary
//! cycle is reported exactly once, rooted at its lexicographically smallest
//! member, as an ordered list of qualified names.

use crate::graph::DependencyGraph;

/// Find all elementary cycles of length <= `max_len`.
///
/// Self-edges come out as length-1 cycles. The search visits each node as a
/// DFS root and only expands into successors that sort after the root, so a
/// cycle is enumerated once, from its smallest node. Terminates on any
/// finite graph: the stack never revisits a node already on it and depth is
/// capped at `max_len`.
pub fn find_cycles(graph: &DependencyGraph, max_len: usize) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    if max_len == 0 {
        return cycles;
    }

    let roots: Vec<String> = graph
        .nodes()
        .iter()
        .map(|n| n.qualified_name.clone())
        .collect();

    for root in &roots {
        let mut stack = vec![root.clone()];
        dfs(graph, root, root, max_len, &mut stack, &mut cycles);
    }

    cycles
}

fn dfs(
    graph: &DependencyGraph,
    root: &str,
    current: &str,
    max_len: usize,
    stack: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    for succ in graph.successors(current) {
        if succ == *root {
            // Back at the root: the stack is one elementary cycle.
            cycles.push(stack.clone());
            continue;
        }
        // Only expand nodes greater than the root so each cycle is found
        // once; skip anything already on the stack.
        if succ.as_str() <= root || stack.contains(&succ) {
            continue;
        }
        if stack.len() >= max_len {
            continue;
        }
        stack.push(succ.clone());
        dfs(graph, root, &succ, max_len, stack, cycles);
        stack.pop();
    }
}
