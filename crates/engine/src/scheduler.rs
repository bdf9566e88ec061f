//! Deterministic topological ordering (Kahn's algorithm, wave-based).
//!
//! Each round selects *all* nodes whose in-degree is zero, in ascending
//! order of original insertion index, before decrementing successors.
//! The tie-break makes the order a pure function of the submitted payload.

use crate::{Graph, GraphError};

/// Compute an execution order honouring every edge (source precedes
/// target).
///
/// # Errors
/// [`GraphError::CycleDetected`] when not every node can be ordered; the
/// participants are all leftover nodes — those on a cycle and those
/// reachable only through one.
pub fn execution_order(graph: &Graph) -> Result<Vec<String>, GraphError> {
    let n = graph.len();
    let mut in_degree = vec![0usize; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];

    for edge in graph.edges() {
        // Indices exist for every validated edge endpoint.
        let (Some(s), Some(t)) = (graph.index_of(&edge.source), graph.index_of(&edge.target))
        else {
            continue;
        };
        successors[s].push(t);
        in_degree[t] += 1;
    }

    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);

    loop {
        let wave: Vec<usize> = (0..n)
            .filter(|&i| !emitted[i] && in_degree[i] == 0)
            .collect();
        if wave.is_empty() {
            break;
        }
        for i in wave {
            emitted[i] = true;
            order.push(graph.nodes()[i].id.clone());
            for &t in &successors[i] {
                in_degree[t] -= 1;
            }
        }
    }

    if order.len() != n {
        let participants = (0..n)
            .filter(|&i| !emitted[i])
            .map(|i| graph.nodes()[i].id.clone())
            .collect();
        return Err(GraphError::CycleDetected { participants });
    }

    Ok(order)
}
