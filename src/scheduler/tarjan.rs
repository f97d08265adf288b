//! Tarjan's strongly connected components, iterative

use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy)]
struct VisitState {
    index: usize,
    lowlink: usize,
    on_stack: bool,
}

/// Strongly connected components of `edges` (node -> nodes it depends on)
///
/// Nodes that only appear as edge targets are included. Each component is
/// sorted and components are returned in reverse topological order of the
/// condensation: a component comes after every component it depends on.
pub fn find_strongly_connected_components(
    edges: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<Vec<String>> {
    let mut nodes: BTreeSet<&str> = edges.keys().map(String::as_str).collect();
    for targets in edges.values() {
        nodes.extend(targets.iter().map(String::as_str));
    }
    let nodes: Vec<&str> = nodes.into_iter().collect();
    let position: BTreeMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let adjacency: Vec<Vec<usize>> = nodes
        .iter()
        .map(|n| {
            edges
                .get(*n)
                .map(|targets| targets.iter().map(|t| position[t.as_str()]).collect())
                .unwrap_or_default()
        })
        .collect();

    let mut state: Vec<Option<VisitState>> = vec![None; nodes.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0;
    let mut components = Vec::new();

    for root in 0..nodes.len() {
        if state[root].is_some() {
            continue;
        }
        // (node, next child to visit)
        let mut call_stack: Vec<(usize, usize)> = vec![(root, 0)];
        state[root] = Some(VisitState {
            index: next_index,
            lowlink: next_index,
            on_stack: true,
        });
        next_index += 1;
        stack.push(root);

        while let Some(frame) = call_stack.last_mut() {
            let v = frame.0;
            if let Some(&w) = adjacency[v].get(frame.1) {
                frame.1 += 1;
                match state[w] {
                    None => {
                        state[w] = Some(VisitState {
                            index: next_index,
                            lowlink: next_index,
                            on_stack: true,
                        });
                        next_index += 1;
                        stack.push(w);
                        call_stack.push((w, 0));
                    }
                    Some(ws) if ws.on_stack => {
                        if let Some(vs) = state[v].as_mut() {
                            vs.lowlink = vs.lowlink.min(ws.index);
                        }
                    }
                    Some(_) => {}
                }
                continue;
            }

            call_stack.pop();
            let Some(vs) = state[v] else { continue };
            if let Some(&(parent, _)) = call_stack.last()
                && let Some(ps) = state[parent].as_mut()
            {
                ps.lowlink = ps.lowlink.min(vs.lowlink);
            }
            if vs.lowlink == vs.index {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    if let Some(ws) = state[w].as_mut() {
                        ws.on_stack = false;
                    }
                    component.push(nodes[w].to_string());
                    if w == v {
                        break;
                    }
                }
                component.sort();
                components.push(component);
            }
        }
    }
    components
}
