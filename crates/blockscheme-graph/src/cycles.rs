//! Enumeration of simple directed cycles (Tiernan's algorithm) and the
//! latch-counting introspection built on top of it.
//!
//! Grounded on `conman::Scheme::computeCycles`, which feeds the DFG (or
//! ESG) into `boost::tiernan_all_cycles`. Boost's implementation only
//! ever extends a candidate path to vertices whose index is greater
//! than or equal to the cycle's starting vertex, which is what avoids
//! reporting the same cycle once per rotation; this module reproduces
//! that restriction using each block's insertion sequence number as
//! the vertex ordering; instead of the original's exception-based
//! "no cycles" fast path, `find_cycles` just returns an empty result.

use ahash::AHashSet;

use crate::graph::{BlockId, Graph};

/// The result of a (possibly truncated) cycle search.
pub struct CycleSearchResult {
    pub cycles: Vec<Vec<BlockId>>,
    /// True if the search space was larger than the configured vertex
    /// cap and the result may be incomplete.
    pub truncated: bool,
}

/// Enumerate every simple directed cycle among `ids`, using `adjacency`
/// to look up each vertex's out-neighbors. `ids` must be given in a
/// fixed, deterministic order (insertion order) — that order is also
/// used as the vertex-ordering restriction that keeps each cycle from
/// being reported once per rotation.
fn find_cycles(
    ids: &[BlockId],
    adjacency: &impl Fn(BlockId) -> Vec<BlockId>,
    max_vertices: usize,
) -> CycleSearchResult {
    let truncated = ids.len() > max_vertices;
    let search_ids = if truncated {
        &ids[..max_vertices]
    } else {
        ids
    };

    let order_index: ahash::AHashMap<BlockId, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut cycles = Vec::new();

    for (start_pos, &start) in search_ids.iter().enumerate() {
        let mut path = vec![start];
        let mut on_path: AHashSet<BlockId> = AHashSet::default();
        on_path.insert(start);
        extend(
            start,
            start_pos,
            &mut path,
            &mut on_path,
            &order_index,
            adjacency,
            &mut cycles,
        );
    }

    CycleSearchResult { cycles, truncated }
}

#[allow(clippy::too_many_arguments)]
fn extend(
    start: BlockId,
    start_pos: usize,
    path: &mut Vec<BlockId>,
    on_path: &mut AHashSet<BlockId>,
    order_index: &ahash::AHashMap<BlockId, usize>,
    adjacency: &impl Fn(BlockId) -> Vec<BlockId>,
    cycles: &mut Vec<Vec<BlockId>>,
) {
    let current = *path.last().unwrap();
    for next in adjacency(current) {
        if next == start {
            cycles.push(path.clone());
            continue;
        }
        let Some(&next_pos) = order_index.get(&next) else {
            continue;
        };
        if next_pos <= start_pos || on_path.contains(&next) {
            continue;
        }
        path.push(next);
        on_path.insert(next);
        extend(start, start_pos, path, on_path, order_index, adjacency, cycles);
        on_path.remove(&next);
        path.pop();
    }
}

/// All simple cycles in the full DFG (latched edges included).
pub fn get_flow_cycles(graph: &Graph, max_vertices: usize) -> CycleSearchResult {
    let ids = graph.blocks_in_insertion_order();
    find_cycles(
        &ids,
        &|id| {
            graph
                .block(id)
                .map(|b| {
                    b.outgoing()
                        .iter()
                        .filter_map(|eid| graph.edge(*eid))
                        .map(|e| e.dst)
                        .collect()
                })
                .unwrap_or_default()
        },
        max_vertices,
    )
}

/// All simple cycles in the ESG (latched edges excluded). Empty
/// whenever the scheme is executable.
pub fn get_execution_cycles(graph: &Graph, max_vertices: usize) -> CycleSearchResult {
    let ids = graph.blocks_in_insertion_order();
    find_cycles(
        &ids,
        &|id| {
            graph
                .block(id)
                .map(|b| {
                    b.outgoing()
                        .iter()
                        .filter_map(|eid| graph.edge(*eid))
                        .filter(|e| e.in_esg())
                        .map(|e| e.dst)
                        .collect()
                })
                .unwrap_or_default()
        },
        max_vertices,
    )
}

/// Count the positions along `path` (a walk of block ids) where the
/// DFG edge between successive blocks is latched. Paths shorter than
/// two blocks have no edges and return 0.
pub fn latch_count(graph: &Graph, path: &[BlockId]) -> usize {
    if path.len() < 2 {
        return 0;
    }
    path.windows(2)
        .filter(|pair| {
            graph
                .edge_between(pair[0], pair[1])
                .map(|e| e.latched)
                .unwrap_or(false)
        })
        .count()
}

/// The minimum and maximum latch count over every simple cycle found by
/// [`get_flow_cycles`]. Both are 0 when there are no cycles. Each cycle
/// is closed by appending its start vertex before counting, since
/// `find_cycles` returns open paths.
pub fn latch_count_bounds(graph: &Graph, max_vertices: usize) -> (usize, usize) {
    let result = get_flow_cycles(graph, max_vertices);
    if result.cycles.is_empty() {
        return (0, 0);
    }

    let counts: Vec<usize> = result
        .cycles
        .iter()
        .map(|cycle| {
            let mut closed = cycle.clone();
            closed.push(cycle[0]);
            latch_count(graph, &closed)
        })
        .collect();

    let min = counts.iter().copied().min().unwrap_or(0);
    let max = counts.iter().copied().max().unwrap_or(0);
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockscheme_core::{BlockHook, BlockState, Exclusivity, InputPort, OutputPort};

    struct StubHook {
        inputs: Vec<InputPort>,
        outputs: Vec<OutputPort>,
    }

    impl StubHook {
        fn new(inputs: &[&str], outputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| InputPort::from(*s)).collect(),
                outputs: outputs.iter().map(|s| OutputPort::from(*s)).collect(),
            }
        }
    }

    impl BlockHook for StubHook {
        fn period(&self) -> f64 {
            0.0
        }
        fn input_ports(&self) -> Vec<InputPort> {
            self.inputs.clone()
        }
        fn output_ports(&self) -> Vec<OutputPort> {
            self.outputs.clone()
        }
        fn set_input_exclusivity(&mut self, _port: &InputPort, _mode: Exclusivity) {}
        fn get_input_exclusivity(&self, _port: &InputPort) -> Exclusivity {
            Exclusivity::Unrestricted
        }
        fn state(&self) -> BlockState {
            BlockState::Configured
        }
        fn start(&mut self) -> bool {
            true
        }
        fn stop(&mut self) -> bool {
            true
        }
        fn update(&mut self, _t: f64) -> bool {
            true
        }
    }

    fn triangle() -> (Graph, BlockId, BlockId, BlockId) {
        let mut g = Graph::new(4, 4);
        let a = g.insert_block("a".into(), Box::new(StubHook::new(&["in"], &["out"])));
        let b = g.insert_block("b".into(), Box::new(StubHook::new(&["in"], &["out"])));
        let c = g.insert_block("c".into(), Box::new(StubHook::new(&["in"], &["out"])));
        g.connect(a, "out".into(), b, "in".into()).unwrap();
        g.connect(b, "out".into(), c, "in".into()).unwrap();
        g.connect(c, "out".into(), a, "in".into()).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn finds_single_triangle_cycle() {
        let (g, a, b, c) = triangle();
        let result = get_flow_cycles(&g, 64);
        assert!(!result.truncated);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0], vec![a, b, c]);
    }

    #[test]
    fn latching_one_edge_removes_execution_cycle_but_not_flow_cycle() {
        let (mut g, a, b, c) = triangle();
        g.set_edge_latch(c, a, true);

        assert_eq!(get_flow_cycles(&g, 64).cycles.len(), 1);
        assert!(get_execution_cycles(&g, 64).cycles.is_empty());
        let _ = b;
    }

    #[test]
    fn latch_count_over_short_paths_is_zero() {
        let (g, a, _b, _c) = triangle();
        assert_eq!(latch_count(&g, &[]), 0);
        assert_eq!(latch_count(&g, &[a]), 0);
    }

    #[test]
    fn latch_count_bounds_track_the_cycle() {
        let (mut g, a, b, c) = triangle();
        assert_eq!(latch_count_bounds(&g, 64), (0, 0));
        g.set_edge_latch(c, a, true);
        assert_eq!(latch_count_bounds(&g, 64), (1, 1));
        let _ = b;
    }
}
