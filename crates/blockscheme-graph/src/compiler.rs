//! Topological ordering of the Execution Scheduling Graph.
//!
//! The ESG is not a separately stored graph; it is the DFG filtered to
//! non-latched edges (see [`crate::graph::DfgEdge::in_esg`]). This
//! module walks that filtered view with Kahn's algorithm, using each
//! block's insertion sequence number as a deterministic tie-break so
//! that two schemes built with the same calls in the same order always
//! compile to the same schedule, regardless of arena slot reuse.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::graph::{BlockId, Graph};

/// The graph's execution edges form at least one cycle, so no valid
/// topological order exists.
#[derive(Debug, Clone)]
pub struct CycleDetected {
    /// Every block that could not be scheduled, i.e. every block that
    /// remains on a cycle (directly or transitively) once the acyclic
    /// prefix of the graph has been peeled off.
    pub unscheduled: Vec<BlockId>,
}

impl std::fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "execution schedule would contain a cycle ({} block(s) unreachable from a valid order)",
            self.unscheduled.len()
        )
    }
}

impl std::error::Error for CycleDetected {}

/// Produce a deterministic topological order of every block in `graph`,
/// using only ESG edges (non-latched DFG edges).
///
/// Ties (multiple blocks simultaneously ready to schedule) are broken by
/// ascending insertion order, so the result depends only on the
/// sequence of `add_block`/`connect`/`latch` calls that built the
/// scheme, never on arena slot reuse or hash-map iteration order.
pub fn sort_topologically(graph: &Graph) -> Result<Vec<BlockId>, CycleDetected> {
    let ids = graph.blocks_in_insertion_order();

    let mut in_degree: AHashMap<BlockId, u32> = AHashMap::with_capacity(ids.len());
    for &id in &ids {
        let degree = graph
            .block(id)
            .map(|b| {
                b.incoming()
                    .iter()
                    .filter_map(|eid| graph.edge(*eid))
                    .filter(|e| e.in_esg())
                    .count() as u32
            })
            .unwrap_or(0);
        in_degree.insert(id, degree);
    }

    let seq_of = |id: BlockId| -> u64 { graph.block(id).map(|b| b.seq).unwrap_or(u64::MAX) };

    let mut ready: BinaryHeap<Reverse<(u64, BlockId)>> = BinaryHeap::with_capacity(ids.len());
    for &id in &ids {
        if in_degree[&id] == 0 {
            ready.push(Reverse((seq_of(id), id)));
        }
    }

    let mut order = Vec::with_capacity(ids.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        order.push(id);

        let Some(block) = graph.block(id) else {
            continue;
        };
        for edge_id in block.outgoing() {
            let Some(edge) = graph.edge(*edge_id) else {
                continue;
            };
            if !edge.in_esg() {
                continue;
            }
            let degree = in_degree.get_mut(&edge.dst).expect("dst in in_degree map");
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse((seq_of(edge.dst), edge.dst)));
            }
        }
    }

    if order.len() != ids.len() {
        let scheduled: std::collections::HashSet<BlockId> = order.iter().copied().collect();
        let unscheduled = ids.into_iter().filter(|id| !scheduled.contains(id)).collect();
        return Err(CycleDetected { unscheduled });
    }

    Ok(order)
}

/// Cheaper than [`sort_topologically`] when only the yes/no answer is
/// needed (e.g. speculatively checking whether adding a connection or
/// removing a latch would introduce a cycle).
pub fn has_cycle(graph: &Graph) -> bool {
    sort_topologically(graph).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
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

    fn linear_graph() -> (Graph, BlockId, BlockId, BlockId) {
        let mut g = Graph::new(4, 4);
        let a = g.insert_block("a".into(), Box::new(StubHook::new(&[], &["out"])));
        let b = g.insert_block("b".into(), Box::new(StubHook::new(&["in"], &["out"])));
        let c = g.insert_block("c".into(), Box::new(StubHook::new(&["in"], &[])));
        g.connect(a, "out".into(), b, "in".into()).unwrap();
        g.connect(b, "out".into(), c, "in".into()).unwrap();
        (g, a, b, c)
    }

    #[test]
    fn sorts_linear_chain_in_order() {
        let (g, a, b, c) = linear_graph();
        let order = sort_topologically(&g).unwrap();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn detects_cycle() {
        let mut g = Graph::new(4, 4);
        let a = g.insert_block("a".into(), Box::new(StubHook::new(&["in"], &["out"])));
        let b = g.insert_block("b".into(), Box::new(StubHook::new(&["in"], &["out"])));
        g.connect(a, "out".into(), b, "in".into()).unwrap();
        g.connect(b, "out".into(), a, "in".into()).unwrap();

        let err = sort_topologically(&g).unwrap_err();
        assert_eq!(err.unscheduled.len(), 2);
        assert!(has_cycle(&g));
    }

    #[test]
    fn latching_an_edge_breaks_the_cycle_for_scheduling() {
        let mut g = Graph::new(4, 4);
        let a = g.insert_block("a".into(), Box::new(StubHook::new(&["in"], &["out"])));
        let b = g.insert_block("b".into(), Box::new(StubHook::new(&["in"], &["out"])));
        g.connect(a, "out".into(), b, "in".into()).unwrap();
        g.connect(b, "out".into(), a, "in".into()).unwrap();
        assert!(has_cycle(&g));

        g.set_edge_latch(b, a, true);
        assert!(!has_cycle(&g));
        let order = sort_topologically(&g).unwrap();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn deterministic_tie_break_follows_insertion_order() {
        let mut g = Graph::new(4, 4);
        // Two independent roots feeding one sink: b was inserted before c,
        // so b must precede c in the schedule even though both become
        // ready for scheduling at the same step.
        let a = g.insert_block("a".into(), Box::new(StubHook::new(&[], &["out"])));
        let b = g.insert_block("b".into(), Box::new(StubHook::new(&[], &["out"])));
        let c = g.insert_block("c".into(), Box::new(StubHook::new(&["x", "y"], &[])));
        g.connect(a, "out".into(), c, "x".into()).unwrap();
        g.connect(b, "out".into(), c, "y".into()).unwrap();

        let order = sort_topologically(&g).unwrap();
        let pos_a = order.iter().position(|&id| id == a).unwrap();
        let pos_b = order.iter().position(|&id| id == b).unwrap();
        let pos_c = order.iter().position(|&id| id == c).unwrap();
        assert!(pos_a < pos_c);
        assert!(pos_b < pos_c);
        assert!(pos_a < pos_b);
    }
}
