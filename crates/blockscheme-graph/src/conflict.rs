//! Resource Conflict Graph: an undirected adjacency derived from the
//! DFG plus each sink port's exclusivity mode.

use ahash::{AHashMap, AHashSet};

use crate::graph::{BlockId, Graph};

/// Undirected adjacency over the blocks currently in the scheme. Two
/// blocks are adjacent iff they both feed an `Exclusive` input port on
/// some third block (or on each other).
#[derive(Default)]
pub struct ConflictGraph {
    adjacency: AHashMap<BlockId, AHashSet<BlockId>>,
}

impl ConflictGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every neighbor currently in conflict with `id`. Empty (not
    /// missing) for a block with an adjacency entry but no conflicts.
    pub fn neighbors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.adjacency
            .get(&id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn conflicts(&self, a: BlockId, b: BlockId) -> bool {
        self.adjacency.get(&a).map(|set| set.contains(&b)).unwrap_or(false)
    }

    /// Drop a vertex and every conflict edge touching it. Called when a
    /// block is removed from the scheme.
    pub fn remove_block(&mut self, id: BlockId) {
        self.adjacency.remove(&id);
        for set in self.adjacency.values_mut() {
            set.remove(&id);
        }
    }

    /// Rebuild the whole RCG from the current DFG + port exclusivity.
    /// This is the global form of the per-block algorithm: every block
    /// gets an (possibly empty) adjacency entry, then for each
    /// exclusive sink port, every pair of distinct source blocks
    /// feeding it becomes mutually conflicting.
    pub fn recompute(&mut self, graph: &Graph) {
        self.adjacency.clear();

        let ids = graph.blocks_in_insertion_order();
        for &id in &ids {
            self.adjacency.entry(id).or_default();
        }

        for &dst in &ids {
            let Some(dst_entry) = graph.block(dst) else {
                continue;
            };

            // group incoming sources by the sink port they feed
            let mut sources_by_port: AHashMap<String, Vec<BlockId>> = AHashMap::default();
            for edge_id in dst_entry.incoming() {
                let Some(edge) = graph.edge(*edge_id) else {
                    continue;
                };
                for conn in &edge.connections {
                    if dst_entry.hook.get_input_exclusivity(&conn.sink_port)
                        == blockscheme_core::Exclusivity::Exclusive
                    {
                        sources_by_port
                            .entry(conn.sink_port.0.clone())
                            .or_default()
                            .push(edge.src);
                    }
                }
            }

            for sources in sources_by_port.values() {
                for i in 0..sources.len() {
                    for j in (i + 1)..sources.len() {
                        let (a, b) = (sources[i], sources[j]);
                        if a == b {
                            continue;
                        }
                        self.adjacency.entry(a).or_default().insert(b);
                        self.adjacency.entry(b).or_default().insert(a);
                    }
                }
            }
        }
    }
}
