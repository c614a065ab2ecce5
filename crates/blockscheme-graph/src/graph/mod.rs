mod error;

use std::fmt::Debug;
use std::hash::Hash;

use ahash::AHashMap;
use blockscheme_core::{BlockHook, InputPort, OutputPort};
use smallvec::SmallVec;
use thunderdome::Arena;

pub use error::ConnectError;

/// A stable, globally unique identifier for a block.
///
/// This is the arena+index pattern: the id stays valid for as long as
/// the block remains in the scheme, and arena slot reuse after removal
/// is made safe by the generation counter baked into
/// [`thunderdome::Index`]. The original design's dense `[0, N)`
/// re-indexing on every removal is replaced by this — see `DESIGN.md`.
#[derive(Clone, Copy)]
pub struct BlockId {
    pub(crate) idx: thunderdome::Index,
}

impl BlockId {
    pub const DANGLING: Self = Self {
        idx: thunderdome::Index::DANGLING,
    };
}

impl Default for BlockId {
    fn default() -> Self {
        Self::DANGLING
    }
}

impl PartialEq for BlockId {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl Eq for BlockId {}

impl PartialOrd for BlockId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl Hash for BlockId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block-{}-{}", self.idx.slot(), self.idx.generation())
    }
}

/// A globally unique identifier for a data-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) thunderdome::Index);

/// One `(source_port, sink_port)` connection multiplexed onto a DFG
/// edge between the same pair of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source_port: OutputPort,
    pub sink_port: InputPort,
}

/// A data-flow edge: `src -> dst`, carrying every concrete port
/// connection between the pair, plus the derived latch flag.
#[derive(Debug, Clone)]
pub struct DfgEdge {
    pub id: EdgeId,
    pub src: BlockId,
    pub dst: BlockId,
    pub connections: SmallVec<[Connection; 2]>,
    /// Set directly by `latch_connection`; independent of the owning
    /// blocks' `latched_input`/`latched_output` flags.
    pub explicit_latch: bool,
    /// `explicit_latch || src.latched_output || dst.latched_input`,
    /// kept in sync by `Graph::recompute_latch`.
    pub latched: bool,
}

impl DfgEdge {
    /// Whether this edge currently participates in the ESG — i.e. it
    /// is not latched. The ESG is this filter applied to the DFG,
    /// rather than a second physically stored graph, so a latch flag
    /// flipping can never leave the two graphs disagreeing about an
    /// edge's membership.
    pub fn in_esg(&self) -> bool {
        !self.latched
    }
}

/// A block vertex, shared by the DFG, ESG (view), and RCG.
pub struct BlockEntry {
    pub id: BlockId,
    /// Monotonic insertion order, used only to make iteration and sort
    /// tie-breaks deterministic regardless of arena slot reuse.
    pub seq: u64,
    pub name: String,
    pub hook: Box<dyn BlockHook>,
    pub latched_input: bool,
    pub latched_output: bool,
    pub(crate) incoming: SmallVec<[EdgeId; 4]>,
    pub(crate) outgoing: SmallVec<[EdgeId; 4]>,
}

impl BlockEntry {
    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }
}

/// The raw vertex/edge store shared by the DFG, ESG view, and (via
/// `Scheme`) the RCG. Owns no policy — just O(1) id-keyed storage and
/// the low-level connect/disconnect mechanics.
pub struct Graph {
    pub(crate) blocks: Arena<BlockEntry>,
    pub(crate) edges: Arena<DfgEdge>,
    pub(crate) edge_by_pair: AHashMap<(BlockId, BlockId), EdgeId>,
    pub(crate) name_to_id: AHashMap<String, BlockId>,
    next_seq: u64,
}

impl Graph {
    pub fn new(initial_block_capacity: usize, initial_edge_capacity: usize) -> Self {
        Self {
            blocks: Arena::with_capacity(initial_block_capacity),
            edges: Arena::with_capacity(initial_edge_capacity),
            edge_by_pair: AHashMap::with_capacity(initial_edge_capacity),
            name_to_id: AHashMap::with_capacity(initial_block_capacity),
            next_seq: 0,
        }
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    pub fn id_for_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockEntry> {
        self.blocks.get(id.idx)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BlockEntry> {
        self.blocks.get_mut(id.idx)
    }

    pub fn blocks_in_insertion_order(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.blocks.iter().map(|(_, b)| b.id).collect();
        ids.sort_by_key(|id| self.blocks[id.idx].seq);
        ids
    }

    pub fn insert_block(&mut self, name: String, hook: Box<dyn BlockHook>) -> BlockId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let idx = self.blocks.insert(BlockEntry {
            id: BlockId::DANGLING,
            seq,
            name: name.clone(),
            hook,
            latched_input: false,
            latched_output: false,
            incoming: SmallVec::new(),
            outgoing: SmallVec::new(),
        });
        let id = BlockId { idx };
        self.blocks[idx].id = id;
        self.name_to_id.insert(name, id);

        id
    }

    /// Remove a block and every edge touching it. Returns the removed
    /// entry (so the caller can still read its name/hook while
    /// finishing cleanup elsewhere, e.g. the RCG) and the set of edges
    /// that were removed as a side effect.
    pub fn remove_block(&mut self, id: BlockId) -> Option<(BlockEntry, Vec<EdgeId>)> {
        let entry = self.blocks.remove(id.idx)?;
        self.name_to_id.remove(&entry.name);

        let mut removed_edges = Vec::new();
        for edge_id in entry.incoming.iter().chain(entry.outgoing.iter()) {
            removed_edges.push(*edge_id);
        }
        for edge_id in &removed_edges {
            self.remove_edge_raw(*edge_id);
        }

        Some((entry, removed_edges))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&DfgEdge> {
        self.edges.get(id.0)
    }

    pub fn edges(&self) -> impl Iterator<Item = &DfgEdge> {
        self.edges.iter().map(|(_, e)| e)
    }

    pub fn edge_between(&self, src: BlockId, dst: BlockId) -> Option<&DfgEdge> {
        self.edge_by_pair
            .get(&(src, dst))
            .and_then(|id| self.edges.get(id.0))
    }

    fn remove_edge_raw(&mut self, id: EdgeId) {
        if let Some(edge) = self.edges.remove(id.0) {
            self.edge_by_pair.remove(&(edge.src, edge.dst));
            if let Some(src) = self.blocks.get_mut(edge.src.idx) {
                src.outgoing.retain(|e| *e != id);
            }
            if let Some(dst) = self.blocks.get_mut(edge.dst.idx) {
                dst.incoming.retain(|e| *e != id);
            }
        }
    }

    /// Compute the latch flag an edge between `src` and `dst` should
    /// have, given the blocks' own latch flags. An explicit per-edge
    /// latch (set by `latch_connection`) is ORed in by the caller.
    fn derived_latch(&self, src: BlockId, dst: BlockId) -> bool {
        let src_latched = self
            .blocks
            .get(src.idx)
            .map(|b| b.latched_output)
            .unwrap_or(false);
        let dst_latched = self
            .blocks
            .get(dst.idx)
            .map(|b| b.latched_input)
            .unwrap_or(false);
        src_latched || dst_latched
    }

    /// Add (or merge into an existing edge) one concrete port
    /// connection. Returns the id of the edge the connection landed on
    /// and whether a *new* edge was created (used by the caller to
    /// decide whether a topology recompute is needed).
    pub fn connect(
        &mut self,
        src: BlockId,
        src_port: OutputPort,
        dst: BlockId,
        dst_port: InputPort,
    ) -> Result<(EdgeId, bool), ConnectError> {
        let src_entry = self
            .blocks
            .get(src.idx)
            .ok_or(ConnectError::SrcBlockNotFound(src))?;
        if !src_entry.hook.output_ports().contains(&src_port) {
            return Err(ConnectError::UnknownOutputPort {
                block: src,
                port: src_port,
            });
        }

        let dst_entry = self
            .blocks
            .get(dst.idx)
            .ok_or(ConnectError::DstBlockNotFound(dst))?;
        if !dst_entry.hook.input_ports().contains(&dst_port) {
            return Err(ConnectError::UnknownInputPort {
                block: dst,
                port: dst_port,
            });
        }

        if let Some(&edge_id) = self.edge_by_pair.get(&(src, dst)) {
            let edge = &mut self.edges[edge_id.0];
            let conn = Connection {
                source_port: src_port,
                sink_port: dst_port,
            };
            if !edge.connections.contains(&conn) {
                edge.connections.push(conn);
            }
            self.recompute_latch(src, dst);
            return Ok((edge_id, false));
        }

        let idx = self.edges.insert(DfgEdge {
            id: EdgeId(thunderdome::Index::DANGLING),
            src,
            dst,
            connections: SmallVec::from_elem(
                Connection {
                    source_port: src_port,
                    sink_port: dst_port,
                },
                1,
            ),
            explicit_latch: false,
            latched: self.derived_latch(src, dst),
        });
        let edge_id = EdgeId(idx);
        self.edges[idx].id = edge_id;
        self.edge_by_pair.insert((src, dst), edge_id);

        self.blocks[src.idx].outgoing.push(edge_id);
        self.blocks[dst.idx].incoming.push(edge_id);

        Ok((edge_id, true))
    }

    /// Remove one concrete port connection. If it was the last
    /// connection on its edge, the edge itself is removed. Returns
    /// whether the edge set actually changed.
    pub fn disconnect(
        &mut self,
        src: BlockId,
        src_port: &OutputPort,
        dst: BlockId,
        dst_port: &InputPort,
    ) -> bool {
        let Some(&edge_id) = self.edge_by_pair.get(&(src, dst)) else {
            return false;
        };

        let edge = &mut self.edges[edge_id.0];
        let before = edge.connections.len();
        edge.connections
            .retain(|c| !(c.source_port == *src_port && c.sink_port == *dst_port));
        let changed = edge.connections.len() != before;

        if edge.connections.is_empty() {
            self.remove_edge_raw(edge_id);
        }

        changed
    }

    /// Re-derive the `latched` flag for the edge between `src` and
    /// `dst` (if any) from `explicit_latch` ORed with the blocks'
    /// current latch flags. Called whenever a contributing input
    /// changes: a new connection, or a block's `latched_input`/
    /// `latched_output` flag flipping. Returns whether the flag
    /// actually changed.
    pub fn recompute_latch(&mut self, src: BlockId, dst: BlockId) -> bool {
        let Some(&edge_id) = self.edge_by_pair.get(&(src, dst)) else {
            return false;
        };
        let derived = self.derived_latch(src, dst);
        let edge = &mut self.edges[edge_id.0];
        let new_latch = edge.explicit_latch || derived;
        if edge.latched != new_latch {
            edge.latched = new_latch;
            true
        } else {
            false
        }
    }

    /// Set (or clear) the explicit per-edge latch on the connection
    /// between `src` and `dst`, independent of the owning blocks' own
    /// latch flags, and recompute `latched` accordingly. Returns
    /// whether the effective `latched` flag changed, or `None` if no
    /// such edge exists.
    pub fn set_edge_latch(&mut self, src: BlockId, dst: BlockId, latch: bool) -> Option<bool> {
        let &edge_id = self.edge_by_pair.get(&(src, dst))?;
        self.edges[edge_id.0].explicit_latch = latch;
        Some(self.recompute_latch(src, dst))
    }

    /// Set a block's `latched_input`/`latched_output` flags and
    /// recompute `latched` on every edge touching it. Used by
    /// `Scheme::latch_inputs`/`latch_outputs` (C6), which latch every
    /// connection touching a block's side rather than one connection.
    pub fn set_block_latch(
        &mut self,
        id: BlockId,
        latched_input: Option<bool>,
        latched_output: Option<bool>,
    ) {
        let Some(entry) = self.blocks.get_mut(id.idx) else {
            return;
        };
        if let Some(v) = latched_input {
            entry.latched_input = v;
        }
        if let Some(v) = latched_output {
            entry.latched_output = v;
        }

        let touched: Vec<(BlockId, BlockId)> = self
            .blocks
            .get(id.idx)
            .map(|entry| {
                entry
                    .incoming
                    .iter()
                    .chain(entry.outgoing.iter())
                    .filter_map(|eid| self.edges.get(eid.0))
                    .map(|e| (e.src, e.dst))
                    .collect()
            })
            .unwrap_or_default();
        for (src, dst) in touched {
            self.recompute_latch(src, dst);
        }
    }
}
