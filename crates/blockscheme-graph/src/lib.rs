//! Graph-management and scheduling core: the Data-Flow Graph, the
//! Execution Scheduling Graph view derived from it, the Resource
//! Conflict Graph, group registry, latching, enable/disable/switch
//! policy, and the periodic update driver.

pub mod compiler;
pub mod conflict;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod groups;
pub mod scheme;

/// Default cap on how many blocks `get_flow_cycles`/
/// `get_execution_cycles`/`min_latch_count`/`max_latch_count` will use
/// as cycle-search starting points before falling back to best-effort
/// (see `SchemeConfig::cycle_search_vertex_cap`). Simple-cycle
/// enumeration is worst-case exponential in the vertex count, so a
/// default is needed to keep a pathological scheme from hanging
/// introspection calls.
pub const MAX_CYCLE_SEARCH_VERTICES_DEFAULT: usize = 64;

pub use compiler::CycleDetected;
pub use conflict::ConflictGraph;
pub use error::SchemeError;
pub use graph::{BlockId, Connection, ConnectError, DfgEdge, EdgeId, Graph};
pub use groups::GroupRegistry;
pub use scheme::{Scheme, SchemeConfig, UpdateReport};
