use thiserror::Error;

use crate::compiler::CycleDetected;
use crate::graph::{BlockId, ConnectError};

/// The crate-wide error type surfaced by every fallible `Scheme`
/// operation.
#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("block name \"{0}\" is not registered in the caller's block registry")]
    MissingHook(String),

    #[error("\"{0}\" is not a block in the scheme")]
    NotInScheme(String),

    #[error("name \"{0}\" collides with an existing block or group")]
    NameCollision(String),

    #[error("\"{0}\" does not resolve to a known block or group")]
    UnknownName(String),

    #[error("group \"{group}\" has a member \"{member}\" that is not a known block or group")]
    UnknownMember { group: String, member: String },

    #[error("block {0:?} is not Configured or Running")]
    NotConfigured(BlockId),

    #[error("block {0:?} conflicts with a currently running block")]
    Conflict(BlockId),

    #[error("block {0:?} failed to start")]
    StartFailed(BlockId),

    #[error("block {0:?} failed to stop")]
    StopFailed(BlockId),

    #[error("operation would introduce a cycle in the execution schedule: {0}")]
    CyclicSchedule(#[from] CycleDetected),

    #[error("no edge exists between \"{edge_source}\" and \"{sink}\"")]
    NoSuchEdge { edge_source: String, sink: String },

    #[error(transparent)]
    Connect(#[from] ConnectError),
}
