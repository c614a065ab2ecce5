use std::error::Error;
use std::fmt;

use blockscheme_core::{InputPort, OutputPort};

use super::BlockId;

/// An error occurred while attempting to add or remove a connection
/// (DFG edge) between two blocks.
#[derive(Debug, Clone)]
pub enum ConnectError {
    /// The given source block was not found in the scheme.
    SrcBlockNotFound(BlockId),
    /// The given destination block was not found in the scheme.
    DstBlockNotFound(BlockId),
    /// The given output port is not declared by the source block.
    UnknownOutputPort { block: BlockId, port: OutputPort },
    /// The given input port is not declared by the destination block.
    UnknownInputPort { block: BlockId, port: InputPort },
}

impl Error for ConnectError {}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SrcBlockNotFound(id) => {
                write!(f, "could not connect: source block {:?} not found", id)
            }
            Self::DstBlockNotFound(id) => {
                write!(
                    f,
                    "could not connect: destination block {:?} not found",
                    id
                )
            }
            Self::UnknownOutputPort { block, port } => {
                write!(
                    f,
                    "output port {:?} is not declared by block {:?}",
                    port, block
                )
            }
            Self::UnknownInputPort { block, port } => {
                write!(
                    f,
                    "input port {:?} is not declared by block {:?}",
                    port, block
                )
            }
        }
    }
}
