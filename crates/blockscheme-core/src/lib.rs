pub mod hook;

pub use hook::{
    BlockHook, BlockState, Exclusivity, HookOp, InputPort, OutputPort,
};
