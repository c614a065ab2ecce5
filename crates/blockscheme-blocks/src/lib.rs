//! A small library of ready-made [`BlockHook`](blockscheme_core::BlockHook)
//! implementations, mirroring the role of
//! `firewheel_graph::basic_nodes` (`DummyAudioNode`, `SumNode`, ...):
//! useful fixtures for tests, and something a caller can `add_block`
//! before writing a real block of their own.

mod counter;
mod failing;
mod passthrough;

pub use counter::CounterBlock;
pub use failing::FailingBlock;
pub use passthrough::PassthroughBlock;
