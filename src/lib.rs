pub use blockscheme_core::*;
pub use blockscheme_graph::*;

#[cfg(feature = "demo-blocks")]
pub use blockscheme_blocks as demo_blocks;
