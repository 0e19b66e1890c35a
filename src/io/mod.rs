//! I/O layer: lazy line-oriented JSONL reader/writer, plus a
//! random-access `LazyJsonl` for the virtual-filesystem navigation
//! contract.

pub mod lazy;
pub mod reader;
pub mod writer;

pub use lazy::{LazyJsonl, VfsNavigate};
pub use reader::{LineMode, Reader};
pub use writer::{KeyOrder, Writer};
