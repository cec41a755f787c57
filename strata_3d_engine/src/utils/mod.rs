//! Small engine utilities.

mod handle;

pub use handle::{HandleTable, RawHandle};
