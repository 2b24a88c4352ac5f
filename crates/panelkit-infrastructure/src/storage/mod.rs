//! Storage backends for session state.

mod atomic_file;
mod json_file;
mod memory;

pub use atomic_file::AtomicFile;
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
