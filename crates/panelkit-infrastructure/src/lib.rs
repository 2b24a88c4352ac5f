pub mod config;
pub mod paths;
pub mod storage;

pub use crate::config::AppConfig;
pub use crate::paths::PanelkitPaths;
pub use crate::storage::{JsonFileStorage, MemoryStorage};
