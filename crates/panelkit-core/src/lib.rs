//! Domain core: pages, artifact versions, sessions and the traits the outer
//! layers implement.

pub mod artifact;
pub mod error;
pub mod generation;
pub mod page;
pub mod session;
pub mod storage;

// Re-export common error type
pub use error::{PanelkitError, Result};
