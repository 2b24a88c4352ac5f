//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: `Session`, its `SessionConfig` and partial updates (`SessionPatch`)
//! - `store`: `SessionStore`, which owns every session and persists them
//! - `event`: change notifications (`SessionEvent`, `EventBus`)
//! - `id`: session id generation

mod event;
mod id;
mod model;
mod store;

pub use event::{EventBus, SessionEvent};
pub use id::{IdGenerator, UuidGenerator};
pub use model::{
    DEFAULT_LANGUAGE, DEFAULT_PAGE_COUNT, DEFAULT_ROWS_PER_PAGE, DEFAULT_STYLE, MAX_PAGE_COUNT,
    MAX_ROWS_PER_PAGE, Session, SessionConfig, SessionPatch,
};
pub use store::{SessionStore, is_default_session_name, is_retained};
