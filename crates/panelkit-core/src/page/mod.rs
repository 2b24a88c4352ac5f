//! Page domain module.
//!
//! # Module Structure
//!
//! - `model`: `Page`, `Row`, `Panel`
//! - `collection`: `PageCollection` (ordered pages + cursor)
//! - `script`: parsing/validation of page JSON

mod collection;
mod model;
mod script;

pub use collection::{PageCollection, PageInput};
pub use model::{DEFAULT_ROW_HEIGHT, Page, Panel, Row};
pub use script::{pages_from_value, parse_pages, validate_script};
