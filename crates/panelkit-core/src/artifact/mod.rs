//! Artifact domain module.
//!
//! Generated images are kept per page as an append-only version history.
//!
//! # Module Structure
//!
//! - `model`: `ArtifactVersion`, `ArtifactEntry`
//! - `record`: stored shapes (`ArtifactRecord::{Versioned, Legacy}`) and their normalization
//! - `store`: `ArtifactVersionStore`
//! - `reference`: reference chain construction for generation requests

mod model;
mod record;
mod reference;
mod store;

pub use model::{ArtifactEntry, ArtifactVersion};
pub use record::{ArtifactRecord, LegacyRecord, VersionedRecord};
pub use reference::{DEFAULT_REFERENCE_CAPACITY, ReferenceImage, build_reference_chain};
pub use store::ArtifactVersionStore;
