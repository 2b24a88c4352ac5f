//! HTTP implementations of the generation collaborators.

pub mod client;
pub mod image;
pub mod script;
pub mod text;

pub use client::BackendClient;
pub use image::HttpPageImageGenerator;
pub use script::HttpScriptGenerator;
pub use text::{HttpPromptOptimizer, HttpSessionTitler};
