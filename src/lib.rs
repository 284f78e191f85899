pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod oracle;
pub mod pathway;
pub mod types;
pub mod utils;
pub mod vocab;

// Re-export main API
pub use api::*;
pub use error::{PathwayError, Result};
