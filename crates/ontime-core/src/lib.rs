pub mod config;
pub mod error;
pub mod types;

pub use config::OntimeConfig;
pub use error::{OntimeError, Result};
pub use types::*;
