//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

pub use parser::{load_and_validate, load_config, load_config_str};
pub use types::*;
