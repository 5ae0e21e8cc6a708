/// The current version of AgriCraft, sourced from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod classify;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod media;
pub mod pipeline;

pub use error::{Error, Result};
