//! Configuration schema and loader for the festa bot.

pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config},
    schema::FestaConfig,
};
