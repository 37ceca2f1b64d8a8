// Content refresh pipeline: cooldown sweep, backoff executor, batch regeneration

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
