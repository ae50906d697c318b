// src/config/mod.rs
// Configuration: environment variables + curator.toml

pub mod env;
pub mod file;

pub use env::{ApiKeys, EnvOverrides};
pub use file::{BatchConfig, CuratorConfig, PipelineConfig};
