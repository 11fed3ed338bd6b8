pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliArgs;

pub use crate::adapters::memory::{MemoryConnector, MemorySpatialStore};
pub use crate::adapters::postgres::{PostgresConfig, PostgresConnector};
pub use crate::app::pipelines::{run_job, GeoPipeline};
pub use crate::config::cli::LocalStorage;
pub use crate::config::toml_config::{EtlConfig, JobConfig};
pub use crate::core::{etl::EtlEngine, loader::SpatialLoader};
pub use crate::utils::error::{EtlError, Result};
