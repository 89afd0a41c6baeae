//! Configuration for the Strata voxel world.
//!
//! Settings persist to disk as a RON file, tolerate missing and unknown
//! fields, and can be overridden from the command line via clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, LightingConfig, MIN_UNLOAD_BUFFER, RenderConfig, SUPPORTED_CHUNK_SIZES,
    StreamingConfig, TerrainConfig, WorkerConfig, WorldConfig,
};
pub use error::ConfigError;
