pub mod config;
pub mod display;
pub mod error;
pub mod types;

pub use config::{parse_platforms, Config, PageBackend};
pub use display::{humanize_duration, ContestView, SnapshotRecord};
pub use error::{ConfigError, ContestError};
pub use types::*;
