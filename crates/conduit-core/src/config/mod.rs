//! Configuration: conduit's own settings and the agent config documents it
//! edits.

pub mod client_config;
pub mod paths;
pub mod settings;

pub use client_config::{ConfigFormat, ConfigSerializer};
pub use settings::ConduitSettings;
