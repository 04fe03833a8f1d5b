//! Configuration types and loading
//!
//! Configuration is read from a JSON file and can be overridden with
//! `GATEWAY_SYNC_*` environment variables at startup.

mod loader;
mod types;

pub use loader::{
    create_default_config, load_config, load_config_str, load_config_with_env,
    parse_redirect_spec,
};
pub use types::{ApiConfig, Config, LogConfig, SourcesConfig};
