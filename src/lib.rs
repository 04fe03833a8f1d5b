//! gateway-sync: DNS gateway policy synchronizer
//!
//! This crate reconciles a desired DNS filtering policy (block-list domains
//! and per-destination override rules) against the rules and domain lists
//! held by a remote Zero Trust gateway.
//!
//! # Architecture
//!
//! ```text
//! Domain sources → Reconciler → Gateway API
//!                     ↓
//!          remove stale rules/lists
//!                     ↓
//!          create block lists + blocking rule
//!                     ↓
//!          create override rules (concurrent, one per destination)
//! ```
//!
//! Every rule created by this tool carries a fixed name prefix (ownership)
//! and the current run's session id in its description, so a later run can
//! tell its own stale artifacts apart from rules managed by other actors.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use gateway_sync::api::HttpGatewayClient;
//! use gateway_sync::config::load_config;
//! use gateway_sync::reconcile::Reconciler;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("/etc/gateway-sync/config.json")?;
//! let client = HttpGatewayClient::new(&config.api)?;
//! let reconciler = Reconciler::new(Arc::new(client));
//! let report = reconciler.run(&["ads.example".into()], &[]).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`api`]: Gateway API client, wire DTOs and errors
//! - [`config`]: Configuration types and loading
//! - [`error`]: Top-level error type
//! - [`reconcile`]: The reconciliation engine
//! - [`sources`]: Block/override domain source loading

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod sources;

// Re-export commonly used types at the crate root
pub use api::{ApiError, GatewayApi, GatewayList, GatewayRule, HttpGatewayClient, SessionId};
pub use config::{load_config, load_config_with_env, Config};
pub use error::{ConfigError, SyncError};
pub use reconcile::{PrecedenceAllocator, ReconcileError, Reconciler, SyncReport};
pub use sources::OverrideRoute;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
