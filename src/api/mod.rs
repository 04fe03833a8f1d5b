//! Gateway API module
//!
//! Wire DTOs, the `GatewayApi` collaborator trait and the HTTPS client
//! implementation against the Zero Trust gateway endpoint.

pub mod client;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use client::{GatewayApi, HttpGatewayClient};
pub use error::{ApiError, ApiResult};
pub use types::{
    constants, ApiEnvelope, ApiMessage, CreateListRequest, CreateRuleRequest, GatewayList,
    GatewayRule, ListItem, RuleAction, RuleSettings, SessionId,
};
