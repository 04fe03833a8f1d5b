//! Gateway API wire types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session identifier stamped into every rule created by one run
///
/// A rule whose name carries the engine's prefix is "owned"; among owned
/// rules the session id tells the current run's artifacts apart from
/// stale ones left by previous runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh per-run session identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Rule action evaluated by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Block,
    Override,
}

impl RuleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Override => "override",
        }
    }
}

/// A gateway DNS policy rule as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traffic: String,
    #[serde(default)]
    pub precedence: u32,
    #[serde(default)]
    pub enabled: bool,
    /// Action name as reported by the server; foreign rules may carry
    /// actions this engine never creates
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GatewayRule {
    /// Whether this rule was created by this engine (any run of it)
    pub fn is_owned(&self) -> bool {
        self.name.starts_with(constants::RULE_NAME_PREFIX)
    }

    /// The session that created this rule, if the engine owns it
    ///
    /// Non-owned rules never report a session, even if their description
    /// happens to look like one.
    pub fn owner_session(&self) -> Option<SessionId> {
        if self.is_owned() && !self.description.is_empty() {
            Some(SessionId::from(self.description.as_str()))
        } else {
            None
        }
    }
}

// Rule identity is the server-assigned id
impl PartialEq for GatewayRule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GatewayRule {}

/// A gateway domain list as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

impl GatewayList {
    /// Whether this list was created by this engine
    pub fn is_owned(&self) -> bool {
        self.name.starts_with(constants::LIST_NAME_PREFIX)
    }
}

/// Request body for creating a rule
#[derive(Debug, Clone, Serialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub description: String,
    pub action: RuleAction,
    pub filters: Vec<String>,
    pub enabled: bool,
    pub traffic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precedence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_settings: Option<RuleSettings>,
}

impl CreateRuleRequest {
    /// Base request for a DNS rule stamped with the given session
    pub fn new(name: String, action: RuleAction, session: &SessionId, traffic: String) -> Self {
        Self {
            name,
            description: session.to_string(),
            action,
            filters: vec!["dns".to_string()],
            enabled: true,
            traffic,
            precedence: None,
            rule_settings: None,
        }
    }
}

/// Override-specific rule settings
#[derive(Debug, Clone, Serialize)]
pub struct RuleSettings {
    pub override_ips: Vec<String>,
}

/// Request body for creating a domain list
#[derive(Debug, Clone, Serialize)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<ListItem>,
}

impl CreateListRequest {
    /// A DOMAIN-type list from a set of domain names
    pub fn domains(name: String, domains: impl IntoIterator<Item = String>) -> Self {
        Self {
            name,
            kind: "DOMAIN".to_string(),
            items: domains.into_iter().map(|value| ListItem { value }).collect(),
        }
    }
}

/// One list member
#[derive(Debug, Clone, Serialize)]
pub struct ListItem {
    pub value: String,
}

/// The gateway's response envelope
///
/// Failure is always explicit: `success` is false and `errors` carries
/// the detail. `result` may be absent on deletes.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub result: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Server error detail joined into one line, verbatim
    pub fn error_detail(&self) -> String {
        if self.errors.is_empty() {
            return "no error detail provided".to_string();
        }
        self.errors
            .iter()
            .map(ApiMessage::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One server-provided error or informational message
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

impl fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// API configuration constants
pub mod constants {
    /// Public gateway API endpoint
    pub const API_BASE: &str = "https://api.cloudflare.com/client/v4";

    /// Name prefix marking rules as owned by this engine
    pub const RULE_NAME_PREFIX: &str = "Rules set by script";

    /// Name prefix marking lists as owned by this engine
    pub const LIST_NAME_PREFIX: &str = "List set by script";

    /// Maximum number of domains the gateway accepts in one list
    pub const MAX_LIST_SIZE: usize = 1000;

    pub const USER_AGENT: &str = concat!("gateway-sync/", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, description: &str) -> GatewayRule {
        GatewayRule {
            id: "r1".to_string(),
            name: name.to_string(),
            description: description.to_string(),
            traffic: String::new(),
            precedence: 0,
            enabled: true,
            action: None,
            created_at: None,
        }
    }

    #[test]
    fn test_ownership_requires_name_prefix() {
        assert!(rule("Rules set by script", "abc").is_owned());
        assert!(rule("Rules set by script override to IP -> 10.0.0.1", "abc").is_owned());
        assert!(!rule("Corporate DNS policy", "abc").is_owned());
    }

    #[test]
    fn test_owner_session_only_for_owned_rules() {
        let session = SessionId::from("run-1");
        assert_eq!(
            rule("Rules set by script", "run-1").owner_session(),
            Some(session)
        );
        // A foreign rule whose description collides with a session id is
        // still not attributed to the engine
        assert_eq!(rule("Corporate DNS policy", "run-1").owner_session(), None);
        assert_eq!(rule("Rules set by script", "").owner_session(), None);
    }

    #[test]
    fn test_rule_equality_is_by_id() {
        let a = rule("Rules set by script", "x");
        let mut b = rule("Something else", "y");
        b.id = "r1".to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn test_create_rule_request_serialization() {
        let session = SessionId::from("sess");
        let request = CreateRuleRequest::new(
            "Rules set by script".to_string(),
            RuleAction::Block,
            &session,
            "any(dns.domains[*] in $abc)".to_string(),
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["action"], "block");
        assert_eq!(json["filters"][0], "dns");
        assert_eq!(json["description"], "sess");
        // Absent precedence must be omitted so the server can pick a default
        assert!(json.get("precedence").is_none());
        assert!(json.get("rule_settings").is_none());
    }

    #[test]
    fn test_envelope_deserialization() {
        let envelope: ApiEnvelope<Vec<GatewayRule>> = serde_json::from_str(
            r#"{
                "success": false,
                "errors": [{"code": 2021, "message": "precedence already in use"}],
                "result": null
            }"#,
        )
        .unwrap();

        assert!(!envelope.success);
        assert!(envelope.result.is_none());
        assert!(envelope.error_detail().contains("precedence already in use"));
        assert!(envelope.error_detail().contains("2021"));
    }

    #[test]
    fn test_envelope_without_result_field() {
        let envelope: ApiEnvelope<GatewayRule> =
            serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(envelope.success);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error_detail(), "no error detail provided");
    }
}
