//! Versioned request/response/event envelopes for the UI host boundary.
//!
//! The UI process is untrusted: inbound operation names are matched against
//! a fixed allow-list and outbound notifications against a fixed name set.

use crate::update::observer::{MenuItemState, UpdateNotification, UserDialog};
use serde::{Deserialize, Serialize};

/// Contract version for host envelopes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Operations the UI may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Check,
    Download,
    Install,
    OpenRelease,
}

impl Operation {
    /// Every allow-listed operation.
    pub const ALL: [Operation; 4] = [
        Operation::Check,
        Operation::Download,
        Operation::Install,
        Operation::OpenRelease,
    ];

    /// Render operation name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Download => "download",
            Self::Install => "install",
            Self::OpenRelease => "open-release",
        }
    }

    /// Parse an operation name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "check" => Some(Self::Check),
            "download" => Some(Self::Download),
            "install" => Some(Self::Install),
            "open-release" => Some(Self::OpenRelease),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of a gateway operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    #[must_use]
    pub fn ok(value: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            value,
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(message.into()),
        }
    }
}

/// A versioned request envelope from UI -> host.
///
/// `operation` stays a raw string so that names outside the allow-list
/// reach the gateway and are rejected there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub v: u32,
    pub request_id: String,
    pub operation: String,
}

impl RequestEnvelope {
    /// Build a v1 request envelope.
    #[must_use]
    pub fn new(request_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            operation: operation.into(),
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != PROTOCOL_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, PROTOCOL_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned response envelope from host -> UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    #[serde(flatten)]
    pub response: GatewayResponse,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn new(request_id: impl Into<String>, response: GatewayResponse) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            response,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(request_id, GatewayResponse::error(message))
    }
}

/// A versioned notification envelope from host -> UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

impl From<&UpdateNotification> for EventEnvelope {
    fn from(notification: &UpdateNotification) -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            notification.name(),
            notification.payload(),
        )
    }
}

/// Every message the host writes to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Response(ResponseEnvelope),
    Notification(EventEnvelope),
    Menu(MenuItemState),
    Dialog(UserDialog),
}

impl HostMessage {
    /// Outbound filter: notifications must carry one of the fixed names.
    #[must_use]
    pub fn is_forwardable(&self) -> bool {
        match self {
            Self::Notification(envelope) => UpdateNotification::is_known_name(&envelope.event),
            Self::Response(_) | Self::Menu(_) | Self::Dialog(_) => true,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
