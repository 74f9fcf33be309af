//! Icinga object models and request types.
//!
//! Check records are decoded from the object envelope the API returns,
//! `{"name": ..., "attrs": {...}, "joins": {"host": {...}}}`. Numeric attributes
//! arrive as floats (`2.0`); they are read leniently so a stray string or
//! boolean does not fail a whole collection.

use icinga_core::normalize::compact_object;
use icinga_core::types::{HostState, ServiceState};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

/// Default attributes requested for host and service status objects.
pub const DEFAULT_STATUS_ATTRS: [&str; 5] = [
    "name",
    "state",
    "acknowledgement",
    "downtime_depth",
    "last_check",
];

/// Default host joins requested for service status objects.
pub const DEFAULT_HOST_JOINS: [&str; 5] = [
    "host.name",
    "host.state",
    "host.acknowledgement",
    "host.downtime_depth",
    "host.last_check",
];

/// Check-relevant attributes shared by hosts and services.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckStatus {
    /// Numeric check state
    #[serde(default, deserialize_with = "lenient::state")]
    pub state: u8,
    /// Acknowledged (normal or sticky)
    #[serde(default, deserialize_with = "lenient::flag")]
    pub acknowledgement: bool,
    /// Number of active downtimes
    #[serde(default, deserialize_with = "lenient::depth")]
    pub downtime_depth: u32,
    /// Epoch seconds of the last check result, zero or negative when never checked
    #[serde(default, deserialize_with = "lenient::number")]
    pub last_check: f64,
}

impl CheckStatus {
    /// Non-OK state.
    #[must_use]
    pub const fn is_problem(&self) -> bool {
        self.state != 0
    }

    /// In at least one downtime.
    #[must_use]
    pub const fn in_downtime(&self) -> bool {
        self.downtime_depth > 0
    }

    /// Acknowledged or in downtime.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        self.acknowledgement || self.in_downtime()
    }

    /// Has received at least one check result.
    #[must_use]
    pub fn has_been_checked(&self) -> bool {
        self.last_check > 0.0
    }
}

/// Joined host attributes of a service object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostJoin {
    /// Host name
    #[serde(default)]
    pub name: Option<String>,
    /// Host check attributes
    #[serde(flatten)]
    pub status: CheckStatus,
}

/// Joins attached to a service object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceJoins {
    /// Joined host
    #[serde(default)]
    pub host: HostJoin,
}

/// A service status object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Full name, `host!service`
    pub name: String,
    /// Service check attributes
    #[serde(rename = "attrs", default)]
    pub status: CheckStatus,
    /// Joined host
    #[serde(default)]
    pub joins: ServiceJoins,
}

impl ServiceRecord {
    /// Service state.
    #[must_use]
    pub const fn state(&self) -> ServiceState {
        ServiceState::from_code(self.status.state)
    }

    /// Joined host attributes.
    #[must_use]
    pub const fn host(&self) -> &CheckStatus {
        &self.joins.host.status
    }
}

/// A host status object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Host name
    pub name: String,
    /// Host check attributes
    #[serde(rename = "attrs", default)]
    pub status: CheckStatus,
}

impl HostRecord {
    /// Host state.
    #[must_use]
    pub const fn state(&self) -> HostState {
        HostState::from_code(self.status.state)
    }
}

/// Something with a name and check attributes.
pub trait Checkable {
    /// Object name
    fn name(&self) -> &str;
    /// Check attributes
    fn status(&self) -> &CheckStatus;
}

impl Checkable for ServiceRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &CheckStatus {
        &self.status
    }
}

impl Checkable for HostRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &CheckStatus {
        &self.status
    }
}

/// Attribute/join/filter selection for object queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectQuery {
    /// Attributes to return
    pub attrs: Vec<String>,
    /// Joins to return
    pub joins: Vec<String>,
    /// Icinga filter expression
    pub filter: Option<String>,
}

impl ObjectQuery {
    /// Status attributes of hosts.
    #[must_use]
    pub fn host_status() -> Self {
        Self {
            attrs: DEFAULT_STATUS_ATTRS.iter().map(ToString::to_string).collect(),
            joins: Vec::new(),
            filter: None,
        }
    }

    /// Status attributes of services, joined with their host.
    #[must_use]
    pub fn service_status() -> Self {
        Self {
            joins: DEFAULT_HOST_JOINS.iter().map(ToString::to_string).collect(),
            ..Self::host_status()
        }
    }

    /// Restrict the result with a filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Request body for a tunneled GET.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        if !self.attrs.is_empty() {
            payload.insert("attrs".to_string(), json!(self.attrs));
        }
        if !self.joins.is_empty() {
            payload.insert("joins".to_string(), json!(self.joins));
        }
        if let Some(filter) = &self.filter {
            payload.insert("filter".to_string(), json!(filter));
        }
        Value::Object(payload)
    }
}

/// Filter expression matching one host by name.
#[must_use]
pub fn host_name_filter(host: &str) -> String {
    format!("host.name==\"{host}\"")
}

/// Payload for creating a host.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct HostRequest {
    /// Object name
    #[validate(length(min = 1, message = "missing host name"))]
    pub name: String,
    /// Templates to import
    pub templates: Vec<String>,
    /// Address (IPv4 or DNS name)
    pub address: Option<String>,
    /// IPv6 address
    pub address6: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Check command
    pub check_command: Option<String>,
    /// Maximum check attempts before a hard state
    pub max_check_attempts: Option<u32>,
    /// Enable notifications
    pub enable_notifications: Option<bool>,
    /// Custom variables
    pub vars: Map<String, Value>,
}

impl HostRequest {
    /// New host importing `generic-host`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: vec!["generic-host".to_string()],
            address: None,
            address6: None,
            display_name: None,
            check_command: None,
            max_check_attempts: None,
            enable_notifications: None,
            vars: Map::new(),
        }
    }

    /// Set the address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Add a custom variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: Value) -> Self {
        self.vars.insert(key.into(), value);
        self
    }

    /// Body of the PUT request.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let vars = if self.vars.is_empty() {
            Value::Null
        } else {
            Value::Object(self.vars.clone())
        };

        json!({
            "templates": self.templates,
            "attrs": compact_object([
                ("address", json!(self.address)),
                ("address6", json!(self.address6)),
                ("display_name", json!(self.display_name)),
                ("check_command", json!(self.check_command)),
                ("max_check_attempts", json!(self.max_check_attempts)),
                ("enable_notifications", json!(self.enable_notifications)),
                ("vars", vars),
            ]),
        })
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct UserRequest {
    /// Object name
    #[validate(length(min = 1, message = "missing user name"))]
    pub name: String,
    /// Display name
    pub display_name: Option<String>,
    /// Email address
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    /// Pager address
    pub pager: Option<String>,
    /// Enable notifications
    pub enable_notifications: bool,
    /// User groups; each must already exist
    pub groups: Vec<String>,
}

impl UserRequest {
    /// New user with notifications disabled and no groups.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            email: None,
            pager: None,
            enable_notifications: false,
            groups: Vec::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the pager address.
    #[must_use]
    pub fn with_pager(mut self, pager: impl Into<String>) -> Self {
        self.pager = Some(pager.into());
        self
    }

    /// Enable notifications.
    #[must_use]
    pub const fn with_notifications(mut self, enabled: bool) -> Self {
        self.enable_notifications = enabled;
        self
    }

    /// Add a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Body of the PUT request; unset attributes are omitted.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let groups = if self.groups.is_empty() {
            Value::Null
        } else {
            json!(self.groups)
        };

        json!({
            "attrs": compact_object([
                ("display_name", json!(self.display_name)),
                ("email", json!(self.email)),
                ("pager", json!(self.pager)),
                ("enable_notifications", json!(self.enable_notifications)),
                ("groups", groups),
            ]),
        })
    }
}

mod lenient {
    use super::{Deserialize, Deserializer, Value};

    fn to_f64(value: &Value) -> f64 {
        match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            Value::Bool(b) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Value::deserialize(deserializer).map(|value| to_f64(&value))
    }

    pub fn state<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        number(deserializer).map(|n| n.round().clamp(0.0, f64::from(u8::MAX)) as u8)
    }

    pub fn depth<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        number(deserializer).map(|n| n.round().clamp(0.0, f64::from(u32::MAX)) as u32)
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        number(deserializer).map(|n| n != 0.0)
    }
}
