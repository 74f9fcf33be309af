//! Core Icinga domain types.
//!
//! Check states for hosts and services, the object types the API exposes, and
//! the display helpers dashboards use to render them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Service check state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceState {
    /// 0
    Ok,
    /// 1
    Warning,
    /// 2
    Critical,
    /// 3
    Unknown,
}

impl ServiceState {
    /// Map a numeric state. Values above 3 are treated as unknown.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Warning,
            2 => Self::Critical,
            _ => Self::Unknown,
        }
    }

    /// Numeric state as sent by the API.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Human-readable state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        }
    }

    /// Named color used by dashboards.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Ok => "green",
            Self::Warning => "yellow",
            Self::Critical => "red",
            Self::Unknown => "purple",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host check state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostState {
    /// 0
    Up,
    /// 1
    Down,
}

impl HostState {
    /// Map a numeric state. Any non-zero value is down.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        if code == 0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    /// Human-readable state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
        }
    }

    /// Named color used by dashboards.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Up => "green",
            Self::Down => "red",
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a raw numeric state, `"Undefined"` when out of range.
#[must_use]
pub fn state_to_string(state: i64, is_host: bool) -> &'static str {
    match (is_host, state) {
        (true, 0) => "Up",
        (true, 1) => "Down",
        (false, 0) => "OK",
        (false, 1) => "Warning",
        (false, 2) => "Critical",
        (false, 3) => "Unknown",
        _ => "Undefined",
    }
}

/// Color for a raw numeric state, `"blue"` when out of range.
#[must_use]
pub fn state_to_color(state: i64, is_host: bool) -> &'static str {
    match (is_host, state) {
        (_, 0) => "green",
        (true, 1) => "red",
        (false, 1) => "yellow",
        (false, 2) => "red",
        (false, 3) => "purple",
        _ => "blue",
    }
}

/// Turn a full service name `host!service` into `host - service`.
#[must_use]
pub fn format_service(name: &str) -> String {
    name.splitn(2, '!').collect::<Vec<_>>().join(" - ")
}

/// Checkable object kind, used for downtimes and object URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ObjectType {
    /// Host object
    Host,
    /// Service object
    Service,
}

impl ObjectType {
    /// Capitalized type name as the API expects it in action payloads.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Host => "Host",
            Self::Service => "Service",
        }
    }

    /// Plural collection name used in `objects/<collection>` URLs.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Host => "hosts",
            Self::Service => "services",
        }
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "service" => Ok(Self::Service),
            _ => Err(Error::ValidationError(format!(
                "wrong downtime type. only 'host' or 'service' allowed ('{s}' given)"
            ))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_codes() {
        assert_eq!(ServiceState::from_code(0), ServiceState::Ok);
        assert_eq!(ServiceState::from_code(2), ServiceState::Critical);
        assert_eq!(ServiceState::from_code(9), ServiceState::Unknown);
        assert_eq!(ServiceState::Warning.code(), 1);
        assert!(ServiceState::Critical > ServiceState::Warning);
    }

    #[test]
    fn test_state_to_string() {
        assert_eq!(state_to_string(0, true), "Up");
        assert_eq!(state_to_string(1, true), "Down");
        assert_eq!(state_to_string(2, true), "Undefined");
        assert_eq!(state_to_string(0, false), "OK");
        assert_eq!(state_to_string(3, false), "Unknown");
        assert_eq!(state_to_string(7, false), "Undefined");
    }

    #[test]
    fn test_state_to_color() {
        assert_eq!(state_to_color(0, true), "green");
        assert_eq!(state_to_color(1, true), "red");
        assert_eq!(state_to_color(1, false), "yellow");
        assert_eq!(state_to_color(3, false), "purple");
        assert_eq!(state_to_color(-1, false), "blue");
        assert_eq!(HostState::Down.color(), "red");
        assert_eq!(ServiceState::Unknown.color(), "purple");
    }

    #[test]
    fn test_format_service() {
        assert_eq!(format_service("icinga2!ping4"), "icinga2 - ping4");
        assert_eq!(format_service("a!b!c"), "a - b!c");
        assert_eq!(format_service("plain"), "plain");
    }

    #[test]
    fn test_object_type_parse() {
        assert_eq!("host".parse::<ObjectType>().unwrap(), ObjectType::Host);
        assert_eq!("Service".parse::<ObjectType>().unwrap(), ObjectType::Service);
        assert!(matches!(
            "zone".parse::<ObjectType>(),
            Err(Error::ValidationError(_))
        ));
        assert_eq!(ObjectType::Service.name(), "Service");
        assert_eq!(ObjectType::Host.collection(), "hosts");
    }

    #[test]
    fn test_object_type_serialization() {
        assert_eq!(serde_json::to_string(&ObjectType::Host).unwrap(), "\"Host\"");
    }
}
