//! Status aggregation.
//!
//! [`StatusSnapshot`] holds the CIB counters as of the last successful fetch;
//! [`StatusAggregator`] keeps that snapshot together with the handled-problem
//! counts from the last object refresh and derives adjusted counts from both.

use crate::api::IcingaApi;
use crate::models::{HostRecord, ServiceRecord};
use crate::problems::{HostAdjusted, HostProblemCounts, ServiceAdjusted, ServiceProblemCounts};
use crate::Result;
use chrono::{DateTime, TimeZone, Utc};
use icinga_core::normalize::{count_field, number_field, str_field};
use icinga_core::Failure;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Counters from `status/CIB`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// When the snapshot was taken
    pub fetched_at: DateTime<Utc>,
    /// Process uptime in seconds
    pub uptime_secs: f64,
    /// Uptime as `HH:MM:SS`, hours not wrapped at a day
    pub uptime: String,
    /// Average check latency, seconds, 2 decimals
    pub avg_latency: f64,
    /// Average check execution time, seconds, 2 decimals
    pub avg_execution_time: f64,
    /// Hosts UP
    pub hosts_up: u64,
    /// Hosts DOWN
    pub hosts_down: u64,
    /// Hosts pending
    pub hosts_pending: u64,
    /// Hosts unreachable
    pub hosts_unreachable: u64,
    /// Hosts in downtime
    pub hosts_in_downtime: u64,
    /// Hosts acknowledged
    pub hosts_acknowledged: u64,
    /// Services OK
    pub services_ok: u64,
    /// Services WARNING
    pub services_warning: u64,
    /// Services CRITICAL
    pub services_critical: u64,
    /// Services UNKNOWN
    pub services_unknown: u64,
    /// Services pending
    pub services_pending: u64,
    /// Services in downtime
    pub services_in_downtime: u64,
    /// Services acknowledged
    pub services_acknowledged: u64,
    /// Active host checks in the last minute
    pub host_active_checks_1min: u64,
    /// Passive host checks in the last minute
    pub host_passive_checks_1min: u64,
    /// Active service checks in the last minute
    pub service_active_checks_1min: u64,
    /// Passive service checks in the last minute
    pub service_passive_checks_1min: u64,
}

impl StatusSnapshot {
    /// Read the counters from a CIB status object. Missing fields read as zero.
    #[must_use]
    pub fn from_cib(cib: &Value, fetched_at: DateTime<Utc>) -> Self {
        let uptime_secs = number_field(cib, "uptime").max(0.0);

        Self {
            fetched_at,
            uptime_secs,
            uptime: format_uptime(uptime_secs),
            avg_latency: round2(number_field(cib, "avg_latency").max(0.0)),
            avg_execution_time: round2(number_field(cib, "avg_execution_time").max(0.0)),
            hosts_up: count_field(cib, "num_hosts_up"),
            hosts_down: count_field(cib, "num_hosts_down"),
            hosts_pending: count_field(cib, "num_hosts_pending"),
            hosts_unreachable: count_field(cib, "num_hosts_unreachable"),
            hosts_in_downtime: count_field(cib, "num_hosts_in_downtime"),
            hosts_acknowledged: count_field(cib, "num_hosts_acknowledged"),
            services_ok: count_field(cib, "num_services_ok"),
            services_warning: count_field(cib, "num_services_warning"),
            services_critical: count_field(cib, "num_services_critical"),
            services_unknown: count_field(cib, "num_services_unknown"),
            services_pending: count_field(cib, "num_services_pending"),
            services_in_downtime: count_field(cib, "num_services_in_downtime"),
            services_acknowledged: count_field(cib, "num_services_acknowledged"),
            host_active_checks_1min: count_field(cib, "active_host_checks_1min"),
            host_passive_checks_1min: count_field(cib, "passive_host_checks_1min"),
            service_active_checks_1min: count_field(cib, "active_service_checks_1min"),
            service_passive_checks_1min: count_field(cib, "passive_service_checks_1min"),
        }
    }

    /// Hosts of any state. Saturates at `u64::MAX`.
    #[must_use]
    pub const fn hosts_all(&self) -> u64 {
        self.hosts_up
            .saturating_add(self.hosts_down)
            .saturating_add(self.hosts_pending)
            .saturating_add(self.hosts_unreachable)
    }

    /// Services of any state. Saturates at `u64::MAX`.
    #[must_use]
    pub const fn services_all(&self) -> u64 {
        self.services_ok
            .saturating_add(self.services_warning)
            .saturating_add(self.services_critical)
            .saturating_add(self.services_unknown)
            .saturating_add(self.services_pending)
    }
}

/// Format seconds as `HH:MM:SS`. Hours keep counting past 24.
#[must_use]
pub fn format_uptime(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Release version, parsed from strings like `r2.8.1-1` or `v2.13.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Version {
    /// Major
    pub major: u32,
    /// Minor
    pub minor: u32,
    /// Revision
    pub revision: u32,
}

impl FromStr for Version {
    type Err = icinga_core::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || icinga_core::Error::ValidationError(format!("invalid version '{s}'"));

        let release = s
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .split('-')
            .next()
            .unwrap_or_default();

        let mut parts = release.split('.').map(str::parse::<u32>);
        let major = parts.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
        let minor = parts.next().transpose().map_err(|_| invalid())?.unwrap_or(0);
        let revision = parts.next().transpose().map_err(|_| invalid())?.unwrap_or(0);

        Ok(Self {
            major,
            minor,
            revision,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// Application details from `status/IcingaApplication`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationInfo {
    /// Version as reported, e.g. `r2.8.1-1`
    pub version_string: String,
    /// Parsed version, when the string is well formed
    pub version: Option<Version>,
    /// Node name of the answering instance
    pub node_name: String,
    /// Process start, epoch seconds
    pub program_start: f64,
    /// Process start as a timestamp
    pub started_at: Option<DateTime<Utc>>,
    /// Global notifications switch
    pub enable_notifications: bool,
    /// Global event handler switch
    pub enable_event_handlers: bool,
    /// Global flap detection switch
    pub enable_flapping: bool,
    /// Global host check switch
    pub enable_host_checks: bool,
    /// Global service check switch
    pub enable_service_checks: bool,
    /// Global performance data switch
    pub enable_perfdata: bool,
}

impl ApplicationInfo {
    /// Read the `app` object of an `IcingaApplication` status entry.
    #[must_use]
    pub fn from_app(app: &Value) -> Self {
        let version_string = str_field(app, "version").unwrap_or_default().to_string();
        let program_start = number_field(app, "program_start");
        let flag = |key: &str| number_field(app, key) != 0.0;

        Self {
            version: version_string.parse().ok(),
            version_string,
            node_name: str_field(app, "node_name").unwrap_or_default().to_string(),
            program_start,
            started_at: epoch_to_datetime(program_start),
            enable_notifications: flag("enable_notifications"),
            enable_event_handlers: flag("enable_event_handlers"),
            enable_flapping: flag("enable_flapping"),
            enable_host_checks: flag("enable_host_checks"),
            enable_service_checks: flag("enable_service_checks"),
            enable_perfdata: flag("enable_perfdata"),
        }
    }
}

fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Utc.timestamp_opt(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        .single()
}

/// The `status` object of a status entry, or the entry itself.
fn status_object(entry: Value) -> Value {
    match entry {
        Value::Object(mut map) => match map.remove("status") {
            Some(status @ Value::Object(_)) => status,
            Some(other) => {
                map.insert("status".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Fetch `status/CIB` and build a snapshot.
///
/// # Errors
///
/// Propagates any request failure unchanged.
pub async fn fetch_snapshot(api: &dyn IcingaApi) -> Result<StatusSnapshot> {
    let entry = api
        .fetch_one(&["status", "CIB"])
        .await?
        .ok_or_else(|| Failure::unexpected("empty CIB status response"))?;

    Ok(StatusSnapshot::from_cib(&status_object(entry), Utc::now()))
}

/// Fetch `status/IcingaApplication`.
///
/// # Errors
///
/// Propagates any request failure unchanged.
pub async fn application_info(api: &dyn IcingaApi) -> Result<ApplicationInfo> {
    let entry = api
        .fetch_one(&["status", "IcingaApplication"])
        .await?
        .ok_or_else(|| Failure::unexpected("empty IcingaApplication status response"))?;

    let status = status_object(entry);
    let app = status
        .pointer("/icingaapplication/app")
        .cloned()
        .unwrap_or(Value::Null);

    Ok(ApplicationInfo::from_app(&app))
}

/// Fetch the `status/ApiListener` status object.
///
/// # Errors
///
/// Propagates any request failure unchanged.
pub async fn api_listener(api: &dyn IcingaApi) -> Result<Value> {
    let entry = api
        .fetch_one(&["status", "ApiListener"])
        .await?
        .unwrap_or(Value::Null);
    Ok(status_object(entry))
}

/// Fetch every status component.
///
/// # Errors
///
/// Propagates any request failure unchanged.
pub async fn status(api: &dyn IcingaApi) -> Result<Vec<Value>> {
    api.fetch(&["status"], None).await
}

/// Last CIB snapshot plus handled-problem counts.
#[derive(Debug, Clone, Default)]
pub struct StatusAggregator {
    snapshot: Option<StatusSnapshot>,
    services: ServiceProblemCounts,
    hosts: HostProblemCounts,
}

impl StatusAggregator {
    /// Empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a fresh snapshot. On failure the previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Propagates the fetch failure unchanged.
    pub async fn refresh(&mut self, api: &dyn IcingaApi) -> Result<StatusSnapshot> {
        let snapshot = fetch_snapshot(api).await?;
        debug!(
            hosts = snapshot.hosts_all(),
            services = snapshot.services_all(),
            uptime = %snapshot.uptime,
            "refreshed Icinga status snapshot"
        );
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Last successful snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }

    /// Record service objects from a refresh.
    pub fn record_services(&mut self, records: &[ServiceRecord]) -> ServiceProblemCounts {
        self.services = ServiceProblemCounts::from_records(records);
        self.services
    }

    /// Record host objects from a refresh.
    pub fn record_hosts(&mut self, records: &[HostRecord]) -> HostProblemCounts {
        self.hosts = HostProblemCounts::from_records(records);
        self.hosts
    }

    /// Service counts from the last service refresh.
    #[must_use]
    pub const fn service_counts(&self) -> &ServiceProblemCounts {
        &self.services
    }

    /// Host counts from the last host refresh.
    #[must_use]
    pub const fn host_counts(&self) -> &HostProblemCounts {
        &self.hosts
    }

    /// Raw service state counts minus handled ones. Zero raw counts without
    /// a snapshot.
    #[must_use]
    pub fn services_adjusted(&self) -> ServiceAdjusted {
        let raw = self.snapshot.as_ref().map_or((0, 0, 0), |s| {
            (s.services_warning, s.services_critical, s.services_unknown)
        });
        ServiceAdjusted::compute(raw, &self.services)
    }

    /// Raw DOWN hosts minus handled ones.
    #[must_use]
    pub fn hosts_adjusted(&self) -> HostAdjusted {
        let raw = self.snapshot.as_ref().map_or(0, |s| s.hosts_down);
        HostAdjusted::compute(raw, &self.hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_from_cib() {
        let cib = json!({
            "uptime": 3661.0,
            "avg_latency": 0.012_345,
            "avg_execution_time": 1.005_1,
            "num_hosts_up": 10.0,
            "num_hosts_down": 2.0,
            "num_services_warning": 3.0,
            "active_service_checks_1min": 120.0
        });
        let snapshot = StatusSnapshot::from_cib(&cib, Utc::now());

        assert_eq!(snapshot.uptime, "01:01:01");
        assert_eq!(snapshot.hosts_up, 10);
        assert_eq!(snapshot.hosts_down, 2);
        assert_eq!(snapshot.hosts_pending, 0);
        assert_eq!(snapshot.avg_latency, 0.01);
        assert_eq!(snapshot.avg_execution_time, 1.01);
        assert_eq!(snapshot.services_warning, 3);
        assert_eq!(snapshot.service_active_checks_1min, 120);
        assert_eq!(snapshot.hosts_all(), 12);
    }

    #[test]
    fn totals_saturate_on_oversized_counters() {
        let snapshot = StatusSnapshot::from_cib(
            &json!({
                "num_hosts_up": 1e20,
                "num_hosts_down": 1.0,
                "num_services_ok": 1e30,
                "num_services_critical": 4.0
            }),
            Utc::now(),
        );

        assert_eq!(snapshot.hosts_up, u64::MAX);
        assert_eq!(snapshot.hosts_all(), u64::MAX);
        assert_eq!(snapshot.services_all(), u64::MAX);
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(0.0), "00:00:00");
        assert_eq!(format_uptime(59.9), "00:00:59");
        assert_eq!(format_uptime(90_061.0), "25:01:01");
        assert_eq!(format_uptime(-5.0), "00:00:00");
        assert_eq!(format_uptime(f64::NAN), "00:00:00");
    }

    #[test]
    fn version_parsing() {
        let version: Version = "r2.8.1-1".parse().unwrap();
        assert_eq!(
            version,
            Version {
                major: 2,
                minor: 8,
                revision: 1
            }
        );
        assert_eq!(version.to_string(), "2.8.1");

        let version: Version = "v2.13.2-1-g1234".parse().unwrap();
        assert_eq!(version.minor, 13);

        let version: Version = "2.9".parse().unwrap();
        assert_eq!(version.revision, 0);

        assert!("unknown".parse::<Version>().is_err());
        assert!("r2.x.1".parse::<Version>().is_err());
    }

    #[test]
    fn application_info_from_app() {
        let info = ApplicationInfo::from_app(&json!({
            "version": "r2.8.1-1",
            "node_name": "icinga2-master",
            "program_start": 1_500_000_000.5,
            "enable_notifications": true,
            "enable_flapping": false,
            "enable_host_checks": 1.0
        }));

        assert_eq!(info.version.unwrap().major, 2);
        assert_eq!(info.node_name, "icinga2-master");
        assert!(info.enable_notifications);
        assert!(!info.enable_flapping);
        assert!(info.enable_host_checks);
        assert_eq!(info.started_at.unwrap().timestamp(), 1_500_000_000);
    }

    #[test]
    fn status_object_unwraps_nested_status() {
        let entry = json!({"name": "CIB", "status": {"uptime": 1.0}});
        assert_eq!(status_object(entry), json!({"uptime": 1.0}));

        let flat = json!({"uptime": 1.0});
        assert_eq!(status_object(flat.clone()), flat);
    }

    #[test]
    fn aggregator_adjusted_counts() {
        let mut aggregator = StatusAggregator::new();
        aggregator.snapshot = Some(StatusSnapshot::from_cib(
            &json!({"num_services_warning": 5.0, "num_hosts_down": 1.0}),
            Utc::now(),
        ));
        aggregator.services = ServiceProblemCounts {
            handled_warning: 7,
            ..ServiceProblemCounts::default()
        };

        assert_eq!(aggregator.services_adjusted().warning, -2);
        assert_eq!(aggregator.hosts_adjusted().down, 1);
    }
}
