//! Integration tests for parsing Icinga status and object data.
//!
//! These tests validate that the status aggregation and problem ranking work on
//! response bodies shaped like those of a real Icinga 2 master.

use chrono::Utc;
use icinga_client::problems::{count_handled, count_unhandled, ServiceProblemCounts};
use icinga_client::{rank, ApplicationInfo, ServiceAdjusted, ServiceRecord, StatusSnapshot};
use icinga_core::Document;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture and decode it the way the executor does.
fn load_fixture(name: &str) -> Document {
    let fixture_path = fixtures_dir().join(name);
    let raw = fs::read(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    Document::from_bytes(&raw).unwrap_or_else(|e| panic!("Failed to decode {name}: {e}"))
}

fn load_services() -> Vec<ServiceRecord> {
    load_fixture("service_objects.json")
        .results()
        .into_iter()
        .map(|value| serde_json::from_value(value).expect("service object"))
        .collect()
}

fn cib_status() -> Value {
    load_fixture("cib.json").first_result().expect("CIB entry")["status"].clone()
}

#[test]
fn test_cib_snapshot() {
    let snapshot = StatusSnapshot::from_cib(&cib_status(), Utc::now());

    assert_eq!(snapshot.uptime, "25:01:01");
    assert_eq!(snapshot.avg_latency, 0.0);
    assert_eq!(snapshot.avg_execution_time, 1.44);
    assert_eq!(snapshot.hosts_up, 10);
    assert_eq!(snapshot.hosts_down, 2);
    assert_eq!(snapshot.hosts_in_downtime, 1);
    assert_eq!(snapshot.services_ok, 140);
    assert_eq!(snapshot.services_warning, 5);
    assert_eq!(snapshot.services_critical, 4);
    assert_eq!(snapshot.services_unknown, 1);
    assert_eq!(snapshot.services_pending, 1);
    assert_eq!(snapshot.host_active_checks_1min, 111);
    assert_eq!(snapshot.service_active_checks_1min, 924);
    assert_eq!(snapshot.service_passive_checks_1min, 1);
    assert_eq!(snapshot.services_all(), 151);
}

#[test]
fn test_application_info() {
    let entry = load_fixture("icinga_application.json")
        .first_result()
        .expect("IcingaApplication entry");
    let info = ApplicationInfo::from_app(&entry["status"]["icingaapplication"]["app"]);

    assert_eq!(info.version_string, "r2.8.1-1");
    assert_eq!(info.version.map(|v| v.to_string()).as_deref(), Some("2.8.1"));
    assert_eq!(info.node_name, "icinga2-master-1.example.com");
    assert!(info.enable_notifications);
    assert!(!info.enable_perfdata);
    assert_eq!(info.started_at.map(|t| t.timestamp()), Some(1_529_412_847));
}

#[test]
fn test_deserialize_service_objects() {
    let services = load_services();
    assert_eq!(services.len(), 7, "Expected 7 services in test data");

    let http = services
        .iter()
        .find(|s| s.name == "web01!http")
        .expect("Should have web01!http");
    assert_eq!(http.status.state, 2);
    assert_eq!(http.joins.host.name.as_deref(), Some("web01"));
}

#[test]
fn test_problem_ranking() {
    let services = load_services();
    let ranked = rank(&services, 5);

    let names: Vec<&str> = ranked.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["web01!http", "db01!swap", "db01!load", "web01!disk", "mail01!ssh"]
    );
    assert_eq!(ranked[0].severity, 2132);
    assert_eq!(ranked[4].severity, 1300);
    assert!(ranked.windows(2).all(|w| w[0].severity > w[1].severity));

    assert_eq!(rank(&services, 10).len(), 6);
}

#[test]
fn test_adjusted_counts() {
    let services = load_services();
    assert_eq!(count_unhandled(&services), 4);
    assert_eq!(count_handled(&services, None), 2);

    let snapshot = StatusSnapshot::from_cib(&cib_status(), Utc::now());
    let handled = ServiceProblemCounts::from_records(&services);
    let adjusted = ServiceAdjusted::compute(
        (
            snapshot.services_warning,
            snapshot.services_critical,
            snapshot.services_unknown,
        ),
        &handled,
    );

    assert_eq!(adjusted.warning, 4);
    assert_eq!(adjusted.critical, 3);
    assert_eq!(adjusted.unknown, 1);
}
