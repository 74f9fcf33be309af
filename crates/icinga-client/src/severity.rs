//! Severity scoring for problem ranking.
//!
//! A severity is a sum of bit weights; higher means more actionable. An
//! unhandled critical service on a healthy, checked host outranks everything
//! that is acknowledged, in downtime or caused by its host.

use crate::models::{CheckStatus, HostRecord, ServiceRecord};

/// Derived severity.
pub type Severity = u32;

const ACKNOWLEDGED: Severity = 2;
const IN_DOWNTIME: Severity = 1;
const UNHANDLED: Severity = 4;
const CHECKED: Severity = 16;
const STATE_WARNING: Severity = 32;
const STATE_CRITICAL: Severity = 64;
const STATE_OTHER: Severity = 256;
const HOST_PROBLEM: Severity = 1024;
const HOST_ACKNOWLEDGED: Severity = 512;
const HOST_IN_DOWNTIME: Severity = 256;
const HOST_HEALTHY: Severity = 2048;

fn handling(status: &CheckStatus) -> Severity {
    if status.acknowledgement {
        ACKNOWLEDGED
    } else if status.in_downtime() {
        IN_DOWNTIME
    } else {
        UNHANDLED
    }
}

fn checked(status: &CheckStatus) -> Severity {
    if status.has_been_checked() {
        CHECKED
    } else {
        0
    }
}

fn state(status: &CheckStatus) -> Severity {
    match status.state {
        0 => 0,
        1 => STATE_WARNING,
        2 => STATE_CRITICAL,
        _ => STATE_OTHER,
    }
}

fn host_context(host: &CheckStatus) -> Severity {
    if host.is_problem() {
        HOST_PROBLEM
    } else if host.acknowledgement {
        HOST_ACKNOWLEDGED
    } else if host.in_downtime() {
        HOST_IN_DOWNTIME
    } else {
        HOST_HEALTHY
    }
}

/// Score a service, taking its joined host into account.
#[must_use]
pub fn service_severity(record: &ServiceRecord) -> Severity {
    let status = &record.status;
    let mut severity = handling(status) + checked(status);
    if !status.is_problem() {
        return severity;
    }

    severity += state(status);
    severity + host_context(record.host())
}

/// Score a host. A DOWN host scores as the highest state weight.
#[must_use]
pub fn host_severity(record: &HostRecord) -> Severity {
    let status = &record.status;
    let severity = handling(status) + checked(status);
    if !status.is_problem() {
        return severity;
    }

    severity + STATE_OTHER
}

/// Scoring per record type.
pub trait Scored {
    /// Severity of this record.
    fn severity(&self) -> Severity;
}

impl Scored for ServiceRecord {
    fn severity(&self) -> Severity {
        service_severity(self)
    }
}

impl Scored for HostRecord {
    fn severity(&self) -> Severity {
        host_severity(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostJoin, ServiceJoins};

    fn status(state: u8, acknowledgement: bool, downtime_depth: u32, last_check: f64) -> CheckStatus {
        CheckStatus {
            state,
            acknowledgement,
            downtime_depth,
            last_check,
        }
    }

    fn service(service: CheckStatus, host: CheckStatus) -> ServiceRecord {
        ServiceRecord {
            name: "web01!http".to_string(),
            status: service,
            joins: ServiceJoins {
                host: HostJoin {
                    name: Some("web01".to_string()),
                    status: host,
                },
            },
        }
    }

    #[test]
    fn critical_service_on_healthy_host() {
        let record = service(status(2, false, 0, 1_700_000_000.0), status(0, false, 0, 1.0));
        assert_eq!(service_severity(&record), 4 + 16 + 64 + 2048);
        assert_eq!(record.severity(), 2132);
    }

    #[test]
    fn ok_service_stops_after_base_terms() {
        let record = service(status(0, false, 0, 10.0), status(1, false, 0, 10.0));
        assert_eq!(service_severity(&record), 20);

        let unchecked = service(status(0, true, 0, 0.0), status(0, false, 0, 0.0));
        assert_eq!(service_severity(&unchecked), 2);
    }

    #[test]
    fn acknowledgement_takes_precedence_over_downtime() {
        let record = service(status(1, true, 3, 10.0), status(0, false, 0, 10.0));
        assert_eq!(service_severity(&record), 2 + 16 + 32 + 2048);

        let downtime = service(status(1, false, 1, 10.0), status(0, false, 0, 10.0));
        assert_eq!(service_severity(&downtime), 1 + 16 + 32 + 2048);
    }

    #[test]
    fn host_context_terms() {
        let down = service(status(3, false, 0, 10.0), status(1, true, 1, 10.0));
        assert_eq!(service_severity(&down), 4 + 16 + 256 + 1024);

        let acked = service(status(2, false, 0, 10.0), status(0, true, 1, 10.0));
        assert_eq!(service_severity(&acked), 4 + 16 + 64 + 512);

        let downtime = service(status(2, false, 0, 10.0), status(0, false, 1, 10.0));
        assert_eq!(service_severity(&downtime), 4 + 16 + 64 + 256);
    }

    #[test]
    fn unhandled_outranks_handled() {
        for state in 1..=3 {
            let host = status(0, false, 0, 10.0);
            let unhandled = service_severity(&service(status(state, false, 0, 10.0), host));
            let acked = service_severity(&service(status(state, true, 0, 10.0), host));
            let downtime = service_severity(&service(status(state, false, 1, 10.0), host));
            assert!(unhandled > acked);
            assert!(unhandled > downtime);
        }
    }

    #[test]
    fn scoring_is_pure() {
        let record = service(status(2, false, 0, 10.0), status(0, false, 0, 10.0));
        let before = record.clone();
        assert_eq!(service_severity(&record), service_severity(&record));
        assert_eq!(record, before);
    }

    #[test]
    fn state_weights_are_monotonic() {
        for (ack, depth, last_check) in [(false, 0, 10.0), (true, 0, 10.0), (false, 2, 0.0)] {
            for host in [status(0, false, 0, 10.0), status(1, false, 0, 10.0)] {
                let score = |state| {
                    service_severity(&service(status(state, ack, depth, last_check), host))
                };
                assert!(score(2) > score(1));
                assert!(score(1) > score(0));
            }

            let host = |state| HostRecord {
                name: "db01".to_string(),
                status: status(state, ack, depth, last_check),
            };
            assert!(host_severity(&host(1)) > host_severity(&host(0)));
        }
    }

    #[test]
    fn host_scores() {
        let up = HostRecord {
            name: "db01".to_string(),
            status: status(0, false, 0, 10.0),
        };
        assert_eq!(host_severity(&up), 20);

        let down = HostRecord {
            name: "db01".to_string(),
            status: status(1, false, 0, 10.0),
        };
        assert_eq!(host_severity(&down), 4 + 16 + 256);

        let down_acked = HostRecord {
            name: "db01".to_string(),
            status: status(1, true, 0, 0.0),
        };
        assert_eq!(down_acked.severity(), 2 + 256);
    }
}
