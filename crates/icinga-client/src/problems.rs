//! Problem counting and ranking.

use crate::models::{Checkable, HostRecord, ServiceRecord};
use crate::severity::{Scored, Severity};
use serde::Serialize;

/// One entry of a ranked problem list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedProblem {
    /// Object name
    pub name: String,
    /// Severity score
    pub severity: Severity,
}

/// Rank non-OK records by severity, highest first, ties by name.
///
/// Returns at most `max_items` entries, starting with the worst problem.
#[must_use]
pub fn rank<R>(records: &[R], max_items: usize) -> Vec<RankedProblem>
where
    R: Checkable + Scored,
{
    let mut ranked: Vec<RankedProblem> = records
        .iter()
        .filter(|record| record.status().is_problem())
        .map(|record| RankedProblem {
            name: record.name().to_string(),
            severity: record.severity(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(max_items);
    ranked
}

/// Problems that are neither acknowledged nor in downtime.
#[must_use]
pub fn count_unhandled<R: Checkable>(records: &[R]) -> usize {
    records
        .iter()
        .map(Checkable::status)
        .filter(|status| status.is_problem() && !status.is_handled())
        .count()
}

/// Problems that are acknowledged or in downtime, optionally of one state.
#[must_use]
pub fn count_handled<R: Checkable>(records: &[R], state: Option<u8>) -> usize {
    records
        .iter()
        .map(Checkable::status)
        .filter(|status| status.is_problem() && status.is_handled())
        .filter(|status| state.map_or(true, |wanted| status.state == wanted))
        .count()
}

/// Service problem counters from the last service refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ServiceProblemCounts {
    /// Services fetched
    pub all: usize,
    /// Unhandled problems
    pub unhandled: usize,
    /// Handled problems of any state
    pub handled: usize,
    /// Handled warnings
    pub handled_warning: usize,
    /// Handled criticals
    pub handled_critical: usize,
    /// Handled unknowns
    pub handled_unknown: usize,
}

impl ServiceProblemCounts {
    /// Count problems among `records`.
    #[must_use]
    pub fn from_records(records: &[ServiceRecord]) -> Self {
        Self {
            all: records.len(),
            unhandled: count_unhandled(records),
            handled: count_handled(records, None),
            handled_warning: count_handled(records, Some(1)),
            handled_critical: count_handled(records, Some(2)),
            handled_unknown: count_handled(records, Some(3)),
        }
    }
}

/// Host problem counters from the last host refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HostProblemCounts {
    /// Hosts fetched
    pub all: usize,
    /// Unhandled problems
    pub unhandled: usize,
    /// Handled DOWN hosts
    pub handled_down: usize,
}

impl HostProblemCounts {
    /// Count problems among `records`.
    #[must_use]
    pub fn from_records(records: &[HostRecord]) -> Self {
        Self {
            all: records.len(),
            unhandled: count_unhandled(records),
            handled_down: count_handled(records, None),
        }
    }
}

/// Service state counts with handled problems removed.
///
/// Values are raw minus handled and may be negative when the two inputs were
/// fetched at different times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ServiceAdjusted {
    /// Unhandled warnings
    pub warning: i64,
    /// Unhandled criticals
    pub critical: i64,
    /// Unhandled unknowns
    pub unknown: i64,
}

impl ServiceAdjusted {
    /// Subtract handled counts from raw state counts.
    #[must_use]
    pub fn compute(raw: (u64, u64, u64), handled: &ServiceProblemCounts) -> Self {
        Self {
            warning: difference(raw.0, handled.handled_warning),
            critical: difference(raw.1, handled.handled_critical),
            unknown: difference(raw.2, handled.handled_unknown),
        }
    }
}

/// Host DOWN count with handled problems removed. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HostAdjusted {
    /// Unhandled DOWN hosts
    pub down: i64,
}

impl HostAdjusted {
    /// Subtract handled DOWN hosts from the raw DOWN count.
    #[must_use]
    pub fn compute(raw_down: u64, handled: &HostProblemCounts) -> Self {
        Self {
            down: difference(raw_down, handled.handled_down),
        }
    }
}

fn difference(raw: u64, handled: usize) -> i64 {
    i64::try_from(raw).unwrap_or(i64::MAX) - i64::try_from(handled).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckStatus, HostJoin, ServiceJoins};

    fn service(name: &str, state: u8, acknowledgement: bool, downtime_depth: u32) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            status: CheckStatus {
                state,
                acknowledgement,
                downtime_depth,
                last_check: 100.0,
            },
            joins: ServiceJoins {
                host: HostJoin::default(),
            },
        }
    }

    fn fleet() -> Vec<ServiceRecord> {
        vec![
            service("a!ok", 0, false, 0),
            service("b!warn", 1, false, 0),
            service("c!crit", 2, false, 0),
            service("d!unknown", 3, false, 0),
            service("e!crit-acked", 2, true, 0),
            service("f!warn-downtime", 1, false, 2),
            service("g!crit", 2, false, 0),
        ]
    }

    #[test]
    fn rank_includes_worst_problem_first() {
        let ranked = rank(&fleet(), 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].name, "d!unknown");
        assert_eq!(ranked[0].severity, 4 + 16 + 256 + 2048);
        assert_eq!(ranked[1].name, "c!crit");
        assert_eq!(ranked[2].name, "g!crit");
        assert_eq!(ranked[1].severity, ranked[2].severity);
    }

    #[test]
    fn rank_is_bounded_and_ordered() {
        let records = fleet();
        for max_items in 0..10 {
            let ranked = rank(&records, max_items);
            assert!(ranked.len() <= max_items);
            assert!(ranked.windows(2).all(|pair| pair[0].severity >= pair[1].severity));
            assert!(ranked.iter().all(|entry| entry.name != "a!ok"));
        }
        assert_eq!(rank(&records, 10).len(), 6);
    }

    #[test]
    fn rank_of_healthy_fleet_is_empty() {
        let records = vec![service("a!ok", 0, false, 0), service("b!ok", 0, true, 1)];
        assert!(rank(&records, 5).is_empty());
    }

    #[test]
    fn counts() {
        let records = fleet();
        assert_eq!(count_unhandled(&records), 4);
        assert_eq!(count_handled(&records, None), 2);
        assert_eq!(count_handled(&records, Some(1)), 1);
        assert_eq!(count_handled(&records, Some(2)), 1);
        assert_eq!(count_handled(&records, Some(3)), 0);

        let counts = ServiceProblemCounts::from_records(&records);
        assert_eq!(counts.all, 7);
        assert_eq!(counts.handled_warning, 1);
    }

    #[test]
    fn adjusted_counts_are_not_clamped() {
        let handled = ServiceProblemCounts {
            handled_warning: 7,
            handled_critical: 1,
            ..ServiceProblemCounts::default()
        };
        let adjusted = ServiceAdjusted::compute((5, 3, 0), &handled);
        assert_eq!(adjusted.warning, -2);
        assert_eq!(adjusted.critical, 2);
        assert_eq!(adjusted.unknown, 0);

        let hosts = HostProblemCounts {
            handled_down: 4,
            ..HostProblemCounts::default()
        };
        assert_eq!(HostAdjusted::compute(1, &hosts).down, -3);
    }
}
