//! Icinga 2 API client with status aggregation and problem ranking.
//!
//! Provides an asynchronous client for the Icinga 2 REST API, typed wrappers
//! for the object endpoints, and the scoring used to pick the most actionable
//! unhandled problems from host and service status.

#![deny(missing_docs)]

pub mod api;
pub mod client;
pub mod downtimes;
pub mod executor;
pub mod groups;
pub mod hosts;
pub mod models;
pub mod notifications;
pub mod problems;
pub mod services;
pub mod severity;
pub mod status;
pub mod users;

pub use api::IcingaApi;
pub use client::{IcingaClient, IcingaClientBuilder};
pub use executor::{ActionResult, ApiRequest, RawResponse, RequestExecutor, Success, Transport};
pub use models::{CheckStatus, HostRecord, HostRequest, ObjectQuery, ServiceRecord, UserRequest};
pub use problems::{rank, HostAdjusted, RankedProblem, ServiceAdjusted};
pub use severity::{host_severity, service_severity, Severity};
pub use status::{ApplicationInfo, StatusAggregator, StatusSnapshot, Version};

/// Convenient result alias that reuses the shared Icinga error type.
pub type Result<T> = icinga_core::Result<T>;
