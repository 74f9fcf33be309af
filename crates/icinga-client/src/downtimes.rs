//! Scheduled downtimes.

use crate::api::IcingaApi;
use crate::executor::ActionResult;
use crate::models::host_name_filter;
use crate::users::Users;
use crate::Result;
use chrono::Utc;
use icinga_core::query::QueryParams;
use icinga_core::types::ObjectType;
use icinga_core::Error;
use reqwest::Method;
use serde_json::{json, Value};
use validator::Validate;

/// Default flexible-downtime duration in seconds.
pub const DEFAULT_DURATION_SECS: u64 = 30;

/// Downtime to schedule for a host or for every host of a host group.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct DowntimeRequest {
    /// Label of the request
    #[validate(length(min = 1, message = "missing downtime name"))]
    pub name: String,
    /// Whether hosts or their services are put into downtime
    pub object_type: ObjectType,
    /// Target host
    pub host_name: Option<String>,
    /// Target host group
    pub host_group: Option<String>,
    /// Start, epoch seconds; now when unset
    pub start_time: Option<i64>,
    /// End, epoch seconds
    pub end_time: i64,
    /// Author; must be an existing user
    #[validate(length(min = 1, message = "missing downtime author"))]
    pub author: String,
    /// Comment
    #[validate(length(min = 1, message = "missing downtime comment"))]
    pub comment: String,
    /// Fixed window instead of flexible
    pub fixed: bool,
    /// Duration of a flexible downtime, seconds
    pub duration: u64,
}

impl DowntimeRequest {
    /// Fixed downtime ending at `end_time`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        object_type: ObjectType,
        author: impl Into<String>,
        comment: impl Into<String>,
        end_time: i64,
    ) -> Self {
        Self {
            name: name.into(),
            object_type,
            host_name: None,
            host_group: None,
            start_time: None,
            end_time,
            author: author.into(),
            comment: comment.into(),
            fixed: true,
            duration: DEFAULT_DURATION_SECS,
        }
    }

    /// Target one host.
    #[must_use]
    pub fn for_host(mut self, host: impl Into<String>) -> Self {
        self.host_name = Some(host.into());
        self
    }

    /// Target every host of a group.
    #[must_use]
    pub fn for_host_group(mut self, group: impl Into<String>) -> Self {
        self.host_group = Some(group.into());
        self
    }

    /// Set the start time.
    #[must_use]
    pub const fn starting_at(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Make the downtime flexible with the given duration.
    #[must_use]
    pub const fn flexible(mut self, duration: u64) -> Self {
        self.fixed = false;
        self.duration = duration;
        self
    }

    /// Validate against the current time `now` (epoch seconds).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for missing fields, for a target that
    /// is not exactly one of host or host group, and when the window does not
    /// end after it starts.
    pub fn check(&self, now: i64) -> Result<()> {
        self.validate()?;

        match (&self.host_name, &self.host_group) {
            (Some(_), Some(_)) => {
                return Err(Error::ValidationError(
                    "choose host or host_group, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::ValidationError(
                    "missing host or host_group".to_string(),
                ))
            }
            _ => {}
        }

        let start = self.start_time.unwrap_or(now);
        if self.end_time <= start {
            return Err(Error::ValidationError(
                "end_time must be greater than start_time".to_string(),
            ));
        }
        Ok(())
    }

    /// Icinga filter selecting the targets.
    #[must_use]
    pub fn filter(&self) -> Option<String> {
        match (&self.host_name, &self.host_group) {
            (Some(host), _) => Some(host_name_filter(host)),
            (None, Some(group)) => Some(format!("\"{group}\" in host.groups")),
            (None, None) => None,
        }
    }

    /// Body of the `schedule-downtime` action.
    #[must_use]
    pub fn to_payload(&self, now: i64) -> Value {
        json!({
            "type": self.object_type.name(),
            "filter": self.filter(),
            "start_time": self.start_time.unwrap_or(now),
            "end_time": self.end_time,
            "author": self.author,
            "comment": self.comment,
            "fixed": self.fixed,
            "duration": self.duration,
        })
    }
}

/// Downtime operations.
#[derive(Clone, Copy)]
pub struct Downtimes<'a> {
    api: &'a dyn IcingaApi,
}

impl<'a> Downtimes<'a> {
    /// Wrap an API handle.
    #[must_use]
    pub fn new(api: &'a dyn IcingaApi) -> Self {
        Self { api }
    }

    /// Schedule a downtime.
    ///
    /// # Errors
    ///
    /// Validation errors, including an unknown author, are returned before
    /// the downtime is scheduled.
    pub async fn add(&self, request: &DowntimeRequest) -> Result<ActionResult> {
        let now = Utc::now().timestamp();
        request.check(now)?;

        if !Users::new(self.api).exists(&request.author).await? {
            return Err(Error::ValidationError(format!(
                "author '{}' does not exist",
                request.author
            )));
        }

        self.api
            .action(
                Method::POST,
                &["actions", "schedule-downtime"],
                QueryParams::new(),
                Some(request.to_payload(now)),
            )
            .await
    }

    /// List all downtimes.
    pub async fn list(&self) -> Result<Vec<Value>> {
        self.api.fetch(&["objects", "downtimes"], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DowntimeRequest {
        DowntimeRequest::new("maintenance", ObjectType::Host, "admin", "patching", 2_000)
    }

    #[test]
    fn defaults() {
        let request = request();
        assert!(request.fixed);
        assert_eq!(request.duration, 30);
        assert_eq!(request.start_time, None);
    }

    #[test]
    fn check_requires_exactly_one_target() {
        assert!(matches!(request().check(1_000), Err(Error::ValidationError(_))));

        let both = request().for_host("web01").for_host_group("linux");
        assert!(matches!(both.check(1_000), Err(Error::ValidationError(_))));

        assert!(request().for_host("web01").check(1_000).is_ok());
        assert!(request().for_host_group("linux").check(1_000).is_ok());
    }

    #[test]
    fn check_requires_end_after_start() {
        let request = request().for_host("web01");
        assert!(request.check(2_000).is_err());
        assert!(request.clone().starting_at(2_500).check(0).is_err());
        assert!(request.starting_at(1_500).check(5_000).is_ok());
    }

    #[test]
    fn check_requires_fields() {
        let mut missing_comment = request().for_host("web01");
        missing_comment.comment.clear();
        assert!(missing_comment.check(1_000).is_err());

        let mut missing_author = request().for_host("web01");
        missing_author.author.clear();
        assert!(missing_author.check(1_000).is_err());
    }

    #[test]
    fn payload_for_host_group() {
        let payload = DowntimeRequest::new("m", ObjectType::Service, "admin", "c", 2_000)
            .for_host_group("linux-servers")
            .to_payload(1_000);

        assert_eq!(
            payload,
            json!({
                "type": "Service",
                "filter": "\"linux-servers\" in host.groups",
                "start_time": 1_000,
                "end_time": 2_000,
                "author": "admin",
                "comment": "c",
                "fixed": true,
                "duration": 30
            })
        );
    }

    #[test]
    fn payload_for_host() {
        let payload = request().for_host("web01").flexible(600).to_payload(1_000);
        assert_eq!(payload["type"], "Host");
        assert_eq!(payload["filter"], "host.name==\"web01\"");
        assert_eq!(payload["fixed"], false);
        assert_eq!(payload["duration"], 600);
    }
}
