//! Host objects.

use crate::api::IcingaApi;
use crate::executor::ActionResult;
use crate::models::{HostRecord, HostRequest, ObjectQuery};
use crate::Result;
use icinga_core::query::QueryParams;
use icinga_core::types::ObjectType;
use icinga_core::Error;
use reqwest::Method;
use serde_json::Value;
use validator::Validate;

const COLLECTION: &str = ObjectType::Host.collection();

/// Host operations.
#[derive(Clone, Copy)]
pub struct Hosts<'a> {
    api: &'a dyn IcingaApi,
    notifications: bool,
}

impl<'a> Hosts<'a> {
    /// Wrap an API handle. New hosts get notifications disabled unless the
    /// request says otherwise.
    #[must_use]
    pub fn new(api: &'a dyn IcingaApi) -> Self {
        Self {
            api,
            notifications: false,
        }
    }

    /// Notification setting for new hosts whose request leaves it unset.
    #[must_use]
    pub const fn with_default_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    /// List all hosts, or one host by name.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Value>> {
        match name {
            Some(name) => self.api.fetch(&["objects", COLLECTION, name], None).await,
            None => self.api.fetch(&["objects", COLLECTION], None).await,
        }
    }

    /// Whether the host exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.api.exists(&["objects", COLLECTION, name]).await
    }

    /// Query host status objects.
    pub async fn objects(&self, query: &ObjectQuery) -> Result<Vec<HostRecord>> {
        let results = self
            .api
            .fetch(&["objects", COLLECTION], Some(query.to_payload()))
            .await?;

        results
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(Error::from))
            .collect()
    }

    /// Create a host.
    pub async fn add(&self, request: &HostRequest) -> Result<ActionResult> {
        request.validate()?;
        let request = HostRequest {
            enable_notifications: request.enable_notifications.or(Some(self.notifications)),
            ..request.clone()
        };
        self.api
            .action(
                Method::PUT,
                &["objects", COLLECTION, &request.name],
                QueryParams::new(),
                Some(request.to_payload()),
            )
            .await
    }

    /// Delete a host and its services.
    pub async fn delete(&self, name: &str) -> Result<ActionResult> {
        if name.is_empty() {
            return Err(Error::ValidationError("missing host name".to_string()));
        }
        self.api
            .action(
                Method::DELETE,
                &["objects", COLLECTION, name],
                QueryParams::cascade(),
                None,
            )
            .await
    }
}
