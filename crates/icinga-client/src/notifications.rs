//! Notification switches for hosts and their services.

use crate::api::IcingaApi;
use crate::executor::ActionResult;
use crate::models::host_name_filter;
use crate::Result;
use icinga_core::query::QueryParams;
use icinga_core::Error;
use reqwest::Method;
use serde_json::{json, Value};

/// Notification operations.
#[derive(Clone, Copy)]
pub struct Notifications<'a> {
    api: &'a dyn IcingaApi,
}

impl<'a> Notifications<'a> {
    /// Wrap an API handle.
    #[must_use]
    pub fn new(api: &'a dyn IcingaApi) -> Self {
        Self { api }
    }

    /// Enable notifications for a host.
    pub async fn enable_host(&self, host: &str) -> Result<ActionResult> {
        self.set_host(host, true).await
    }

    /// Disable notifications for a host.
    pub async fn disable_host(&self, host: &str) -> Result<ActionResult> {
        self.set_host(host, false).await
    }

    /// Enable notifications for every service of a host.
    pub async fn enable_service(&self, host: &str) -> Result<ActionResult> {
        self.set_services(host, true).await
    }

    /// Disable notifications for every service of a host.
    pub async fn disable_service(&self, host: &str) -> Result<ActionResult> {
        self.set_services(host, false).await
    }

    /// List all notification objects.
    pub async fn list(&self) -> Result<Vec<Value>> {
        self.api.fetch(&["objects", "notifications"], None).await
    }

    async fn set_host(&self, host: &str, enabled: bool) -> Result<ActionResult> {
        require_host(host)?;
        self.api
            .action(
                Method::POST,
                &["objects", "hosts", host],
                QueryParams::new(),
                Some(json!({"attrs": {"enable_notifications": enabled}})),
            )
            .await
    }

    async fn set_services(&self, host: &str, enabled: bool) -> Result<ActionResult> {
        require_host(host)?;
        self.api
            .action(
                Method::POST,
                &["objects", "services"],
                QueryParams::new(),
                Some(json!({
                    "filter": host_name_filter(host),
                    "attrs": {"enable_notifications": enabled}
                })),
            )
            .await
    }
}

fn require_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::ValidationError("missing host name".to_string()));
    }
    Ok(())
}
