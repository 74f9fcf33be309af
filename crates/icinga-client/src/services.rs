//! Service objects.

use crate::api::IcingaApi;
use crate::models::{host_name_filter, ObjectQuery, ServiceRecord};
use crate::Result;
use icinga_core::types::ObjectType;
use icinga_core::Error;
use serde_json::{json, Value};

const COLLECTION: &str = ObjectType::Service.collection();

/// Service operations.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    api: &'a dyn IcingaApi,
}

impl<'a> Services<'a> {
    /// Wrap an API handle.
    #[must_use]
    pub fn new(api: &'a dyn IcingaApi) -> Self {
        Self { api }
    }

    /// List services: all, all of one host, or one by host and name.
    pub async fn list(&self, host: Option<&str>, service: Option<&str>) -> Result<Vec<Value>> {
        match (host, service) {
            (Some(host), Some(service)) => {
                let name = format!("{host}!{service}");
                self.api.fetch(&["objects", COLLECTION, &name], None).await
            }
            (Some(host), None) => {
                let payload = json!({"filter": host_name_filter(host)});
                self.api.fetch(&["objects", COLLECTION], Some(payload)).await
            }
            (None, Some(_)) => Err(Error::ValidationError(
                "missing host name for service lookup".to_string(),
            )),
            (None, None) => self.api.fetch(&["objects", COLLECTION], None).await,
        }
    }

    /// Whether the service exists on the host.
    pub async fn exists(&self, host: &str, service: &str) -> Result<bool> {
        let name = format!("{host}!{service}");
        self.api.exists(&["objects", COLLECTION, &name]).await
    }

    /// Query service status objects.
    pub async fn objects(&self, query: &ObjectQuery) -> Result<Vec<ServiceRecord>> {
        let results = self
            .api
            .fetch(&["objects", COLLECTION], Some(query.to_payload()))
            .await?;

        results
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(Error::from))
            .collect()
    }
}
