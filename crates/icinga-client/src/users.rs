//! User objects.

use crate::api::IcingaApi;
use crate::executor::ActionResult;
use crate::groups::{GroupKind, Groups};
use crate::models::UserRequest;
use crate::Result;
use icinga_core::query::QueryParams;
use icinga_core::{Error, Failure, FailureKind};
use reqwest::Method;
use serde_json::Value;
use validator::Validate;

const COLLECTION: &str = "users";

/// User operations.
#[derive(Clone, Copy)]
pub struct Users<'a> {
    api: &'a dyn IcingaApi,
}

impl<'a> Users<'a> {
    /// Wrap an API handle.
    #[must_use]
    pub fn new(api: &'a dyn IcingaApi) -> Self {
        Self { api }
    }

    /// Create a user. Every listed group must already exist.
    ///
    /// # Errors
    ///
    /// A 404 failure naming the missing groups, before the user is created.
    pub async fn add(&self, request: &UserRequest) -> Result<ActionResult> {
        request.validate()?;

        let groups = Groups::new(self.api, GroupKind::User);
        let mut missing = Vec::new();
        for group in &request.groups {
            if !groups.exists(group).await? {
                missing.push(group.as_str());
            }
        }
        if !missing.is_empty() {
            return Err(Failure::new(
                404,
                FailureKind::NotFound,
                format!("these groups do not exist: {}", missing.join(", ")),
            )
            .into());
        }

        self.api
            .action(
                Method::PUT,
                &["objects", COLLECTION, &request.name],
                QueryParams::new(),
                Some(request.to_payload()),
            )
            .await
    }

    /// Delete a user.
    pub async fn delete(&self, name: &str) -> Result<ActionResult> {
        if name.is_empty() {
            return Err(Error::ValidationError("missing user name".to_string()));
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

    /// List all users, or one by name.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Value>> {
        match name {
            Some(name) => self.api.fetch(&["objects", COLLECTION, name], None).await,
            None => self.api.fetch(&["objects", COLLECTION], None).await,
        }
    }

    /// Whether the user exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.api.exists(&["objects", COLLECTION, name]).await
    }
}
