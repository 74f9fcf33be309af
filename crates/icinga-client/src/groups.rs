//! Host, service and user groups.

use crate::api::IcingaApi;
use crate::executor::ActionResult;
use crate::Result;
use icinga_core::normalize::compact_object;
use icinga_core::query::QueryParams;
use icinga_core::Error;
use reqwest::Method;
use serde_json::{json, Value};

/// Group object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// `HostGroup`
    Host,
    /// `ServiceGroup`
    Service,
    /// `UserGroup`
    User,
}

impl GroupKind {
    /// Collection name in object URLs.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Host => "hostgroups",
            Self::Service => "servicegroups",
            Self::User => "usergroups",
        }
    }
}

/// Group operations for one group kind.
#[derive(Clone, Copy)]
pub struct Groups<'a> {
    api: &'a dyn IcingaApi,
    kind: GroupKind,
}

impl<'a> Groups<'a> {
    /// Wrap an API handle.
    #[must_use]
    pub fn new(api: &'a dyn IcingaApi, kind: GroupKind) -> Self {
        Self { api, kind }
    }

    /// Group kind handled by this wrapper.
    #[must_use]
    pub const fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Create a group.
    pub async fn add(&self, name: &str, display_name: Option<&str>) -> Result<ActionResult> {
        require_name(name)?;
        let payload = json!({
            "attrs": compact_object([("display_name", json!(display_name))]),
        });
        self.api
            .action(
                Method::PUT,
                &["objects", self.kind.collection(), name],
                QueryParams::new(),
                Some(payload),
            )
            .await
    }

    /// Delete a group.
    pub async fn delete(&self, name: &str) -> Result<ActionResult> {
        require_name(name)?;
        self.api
            .action(
                Method::DELETE,
                &["objects", self.kind.collection(), name],
                QueryParams::cascade(),
                None,
            )
            .await
    }

    /// List all groups, or one by name.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Value>> {
        match name {
            Some(name) => {
                self.api
                    .fetch(&["objects", self.kind.collection(), name], None)
                    .await
            }
            None => self.api.fetch(&["objects", self.kind.collection()], None).await,
        }
    }

    /// Whether the group exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.api
            .exists(&["objects", self.kind.collection(), name])
            .await
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::ValidationError("missing group name".to_string()));
    }
    Ok(())
}
