//! Asynchronous Icinga 2 API client.

use crate::api::IcingaApi;
use crate::downtimes::Downtimes;
use crate::executor::{ApiRequest, ReqwestTransport, RequestExecutor, Success, Transport};
use crate::groups::{GroupKind, Groups};
use crate::hosts::Hosts;
use crate::models::{host_name_filter, ObjectQuery};
use crate::notifications::Notifications;
use crate::problems::{
    rank, HostAdjusted, HostProblemCounts, RankedProblem, ServiceAdjusted, ServiceProblemCounts,
};
use crate::services::Services;
use crate::status::{self, ApplicationInfo, StatusAggregator, StatusSnapshot};
use crate::users::Users;
use crate::Result;
use async_trait::async_trait;
use icinga_core::client::{ClientConfig, RetryPolicy, Sleeper};
use icinga_core::config::IcingaClientConfig;
use icinga_core::{AuthContext, Error};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Default number of entries in a problem list.
pub const DEFAULT_MAX_PROBLEMS: usize = 5;

/// Builder for [`IcingaClient`].
pub struct IcingaClientBuilder {
    config: IcingaClientConfig,
    http_config: ClientConfig,
    base_url: Option<Url>,
    auth: Option<AuthContext>,
    transport: Option<Arc<dyn Transport>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl IcingaClientBuilder {
    /// Create a builder from the client configuration.
    #[must_use]
    pub fn new(config: IcingaClientConfig) -> Self {
        let http_config = ClientConfig::new()
            .with_timeout(config.timeout())
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_retries(config.max_retries)
                    .with_delay(config.retry_delay()),
            );
        Self {
            config,
            http_config,
            base_url: None,
            auth: None,
            transport: None,
            sleeper: None,
        }
    }

    /// Override the HTTP client configuration, including the retry policy.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the API base URL derived from host, port and version.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(base_url.as_ref())?);
        Ok(self)
    }

    /// Use these credentials instead of resolving them from the configuration.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Use a custom transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom sleeper between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Configuration, credential and TLS setup errors.
    pub fn build(self) -> Result<IcingaClient> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => self.config.base_url()?,
        };
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(format!(
                "`{base_url}` cannot be a base URL"
            )));
        }

        let auth = match self.auth {
            Some(auth) => auth,
            None => AuthContext::resolve(&self.config)?,
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.http_config, &auth)?),
        };

        let target = base_url.origin().ascii_serialization();
        let mut executor =
            RequestExecutor::new(transport, self.http_config.retry_policy, target);
        if let Some(sleeper) = self.sleeper {
            executor = executor.with_sleeper(sleeper);
        }

        debug!(base_url = %base_url, certificate = auth.is_certificate(), "built Icinga API client");

        Ok(IcingaClient {
            executor,
            auth: Arc::new(auth),
            base_url,
            host_notifications: self.config.notifications,
            aggregator: Arc::new(RwLock::new(StatusAggregator::new())),
        })
    }
}

/// Asynchronous Icinga 2 API client.
///
/// Clones share credentials and aggregated counters.
#[derive(Clone)]
pub struct IcingaClient {
    executor: RequestExecutor,
    auth: Arc<AuthContext>,
    base_url: Url,
    host_notifications: bool,
    aggregator: Arc<RwLock<StatusAggregator>>,
}

impl IcingaClient {
    /// Construct a client directly from configuration.
    pub fn new(config: IcingaClientConfig) -> Result<Self> {
        IcingaClientBuilder::new(config).build()
    }

    /// Construct a client from `ICINGA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(IcingaClientConfig::from_env()?)
    }

    /// Host operations. New hosts follow the configured notification default.
    #[must_use]
    pub fn hosts(&self) -> Hosts<'_> {
        Hosts::new(self).with_default_notifications(self.host_notifications)
    }

    /// Service operations.
    #[must_use]
    pub fn services(&self) -> Services<'_> {
        Services::new(self)
    }

    /// Host group operations.
    #[must_use]
    pub fn hostgroups(&self) -> Groups<'_> {
        Groups::new(self, GroupKind::Host)
    }

    /// Service group operations.
    #[must_use]
    pub fn servicegroups(&self) -> Groups<'_> {
        Groups::new(self, GroupKind::Service)
    }

    /// User group operations.
    #[must_use]
    pub fn usergroups(&self) -> Groups<'_> {
        Groups::new(self, GroupKind::User)
    }

    /// User operations.
    #[must_use]
    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    /// Downtime operations.
    #[must_use]
    pub fn downtimes(&self) -> Downtimes<'_> {
        Downtimes::new(self)
    }

    /// Notification operations.
    #[must_use]
    pub fn notifications(&self) -> Notifications<'_> {
        Notifications::new(self)
    }

    /// Version, node and start time of the answering instance.
    pub async fn application_info(&self) -> Result<ApplicationInfo> {
        status::application_info(self).await
    }

    /// Listener status, including connected endpoints.
    pub async fn api_listener(&self) -> Result<Value> {
        status::api_listener(self).await
    }

    /// All status components.
    pub async fn status(&self) -> Result<Vec<Value>> {
        status::status(self).await
    }

    /// Fetch a fresh CIB snapshot and keep it.
    ///
    /// Concurrent refreshes are serialized.
    pub async fn refresh_status(&self) -> Result<StatusSnapshot> {
        let mut aggregator = self.aggregator.write().await;
        aggregator.refresh(self).await
    }

    /// Last successful CIB snapshot.
    pub async fn snapshot(&self) -> Option<StatusSnapshot> {
        self.aggregator.read().await.snapshot().cloned()
    }

    /// Fetch service status objects, record their problem counts and return
    /// the worst `max_items` problems.
    pub async fn refresh_services(&self, max_items: usize) -> Result<Vec<RankedProblem>> {
        let records = self
            .services()
            .objects(&ObjectQuery::service_status())
            .await?;
        let counts = self.aggregator.write().await.record_services(&records);
        debug!(services = counts.all, unhandled = counts.unhandled, "refreshed Icinga services");
        Ok(rank(&records, max_items))
    }

    /// Fetch host status objects, record their problem counts and return the
    /// worst `max_items` problems.
    pub async fn refresh_hosts(&self, max_items: usize) -> Result<Vec<RankedProblem>> {
        let records = self.hosts().objects(&ObjectQuery::host_status()).await?;
        let counts = self.aggregator.write().await.record_hosts(&records);
        debug!(hosts = counts.all, unhandled = counts.unhandled, "refreshed Icinga hosts");
        Ok(rank(&records, max_items))
    }

    /// Worst service problems of one host.
    pub async fn host_service_problems(
        &self,
        host: &str,
        max_items: usize,
    ) -> Result<Vec<RankedProblem>> {
        let query = ObjectQuery::service_status().with_filter(host_name_filter(host));
        let records = self.services().objects(&query).await?;
        Ok(rank(&records, max_items))
    }

    /// Service problem counts from the last service refresh.
    pub async fn service_problem_counts(&self) -> ServiceProblemCounts {
        *self.aggregator.read().await.service_counts()
    }

    /// Host problem counts from the last host refresh.
    pub async fn host_problem_counts(&self) -> HostProblemCounts {
        *self.aggregator.read().await.host_counts()
    }

    /// Snapshot service counts minus handled service problems.
    pub async fn services_adjusted(&self) -> ServiceAdjusted {
        self.aggregator.read().await.services_adjusted()
    }

    /// Snapshot DOWN hosts minus handled host problems.
    pub async fn hosts_adjusted(&self) -> HostAdjusted {
        self.aggregator.read().await.hosts_adjusted()
    }
}

#[async_trait]
impl IcingaApi for IcingaClient {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn execute(&self, request: ApiRequest) -> Result<Success> {
        self.executor.execute(&request, &self.auth).await
    }
}
