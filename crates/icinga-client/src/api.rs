//! The request capability shared by the client and the resource wrappers.

use crate::executor::{ActionResult, ApiRequest, Success};
use crate::Result;
use async_trait::async_trait;
use icinga_core::query::QueryParams;
use icinga_core::Error;
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// Executes requests against one Icinga API endpoint.
///
/// Wrappers hold a `&dyn IcingaApi` and only build URLs and payloads; all
/// transport, retry and status handling happens behind [`IcingaApi::execute`].
#[async_trait]
pub trait IcingaApi: Send + Sync {
    /// API base URL, e.g. `https://icinga:5665/v1`.
    fn base_url(&self) -> &Url;

    /// Execute one request.
    async fn execute(&self, request: ApiRequest) -> Result<Success>;

    /// Build a URL below the base from path segments. Segments are
    /// percent-encoded individually.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the base URL cannot carry a path.
    fn endpoint(&self, segments: &[&str], query: &QueryParams) -> Result<Url> {
        let mut url = self.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidEndpoint(format!("`{}` cannot be a base URL", self.base_url()))
            })?
            .pop_if_empty()
            .extend(segments);
        query.apply(&mut url);
        Ok(url)
    }

    /// Logical GET returning the collection view of the response. A payload
    /// tunnels the request as POST.
    async fn fetch(&self, segments: &[&str], payload: Option<Value>) -> Result<Vec<Value>> {
        let url = self.endpoint(segments, &QueryParams::new())?;
        let mut request = ApiRequest::get(url);
        if let Some(payload) = payload {
            request = request.with_payload(payload);
        }
        Ok(self.execute(request).await?.data.results())
    }

    /// Logical GET returning the single-object view of the response.
    async fn fetch_one(&self, segments: &[&str]) -> Result<Option<Value>> {
        let url = self.endpoint(segments, &QueryParams::new())?;
        Ok(self.execute(ApiRequest::get(url)).await?.data.first_result())
    }

    /// PUT, POST or DELETE returning the flattened first result.
    async fn action(
        &self,
        method: Method,
        segments: &[&str],
        query: QueryParams,
        payload: Option<Value>,
    ) -> Result<ActionResult> {
        let url = self.endpoint(segments, &query)?;
        let mut request = ApiRequest::new(method, url);
        if let Some(payload) = payload {
            request = request.with_payload(payload);
        }
        let success = self.execute(request).await?;
        ActionResult::from_document(&success.data)
    }

    /// Whether a lookup succeeds with at least one result. A 404 answer reads
    /// as absent.
    async fn exists(&self, segments: &[&str]) -> Result<bool> {
        match self.fetch(segments, None).await {
            Ok(results) => Ok(!results.is_empty()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
