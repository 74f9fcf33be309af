//! Request execution, retry policy and response classification.
//!
//! [`RequestExecutor`] sends one logical request through a [`Transport`],
//! retries connection failures with a fixed pause, and turns the HTTP status of
//! the answer into either a [`Success`] or a classified [`Failure`].

use async_trait::async_trait;
use icinga_core::client::{ClientConfig, RetryPolicy, Sleeper, TokioSleeper};
use icinga_core::normalize::{number_field, str_field};
use icinga_core::{AuthContext, Document, Error, Failure, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("icinga-client/", env!("CARGO_PKG_VERSION"));

/// Header carrying the logical verb of a tunneled request.
pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";

/// One logical API request. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Logical verb (GET, POST, PUT or DELETE)
    pub method: Method,
    /// Absolute URL
    pub url: Url,
    /// Request headers; JSON content negotiation is preset
    pub headers: HeaderMap,
    /// Optional JSON object payload
    pub payload: Option<Value>,
}

impl ApiRequest {
    /// Create a request with JSON `Content-Type` and `Accept` headers.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            method,
            url,
            headers,
            payload: None,
        }
    }

    /// Logical GET.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Logical POST with a payload.
    #[must_use]
    pub fn post(url: Url, payload: Value) -> Self {
        Self::new(Method::POST, url).with_payload(payload)
    }

    /// Logical PUT with a payload.
    #[must_use]
    pub fn put(url: Url, payload: Value) -> Self {
        Self::new(Method::PUT, url).with_payload(payload)
    }

    /// Logical DELETE.
    #[must_use]
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attach a JSON payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Verb used on the wire. A GET carrying a filter body is tunneled as POST.
    #[must_use]
    pub fn wire_method(&self) -> Method {
        if self.method == Method::GET && self.payload.is_some() {
            Method::POST
        } else {
            self.method.clone()
        }
    }

    /// Headers sent on the wire, including the method override.
    #[must_use]
    pub fn wire_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if let Ok(value) = HeaderValue::from_str(self.method.as_str()) {
            headers.insert(METHOD_OVERRIDE_HEADER, value);
        }
        headers
    }

    /// Reject requests the API cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for verbs other than GET/POST/PUT/DELETE
    /// or for non-object payloads.
    pub fn validate(&self) -> Result<()> {
        if ![Method::GET, Method::POST, Method::PUT, Method::DELETE].contains(&self.method) {
            return Err(Error::ValidationError(format!(
                "method must be 'GET', 'POST', 'PUT' or 'DELETE' ('{}' given)",
                self.method
            )));
        }
        if let Some(payload) = &self.payload {
            if !payload.is_object() {
                return Err(Error::ValidationError(
                    "only JSON objects are allowed as payload".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Raw answer from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Response with a status and body and no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Transport-level failure, before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused or host unreachable
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request timed out
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Any other transport error
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Only connection failures are retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Sends a request and returns the raw answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` authenticated with `auth`.
    async fn send(
        &self,
        request: &ApiRequest,
        auth: &AuthContext,
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build the HTTP client for the given settings and credentials.
    ///
    /// Client certificates are installed as TLS identity; peer verification
    /// follows [`AuthContext::verify_ssl`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the PEM material is invalid or the
    /// client cannot be built.
    pub fn new(config: &ClientConfig, auth: &AuthContext) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if !auth.verify_ssl() {
            warn!("TLS verification disabled for Icinga API client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let AuthContext::Certificate {
            cert_pem,
            key_pem,
            ca_pem,
        } = auth
        {
            debug!("using client certificate for Icinga API client");
            let mut identity_pem = cert_pem.clone();
            identity_pem.push(b'\n');
            identity_pem.extend_from_slice(key_pem);

            let identity = reqwest::Identity::from_pem(&identity_pem)
                .map_err(|err| Error::ConfigError(format!("Invalid client certificate: {err}")))?;
            let ca = reqwest::Certificate::from_pem(ca_pem)
                .map_err(|err| Error::ConfigError(format!("Invalid CA certificate: {err}")))?;

            builder = builder.identity(identity).add_root_certificate(ca);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build Icinga HTTP client: {err}"))
        })?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        auth: &AuthContext,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.wire_method(), request.url.clone())
            .headers(request.wire_headers());

        if let AuthContext::Basic { user, password } = auth {
            builder = builder.basic_auth(user, Some(password.expose_secret()));
        }

        if let Some(payload) = &request.payload {
            let body = serde_json::to_vec(payload)
                .map_err(|err| TransportError::Other(format!("Failed to encode payload: {err}")))?;
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// A successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    /// HTTP status code
    pub code: u16,
    /// Normalized body
    pub data: Document,
}

/// Flat outcome of a PUT, POST or DELETE, taken from the first `results` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    /// Result code reported by the server
    pub code: u16,
    /// Object name, when reported
    pub name: Option<String>,
    /// Status text, when reported
    pub status: Option<String>,
}

impl ActionResult {
    /// Extract the action result from a response document.
    ///
    /// # Errors
    ///
    /// Returns an unexpected failure if the document carries no result entry.
    pub fn from_document(document: &Document) -> Result<Self> {
        let entry = document
            .first_result()
            .ok_or_else(|| Failure::unexpected("empty result set in action response"))?;

        Ok(Self {
            code: number_field(&entry, "code").round().clamp(0.0, f64::from(u16::MAX)) as u16,
            name: str_field(&entry, "name").map(ToString::to_string),
            status: str_field(&entry, "status").map(ToString::to_string),
        })
    }
}

/// Executes requests with retry and status classification.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    retry_policy: RetryPolicy,
    target: String,
}

impl RequestExecutor {
    /// Create an executor for the API at `target` (`https://host:port`).
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        retry_policy: RetryPolicy,
        target: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            retry_policy,
            target: target.into(),
        }
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The API origin used in messages.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The active retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Send `request` and classify the answer.
    ///
    /// # Errors
    ///
    /// - [`Error::ValidationError`] for malformed requests, before sending.
    /// - [`Error::RetriesExhausted`] when every attempt failed to connect.
    /// - [`Error::Api`] for HTTP failures and unexpected transport errors.
    pub async fn execute(&self, request: &ApiRequest, auth: &AuthContext) -> Result<Success> {
        request.validate()?;

        let mut retries = 0;

        loop {
            info!(method = %request.method, url = %request.url, attempt = retries, "Icinga API request");

            match self.transport.send(request, auth).await {
                Ok(response) => return classify(request, &response, &self.target),
                Err(err) if err.is_retryable() => {
                    if retries >= self.retry_policy.max_retries {
                        error!(
                            target_url = %self.target,
                            retries,
                            "Maximum retries against Icinga API reached. Giving up"
                        );
                        return Err(Error::RetriesExhausted {
                            attempts: retries,
                            target: self.target.clone(),
                            message: err.to_string(),
                        });
                    }

                    retries += 1;
                    warn!(
                        "Cannot execute request against '{}': '{}' (retry {} / {})",
                        self.target, err, retries, self.retry_policy.max_retries
                    );

                    let delay = self.retry_policy.delay_for_attempt(retries);
                    debug!("Retrying Icinga API request after {:?}", delay);
                    self.sleeper.sleep(delay).await;
                }
                Err(err) => {
                    error!(
                        method = %request.method,
                        url = %request.url,
                        payload = ?request.payload,
                        headers = ?request.wire_headers(),
                        error = %err,
                        "Icinga API request failed"
                    );
                    return Err(Failure::unexpected(err.to_string()).into());
                }
            }
        }
    }
}

/// Map an HTTP answer to a success or a classified failure.
///
/// # Errors
///
/// Returns [`Error::Api`] for every non-2xx status and for undecodable bodies.
pub fn classify(request: &ApiRequest, response: &RawResponse, target: &str) -> Result<Success> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_success() {
        return match Document::from_bytes(&response.body) {
            Ok(data) => Ok(Success {
                code: response.status,
                data,
            }),
            Err(err) => {
                log_unexpected(request, response, &err.to_string());
                Err(Failure::unexpected(format!(
                    "Failed to parse Icinga response for `{}`: {err}",
                    request.url
                ))
                .into())
            }
        };
    }

    let failure = match status {
        StatusCode::BAD_REQUEST => Failure::bad_request(bad_request_message(&response.body)),
        StatusCode::UNAUTHORIZED => Failure::unauthorized(target),
        StatusCode::NOT_FOUND => Failure::not_found(),
        StatusCode::INTERNAL_SERVER_ERROR => {
            Failure::server_error(server_error_message(&response.body))
        }
        other => {
            let message = other.to_string();
            log_unexpected(request, response, &message);
            Failure::unexpected(message)
        }
    };

    Err(failure.into())
}

fn log_unexpected(request: &ApiRequest, response: &RawResponse, message: &str) {
    error!(
        method = %request.method,
        url = %request.url,
        status = response.status,
        payload = ?request.payload,
        headers = ?request.wire_headers(),
        response_headers = ?response.headers,
        "Unexpected Icinga API response: {message}"
    );
}

/// Message for a 400 answer: the body's `status`, else the raw body, else
/// `"Bad Request"`.
#[must_use]
pub fn bad_request_message(body: &[u8]) -> String {
    if let Ok(document) = Document::from_bytes(body) {
        if let Some(status) = document
            .first_result()
            .as_ref()
            .and_then(|entry| str_field(entry, "status"))
        {
            return status.to_string();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "Bad Request".to_string()
    } else {
        text.to_string()
    }
}

/// Message for a 500 answer: `"<status> (<first error>)"` with the quoted part
/// of the error removed and every period deleted.
#[must_use]
pub fn server_error_message(body: &[u8]) -> String {
    let entry = Document::from_bytes(body)
        .ok()
        .and_then(|document| document.first_result());

    let Some(entry) = entry else {
        return "Internal Server Error".to_string();
    };

    let status = entry.get("status").map_or_else(String::new, value_text);
    let errors = match entry.get("errors") {
        Some(Value::Array(items)) => items.first().map_or_else(String::new, value_text),
        Some(other) => value_text(other),
        None => String::new(),
    };

    format!("{status} ({})", strip_quoted(&errors)).replace('.', "")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Remove the first ` '...'` span, extending to the last quote on that line.
fn strip_quoted(text: &str) -> String {
    for (start, _) in text.match_indices(" '") {
        let rest = &text[start + 2..];
        let line = rest.split('\n').next().unwrap_or_default();
        if let Some(end) = line.rfind('\'') {
            return format!("{}{}", &text[..start], &rest[end + 1..]);
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icinga_core::FailureKind;
    use mockall::Sequence;
    use serde_json::json;
    use std::time::Duration;

    mockall::mock! {
        Sleeper {}

        #[async_trait]
        impl Sleeper for Sleeper {
            async fn sleep(&self, duration: Duration);
        }
    }

    fn url() -> Url {
        Url::parse("https://icinga.example.com:5665/v1/status/CIB").unwrap()
    }

    fn auth() -> AuthContext {
        AuthContext::basic("root", "icinga")
    }

    fn executor(transport: MockTransport, sleeper: MockSleeper) -> RequestExecutor {
        RequestExecutor::new(
            Arc::new(transport),
            RetryPolicy::new(),
            "https://icinga.example.com:5665",
        )
        .with_sleeper(Arc::new(sleeper))
    }

    fn refused() -> TransportError {
        TransportError::Connect("Connection refused (os error 111)".to_string())
    }

    #[test]
    fn wire_method_tunnels_get_with_body() {
        let request = ApiRequest::get(url()).with_payload(json!({"filter": "host.state != 0"}));
        assert_eq!(request.wire_method(), Method::POST);
        assert_eq!(request.wire_headers()[METHOD_OVERRIDE_HEADER], "GET");
        assert_eq!(request.wire_headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.wire_headers()[ACCEPT], "application/json");

        let plain = ApiRequest::get(url());
        assert_eq!(plain.wire_method(), Method::GET);
        assert_eq!(plain.wire_headers()[METHOD_OVERRIDE_HEADER], "GET");

        let delete = ApiRequest::delete(url());
        assert_eq!(delete.wire_method(), Method::DELETE);
        assert_eq!(delete.wire_headers()[METHOD_OVERRIDE_HEADER], "DELETE");
    }

    #[test]
    fn validate_rejects_unsupported_requests() {
        let patch = ApiRequest::new(Method::PATCH, url());
        assert!(matches!(patch.validate(), Err(Error::ValidationError(_))));

        let list_payload = ApiRequest::post(url(), json!(["a"]));
        assert!(matches!(list_payload.validate(), Err(Error::ValidationError(_))));

        assert!(ApiRequest::put(url(), json!({"attrs": {}})).validate().is_ok());
    }

    #[test]
    fn classify_success_normalizes_body() {
        let request = ApiRequest::get(url());
        let response = RawResponse::new(200, r#"{"results":[{"name":"CIB"}]}"#);
        let success = classify(&request, &response, "t").unwrap();
        assert_eq!(success.code, 200);
        assert_eq!(success.data.first_result().unwrap()["name"], "CIB");
    }

    #[test]
    fn classify_malformed_success_body() {
        let request = ApiRequest::get(url());
        let response = RawResponse::new(200, "<html>");
        let err = classify(&request, &response, "t").unwrap_err();
        assert_eq!(err.code(), Some(500));
        assert_eq!(err.failure().unwrap().kind, FailureKind::Unexpected);
    }

    #[test]
    fn classify_status_codes() {
        let request = ApiRequest::get(url());
        let target = "https://icinga.example.com:5665";

        let err = classify(&request, &RawResponse::new(400, ""), target).unwrap_err();
        assert_eq!(err, Error::Api(Failure::bad_request("Bad Request")));

        let err = classify(
            &request,
            &RawResponse::new(400, r#"{"error":400,"status":"Invalid request body"}"#),
            target,
        )
        .unwrap_err();
        assert_eq!(err, Error::Api(Failure::bad_request("Invalid request body")));

        let err = classify(&request, &RawResponse::new(401, ""), target).unwrap_err();
        assert_eq!(
            err.failure().unwrap().message,
            "Not authorized to connect 'https://icinga.example.com:5665' - wrong username or password?"
        );

        let err = classify(&request, &RawResponse::new(404, "{}"), target).unwrap_err();
        assert_eq!(err, Error::Api(Failure::not_found()));

        let err = classify(&request, &RawResponse::new(503, ""), target).unwrap_err();
        let failure = err.failure().unwrap();
        assert_eq!(failure.code, 500);
        assert_eq!(failure.kind, FailureKind::Unexpected);
        assert_eq!(failure.message, "503 Service Unavailable");
    }

    #[test]
    fn server_error_message_strips_quotes_and_periods() {
        let body = br#"{"results":[{"status":"Error.","errors":["Invalid value 'foo'"]}]}"#;
        assert_eq!(server_error_message(body), "Error (Invalid value)");

        let body = br#"{"results":[{"code":500.0,"status":"Object could not be created.","errors":["Error: Object 'x' of type 'Host' already exists. Location: in 'y'"]}]}"#;
        assert_eq!(
            server_error_message(body),
            "Object could not be created (Error: Object)"
        );

        let body = br#"{"results":[{"status":"Failed.","errors":"single error"}]}"#;
        assert_eq!(server_error_message(body), "Failed (single error)");

        assert_eq!(server_error_message(b"oops"), "Internal Server Error");
    }

    #[test]
    fn strip_quoted_leaves_unquoted_text() {
        assert_eq!(strip_quoted("no quotes here"), "no quotes here");
        assert_eq!(strip_quoted("dangling 'quote"), "dangling 'quote");
        assert_eq!(strip_quoted("value 'a' and 'b' end"), "value end");
    }

    #[test]
    fn action_result_from_document() {
        let document = Document::new(json!({
            "results": [{"code": 200.0, "name": "foo", "status": "Object was created"}]
        }));
        let result = ActionResult::from_document(&document).unwrap();
        assert_eq!(result.code, 200);
        assert_eq!(result.name.as_deref(), Some("foo"));
        assert_eq!(result.status.as_deref(), Some("Object was created"));

        let empty = Document::new(json!({"results": []}));
        assert!(ActionResult::from_document(&empty).is_err());
    }

    #[tokio::test]
    async fn execute_succeeds_on_second_attempt() {
        let mut transport = MockTransport::new();
        let mut sequence = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Err(refused()));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"results":[]}"#)));

        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .with(mockall::predicate::eq(Duration::from_secs(3)))
            .times(1)
            .returning(|_| ());

        let success = executor(transport, sleeper)
            .execute(&ApiRequest::get(url()), &auth())
            .await
            .unwrap();
        assert_eq!(success.code, 200);
    }

    #[tokio::test]
    async fn execute_gives_up_after_three_retries() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(4)
            .returning(|_, _| Err(refused()));

        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .with(mockall::predicate::eq(Duration::from_secs(3)))
            .times(3)
            .returning(|_| ());

        let err = executor(transport, sleeper)
            .execute(&ApiRequest::get(url()), &auth())
            .await
            .unwrap_err();

        match err {
            Error::RetriesExhausted {
                attempts, target, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(target, "https://icinga.example.com:5665");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_does_not_retry_http_failures() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "")));

        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let err = executor(transport, sleeper)
            .execute(&ApiRequest::get(url()), &auth())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn execute_does_not_retry_timeouts() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _| Err(TransportError::Timeout("deadline elapsed".to_string())));

        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let err = executor(transport, sleeper)
            .execute(&ApiRequest::get(url()), &auth())
            .await
            .unwrap_err();

        let failure = err.failure().unwrap();
        assert_eq!(failure.code, 500);
        assert_eq!(failure.message, "request timed out: deadline elapsed");
    }

    #[tokio::test]
    async fn execute_rejects_invalid_request_before_sending() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let err = executor(transport, MockSleeper::new())
            .execute(&ApiRequest::new(Method::PATCH, url()), &auth())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }
}
