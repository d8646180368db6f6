//! The secure request executor.
//!
//! # Responsibilities
//! - Build headers (sanitized caller headers, bearer token, CSRF, request ID)
//! - Sanitize request bodies
//! - Consult the rate limiter before anything leaves the process
//! - Execute under a cancellation deadline
//! - Decode responses and validate echoed CSRF tokens
//! - Report every outcome to the security monitor
//!
//! # Design Decisions
//! - Shared services are injected, never global
//! - Every failure surfaces as a `SecurityError`; nothing is retried here
//! - Errors are redacted according to `environment` before reaching callers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{Method, Url};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::request::{is_mutating, RequestBody, RequestOptions, UploadFile};
use crate::client::response::{
    decode_body, error_from_response, success_message, ApiResponse, RawResponse, ResponseBody,
};
use crate::config::{validate_config, ClientConfig};
use crate::error::{SecurityError, SecurityResult};
use crate::observability::metrics::Metrics;
use crate::resilience::with_deadline;
use crate::security::clock::{Clock, SystemClock};
use crate::security::csrf::CsrfStore;
use crate::security::file_validation::validate_file_upload;
use crate::security::headers::{
    build_base_headers, set_header, BodyKind, CSRF_HEADER, REQUESTED_WITH_HEADER,
    REQUESTED_WITH_VALUE, REQUEST_ID_HEADER,
};
use crate::security::monitor::SecurityMonitor;
use crate::security::rate_limit::{RateLimitBucket, RateLimiter};
use crate::security::sanitizer::{sanitize_body_text, sanitize_input, sanitize_value};
use crate::storage::{MemoryStorage, SecureStorage};

/// Stateful security services shared by one or more clients.
#[derive(Clone)]
pub struct SecurityServices {
    pub csrf: Arc<CsrfStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub monitor: Arc<SecurityMonitor>,
    pub metrics: Metrics,
}

impl SecurityServices {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ClientConfig, clock: Arc<dyn Clock>) -> Self {
        let metrics = Metrics::new(config.observability.metrics_enabled);
        Self {
            csrf: Arc::new(CsrfStore::new(config.csrf.clone())),
            rate_limiter: Arc::new(
                RateLimiter::with_clock(config.rate_limit.clone(), clock).with_metrics(metrics),
            ),
            monitor: Arc::new(SecurityMonitor::new(config.monitor.clone()).with_metrics(metrics)),
            metrics,
        }
    }
}

/// HTTP client builder with the pipeline's transport defaults.
///
/// Redirects are not followed: a 3xx would otherwise carry the CSRF header and
/// body to whatever host the `Location` names. They surface as API errors.
pub fn http_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(Policy::none())
}

/// Builder for [`SecureApiClient`].
pub struct SecureApiClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn SecureStorage>>,
    services: Option<SecurityServices>,
    http: Option<reqwest::Client>,
}

impl SecureApiClientBuilder {
    pub fn storage(mut self, storage: Arc<dyn SecureStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn services(mut self, services: SecurityServices) -> Self {
        self.services = Some(services);
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> SecurityResult<SecureApiClient> {
        validate_config(&self.config).map_err(|errors| {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            SecurityError::InvalidRequest(format!("invalid configuration: {}", joined))
        })?;

        let base_url = self.config.base_url.trim_end_matches('/').to_string();
        let services = self
            .services
            .unwrap_or_else(|| SecurityServices::from_config(&self.config));
        let http = match self.http {
            Some(http) => http,
            None => http_client_builder().build().map_err(SecurityError::from)?,
        };

        let storage: Arc<dyn SecureStorage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::new()),
        };

        Ok(SecureApiClient {
            http,
            base_url,
            config: Arc::new(self.config),
            storage,
            services,
        })
    }
}

/// Body as it will be put on the wire.
enum Outbound {
    Empty,
    Text(String),
    Multipart(Form),
}

/// Headers and bookkeeping produced by the pre-flight steps.
struct Prepared {
    headers: HeaderMap,
    csrf_token: Option<String>,
    timeout_ms: u64,
}

/// HTTP client that runs every request through the security pipeline.
#[derive(Clone)]
pub struct SecureApiClient {
    http: reqwest::Client,
    base_url: String,
    config: Arc<ClientConfig>,
    storage: Arc<dyn SecureStorage>,
    services: SecurityServices,
}

impl SecureApiClient {
    pub fn builder(config: ClientConfig) -> SecureApiClientBuilder {
        SecureApiClientBuilder {
            config,
            storage: None,
            services: None,
            http: None,
        }
    }

    /// Client with fresh services and the given token store.
    pub fn new(config: ClientConfig, storage: Arc<dyn SecureStorage>) -> SecurityResult<Self> {
        Self::builder(config).storage(storage).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn SecureStorage> {
        &self.storage
    }

    pub fn csrf_store(&self) -> &CsrfStore {
        &self.services.csrf
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.services.rate_limiter
    }

    pub fn monitor(&self) -> &SecurityMonitor {
        &self.services.monitor
    }

    pub fn metrics(&self) -> Metrics {
        self.services.metrics
    }

    pub async fn get(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        self.request(Method::POST, path, body, options).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        self.request(Method::PUT, path, body, options).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        self.request(Method::PATCH, path, body, options).await
    }

    pub async fn delete(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        self.request(Method::DELETE, path, None, options).await
    }

    /// GET and decode the JSON payload as `T`.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<T>> {
        self.get(path, options).await?.into_json()
    }

    /// Run one request through the full pipeline.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        let request_id = Uuid::new_v4();
        let fut = async {
            let url = self.url_for(path)?;
            let (outbound, kind) = match body {
                None => (Outbound::Empty, BodyKind::Json),
                Some(RequestBody::Json(value)) => (
                    Outbound::Text(sanitize_value(value).to_string()),
                    BodyKind::Json,
                ),
                Some(RequestBody::Text(text)) => match sanitize_body_text(&text) {
                    (clean, true) => (Outbound::Text(clean), BodyKind::Json),
                    (clean, false) => (Outbound::Text(clean), BodyKind::PlainText),
                },
            };
            let prepared =
                self.prepare(&method, &options, request_id, RateLimitBucket::Api, kind)?;
            self.dispatch(method.clone(), url, prepared, outbound).await
        };
        self.observe(&method, path, request_id, fut).await
    }

    /// Validate and upload a file as multipart form data alongside `fields`.
    pub async fn upload_file(
        &self,
        path: &str,
        file: UploadFile,
        fields: &BTreeMap<String, String>,
        options: RequestOptions,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        let method = Method::POST;
        let request_id = Uuid::new_v4();
        let fut = async {
            let check = validate_file_upload(&file.metadata(), &self.config.upload);
            if !check.is_valid {
                let reason = check.error.unwrap_or_else(|| "invalid file".to_string());
                return Err(SecurityError::FileValidationFailed(reason));
            }

            let url = self.url_for(path)?;
            let prepared = self.prepare(
                &method,
                &options,
                request_id,
                RateLimitBucket::File,
                BodyKind::Multipart,
            )?;

            let mut form = Form::new();
            for (key, value) in fields {
                form = form.text(sanitize_input(key), sanitize_input(value));
            }
            let part = Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str(&file.mime_type)
                .map_err(|_| SecurityError::InvalidRequest("invalid MIME type".to_string()))?;
            form = form.part("file", part);

            self.dispatch(method.clone(), url, prepared, Outbound::Multipart(form))
                .await
        };
        self.observe(&method, path, request_id, fut).await
    }

    fn url_for(&self, path: &str) -> SecurityResult<Url> {
        if path.contains("://") {
            return Err(SecurityError::InvalidRequest(
                "path must be relative to the base URL".to_string(),
            ));
        }
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|e| SecurityError::InvalidRequest(e.to_string()))
    }

    /// Pre-flight: headers, auth, rate limit, CSRF.
    fn prepare(
        &self,
        method: &Method,
        options: &RequestOptions,
        request_id: Uuid,
        default_bucket: RateLimitBucket,
        kind: BodyKind,
    ) -> SecurityResult<Prepared> {
        let mut headers = build_base_headers(&options.headers, kind);

        if options.require_auth {
            let tokens = self
                .storage
                .get_auth_tokens()
                .ok_or(SecurityError::AuthenticationRequired)?;
            let bearer = format!("Bearer {}", tokens.access_token);
            if !set_header(&mut headers, "authorization", &bearer) {
                return Err(SecurityError::AuthenticationRequired);
            }
        }

        let bucket = options
            .rate_limit_key
            .as_deref()
            .unwrap_or(default_bucket.as_str());
        self.services.rate_limiter.check(bucket)?;

        let csrf_token = if is_mutating(method) && !options.skip_csrf {
            let token = self.services.csrf.obtain_token();
            set_header(&mut headers, CSRF_HEADER, &token);
            Some(token)
        } else {
            None
        };

        set_header(&mut headers, REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE);
        set_header(&mut headers, REQUEST_ID_HEADER, &request_id.to_string());

        Ok(Prepared {
            headers,
            csrf_token,
            timeout_ms: options.timeout_ms.unwrap_or(self.config.request.timeout_ms),
        })
    }

    /// Send, receive, and interpret one response under the deadline.
    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        prepared: Prepared,
        outbound: Outbound,
    ) -> SecurityResult<ApiResponse<ResponseBody>> {
        let Prepared {
            headers,
            csrf_token,
            timeout_ms,
        } = prepared;

        let mut builder = self.http.request(method.clone(), url).headers(headers);
        builder = match outbound {
            Outbound::Empty => builder,
            Outbound::Text(text) => builder.body(text),
            Outbound::Multipart(form) => builder.multipart(form),
        };

        let metrics = self.services.metrics;
        let csrf = &self.services.csrf;
        let result = with_deadline(timeout_ms, async move {
            let response = builder.send().await?;
            let raw = RawResponse {
                status: response.status(),
                headers: response.headers().clone(),
                body: response.bytes().await?.to_vec(),
            };

            metrics.record_request(method.as_str(), raw.status.as_u16());

            if !raw.status.is_success() {
                return Err(error_from_response(&raw));
            }

            if csrf_token.is_some() {
                if let Some(echo) = raw.headers.get(CSRF_HEADER) {
                    let echo = echo.to_str().unwrap_or_default();
                    if !csrf.verify(echo) {
                        metrics.record_csrf_failure();
                        return Err(SecurityError::CsrfValidationFailed);
                    }
                }
            }

            // Decoding sanitizes text, so it runs under the deadline too.
            let message = success_message(&raw.headers);
            let data = decode_body(&raw.headers, raw.body)?;
            Ok(ApiResponse::ok(data, message))
        })
        .await;

        if let Err(SecurityError::Timeout(_)) = result {
            metrics.record_timeout();
        }
        result
    }

    /// Wrap a pipeline run with a span, a security event, and error redaction.
    async fn observe<F>(
        &self,
        method: &Method,
        path: &str,
        request_id: Uuid,
        fut: F,
    ) -> SecurityResult<ApiResponse<ResponseBody>>
    where
        F: std::future::Future<Output = SecurityResult<ApiResponse<ResponseBody>>>,
    {
        let route = path.split('?').next().unwrap_or_default();
        let span = tracing::info_span!("request", %request_id, %method, path = %route);
        let started = Instant::now();

        let result = fut.instrument(span).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                self.services.monitor.log_event(
                    "api_request",
                    json!({
                        "method": method.as_str(),
                        "path": route,
                        "request_id": request_id.to_string(),
                        "duration_ms": elapsed_ms,
                    }),
                );
                Ok(response)
            }
            Err(err) => {
                let mut data = json!({
                    "method": method.as_str(),
                    "path": route,
                    "request_id": request_id.to_string(),
                    "duration_ms": elapsed_ms,
                    "error": err.to_string(),
                });
                if let (Some(status), Value::Object(map)) = (err.status(), &mut data) {
                    map.insert("status".to_string(), json!(status));
                }
                tracing::warn!(%request_id, error = %err, "Request failed");
                self.services.monitor.log_event(err.kind(), data);
                Err(err.redact_for(self.config.environment))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_switch_is_per_client() {
        let mut quiet = ClientConfig::default();
        quiet.observability.metrics_enabled = false;
        let loud = ClientConfig::default();

        let quiet_client = SecureApiClient::new(quiet, Arc::new(MemoryStorage::new())).unwrap();
        let loud_client = SecureApiClient::new(loud, Arc::new(MemoryStorage::new())).unwrap();

        // Building the second client must not flip the first one's switch.
        assert!(!quiet_client.metrics().is_enabled());
        assert!(loud_client.metrics().is_enabled());
    }

    #[test]
    fn test_invalid_config_rejected_at_build() {
        let mut config = ClientConfig::default();
        config.base_url = "not a url".to_string();
        let result = SecureApiClient::new(config, Arc::new(MemoryStorage::new()));
        assert!(matches!(result, Err(SecurityError::InvalidRequest(_))));
    }
}
