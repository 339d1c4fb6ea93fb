//! HTTP client wrapper with loading-indicator orchestration.
//!
//! [`Http`] resolves every call to an [`Envelope`]; transport failures,
//! backend-declared failures and validator-declared failures all end up as
//! `Envelope::Fail` and are never returned as errors.

pub mod envelope;
pub mod loading;
pub mod transport;


use std::{sync::Arc, time::Duration};

use http::{HeaderMap, HeaderValue, Method, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio_util::sync::CancellationToken;
use validator::Validate;

pub use envelope::{normalize_payload, Envelope, EnvelopeMeta, NormalizedPayload};
pub use loading::{DelayOverride, LoadingConfig, LoadingFn, MIN_VISIBLE};
pub use transport::{
    ReqwestTransport, RequestBody, StatusInterceptor, StatusValidatorFn, TransportError,
    TransportRequest, TransportResponse,
};

use crate::config::HttpConfig;
use crate::core::{ProKitResult, Transport};
use crate::utils::{query::to_query_pairs, request::resolve_url};
use loading::LoadingTimer;

pub type ShowErrorFn = Arc<dyn Fn(&str, &LoadingConfig) + Send + Sync>;

static TIMEOUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"timeout\sof\s\d+ms\sexceeded").unwrap());

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub headers: HeaderMap,
    /// Query params sent with every verb; `get` overlays its own params on
    /// top of these, `delete` replaces them with its own
    pub params: JsonMap<String, JsonValue>,
    pub timeout: Option<Duration>,
    pub show_loading: Option<bool>,
    pub show_error: Option<bool>,
    pub show_error_mode: Option<String>,
    pub delay: DelayOverride,
    pub cancel: Option<CancellationToken>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_loading(mut self, show: bool) -> Self {
        self.show_loading = Some(show);
        self
    }

    pub fn show_error(mut self, show: bool) -> Self {
        self.show_error = Some(show);
        self
    }

    pub fn show_error_mode(mut self, mode: impl Into<String>) -> Self {
        self.show_error_mode = Some(mode.into());
        self
    }

    pub fn delay(mut self, delay: impl Into<DelayOverride>) -> Self {
        self.delay = delay.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[derive(Clone, Default)]
struct Hooks {
    on_show_loading: Option<LoadingFn>,
    on_hide_loading: Option<LoadingFn>,
    on_show_error: Option<ShowErrorFn>,
}

/// Builder for [`Http`]
pub struct HttpBuilder {
    config: HttpConfig,
    transport: Option<Arc<dyn Transport>>,
    hooks: Hooks,
    valid_status_code: Option<StatusValidatorFn>,
}

impl HttpBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn on_show_loading(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_show_loading = Some(Arc::new(f));
        self
    }

    pub fn on_hide_loading(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_hide_loading = Some(Arc::new(f));
        self
    }

    pub fn on_show_error(mut self, f: impl Fn(&str, &LoadingConfig) + Send + Sync + 'static) -> Self {
        self.hooks.on_show_error = Some(Arc::new(f));
        self
    }

    /// Installs a status validator in front of the transport.
    pub fn valid_status_code(
        mut self,
        f: impl Fn(StatusCode, &TransportResponse) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.valid_status_code = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> ProKitResult<Http> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };
        let transport: Arc<dyn Transport> = match self.valid_status_code {
            Some(validator) => Arc::new(StatusInterceptor::new(transport, validator)),
            None => transport,
        };

        let config = self.config;
        Ok(Http {
            transport,
            defaults: LoadingConfig {
                show_loading: config.show_loading,
                show_error: config.show_error,
                show_error_mode: config.show_error_mode,
                delay: Duration::from_millis(config.delay),
            },
            base_url: config.base_url,
            timeout_text: non_empty_or(config.timeout_text, HttpConfig::default_timeout_text),
            default_err: non_empty_or(config.default_err, HttpConfig::default_err),
            hooks: self.hooks,
        })
    }
}

fn non_empty_or(text: String, default: fn() -> String) -> String {
    if text.is_empty() {
        default()
    } else {
        text
    }
}

/// Request orchestrator.
///
/// Cheap to clone; clones share the transport and callbacks.
#[derive(Clone)]
pub struct Http {
    transport: Arc<dyn Transport>,
    base_url: String,
    defaults: LoadingConfig,
    timeout_text: String,
    default_err: String,
    hooks: Hooks,
}

impl Http {
    pub fn builder(config: HttpConfig) -> HttpBuilder {
        HttpBuilder {
            config,
            transport: None,
            hooks: Hooks::default(),
            valid_status_code: None,
        }
    }

    /// Orchestrator over the default reqwest transport, without callbacks.
    pub fn new(config: HttpConfig) -> ProKitResult<Self> {
        Self::builder(config).build()
    }

    /// A fresh token for cancelling in-flight requests.
    pub fn cancel_token() -> CancellationToken {
        CancellationToken::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn defaults(&self) -> &LoadingConfig {
        &self.defaults
    }

    pub async fn get(
        &self,
        url: &str,
        params: Option<JsonMap<String, JsonValue>>,
        config: Option<RequestConfig>,
    ) -> Envelope {
        let mut config = config.unwrap_or_default();
        let mut query = std::mem::take(&mut config.params);
        query.extend(params.unwrap_or_default());

        let mut request = self.prepare(Method::GET, url, &mut config);
        request.query = to_query_pairs(&query);
        self.request(request, config).await
    }

    pub async fn post(
        &self,
        url: &str,
        params: Option<JsonMap<String, JsonValue>>,
        config: Option<RequestConfig>,
    ) -> Envelope {
        self.send_json(Method::POST, url, params, config).await
    }

    pub async fn put(
        &self,
        url: &str,
        params: Option<JsonMap<String, JsonValue>>,
        config: Option<RequestConfig>,
    ) -> Envelope {
        self.send_json(Method::PUT, url, params, config).await
    }

    pub async fn delete(
        &self,
        url: &str,
        params: Option<JsonMap<String, JsonValue>>,
        config: Option<RequestConfig>,
    ) -> Envelope {
        let mut config = config.unwrap_or_default();
        let mut request = self.prepare(Method::DELETE, url, &mut config);
        request.query = to_query_pairs(&params.unwrap_or_default());
        self.request(request, config).await
    }

    /// Posts `params` as `multipart/form-data` text fields.
    pub async fn upload(
        &self,
        url: &str,
        params: Option<JsonMap<String, JsonValue>>,
        config: Option<RequestConfig>,
    ) -> Envelope {
        let mut config = config.unwrap_or_default();
        let mut request = self.prepare(Method::POST, url, &mut config);
        request
            .headers
            .insert("charset", HeaderValue::from_static("utf-8"));
        request.body = RequestBody::Multipart(params.unwrap_or_default());
        self.request(request, config).await
    }

    async fn send_json(
        &self,
        method: Method,
        url: &str,
        params: Option<JsonMap<String, JsonValue>>,
        config: Option<RequestConfig>,
    ) -> Envelope {
        let mut config = config.unwrap_or_default();
        let mut request = self.prepare(method, url, &mut config);
        request.body = RequestBody::Json(JsonValue::Object(params.unwrap_or_default()));
        self.request(request, config).await
    }

    fn prepare(&self, method: Method, url: &str, config: &mut RequestConfig) -> TransportRequest {
        let mut request = TransportRequest::new(method, resolve_url(&self.base_url, url));
        request.query = to_query_pairs(&config.params);
        request.headers = std::mem::take(&mut config.headers);
        request.timeout = config.timeout;
        request
    }

    /// Sends `request` and folds every outcome into an envelope.
    pub async fn request(&self, request: TransportRequest, config: RequestConfig) -> Envelope {
        let loading = LoadingConfig::resolve(&self.defaults, &config);
        log::debug!("{} {}", request.method, request.url);

        let timer = match (&self.hooks.on_show_loading, loading.show_loading) {
            (Some(on_show), true) => Some(LoadingTimer::arm(
                loading.delay,
                on_show.clone(),
                self.hooks.on_hide_loading.clone(),
            )),
            _ => None,
        };

        let outcome = match &config.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::Canceled),
                res = self.transport.send(request) => res,
            },
            None => self.transport.send(request).await,
        };

        match outcome {
            Ok(response) => {
                if let Some(timer) = timer {
                    let pad = timer.reconcile_delay();
                    tokio::spawn(async move {
                        if !pad.is_zero() {
                            tokio::time::sleep(pad).await;
                        }
                        timer.dismiss().await;
                    });
                }
                self.settle(response.data, &loading)
            }
            Err(err) => {
                if let Some(timer) = timer {
                    timer.dismiss().await;
                }
                self.reject(err, &loading)
            }
        }
    }

    fn settle(&self, payload: JsonValue, loading: &LoadingConfig) -> Envelope {
        let normalized = normalize_payload(payload);
        if normalized.ok {
            return Envelope::Ok {
                data: normalized.data,
                meta: normalized.meta,
            };
        }

        let err = normalized.err.unwrap_or_else(|| self.default_err.clone());
        log::warn!("Request rejected by backend: {err}");
        if loading.show_error {
            self.show_error(&err, loading);
        }

        Envelope::Fail {
            err,
            meta: normalized.meta,
        }
    }

    fn reject(&self, err: TransportError, loading: &LoadingConfig) -> Envelope {
        let err_msg = match &err {
            TransportError::Canceled => String::new(),
            TransportError::Failed {
                message: Some(message),
            } if !message.is_empty() => {
                if TIMEOUT_PATTERN.is_match(message) {
                    self.timeout_text.clone()
                } else {
                    message.clone()
                }
            }
            TransportError::Failed { .. } => self.default_err.clone(),
        };

        if err_msg.is_empty() {
            log::debug!("Request canceled");
        } else {
            log::warn!("Request failed: {err}");
            if loading.show_error {
                self.show_error(&err_msg, loading);
            }
        }

        Envelope::fail(err_msg)
    }

    fn show_error(&self, msg: &str, loading: &LoadingConfig) {
        if let Some(on_show_error) = &self.hooks.on_show_error {
            on_show_error(msg, loading);
        }
    }
}
