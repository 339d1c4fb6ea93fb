//! Wire-level request/response types and the reqwest-backed transport.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::HttpConfig;
use crate::core::{ProKitError, ProKitResult, Transport};

/// Caller-supplied status check: returns an error message to mark the response failed
pub type StatusValidatorFn =
    Arc<dyn Fn(StatusCode, &TransportResponse) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(JsonValue),
    /// Text fields of a `multipart/form-data` upload
    Multipart(JsonMap<String, JsonValue>),
}

/// A fully resolved request, ready for the wire
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Body parsed as JSON; non-JSON bodies are kept as a JSON string, empty ones as null
    pub data: JsonValue,
}

impl TransportResponse {
    pub fn new(status: StatusCode, data: JsonValue) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The caller cancelled the request
    Canceled,
    /// Network, timeout or rejected-status failure
    Failed { message: Option<String> },
}

impl TransportError {
    pub fn failed(message: impl Into<String>) -> Self {
        TransportError::Failed {
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Canceled => write!(f, "canceled"),
            TransportError::Failed { message: Some(msg) } => write!(f, "{msg}"),
            TransportError::Failed { message: None } => write!(f, "request failed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Parses a raw body the way browser HTTP clients do: JSON when possible,
/// otherwise the text itself.
pub fn parse_body(body: &[u8]) -> JsonValue {
    if body.iter().all(u8::is_ascii_whitespace) {
        return JsonValue::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(body).into_owned()))
}

/// Message used for timeouts, matched later by the orchestrator
pub fn timeout_message(timeout: Duration) -> String {
    format!("timeout of {}ms exceeded", timeout.as_millis())
}

/// Transport over a shared `reqwest::Client`
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
    accept_any_status: bool,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
            accept_any_status: false,
        }
    }

    /// Builds a client carrying the configured default headers and timeout.
    pub fn from_config(config: &HttpConfig) -> ProKitResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProKitError::Transport(format!("Invalid header name '{name}': {e}")))?;
            let value = http::HeaderValue::from_str(value)
                .map_err(|e| ProKitError::Transport(format!("Invalid header value for '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProKitError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout.map(Duration::from_millis),
            accept_any_status: config.accept_any_status,
        })
    }

    fn build(&self, request: TransportRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(timeout) = request.timeout.or(self.timeout) {
            builder = builder.timeout(timeout);
        }

        match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                        let text = match value {
                            JsonValue::String(s) => s,
                            other => other.to_string(),
                        };
                        form.text(name, text)
                    });
                builder.multipart(form)
            }
        }
    }

    fn classify(&self, err: reqwest::Error, timeout: Option<Duration>) -> TransportError {
        if err.is_timeout() {
            let timeout = timeout.or(self.timeout).unwrap_or_default();
            return TransportError::failed(timeout_message(timeout));
        }
        TransportError::failed(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let timeout = request.timeout;
        let response = self
            .build(request)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        let status = response.status();
        if !self.accept_any_status && !status.is_success() {
            return Err(TransportError::failed(format!(
                "Request failed with status code {}",
                status.as_u16()
            )));
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.classify(e, timeout))?;

        Ok(TransportResponse {
            status,
            headers,
            data: parse_body(&body),
        })
    }
}

/// Wraps a transport so a status validator can mark responses failed.
///
/// When the validator returns a non-empty message, the payload gains
/// `ok: false` and `err: <message>` (non-object payloads are replaced).
pub struct StatusInterceptor {
    inner: Arc<dyn Transport>,
    validator: StatusValidatorFn,
}

impl StatusInterceptor {
    pub fn new(inner: Arc<dyn Transport>, validator: StatusValidatorFn) -> Self {
        Self { inner, validator }
    }
}

#[async_trait]
impl Transport for StatusInterceptor {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut response = self.inner.send(request).await?;

        let err = match (self.validator)(response.status, &response) {
            Some(err) if !err.is_empty() => err,
            _ => return Ok(response),
        };

        log::debug!("Status {} rejected by validator: {err}", response.status);
        let mut data = match std::mem::take(&mut response.data) {
            JsonValue::Object(map) => map,
            _ => JsonMap::new(),
        };
        data.insert("err".to_string(), JsonValue::String(err));
        data.insert("ok".to_string(), JsonValue::Bool(false));
        response.data = JsonValue::Object(data);

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(TransportResponse);

    #[async_trait]
    impl Transport for Fixed {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
            Ok(self.0.clone())
        }
    }

    fn validator() -> StatusValidatorFn {
        Arc::new(|status, _res| match status.as_u16() {
            401 => Some("please log in".to_string()),
            204 => Some(String::new()),
            _ => None,
        })
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(br#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(parse_body(b"plain text"), json!("plain text"));
        assert_eq!(parse_body(b"  \n"), JsonValue::Null);
        assert_eq!(parse_body(b""), JsonValue::Null);
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            timeout_message(Duration::from_secs(5)),
            "timeout of 5000ms exceeded"
        );
    }

    #[tokio::test]
    async fn test_interceptor_marks_failure() {
        let inner = Arc::new(Fixed(TransportResponse::new(
            StatusCode::UNAUTHORIZED,
            json!({"ok": true, "data": 1}),
        )));
        let transport = StatusInterceptor::new(inner, validator());
        let res = transport
            .send(TransportRequest::new(Method::GET, "http://x"))
            .await
            .unwrap();
        assert_eq!(res.data, json!({"ok": false, "err": "please log in", "data": 1}));
    }

    #[tokio::test]
    async fn test_interceptor_replaces_non_object_payload() {
        let inner = Arc::new(Fixed(TransportResponse::new(
            StatusCode::UNAUTHORIZED,
            json!("denied"),
        )));
        let transport = StatusInterceptor::new(inner, validator());
        let res = transport
            .send(TransportRequest::new(Method::GET, "http://x"))
            .await
            .unwrap();
        assert_eq!(res.data, json!({"ok": false, "err": "please log in"}));
    }

    #[tokio::test]
    async fn test_interceptor_passes_through() {
        for status in [StatusCode::OK, StatusCode::NO_CONTENT] {
            let inner = Arc::new(Fixed(TransportResponse::new(status, json!({"ok": true}))));
            let transport = StatusInterceptor::new(inner, validator());
            let res = transport
                .send(TransportRequest::new(Method::GET, "http://x"))
                .await
                .unwrap();
            assert_eq!(res.data, json!({"ok": true}));
        }
    }

    #[test]
    fn test_reqwest_transport_from_config() {
        let mut config = HttpConfig::default();
        config.headers.insert("x-app".to_string(), "prokit".to_string());
        assert!(ReqwestTransport::from_config(&config).is_ok());

        config
            .headers
            .insert("bad header".to_string(), "v".to_string());
        assert!(matches!(
            ReqwestTransport::from_config(&config),
            Err(ProKitError::Transport(_))
        ));
    }
}
