/// API Client: the single point of entry for every backend call the console makes.
///
/// Every page orchestrator goes through `ApiClient`; nothing else talks to
/// the backend. Each call gets a per-attempt timeout, a small fixed retry
/// budget, and a uniform error shape.
use std::time::Duration;

use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    multipart::{Form, Part},
    Client, Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::errors::ApiError;
use crate::files::FileCandidate;

pub mod endpoints;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_RETRIES: u32 = 2;
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Which failures earn another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Any failure is retried, including 4xx responses.
    #[default]
    Always,
    /// Only network errors, timeouts, 5xx and 429.
    TransientOnly,
}

impl RetryPolicy {
    pub fn should_retry(self, err: &ApiError) -> bool {
        match self {
            RetryPolicy::Always => true,
            RetryPolicy::TransientOnly => err.is_transient(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
            retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            retry_policy: RetryPolicy::Always,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Sent as `multipart/form-data` under the given field name.
    File { field: String, file: FileCandidate },
}

/// Method, body and extra headers for one logical call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    body: RequestBody,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get() -> Self {
        Self::new(Method::GET, RequestBody::Empty)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE, RequestBody::Empty)
    }

    pub fn post_json<T: Serialize>(body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self::new(Method::POST, RequestBody::Json(value)))
    }

    pub fn post_file(field: impl Into<String>, file: FileCandidate) -> Self {
        Self::new(
            Method::POST,
            RequestBody::File {
                field: field.into(),
                file,
            },
        )
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn new(method: Method, body: RequestBody) -> Self {
        Self {
            method,
            body,
            headers: Vec::new(),
        }
    }
}

/// A response body: JSON when it parses, otherwise the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Json(Value),
    Text(String),
}

impl ApiPayload {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => ApiPayload::Json(value),
            Err(_) => ApiPayload::Text(text),
        }
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            ApiPayload::Json(value) => {
                serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
            }
            ApiPayload::Text(text) => Err(ApiError::Decode(format!(
                "expected JSON, got text: {}",
                preview(&text)
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    options: ClientOptions,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("resumatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs `request` against `endpoint`, retrying per the client's policy.
    pub async fn call(&self, endpoint: &str, request: &ApiRequest) -> Result<ApiPayload, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&url, request).await {
                Ok(payload) => {
                    debug!(method = %request.method, endpoint, attempt, "API call succeeded");
                    return Ok(payload);
                }
                Err(err)
                    if attempt < self.options.retries
                        && self.options.retry_policy.should_retry(&err) =>
                {
                    attempt += 1;
                    warn!(
                        method = %request.method,
                        endpoint,
                        "API call failed, retrying in {}ms ({attempt}/{}): {err}",
                        self.options.retry_delay.as_millis(),
                        self.options.retries
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(err) => {
                    error!(method = %request.method, endpoint, "API call failed after retries: {err}");
                    return Err(err);
                }
            }
        }
    }

    /// Calls `endpoint` and deserializes the JSON body into `T`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        self.call(endpoint, request).await?.into_typed()
    }

    async fn attempt(&self, url: &str, request: &ApiRequest) -> Result<ApiPayload, ApiError> {
        let timeout = self.options.timeout;
        match tokio::time::timeout(timeout, self.send_once(url, request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    async fn send_once(&self, url: &str, request: &ApiRequest) -> Result<ApiPayload, ApiError> {
        let mut builder = self.client.request(request.method.clone(), url);

        builder = match &request.body {
            RequestBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            RequestBody::Json(value) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(value.to_string()),
            // No content type here: the transport writes the multipart boundary.
            RequestBody::File { field, file } => builder.multipart(multipart_form(field, file)?),
        };

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Request(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Request(format!("invalid header value: {e}")))?;
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(ApiPayload::from_text(text))
    }
}

fn multipart_form(field: &str, file: &FileCandidate) -> Result<Form, ApiError> {
    // `Bytes` clones share the buffer, so each retry reuses the same allocation.
    let part = Part::stream_with_length(file.bytes().clone(), file.size())
        .file_name(file.filename().to_string())
        .mime_str(file.mime())
        .map_err(|e| ApiError::Request(format!("invalid MIME type '{}': {e}", file.mime())))?;
    Ok(Form::new().part(field.to_string(), part))
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() > LIMIT {
        let mut cut: String = text.chars().take(LIMIT).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}
