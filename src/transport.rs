// HTTP transport for SOAP calls
use crate::config::ClientConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use std::time::Duration;

pub const CONTENT_TYPE_XML: &str = r#"text/xml; charset="utf-8""#;

// Fully rendered request, ready to be sent
#[derive(Debug, Clone)]
pub struct SoapRequest {
    pub uri: String,
    pub body: String,
    // (username, password) when Basic auth is enabled
    pub basic_auth: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

// Anything that can POST an XML body and hand back the status and body.
// Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, request: SoapRequest) -> Result<HttpResponse, ApiError>;
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_XML));
    headers.insert(ACCEPT, HeaderValue::from_static("text/xml"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

// reqwest backed transport; owns the connection pool for a client session
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().default_headers(default_headers());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            let timeout_ms = self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
            ApiError::Timeout(timeout_ms)
        } else {
            ApiError::from(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: SoapRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.client.post(&request.uri).body(request.body);
        if let Some((username, password)) = request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        Ok(HttpResponse { status_code, body })
    }
}
