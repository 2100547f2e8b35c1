use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{Transport, TransportResponse};
use crate::config::RunConfig;
use crate::errors::FuzzError;

/// JSON-over-HTTP POST transport with a minimum gap between requests.
pub struct HttpTransport {
    client: Client,
    headers: BTreeMap<String, String>,
    proxy: Option<String>,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpTransport {
    pub fn new(config: &RunConfig) -> Result<Self, FuzzError> {
        let mut headers = config.headers.clone();
        headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
        if let Some(auth) = &config.authorization {
            headers.insert(AUTHORIZATION.to_string(), auth.clone());
        }

        let mut header_map = HeaderMap::new();
        for (name, value) in &headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FuzzError::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| FuzzError::Config(format!("Invalid value for header '{}': {}", name, e)))?;
            header_map.insert(header_name, header_value);
        }

        let mut builder = Client::builder()
            .default_headers(header_map)
            .timeout(config.request_timeout);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| FuzzError::Config(format!("Invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| FuzzError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            headers,
            proxy: config.proxy.clone(),
            min_interval: config.time_between_requests,
            last_request: Mutex::new(None),
        })
    }

    /// Best-effort JSON parse; anything else becomes a single GraphQL error.
    fn parse_body(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|_| json!({ "errors": [{ "message": text }] }))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_request(&self, url: &str, payload: &str) -> Result<TransportResponse, FuzzError> {
        // Held across the request so calls stay strictly sequential
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());

        trace!(url = %url, payload = %payload, "Sending request");
        let resp = self
            .client
            .post(url)
            .json(&json!({ "query": payload }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FuzzError::Timeout(format!("Request to {} timed out: {}", url, e))
                } else {
                    FuzzError::Network(format!("Request to {} failed: {}", url, e))
                }
            })?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| FuzzError::Network(format!("Failed to read response body: {}", e)))?;
        debug!(status, bytes = text.len(), "Received response");

        Ok(TransportResponse::new(status, Self::parse_body(&text)))
    }

    fn headers(&self) -> BTreeMap<String, String> {
        self.headers.clone()
    }

    fn proxy(&self) -> Option<String> {
        self.proxy.clone()
    }
}
