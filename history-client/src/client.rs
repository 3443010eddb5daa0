//! Thin JSON client for the hospital REST API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::{ApiError, ClientConfig};

pub const TENANT_HEADER: &str = "x-tenant-id";

/// JSON verbs against the hospital API. Paths are relative to the base URL.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError>;
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn delete(&self, path: &str) -> Result<Value, ApiError>;
}

/// `ApiClient` over `reqwest`, with auth and tenant headers on every request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| ApiError::Config(format!("invalid auth token: {err}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(tenant) = &config.tenant_id {
            let value = HeaderValue::from_str(tenant)
                .map_err(|err| ApiError::Config(format!("invalid tenant id: {err}")))?;
            headers.insert(HeaderName::from_static(TENANT_HEADER), value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("failed to create HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder, url: String) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "api response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        decode_body(status, &bytes).map_err(|message| ApiError::Decode { url, message })
    }
}

fn decode_body(status: StatusCode, bytes: &[u8]) -> Result<Value, String> {
    if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| err.to_string())
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, ?query, "GET");
        self.send(self.http.get(&url).query(query), url).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, "POST");
        self.send(self.http.post(&url).json(body), url).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, "PUT");
        self.send(self.http.put(&url).json(body), url).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, "PATCH");
        self.send(self.http.patch(&url).json(body), url).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, "DELETE");
        self.send(self.http.delete(&url), url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base_url() {
        let config = ClientConfig::new("https://hms.example.org/api/v1/").unwrap();
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(client.url("/ipd/admissions"), "https://hms.example.org/api/v1/ipd/admissions");
        assert_eq!(client.url("procedures"), "https://hms.example.org/api/v1/procedures");
    }

    #[test]
    fn empty_body_decodes_to_null() {
        assert_eq!(decode_body(StatusCode::OK, b""), Ok(Value::Null));
        assert_eq!(decode_body(StatusCode::OK, b"  \n"), Ok(Value::Null));
        assert_eq!(decode_body(StatusCode::NO_CONTENT, b"ignored"), Ok(Value::Null));
        assert_eq!(decode_body(StatusCode::OK, b"[1]"), Ok(serde_json::json!([1])));
        assert!(decode_body(StatusCode::OK, b"<html>").is_err());
    }

    #[test]
    fn rejects_header_unsafe_token() {
        let config = ClientConfig::new("http://localhost:3000")
            .unwrap()
            .with_token("abc\ndef");
        assert!(matches!(HttpClient::new(&config), Err(ApiError::Config(_))));
    }
}
