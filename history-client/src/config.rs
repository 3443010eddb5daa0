use std::time::Duration;

use reqwest::Url;

use crate::ApiError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the hospital API lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub tenant_id: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Validate `base_url` (http or https only) and strip its trailing slash.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let cleaned = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(cleaned)
            .map_err(|err| ApiError::Config(format!("invalid base URL '{cleaned}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "base URL must use http or https, got {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: cleaned.to_string(),
            auth_token: None,
            tenant_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into()).filter(|token: &String| !token.trim().is_empty());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant.into()).filter(|tenant: &String| !tenant.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
