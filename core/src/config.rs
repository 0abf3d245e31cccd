//! Connection settings for a ServiceNow instance.

use std::fmt;

use base64::Engine;
use url::Url;

use crate::error::{ApiError, Result};

/// Everything needed to address and authenticate against one instance.
///
/// Credentials are supplied by the caller; nothing here reads the environment
/// or a file.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Instance name, the `acme` in `acme.service-now.com`.
    pub instance: String,
    pub user_name: String,
    pub password: String,
    /// Replaces the `https://{instance}.service-now.com` address, e.g. for a
    /// proxy in front of the instance.
    pub base_url: Option<String>,
}

impl ClientConfig {
    pub fn new(
        instance: impl Into<String>,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            user_name: user_name.into(),
            password: password.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.instance.is_empty() {
            return Err(ApiError::ConfigurationError("missing instance"));
        }
        if self.user_name.is_empty() {
            return Err(ApiError::ConfigurationError("missing user name"));
        }
        if self.password.is_empty() {
            return Err(ApiError::ConfigurationError("missing password"));
        }
        Ok(())
    }

    /// Address of the instance without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.service-now.com", self.instance),
        }
    }

    /// `base_url` parsed, rejecting anything that cannot carry a path.
    pub fn endpoint(&self) -> Result<Url> {
        match Url::parse(&self.base_url()) {
            Ok(url) if !url.cannot_be_a_base() => Ok(url),
            _ => Err(ApiError::ConfigurationError("base url is not an absolute http address")),
        }
    }

    /// Value for the `Authorization` header.
    pub fn auth_header(&self) -> String {
        let creds = format!("{}:{}", self.user_name, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("instance", &self.instance)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
