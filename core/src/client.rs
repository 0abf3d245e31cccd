//! Authenticated request pipeline for ServiceNow table endpoints.
//!
//! # Design
//! `TableClient` precomputes the instance address and the `Authorization`
//! value at construction and never mutates them afterwards, so one client can
//! be shared across threads whenever its transport can. Each table operation
//! is split into a `build_*` method that produces an `HttpRequest` and a
//! shared `do_request` step that executes it through the owned `Transport`
//! and classifies the outcome. The typed incident operations live in
//! `incident.rs` and sit on top of the byte-level `create` / `get` / `update`.

use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, Transport, UreqTransport};

const TABLE_API_PATH: &[&str] = &["api", "now", "v2", "table"];

/// Blocking client for the table API of one ServiceNow instance.
#[derive(Clone)]
pub struct TableClient<T = UreqTransport> {
    base_url: String,
    endpoint: Url,
    auth_header: String,
    transport: T,
}

impl TableClient<UreqTransport> {
    /// Client for `https://{instance}.service-now.com` over a default
    /// `ureq` agent.
    pub fn new(instance: &str, user_name: &str, password: &str) -> Result<Self> {
        Self::with_transport(instance, user_name, password, UreqTransport::new())
    }
}

impl<T: Transport> TableClient<T> {
    pub fn with_transport(
        instance: &str,
        user_name: &str,
        password: &str,
        transport: T,
    ) -> Result<Self> {
        Self::from_config(&ClientConfig::new(instance, user_name, password), transport)
    }

    pub fn from_config(config: &ClientConfig, transport: T) -> Result<Self> {
        let endpoint = match config.validate().and_then(|()| config.endpoint()) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::error!(error = %e, "invalid ServiceNow client configuration");
                return Err(e);
            }
        };
        Ok(Self {
            base_url: config.base_url(),
            endpoint,
            auth_header: config.auth_header(),
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_create(&self, table: &str, body: Vec<u8>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: self.table_url(&[table]).into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn build_get(&self, table: &str, params: &HashMap<String, String>) -> HttpRequest {
        let mut url = self.table_url(&[table]);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_update(&self, table: &str, body: Vec<u8>, sys_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Put,
            url: self.table_url(&[table, sys_id]).into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Insert a row into `table` from a JSON body. Returns the raw response body.
    pub fn create(&self, table: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        self.do_request(self.build_create(table, body))
    }

    /// Query `table`, passing `params` as query string pairs.
    pub fn get(&self, table: &str, params: &HashMap<String, String>) -> Result<Vec<u8>> {
        self.do_request(self.build_get(table, params))
    }

    /// Replace fields of the row `sys_id` in `table` from a JSON body.
    pub fn update(&self, table: &str, body: Vec<u8>, sys_id: &str) -> Result<Vec<u8>> {
        self.do_request(self.build_update(table, body, sys_id))
    }

    /// Table API address with `segments` appended, each percent-encoded.
    fn table_url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        // Never fails: `ClientConfig::endpoint` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(TABLE_API_PATH).extend(segments);
        }
        url
    }

    fn do_request(&self, mut request: HttpRequest) -> Result<Vec<u8>> {
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        request
            .headers
            .push(("Authorization".to_string(), self.auth_header.clone()));

        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            "sending ServiceNow request"
        );

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "error sending the request");
                return Err(e);
            }
        };

        if response.status >= 400 {
            let err = ApiError::RemoteError {
                status: response.status,
            };
            tracing::error!("{err}");
            return Err(err);
        }

        Ok(response.body)
    }
}

impl<T> fmt::Debug for TableClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
