//! Blocking client for the ServiceNow table API, bound to the `incident` table.
//!
//! # Overview
//! `TableClient` turns table operations into authenticated HTTP requests,
//! runs them through an injected `Transport`, and decodes the
//! `{"result": ...}` envelope into typed records.
//!
//! # Design
//! - Address and credentials are computed once at construction; the client is
//!   immutable afterwards and holds no per-call state.
//! - The transport is owned by the client rather than a process-wide global.
//!   `UreqTransport` is the default; tests substitute a recording double.
//! - Every failure maps to one `ApiError` variant and is logged through
//!   `tracing` before it is returned. There are no retries.
//!
//! ```no_run
//! use servicenow_core::{Incident, IncidentService, TableClient};
//!
//! let client = TableClient::new("acme", "bob", "secret")?;
//! let created = client.create_incident(&Incident {
//!     short_description: Some("Disk full on db-01".to_string()),
//!     group_key: Some("alertgroup-42".to_string()),
//!     ..Default::default()
//! })?;
//! println!("created {}", created.number.unwrap_or_default());
//! # Ok::<(), servicenow_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod incident;
pub mod types;

pub use client::TableClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use incident::IncidentService;
pub use types::{Incident, LinkedValue, NumericText, Reference, TableResponse};
