//! Typed operations on the `incident` table.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::client::TableClient;
use crate::error::{ApiError, Result};
use crate::http::Transport;
use crate::types::{Incident, TableResponse};

const INCIDENT_TABLE: &str = "incident";

/// Create, query and update incidents.
///
/// Implemented by `TableClient`; code that files incidents can depend on this
/// trait and substitute a double in its own tests.
pub trait IncidentService {
    /// Create `incident` and return the record as stored by the instance,
    /// including its `number` and `sys_id`.
    fn create_incident(&self, incident: &Incident) -> Result<Incident>;

    /// Incidents matching `params`. An empty result is not an error.
    fn get_incidents(&self, params: &HashMap<String, String>) -> Result<Vec<Incident>>;

    /// Send every set field of `incident` to the record named by its `sys_id`.
    fn update_incident(&self, incident: &Incident) -> Result<Incident>;
}

impl<T: Transport> IncidentService for TableClient<T> {
    fn create_incident(&self, incident: &Incident) -> Result<Incident> {
        tracing::info!("Create a ServiceNow incident");

        let body = encode(incident)?;
        let response = self.create(INCIDENT_TABLE, body).inspect_err(|e| {
            tracing::error!(error = %e, "error while creating the incident");
        })?;
        let created: Incident = decode(&response)?;

        tracing::info!(number = created.number.as_deref().unwrap_or_default(), "Incident created");
        Ok(created)
    }

    fn get_incidents(&self, params: &HashMap<String, String>) -> Result<Vec<Incident>> {
        tracing::info!(?params, "Get ServiceNow incidents");

        let response = self.get(INCIDENT_TABLE, params).inspect_err(|e| {
            tracing::error!(error = %e, "error while getting the incidents");
        })?;
        decode(&response)
    }

    fn update_incident(&self, incident: &Incident) -> Result<Incident> {
        let number = incident.number.as_deref().unwrap_or_default();
        tracing::info!(number, "Update ServiceNow incident");

        let sys_id = match incident.sys_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                tracing::error!(number, "cannot update an incident without sys_id");
                return Err(ApiError::MissingSysId);
            }
        };

        let body = encode(incident)?;
        let response = self
            .update(INCIDENT_TABLE, body, sys_id)
            .inspect_err(|e| {
                tracing::error!(error = %e, sys_id, "error while updating the incident");
            })?;
        let updated: Incident = decode(&response)?;

        tracing::info!(number = updated.number.as_deref().unwrap_or_default(), "Incident updated");
        Ok(updated)
    }
}

fn encode(incident: &Incident) -> Result<Vec<u8>> {
    serde_json::to_vec(incident).map_err(|e| {
        tracing::error!(error = %e, "error while marshalling the incident");
        ApiError::EncodingError(e.to_string())
    })
}

/// Unwrap the `{"result": ...}` envelope.
fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R> {
    serde_json::from_slice::<TableResponse<R>>(body)
        .map(|envelope| envelope.result)
        .map_err(|e| {
            tracing::error!(error = %e, "error while unmarshalling the incident");
            ApiError::DecodingError(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client, RecordingTransport};
    use crate::http::HttpMethod;
    use crate::types::{LinkedValue, NumericText};

    fn new_incident() -> Incident {
        Incident {
            short_description: Some("Database unreachable".to_string()),
            group_key: Some("alertgroup-7".to_string()),
            impact: Some(NumericText::from("2")),
            urgency: Some(NumericText::from("2")),
            assignment_group: Some(LinkedValue::from("Database")),
            ..Default::default()
        }
    }

    #[test]
    fn create_returns_assigned_identifiers() {
        let c = client(RecordingTransport::replying(
            201,
            r#"{"result":{"number":"INC0001","sys_id":"abc123","priority":"3","impact":"2"}}"#,
        ));
        let created = c.create_incident(&new_incident()).unwrap();
        assert_eq!(created.number.as_deref(), Some("INC0001"));
        assert_eq!(created.sys_id.as_deref(), Some("abc123"));
        assert_eq!(created.priority.as_deref(), Some("3"));
    }

    #[test]
    fn create_sends_only_set_fields() {
        let c = client(RecordingTransport::replying(201, r#"{"result":{}}"#));
        c.create_incident(&new_incident()).unwrap();

        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Post);
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "short_description": "Database unreachable",
                "u_other_reference_1": "alertgroup-7",
                "impact": "2",
                "urgency": "2",
                "assignment_group": "Database"
            })
        );
    }

    #[test]
    fn create_on_server_error_skips_body() {
        let c = client(RecordingTransport::replying(500, "<html>not json</html>"));
        let err = c.create_incident(&new_incident()).unwrap_err();
        assert!(matches!(err, ApiError::RemoteError { status: 500 }));
    }

    #[test]
    fn create_with_malformed_envelope_is_decoding_error() {
        let c = client(RecordingTransport::replying(201, r#"{"records":[]}"#));
        let err = c.create_incident(&new_incident()).unwrap_err();
        assert!(matches!(err, ApiError::DecodingError(_)));
    }

    #[test]
    fn get_with_empty_result_is_empty_vec() {
        let c = client(RecordingTransport::replying(200, r#"{"result":[]}"#));
        let incidents = c.get_incidents(&HashMap::new()).unwrap();
        assert!(incidents.is_empty());
    }

    #[test]
    fn get_decodes_every_record() {
        let c = client(RecordingTransport::replying(
            200,
            r#"{"result":[
                {"number":"INC0001","caller_id":{
                    "link":"https://acme.service-now.com/api/now/table/sys_user/u1",
                    "value":"u1"
                }},
                {"number":"INC0002","caller_id":""}
            ]}"#,
        ));
        let incidents = c.get_incidents(&HashMap::new()).unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].caller_id.as_ref().map(LinkedValue::value), Some("u1"));
        assert_eq!(incidents[1].caller_id, Some(LinkedValue::Display(String::new())));
    }

    #[test]
    fn get_passes_params_in_query() {
        let c = client(RecordingTransport::replying(200, r#"{"result":[]}"#));
        let params = HashMap::from([
            ("active".to_string(), "true".to_string()),
            ("priority".to_string(), "1".to_string()),
        ]);
        c.get_incidents(&params).unwrap();

        let req = c.transport().last_request();
        let (path, query) = req.url.split_once('?').unwrap();
        assert!(path.ends_with("/api/now/v2/table/incident"));
        assert_eq!(query.matches("active=true").count(), 1);
        assert_eq!(query.matches("priority=1").count(), 1);
        assert_eq!(query.split('&').count(), 2);
    }

    #[test]
    fn update_targets_sys_id_path() {
        let c = client(RecordingTransport::replying(
            200,
            r#"{"result":{"number":"INC0001","sys_id":"abc123","state":"2"}}"#,
        ));
        let incident = Incident {
            sys_id: Some("abc123".to_string()),
            number: Some("INC0001".to_string()),
            state: Some(NumericText::from("2")),
            ..Default::default()
        };
        let updated = c.update_incident(&incident).unwrap();
        assert_eq!(updated.state, Some(NumericText::from("2")));

        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.url.ends_with("/incident/abc123"));
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["sys_id"], "abc123");
        assert_eq!(body["state"], "2");
    }

    #[test]
    fn update_without_sys_id_sends_nothing() {
        let c = client(RecordingTransport::replying(200, r#"{"result":{}}"#));
        let err = c.update_incident(&new_incident()).unwrap_err();
        assert!(matches!(err, ApiError::MissingSysId));
        assert!(c.transport().requests.borrow().is_empty());
    }

    #[test]
    fn update_transport_failure_is_transport_error() {
        let c = client(RecordingTransport::failing("connection reset"));
        let incident = Incident {
            sys_id: Some("abc123".to_string()),
            ..Default::default()
        };
        let err = c.update_incident(&incident).unwrap_err();
        assert!(matches!(err, ApiError::TransportError(_)));
    }
}
