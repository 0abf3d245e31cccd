//! Record types for the ServiceNow `incident` table.
//!
//! # Design
//! Wire names are fixed by the instance's schema and are kept verbatim through
//! `#[serde(rename)]`. Every field is optional: the instance fills in what it
//! owns (`sys_id`, `number`, `priority`) and callers only send what they set.
//! A field that is `None` or empty is left out of the outgoing JSON entirely,
//! so an update never blanks a value it did not mean to touch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a row in another table, as the instance returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub link: String,
    pub value: String,
}

/// A field that is either a plain display string or a reference object.
///
/// Decoding tries the reference object first and falls back to a string.
/// Encoding writes back whichever form is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkedValue {
    Link(Reference),
    Display(String),
}

impl LinkedValue {
    /// The sys_id of the referenced row, or the display string.
    pub fn value(&self) -> &str {
        match self {
            LinkedValue::Link(reference) => &reference.value,
            LinkedValue::Display(text) => text,
        }
    }
}

impl From<&str> for LinkedValue {
    fn from(text: &str) -> Self {
        LinkedValue::Display(text.to_string())
    }
}

impl From<String> for LinkedValue {
    fn from(text: String) -> Self {
        LinkedValue::Display(text)
    }
}

/// A numeric field kept as text.
///
/// Instances return choice fields like `impact` as quoted strings, some
/// integrations send bare numbers. The value is never parsed into an integer
/// and is written back in the representation it arrived in; bare numbers keep
/// their literal text (`1e0`, `1.50`) through serde_json's
/// `arbitrary_precision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericText {
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for NumericText {
    fn from(text: &str) -> Self {
        NumericText::Text(text.to_string())
    }
}

impl From<u64> for NumericText {
    fn from(n: u64) -> Self {
        NumericText::Number(n.into())
    }
}

impl fmt::Display for NumericText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericText::Number(n) => write!(f, "{n}"),
            NumericText::Text(text) => f.write_str(text),
        }
    }
}

/// Values that count as "not set" when empty.
trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for LinkedValue {
    fn is_blank(&self) -> bool {
        self.value().is_empty()
    }
}

impl Blank for NumericText {
    fn is_blank(&self) -> bool {
        matches!(self, NumericText::Text(text) if text.is_empty())
    }
}

fn is_unset<T: Blank>(field: &Option<T>) -> bool {
    field.as_ref().map_or(true, Blank::is_blank)
}

/// One row of the `incident` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub assignment_group: Option<LinkedValue>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub contact_type: Option<String>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub caller_id: Option<LinkedValue>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub comments: Option<String>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub description: Option<String>,

    /// Correlation token set by the caller before creation.
    #[serde(
        rename = "u_other_reference_1",
        default,
        skip_serializing_if = "is_unset"
    )]
    pub group_key: Option<String>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub impact: Option<NumericText>,

    /// Human-readable ticket number, assigned by the instance.
    #[serde(default, skip_serializing_if = "is_unset")]
    pub number: Option<String>,

    /// Computed by the instance from impact and urgency.
    #[serde(default, skip_serializing_if = "is_unset")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub short_description: Option<String>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub state: Option<NumericText>,

    /// Primary key, assigned by the instance on creation.
    #[serde(default, skip_serializing_if = "is_unset")]
    pub sys_id: Option<String>,

    #[serde(default, skip_serializing_if = "is_unset")]
    pub urgency: Option<NumericText>,
}

/// `{"result": ...}` envelope wrapping every table API response.
#[derive(Debug, Clone, Deserialize)]
pub struct TableResponse<T> {
    pub result: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_fields_are_omitted() {
        let body = serde_json::to_value(Incident::default()).unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn empty_fields_are_omitted() {
        let incident = Incident {
            comments: Some(String::new()),
            caller_id: Some(LinkedValue::from("")),
            impact: Some(NumericText::from("")),
            short_description: Some("Disk full".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(&incident).unwrap();
        assert_eq!(body, json!({"short_description": "Disk full"}));
    }

    #[test]
    fn group_key_uses_custom_field_name() {
        let incident = Incident {
            group_key: Some("alertgroup-42".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(&incident).unwrap();
        assert_eq!(body, json!({"u_other_reference_1": "alertgroup-42"}));
    }

    #[test]
    fn missing_fields_decode_as_unset() {
        let incident: Incident = serde_json::from_str(r#"{"number":"INC0001"}"#).unwrap();
        assert_eq!(incident.number.as_deref(), Some("INC0001"));
        assert!(incident.sys_id.is_none());
        assert!(incident.assignment_group.is_none());
        assert!(incident.impact.is_none());
    }

    #[test]
    fn null_fields_decode_as_unset() {
        let incident: Incident =
            serde_json::from_str(r#"{"caller_id":null,"state":null}"#).unwrap();
        assert!(incident.caller_id.is_none());
        assert!(incident.state.is_none());
    }

    #[test]
    fn linked_value_prefers_reference_object() {
        let v: LinkedValue = serde_json::from_value(json!({
            "link": "https://acme.service-now.com/api/now/table/sys_user_group/abc",
            "value": "abc"
        }))
        .unwrap();
        assert!(matches!(v, LinkedValue::Link(_)));
        assert_eq!(v.value(), "abc");
    }

    #[test]
    fn linked_value_falls_back_to_string() {
        let v: LinkedValue = serde_json::from_value(json!("Service Desk")).unwrap();
        assert_eq!(v, LinkedValue::Display("Service Desk".to_string()));
    }

    #[test]
    fn linked_value_encodes_held_variant() {
        let link = LinkedValue::Link(Reference {
            link: "https://x/y".to_string(),
            value: "y".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            json!({"link": "https://x/y", "value": "y"})
        );
        assert_eq!(
            serde_json::to_value(LinkedValue::from("Network")).unwrap(),
            json!("Network")
        );
    }

    #[test]
    fn numeric_text_keeps_quoted_form() {
        let incident: Incident = serde_json::from_str(r#"{"impact":"2","urgency":3}"#).unwrap();
        assert_eq!(incident.impact, Some(NumericText::Text("2".to_string())));
        assert_eq!(incident.urgency, Some(NumericText::from(3u64)));

        let body = serde_json::to_value(&incident).unwrap();
        assert_eq!(body, json!({"impact": "2", "urgency": 3}));
    }

    #[test]
    fn numeric_text_keeps_number_literal() {
        for raw in [
            r#"{"impact":1e0}"#,
            r#"{"impact":1.50}"#,
            r#"{"impact":100000000000000000000000}"#,
        ] {
            let incident: Incident = serde_json::from_str(raw).unwrap();
            assert!(matches!(incident.impact, Some(NumericText::Number(_))), "{raw}");
            assert_eq!(serde_json::to_string(&incident).unwrap(), raw);
        }
    }

    #[test]
    fn numeric_text_displays_number_literal() {
        let v: NumericText = serde_json::from_str("1.50").unwrap();
        assert_eq!(v.to_string(), "1.50");
    }

    #[test]
    fn numeric_text_displays_raw_text() {
        assert_eq!(NumericText::from("07").to_string(), "07");
        assert_eq!(NumericText::from(1u64).to_string(), "1");
    }

    #[test]
    fn envelope_with_empty_list_decodes() {
        let resp: TableResponse<Vec<Incident>> = serde_json::from_str(r#"{"result":[]}"#).unwrap();
        assert!(resp.result.is_empty());
    }
}
