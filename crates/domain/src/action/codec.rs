//! Encodings of a [`SubActionImpl`]: JSON object, wire message and stored row.
//!
//! The wire message and the row share one binary payload: a bincode-encoded
//! [`TypedPayload`] whose `type_code` must match the implementation decoding
//! it, wrapping the bincode-encoded record of the variant.

use bincode::config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{DecodeError, HearthError};
use crate::id::{ActionId, DeviceId};

use super::sub_action::{SubActionImpl, SubActionKind};

/// Sub-action as exchanged with clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubActionMessage {
    pub action_type: u64,
    pub timeout_ms: u64,
    pub transition: bool,
    pub data: Vec<u8>,
}

/// Sub-action as persisted by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubActionRow {
    pub action_type: u64,
    pub data: Vec<u8>,
    /// Milliseconds.
    pub timeout: u64,
    pub transition: bool,
}

#[derive(Serialize, Deserialize)]
struct TypedPayload {
    type_code: u64,
    body: Vec<u8>,
}

// Binary records. `value` travels as JSON text because bincode is not
// self-describing.
#[derive(Serialize, Deserialize)]
struct DeviceSetRecord {
    device_id: u64,
    property: String,
    value: String,
}

#[derive(Serialize, Deserialize)]
struct DeviceToggleRecord {
    device_id: u64,
    property: String,
}

#[derive(Serialize, Deserialize)]
struct NotificationRecord {
    category: i32,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct RecursiveActionRecord {
    action_id: u64,
}

#[derive(Deserialize)]
struct JsonHeader {
    #[serde(rename = "type")]
    type_code: Option<u64>,
    #[serde(default)]
    timeout: u64,
    #[serde(default)]
    transition: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceSetJson {
    device_id: DeviceId,
    property: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceToggleJson {
    device_id: DeviceId,
    property: String,
}

#[derive(Deserialize)]
struct NotificationJson {
    category: i32,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecursiveActionJson {
    action_id: ActionId,
}

impl SubActionImpl {
    /// JSON object with a `type` discriminant and the variant fields.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = json!({
            "type": self.type_code(),
            "timeout": self.timeout_ms(),
            "transition": self.transition,
        });
        match &self.kind {
            SubActionKind::DeviceSet {
                device_id,
                property,
                value: target,
            } => {
                value["deviceId"] = json!(device_id);
                value["property"] = json!(property);
                value["value"] = target.clone();
            }
            SubActionKind::DeviceToggle {
                device_id,
                property,
            } => {
                value["deviceId"] = json!(device_id);
                value["property"] = json!(property);
            }
            SubActionKind::Notification { category, message } => {
                value["category"] = json!(category);
                value["message"] = json!(message);
            }
            SubActionKind::RecursiveAction { action_id } => {
                value["actionId"] = json!(action_id);
            }
        }
        value
    }

    /// Populate this instance from a JSON object of the same variant.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when a field is missing or malformed, or when the
    /// document's `type` differs from this instance's type code. `self` is
    /// left untouched on error.
    pub fn parse_json(&mut self, json: &serde_json::Value) -> Result<(), DecodeError> {
        let header = JsonHeader::deserialize(json)?;
        if let Some(found) = header.type_code {
            self.check_type(found)?;
        }
        let kind = match &self.kind {
            SubActionKind::DeviceSet { .. } => {
                let data = DeviceSetJson::deserialize(json)?;
                SubActionKind::DeviceSet {
                    device_id: data.device_id,
                    property: data.property,
                    value: data.value,
                }
            }
            SubActionKind::DeviceToggle { .. } => {
                let data = DeviceToggleJson::deserialize(json)?;
                SubActionKind::DeviceToggle {
                    device_id: data.device_id,
                    property: data.property,
                }
            }
            SubActionKind::Notification { .. } => {
                let data = NotificationJson::deserialize(json)?;
                SubActionKind::Notification {
                    category: data.category,
                    message: data.message,
                }
            }
            SubActionKind::RecursiveAction { .. } => {
                let data = RecursiveActionJson::deserialize(json)?;
                SubActionKind::RecursiveAction {
                    action_id: data.action_id,
                }
            }
        };
        self.apply(header.timeout, header.transition, kind);
        Ok(())
    }

    /// Wire message carrying the typed binary payload.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Encode`] if the payload cannot be encoded.
    pub fn to_message(&self) -> Result<SubActionMessage, HearthError> {
        Ok(SubActionMessage {
            action_type: self.type_code(),
            timeout_ms: self.timeout_ms(),
            transition: self.transition,
            data: self.encode_payload()?,
        })
    }

    /// Populate this instance from a wire message.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the message or its payload carries another
    /// type code, or the payload is malformed.
    pub fn parse_message(&mut self, message: &SubActionMessage) -> Result<(), DecodeError> {
        self.check_type(message.action_type)?;
        let kind = self.decode_payload(&message.data)?;
        self.apply(message.timeout_ms, message.transition, kind);
        Ok(())
    }

    /// Row representation for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Encode`] if the payload cannot be encoded.
    pub fn to_row(&self) -> Result<SubActionRow, HearthError> {
        Ok(SubActionRow {
            action_type: self.type_code(),
            data: self.encode_payload()?,
            timeout: self.timeout_ms(),
            transition: self.transition,
        })
    }

    /// Populate this instance from a stored row.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SubActionImpl::parse_message`].
    pub fn parse_row(&mut self, row: &SubActionRow) -> Result<(), DecodeError> {
        self.check_type(row.action_type)?;
        let kind = self.decode_payload(&row.data)?;
        self.apply(row.timeout, row.transition, kind);
        Ok(())
    }

    fn apply(&mut self, timeout_ms: u64, transition: bool, kind: SubActionKind) {
        self.timeout = std::time::Duration::from_millis(timeout_ms);
        self.transition = transition;
        self.kind = kind;
    }

    fn check_type(&self, found: u64) -> Result<(), DecodeError> {
        if found == self.type_code() {
            Ok(())
        } else {
            Err(DecodeError::TypeMismatch {
                expected: self.type_code(),
                found,
            })
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        let body = match &self.kind {
            SubActionKind::DeviceSet {
                device_id,
                property,
                value,
            } => encode(&DeviceSetRecord {
                device_id: device_id.value(),
                property: property.clone(),
                value: value.to_string(),
            })?,
            SubActionKind::DeviceToggle {
                device_id,
                property,
            } => encode(&DeviceToggleRecord {
                device_id: device_id.value(),
                property: property.clone(),
            })?,
            SubActionKind::Notification { category, message } => encode(&NotificationRecord {
                category: *category,
                message: message.clone(),
            })?,
            SubActionKind::RecursiveAction { action_id } => encode(&RecursiveActionRecord {
                action_id: action_id.value(),
            })?,
        };
        encode(&TypedPayload {
            type_code: self.type_code(),
            body,
        })
    }

    fn decode_payload(&self, data: &[u8]) -> Result<SubActionKind, DecodeError> {
        let payload: TypedPayload = decode(data)?;
        self.check_type(payload.type_code)?;
        let kind = match &self.kind {
            SubActionKind::DeviceSet { .. } => {
                let record: DeviceSetRecord = decode(&payload.body)?;
                SubActionKind::DeviceSet {
                    device_id: DeviceId::new(record.device_id),
                    property: record.property,
                    value: serde_json::from_str(&record.value)?,
                }
            }
            SubActionKind::DeviceToggle { .. } => {
                let record: DeviceToggleRecord = decode(&payload.body)?;
                SubActionKind::DeviceToggle {
                    device_id: DeviceId::new(record.device_id),
                    property: record.property,
                }
            }
            SubActionKind::Notification { .. } => {
                let record: NotificationRecord = decode(&payload.body)?;
                SubActionKind::Notification {
                    category: record.category,
                    message: record.message,
                }
            }
            SubActionKind::RecursiveAction { .. } => {
                let record: RecursiveActionRecord = decode(&payload.body)?;
                SubActionKind::RecursiveAction {
                    action_id: ActionId::new(record.action_id),
                }
            }
        };
        Ok(kind)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::error::EncodeError> {
    bincode::serde::encode_to_vec(value, config::standard())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, config::standard())?;
    if read != bytes.len() {
        return Err(DecodeError::InvalidField {
            field: "data",
            reason: format!("{} trailing bytes", bytes.len() - read),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn samples() -> Vec<SubActionImpl> {
        vec![
            SubActionImpl::device_set(DeviceId::new(3), "brightness", json!({"level": 80}))
                .with_timeout(Duration::from_millis(1500))
                .with_transition(true),
            SubActionImpl::device_toggle(DeviceId::new(4), "on"),
            SubActionImpl::notification(2, "door opened").with_timeout(Duration::from_secs(5)),
            SubActionImpl::recursive_action(ActionId::new(11)),
        ]
    }

    fn blank(type_code: u64, sample: &SubActionImpl) -> SubActionImpl {
        let kind = match sample.kind {
            SubActionKind::DeviceSet { .. } => SubActionKind::DeviceSet {
                device_id: DeviceId::default(),
                property: String::new(),
                value: serde_json::Value::Null,
            },
            SubActionKind::DeviceToggle { .. } => SubActionKind::DeviceToggle {
                device_id: DeviceId::default(),
                property: String::new(),
            },
            SubActionKind::Notification { .. } => SubActionKind::Notification {
                category: 0,
                message: String::new(),
            },
            SubActionKind::RecursiveAction { .. } => SubActionKind::RecursiveAction {
                action_id: ActionId::default(),
            },
        };
        SubActionImpl::new(type_code, kind)
    }

    #[test]
    fn should_restore_every_variant_from_each_encoding() {
        for sample in samples() {
            let mut from_json = blank(sample.type_code(), &sample);
            from_json.parse_json(&sample.to_json()).unwrap();

            let mut from_message = blank(sample.type_code(), &sample);
            from_message
                .parse_message(&sample.to_message().unwrap())
                .unwrap();

            let mut from_row = blank(sample.type_code(), &sample);
            from_row.parse_row(&sample.to_row().unwrap()).unwrap();

            assert_eq!(from_json, sample);
            assert_eq!(from_message, sample);
            assert_eq!(from_row, sample);
        }
    }

    #[test]
    fn should_emit_camel_case_json_fields() {
        let json = SubActionImpl::device_set(DeviceId::new(3), "on", true).to_json();
        assert_eq!(
            json,
            json!({
                "type": 0,
                "timeout": 0,
                "transition": false,
                "deviceId": 3,
                "property": "on",
                "value": true,
            })
        );
    }

    #[test]
    fn should_default_timeout_and_transition_when_absent_from_json() {
        let mut sub = blank(2, &SubActionImpl::notification(0, ""));
        sub.parse_json(&json!({"type": 2, "category": 1, "message": "hi"}))
            .unwrap();
        assert_eq!(sub.timeout, Duration::ZERO);
        assert!(!sub.transition);
    }

    #[test]
    fn should_reject_json_with_missing_field() {
        let mut sub = blank(5, &SubActionImpl::recursive_action(ActionId::new(1)));
        let before = sub.clone();
        let result = sub.parse_json(&json!({"type": 5}));
        assert!(matches!(result, Err(DecodeError::Json(_))));
        assert_eq!(sub, before);
    }

    #[test]
    fn should_reject_message_with_other_type_code() {
        let notification = SubActionImpl::notification(1, "x").to_message().unwrap();
        let mut toggle = blank(1, &SubActionImpl::device_toggle(DeviceId::new(1), "on"));
        let result = toggle.parse_message(&notification);
        assert!(matches!(
            result,
            Err(DecodeError::TypeMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn should_reject_row_whose_payload_belongs_to_another_variant() {
        let notification = SubActionImpl::notification(1, "x").to_row().unwrap();
        let forged = SubActionRow {
            action_type: 1,
            ..notification
        };
        let mut toggle = blank(1, &SubActionImpl::device_toggle(DeviceId::new(1), "on"));
        assert!(matches!(
            toggle.parse_row(&forged),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn should_reject_truncated_payload() {
        let mut row = SubActionImpl::device_toggle(DeviceId::new(1), "on")
            .to_row()
            .unwrap();
        row.data.truncate(row.data.len() / 2);
        let mut toggle = blank(1, &SubActionImpl::device_toggle(DeviceId::new(1), "on"));
        assert!(toggle.parse_row(&row).is_err());
    }
}
