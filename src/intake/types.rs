use serde::Deserialize;

use crate::error_handling::types::IntakeError;
use crate::storage::types::CaptureRecord;

/// Body of an inbound trigger, as received.
///
/// Both fields are optional at this stage so that a missing field and an empty
/// one are rejected the same way by [`TriggerPayload::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerPayload {
    pub key: Option<String>,
    pub description: Option<String>,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub key: String,
    pub description: String,
}

impl TriggerPayload {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            description: Some(description.into()),
        }
    }

    pub fn validate(self) -> Result<Trigger, IntakeError> {
        let key = required(self.key, "key")?;
        let description = required(self.description, "description")?;
        Ok(Trigger { key, description })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, IntakeError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(IntakeError::InvalidPayload(format!("`{}` is empty", field))),
        None => Err(IntakeError::InvalidPayload(format!("`{}` is missing", field))),
    }
}

/// Result of handling one trigger end to end.
#[derive(Debug)]
pub enum Outcome {
    /// Artifact stored and indexed.
    Accepted(CaptureRecord),
    /// Payload failed validation; nothing was captured or written.
    Rejected(IntakeError),
    Failed(IntakeError),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_payload_passes() {
        let trigger = TriggerPayload::new("ABC-1", "Shipped!").validate().unwrap();
        assert_eq!(trigger.key, "ABC-1");
        assert_eq!(trigger.description, "Shipped!");
    }

    #[test]
    fn empty_and_missing_fields_are_rejected() {
        let empty_key = TriggerPayload::new("", "x");
        let missing_key: TriggerPayload = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        let missing_description: TriggerPayload = serde_json::from_str(r#"{"key":"K"}"#).unwrap();

        for payload in [empty_key, missing_key, missing_description] {
            assert!(matches!(
                payload.validate(),
                Err(IntakeError::InvalidPayload(_))
            ));
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload: TriggerPayload =
            serde_json::from_str(r#"{"key":"K","description":"d","issue":{"id":1}}"#).unwrap();
        assert!(payload.validate().is_ok());
    }
}
