use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Certificate, CertificateRequest};

/// Fields a plain JSON request must carry, in reporting order.
pub const PLAINTEXT_REQUIRED: &[&str] = &["certificateId", "name", "email"];

/// Fields a decrypted payload must carry, in reporting order.
pub const ENCRYPTED_REQUIRED: &[&str] = &["certificateId", "userId", "name", "email"];

const STRING_FIELDS: &[&str] = &["certificateId", "userId", "name", "email"];
const TIMESTAMP_FIELDS: &[&str] = &["issueDate", "expiryDate"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid certificateId {0:?}: use up to 128 letters, digits, '.', '_' or '-', starting with a letter or digit")]
    InvalidCertificateId(String),

    #[error("Invalid {field}: {value:?} is not a recognised date")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Field {field} contains characters the certificate font cannot print: {chars}")]
    UnprintableCharacters { field: &'static str, chars: String },

    #[error("expiryDate must not be earlier than issueDate")]
    ExpiryBeforeIssue,

    #[error("Malformed certificate data: {0}")]
    Malformed(String),
}

/// Check `body` against `required` (first missing field wins), then build the record.
pub fn validate(
    body: Value,
    required: &[&'static str],
    now: DateTime<Utc>,
) -> Result<Certificate, ValidationError> {
    let Value::Object(object) = body else {
        return Err(ValidationError::NotAnObject);
    };

    if let Some(field) = required.iter().copied().find(|f| is_missing(&object, f)) {
        return Err(ValidationError::MissingField(field));
    }
    check_types(&object)?;

    let request: CertificateRequest = serde_json::from_value(Value::Object(object))
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    request.into_certificate(now)
}

fn is_missing(object: &Map<String, Value>, field: &str) -> bool {
    match object.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn check_types(object: &Map<String, Value>) -> Result<(), ValidationError> {
    for field in STRING_FIELDS.iter().copied() {
        match object.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => {
                return Err(ValidationError::InvalidType {
                    field,
                    expected: "a string",
                })
            }
        }
    }
    for field in TIMESTAMP_FIELDS.iter().copied() {
        match object.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(Value::Number(n)) if n.is_i64() => {}
            Some(_) => {
                return Err(ValidationError::InvalidType {
                    field,
                    expected: "an ISO-8601 string or epoch milliseconds",
                })
            }
        }
    }
    Ok(())
}
