mod validation;

pub use validation::{validate, ValidationError, ENCRYPTED_REQUIRED, PLAINTEXT_REQUIRED};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Validity window applied when the request carries no expiry.
pub const DEFAULT_VALIDITY_DAYS: i64 = 365;

const MAX_ID_LEN: usize = 128;

static ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn id_pattern() -> &'static Regex {
    ID_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

/// A certificate identifier that is safe to use as a file name stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CertificateId(String);

impl CertificateId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() || raw.len() > MAX_ID_LEN || !id_pattern().is_match(raw) {
            return Err(ValidationError::InvalidCertificateId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.0)
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issue/expiry timestamp as sent by clients: an ISO string or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn resolve(&self, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
        let parsed = match self {
            Timestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Timestamp::Text(raw) => parse_text_timestamp(raw),
        };
        parsed.ok_or_else(|| ValidationError::InvalidTimestamp {
            field,
            value: self.to_string(),
        })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Millis(ms) => write!(f, "{}", ms),
            Timestamp::Text(raw) => f.write_str(raw),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Text(value.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }
}

fn parse_text_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Certificate fields as they arrive on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<Timestamp>,
}

impl CertificateRequest {
    /// Resolve defaults and check the fields that do not depend on the intake path.
    pub fn into_certificate(self, now: DateTime<Utc>) -> Result<Certificate, ValidationError> {
        let raw_id = present("certificateId", self.certificate_id)?;
        let id = CertificateId::parse(&raw_id)?;
        let name = present("name", self.name)?;
        printable("name", &name)?;
        let email = present("email", self.email)?;
        let user_id = self
            .user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let issue_date = match self.issue_date {
            Some(ts) => ts.resolve("issueDate")?,
            None => now,
        };
        let expiry_date = match self.expiry_date {
            Some(ts) => ts.resolve("expiryDate")?,
            None => issue_date
                .checked_add_signed(Duration::days(DEFAULT_VALIDITY_DAYS))
                .ok_or_else(|| ValidationError::InvalidTimestamp {
                    field: "issueDate",
                    value: issue_date.to_rfc3339(),
                })?,
        };
        if expiry_date < issue_date {
            return Err(ValidationError::ExpiryBeforeIssue);
        }

        Ok(Certificate {
            id,
            user_id,
            name,
            email,
            issue_date,
            expiry_date,
        })
    }
}

fn present(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

/// Reject text the certificate fonts would silently drop.
fn printable(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let missing = crate::pdf::fonts::unprintable_chars(value);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::UnprintableCharacters {
            field,
            chars: missing.into_iter().collect(),
        })
    }
}

/// A validated certificate record, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_ids() {
        for id in ["CSG-0001", "csg_2025.v2", "A", "0-abc"] {
            assert!(CertificateId::parse(id).is_ok(), "{id} should be accepted");
        }
        assert_eq!(CertificateId::parse("CSG-0001").unwrap().file_name(), "CSG-0001.pdf");
    }

    #[test]
    fn rejects_unsafe_ids() {
        let long = "x".repeat(MAX_ID_LEN + 1);
        for id in ["", "../etc/passwd", "a/b", "a\\b", ".hidden", "..", "has space", "-lead", long.as_str()] {
            assert!(
                matches!(CertificateId::parse(id), Err(ValidationError::InvalidCertificateId(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn parses_timestamp_forms() {
        let iso = Timestamp::Text("2025-01-05T10:30:00.000Z".into()).resolve("issueDate").unwrap();
        assert_eq!(iso.to_rfc3339(), "2025-01-05T10:30:00+00:00");

        let date_only = Timestamp::Text("2025-01-05".into()).resolve("issueDate").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2025-01-05T00:00:00+00:00");

        let offset = Timestamp::Text("2025-01-05T02:00:00+02:00".into()).resolve("issueDate").unwrap();
        assert_eq!(offset.to_rfc3339(), "2025-01-05T00:00:00+00:00");

        let millis = Timestamp::Millis(1_736_035_200_000).resolve("issueDate").unwrap();
        assert_eq!(millis.to_rfc3339(), "2025-01-05T00:00:00+00:00");

        let err = Timestamp::Text("next tuesday".into()).resolve("expiryDate").unwrap_err();
        assert!(err.to_string().contains("expiryDate"));
    }

    #[test]
    fn defaults_dates_from_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        let cert = CertificateRequest {
            certificate_id: Some("CSG-0001".into()),
            name: Some("  Jane Doe ".into()),
            email: Some("jane@example.com".into()),
            ..Default::default()
        }
        .into_certificate(now)
        .unwrap();

        assert_eq!(cert.name, "Jane Doe");
        assert_eq!(cert.issue_date, now);
        assert_eq!(cert.expiry_date, now + Duration::days(365));
        assert_eq!(cert.user_id, None);
    }

    #[test]
    fn expiry_defaults_from_issue_date() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let cert = CertificateRequest {
            certificate_id: Some("CSG-0002".into()),
            name: Some("Jane".into()),
            email: Some("jane@example.com".into()),
            issue_date: Some(Timestamp::Text("2024-03-01".into())),
            ..Default::default()
        }
        .into_certificate(now)
        .unwrap();

        assert_eq!(cert.expiry_date.to_rfc3339(), "2025-03-01T00:00:00+00:00");
    }

    #[test]
    fn rejects_names_the_fonts_cannot_print() {
        let request = |name: &str| CertificateRequest {
            certificate_id: Some("CSG-0004".into()),
            name: Some(name.into()),
            email: Some("jane@example.com".into()),
            ..Default::default()
        };

        let err = request("\u{141}ukasz \u{17b}\u{f3}\u{142}\u{107}")
            .into_certificate(Utc::now())
            .unwrap_err();
        match err {
            ValidationError::UnprintableCharacters { field, chars } => {
                assert_eq!(field, "name");
                assert_eq!(chars, "\u{141}\u{17b}\u{142}\u{107}");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            request("\u{674e}\u{96f7}").into_certificate(Utc::now()),
            Err(ValidationError::UnprintableCharacters { field: "name", .. })
        ));

        let cert = request("Jos\u{e9} N\u{fa}\u{f1}ez").into_certificate(Utc::now()).unwrap();
        assert_eq!(cert.name, "Jos\u{e9} N\u{fa}\u{f1}ez");
    }

    #[test]
    fn rejects_expiry_before_issue() {
        let err = CertificateRequest {
            certificate_id: Some("CSG-0003".into()),
            name: Some("Jane".into()),
            email: Some("jane@example.com".into()),
            issue_date: Some(Timestamp::Text("2025-06-01".into())),
            expiry_date: Some(Timestamp::Text("2025-01-01".into())),
            ..Default::default()
        }
        .into_certificate(Utc::now())
        .unwrap_err();

        assert!(matches!(err, ValidationError::ExpiryBeforeIssue));
    }
}
