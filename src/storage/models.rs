// storage/models.rs
// Certificate record types

use serde::Serialize;
use serde_json::Value;

// JSON pointers into the parser document for the flattened summary columns.
const ISSUER_ORGANIZATION: &str = "/parsed/issuer/organization/0";
const ISSUER_COMMON_NAME: &str = "/parsed/issuer/common_name/0";
const SUBJECT_COMMON_NAME: &str = "/parsed/subject/common_name/0";
const VALIDITY_START: &str = "/parsed/validity/start";
const VALIDITY_END: &str = "/parsed/validity/end";
const SERIAL_NUMBER: &str = "/parsed/serial_number";
const FINGERPRINT_SHA256: &str = "/parsed/fingerprint_sha256";
const SIGNATURE_ALGORITHM: &str = "/parsed/signature_algorithm/name";
const KEY_ALGORITHM: &str = "/parsed/subject_key_info/key_algorithm/name";
const VALIDATION_LEVEL: &str = "/parsed/validation_level";

/// One parsed leaf certificate, keyed by the domain it was fetched from.
///
/// `document` is the parser output kept whole; the other fields are copies of
/// the values reporting queries filter and group on. Missing paths map to
/// `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCertificateRecord {
    pub domain: String,
    pub issuer_organization: Option<String>,
    pub issuer_common_name: Option<String>,
    pub subject_common_name: Option<String>,
    pub validity_start: Option<String>,
    pub validity_end: Option<String>,
    pub serial_number: Option<String>,
    pub fingerprint_sha256: Option<String>,
    pub signature_algorithm: Option<String>,
    pub key_algorithm: Option<String>,
    pub validation_level: Option<String>,
    pub document: Value,
}

impl ParsedCertificateRecord {
    /// Builds a record from the parser's JSON document.
    pub fn from_document(domain: &str, document: Value) -> Self {
        Self {
            domain: domain.to_string(),
            issuer_organization: text_at(&document, ISSUER_ORGANIZATION),
            issuer_common_name: text_at(&document, ISSUER_COMMON_NAME),
            subject_common_name: text_at(&document, SUBJECT_COMMON_NAME),
            validity_start: text_at(&document, VALIDITY_START),
            validity_end: text_at(&document, VALIDITY_END),
            serial_number: text_at(&document, SERIAL_NUMBER),
            fingerprint_sha256: text_at(&document, FINGERPRINT_SHA256),
            signature_algorithm: text_at(&document, SIGNATURE_ALGORITHM),
            key_algorithm: text_at(&document, KEY_ALGORITHM),
            validation_level: text_at(&document, VALIDATION_LEVEL),
            document,
        }
    }
}

/// A certificate row as read back from the store.
#[derive(Debug, Clone)]
pub struct StoredCertificate {
    pub record: ParsedCertificateRecord,
    pub observed_at_ms: i64,
    pub run_id: Option<String>,
}

fn text_at(document: &Value, pointer: &str) -> Option<String> {
    match document.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
