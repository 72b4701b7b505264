//! DER to PEM conversion for leaf certificates.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const PEM_LINE_WIDTH: usize = 64;

/// A single certificate in PEM text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemCertificate(String);

impl PemCertificate {
    /// Wraps text that is already PEM encoded.
    pub fn new(pem: impl Into<String>) -> Self {
        Self(pem.into())
    }

    /// Encodes DER bytes as a `CERTIFICATE` PEM block with 64-column lines.
    pub fn from_der(der: &[u8]) -> Self {
        let encoded = STANDARD.encode(der);
        let mut pem = String::with_capacity(encoded.len() + encoded.len() / PEM_LINE_WIDTH + 64);
        pem.push_str("-----BEGIN CERTIFICATE-----\n");
        // base64 output is ASCII, so byte chunks are valid UTF-8
        for line in encoded.as_bytes().chunks(PEM_LINE_WIDTH) {
            pem.push_str(&String::from_utf8_lossy(line));
            pem.push('\n');
        }
        pem.push_str("-----END CERTIFICATE-----\n");
        Self(pem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Checks that `der` decodes as an X.509 certificate and returns it as PEM.
///
/// # Errors
///
/// Returns the decoder's message when the bytes are not a certificate.
pub fn leaf_to_pem(der: &[u8]) -> Result<PemCertificate, String> {
    x509_parser::parse_x509_certificate(der).map_err(|e| e.to_string())?;
    Ok(PemCertificate::from_der(der))
}
