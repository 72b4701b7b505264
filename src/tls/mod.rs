//! Leaf certificate retrieval.
//!
//! Connects to `domain:port`, completes a TLS handshake and returns the leaf
//! certificate the server presented, PEM encoded.
//!
//! Uses `tokio-rustls` for the handshake and `x509-parser` to check that the
//! presented bytes are a decodable certificate.

mod pem;
mod verifier;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rustls::pki_types::ServerName;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::error_handling::{FetchError, InitializationError};

pub use pem::{leaf_to_pem, PemCertificate};
use verifier::AcceptAnyCertificate;

/// Upper bound for the `close_notify` exchange after a successful fetch.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a fetch attempt did not yield a certificate.
#[derive(Error, Debug)]
pub enum FetchFailure {
    /// Network or handshake problem; may succeed on another attempt.
    #[error(transparent)]
    Transient(#[from] FetchError),

    /// The server sent bytes that are not an X.509 certificate.
    #[error("Presented certificate could not be decoded: {0}")]
    Parse(String),
}

/// Result of one fetch attempt.
pub type FetchOutcome = Result<PemCertificate, FetchFailure>;

/// Fetches the leaf certificate for a domain.
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> FetchOutcome;
}

/// Whether the presented chain has to verify against the webpki roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Accept any chain and record the certificate as served.
    Collect,
    /// Reject chains that don't verify against `webpki-roots`.
    Verify,
}

impl VerificationMode {
    pub fn from_flag(verify: bool) -> Self {
        if verify {
            VerificationMode::Verify
        } else {
            VerificationMode::Collect
        }
    }
}

/// `CertificateFetcher` over real TCP and TLS connections.
pub struct TlsFetcher {
    connector: TlsConnector,
    port: u16,
    timeout: Duration,
}

impl TlsFetcher {
    /// Builds a fetcher that connects to `port` and bounds the connect and
    /// the handshake by `timeout` each.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::TlsConfigError` if the crypto provider
    /// supports none of the default protocol versions.
    pub fn new(
        mode: VerificationMode,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, InitializationError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder =
            ClientConfig::builder_with_provider(provider.clone()).with_safe_default_protocol_versions()?;

        let config = match mode {
            VerificationMode::Verify => {
                let mut root_store = RootCertStore::empty();
                root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                builder
                    .with_root_certificates(root_store)
                    .with_no_client_auth()
            }
            VerificationMode::Collect => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate::new(&provider)))
                .with_no_client_auth(),
        };

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            port,
            timeout,
        })
    }

    async fn connect(&self, domain: &str) -> Result<TcpStream, FetchError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((domain, self.port))
            .await
            .map_err(|source| FetchError::Dns {
                domain: domain.to_string(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(FetchError::Dns {
                domain: domain.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
            });
        }

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("Connect to {addr} for {domain} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        let source = last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "no address accepted")
        });
        Err(connect_error(domain, self.port, source))
    }
}

/// Local refusals (sandbox policy, bad socket options) are not network
/// failures; everything else the OS reports on connect is.
fn connect_error(domain: &str, port: u16, source: std::io::Error) -> FetchError {
    use std::io::ErrorKind;

    match source.kind() {
        ErrorKind::PermissionDenied
        | ErrorKind::InvalidInput
        | ErrorKind::Unsupported
        | ErrorKind::OutOfMemory => FetchError::Unexpected {
            domain: domain.to_string(),
            reason: format!("connect to port {port} failed: {source}"),
        },
        _ => FetchError::Connect {
            domain: domain.to_string(),
            port,
            source,
        },
    }
}

#[async_trait]
impl CertificateFetcher for TlsFetcher {
    async fn fetch(&self, domain: &str) -> FetchOutcome {
        let secs = self.timeout.as_secs();
        let server_name =
            ServerName::try_from(domain.to_string()).map_err(|e| FetchError::InvalidDomain {
                domain: domain.to_string(),
                reason: e.to_string(),
            })?;

        let stream = match tokio::time::timeout(self.timeout, self.connect(domain)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::ConnectTimeout {
                    domain: domain.to_string(),
                    port: self.port,
                    secs,
                }
                .into())
            }
        };

        let mut tls_stream =
            match tokio::time::timeout(self.timeout, self.connector.connect(server_name, stream))
                .await
            {
                Ok(Ok(tls_stream)) => tls_stream,
                Ok(Err(source)) => {
                    return Err(FetchError::Handshake {
                        domain: domain.to_string(),
                        source,
                    }
                    .into())
                }
                Err(_) => {
                    return Err(FetchError::HandshakeTimeout {
                        domain: domain.to_string(),
                        secs,
                    }
                    .into())
                }
            };

        let leaf = tls_stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| cert.as_ref().to_vec());

        // Best effort; the stream is dropped either way.
        let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, tls_stream.shutdown()).await;

        let der = leaf.ok_or_else(|| FetchError::NoCertificate {
            domain: domain.to_string(),
        })?;

        leaf_to_pem(&der).map_err(FetchFailure::Parse)
    }
}
