//! Process-wide initialization.
//!
//! - Logger setup (`env_logger`, plain or JSON lines)
//! - The `rustls` crypto provider

mod logger;

use rustls::crypto::{ring::default_provider, CryptoProvider};

pub use logger::init_logger_with;

/// Installs `ring` as the process-wide `rustls` crypto provider.
///
/// Must run before the first TLS connection. Installing twice is harmless.
pub fn init_crypto_provider() {
    let _ = CryptoProvider::install_default(default_provider());
}
