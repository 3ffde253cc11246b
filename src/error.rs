//! Error types for connection-key handling and TLS configuration assembly.

use std::io;

use thiserror::Error;

/// Errors that can occur while deriving certificates or assembling TLS
/// configurations from a connection key.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection key is all-zero. The all-zero value is reserved as
    /// invalid and is rejected at every entry point that accepts a key.
    #[error("connection key is all-zero")]
    ZeroKey,

    /// The textual key was not valid URL-safe base64 without padding.
    #[error("connection key is not valid base64: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    /// The decoded key had the wrong length.
    #[error("connection key must decode to {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// The OS entropy source failed while generating a key.
    #[error("entropy source failed: {0}")]
    Entropy(#[source] rand::Error),

    /// The derived private key could not be encoded as PKCS#8.
    #[error("private key encoding failed: {0}")]
    KeyDer(#[from] ed25519_dalek::pkcs8::Error),

    /// Certificate construction or signing failed. This does not happen for
    /// correctly derived Ed25519 inputs; treat it as a bug if it surfaces.
    #[error("certificate generation failed: {0}")]
    Certificate(#[from] rcgen::Error),

    /// The requested server name is not a valid DNS name.
    #[error("invalid server name {0:?}")]
    InvalidServerName(String),

    /// Building the client-certificate verifier failed.
    #[error("failed to build client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    /// TLS configuration assembly failed.
    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    /// I/O failure in the dial/listen wrappers. Handshake failures also
    /// surface here, reported by the TLS stack at read/write time.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for key-based TLS operations.
pub type Result<T> = std::result::Result<T, Error>;
