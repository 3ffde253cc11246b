//! Key-based mutual TLS.
//!
//! This crate turns a single short shared secret (a "connection key") into a
//! fully pinned mutual-TLS handshake between exactly two parties. Both sides
//! derive the same certificate authority from the key, issue themselves leaf
//! certificates that chain to it, and configure TLS to reject everything
//! else. No certificate infrastructure, no trust negotiation; the only thing
//! exchanged out-of-band is a 43-character copy-pasteable key.
//!
//! ## Derivation pipeline
//!
//! ```text
//! connection key (32 bytes)
//!     │
//!     ├── Ed25519 keypair (key bytes as RFC 8032 seed)
//!     │       │
//!     │       ├── CA certificate (self-signed, serial = public key,
//!     │       │                   deterministic down to the last byte)
//!     │       │       │
//!     │       │       └── leaf certificate (signed by CA, server + client auth)
//!     │       │
//!     └───────┴── TLS configs (leaf identity, CA as the only trust anchor,
//!                              client certificates required and verified)
//! ```
//!
//! Because the CA is a pure function of the key, an attacker without the key
//! cannot present a certificate either side accepts, and neither side
//! accepts anything from the platform trust store.
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> kbtls::Result<()> {
//! let key = kbtls::ConnectionKey::generate()?;
//!
//! // give key.to_string() to the other side out-of-band, then:
//! let listener = kbtls::listen("localhost:8443", &key.to_string()).await?;
//! let (stream, peer) = listener.accept().await?;
//! # let _ = (stream, peer); Ok(())
//! # }
//! ```
//!
//! For finer control, build [`ClientTlsConfig`] / [`ServerTlsConfig`]
//! directly and hand them to any rustls-based stack.

mod ca;
mod error;
mod identity;
mod key;
mod leaf;
mod net;
mod tls;

pub use ca::CertificateAuthority;
pub use error::{Error, Result};
pub use identity::DerivedIdentity;
pub use key::{ConnectionKey, KEY_LENGTH};
pub use leaf::{LeafCertificate, DEFAULT_SERVER_NAME};
pub use net::{dial, listen, TlsListener};
pub use tls::{ClientTlsConfig, ServerTlsConfig};
