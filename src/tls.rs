//! Mutual-TLS configuration assembly.
//!
//! Builds rustls client and server configurations whose only trust anchor is
//! the CA derived from the connection key. The client presents the derived
//! leaf for client authentication and pins the expected server name; the
//! server requires and verifies a client certificate against the derived CA.
//! The platform trust store is never consulted, so no certificate issued by
//! any other authority is accepted on either side.

use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::ca::CertificateAuthority;
use crate::error::{Error, Result};
use crate::key::ConnectionKey;
use crate::leaf::{LeafCertificate, DEFAULT_SERVER_NAME};

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn derive_identity(
    key: &ConnectionKey,
    server_name: &str,
) -> Result<(CertificateAuthority, LeafCertificate, RootCertStore)> {
    let ca = CertificateAuthority::generate(key)?;
    let leaf = LeafCertificate::issue(&ca, server_name)?;

    let mut roots = RootCertStore::empty();
    roots.add(ca.cert_der().clone())?;

    Ok((ca, leaf, roots))
}

/// Client-side TLS configuration derived from a connection key.
///
/// Bundles the rustls config with the pinned server name, which rustls takes
/// at connect time rather than inside the config.
#[derive(Clone)]
pub struct ClientTlsConfig {
    config: ClientConfig,
    server_name: ServerName<'static>,
}

impl ClientTlsConfig {
    /// Build a client configuration pinned to the default server name.
    pub fn new(key: &ConnectionKey) -> Result<Self> {
        Self::for_server_name(key, DEFAULT_SERVER_NAME)
    }

    /// Build a client configuration pinned to an explicit server name.
    ///
    /// The name must match the SAN of the leaf the server presents; use this
    /// when the server was set up with
    /// [`ServerTlsConfig::for_server_name`].
    pub fn for_server_name(key: &ConnectionKey, server_name: &str) -> Result<Self> {
        let (ca, leaf, roots) = derive_identity(key, server_name)?;

        let config = ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_client_auth_cert(leaf.chain(&ca), leaf.private_key())?;

        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|_| Error::InvalidServerName(server_name.to_string()))?;

        Ok(Self {
            config,
            server_name,
        })
    }

    /// The underlying rustls configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mutable access for tuning knobs like ALPN. The root pinning and the
    /// client identity stay in place.
    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Consume the bundle, yielding the config and the pinned server name to
    /// dial with.
    pub fn into_parts(self) -> (ClientConfig, ServerName<'static>) {
        (self.config, self.server_name)
    }

    /// The pinned server name to dial with.
    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }
}

/// Server-side TLS configuration derived from a connection key.
///
/// Client authentication is mandatory: a peer that presents no certificate,
/// or one that does not chain to the derived CA, fails the handshake.
#[derive(Clone)]
pub struct ServerTlsConfig {
    config: ServerConfig,
}

impl ServerTlsConfig {
    /// Build a server configuration with a leaf for the default server name.
    pub fn new(key: &ConnectionKey) -> Result<Self> {
        Self::for_server_name(key, DEFAULT_SERVER_NAME)
    }

    /// Build a server configuration with a leaf for an explicit server name,
    /// for deployments where clients pin a non-default name.
    pub fn for_server_name(key: &ConnectionKey, server_name: &str) -> Result<Self> {
        let (ca, leaf, roots) = derive_identity(key, server_name)?;

        let client_verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider()).build()?;

        let config = ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_client_cert_verifier(client_verifier)
            .with_single_cert(leaf.chain(&ca), leaf.private_key())?;

        Ok(Self { config })
    }

    /// The underlying rustls configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Mutable access for tuning knobs like ALPN. The client-certificate
    /// requirement stays in place.
    pub fn config_mut(&mut self) -> &mut ServerConfig {
        &mut self.config
    }

    /// Consume the bundle, yielding the rustls configuration.
    pub fn into_config(self) -> ServerConfig {
        self.config
    }
}
