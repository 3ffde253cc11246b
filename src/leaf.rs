//! Leaf certificate issuance.
//!
//! The leaf is the end-entity certificate each peer presents during the
//! handshake. It is signed by the derived CA and allows both TLS roles, so
//! one leaf serves whichever side of the connection the peer ends up on.
//! Unlike the CA, the leaf does not need to be byte-identical between peers;
//! chaining to the same derived CA is what the handshake verifies.

use rcgen::{
    Certificate, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, Ia5String,
    IsCa, KeyPair, KeyUsagePurpose, SanType,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::ca::{self, CertificateAuthority};
use crate::error::{Error, Result};

/// Server name used when no explicit name is given.
///
/// The client pins this name, so a server behind a different hostname must
/// be set up with the explicit-name constructors on both sides.
pub const DEFAULT_SERVER_NAME: &str = "localhost";

/// An end-entity certificate signed by the derived CA.
///
/// The subject common name and the DNS subject alternative name both carry
/// the server name; extended key usage permits TLS server and client
/// authentication alike. The private key is the derived keypair, reused
/// from the CA.
pub struct LeafCertificate {
    cert: Certificate,
    key_der: PrivatePkcs8KeyDer<'static>,
}

impl LeafCertificate {
    /// Issue a leaf for `server_name`, signed by `ca`.
    pub fn issue(ca: &CertificateAuthority, server_name: &str) -> Result<Self> {
        let dns_name = Ia5String::try_from(server_name.to_string())
            .map_err(|_| Error::InvalidServerName(server_name.to_string()))?;

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, server_name);

        let mut params = CertificateParams::default();
        params.distinguished_name = dn;
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        params.subject_alt_names = vec![SanType::DnsName(dns_name)];

        let (not_before, not_after) = ca::validity();
        params.not_before = not_before;
        params.not_after = not_after;

        // The leaf reuses the derived keypair; only the CA key has to be
        // reproducible, and a single derivation keeps the pipeline one-shot.
        let key_pair = KeyPair::from_pkcs8_der_and_sign_algo(
            &PrivatePkcs8KeyDer::from(ca.key_der()),
            &rcgen::PKCS_ED25519,
        )?;

        let cert = params.signed_by(&key_pair, ca.cert(), ca.key_pair())?;
        let key_der = PrivatePkcs8KeyDer::from(ca.key_der().to_vec());

        Ok(Self { cert, key_der })
    }

    /// The leaf certificate in DER form.
    pub fn cert_der(&self) -> &CertificateDer<'static> {
        self.cert.der()
    }

    /// The leaf certificate in PEM form.
    pub fn cert_pem(&self) -> String {
        self.cert.pem()
    }

    /// The private key for TLS use.
    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(self.key_der.clone_key())
    }

    /// Certificate chain presented during the handshake: leaf first, then
    /// the issuing CA.
    pub fn chain(&self, ca: &CertificateAuthority) -> Vec<CertificateDer<'static>> {
        vec![self.cert_der().clone(), ca.cert_der().clone()]
    }
}
