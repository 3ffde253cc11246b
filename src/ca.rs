//! Deterministic certificate authority derivation.
//!
//! Both peers reconstruct the trust anchor from the connection key instead
//! of exchanging it, so the CA must come out bitwise-identical on every
//! machine. Every field that is usually randomised or clock-dependent is
//! pinned here:
//!
//! - the keypair is derived from the key bytes (no RNG),
//! - the serial number is the raw Ed25519 public key,
//! - the validity window is a fixed constant (never "now"),
//! - the signature is Ed25519, which is deterministic by construction.

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::CertificateDer;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::identity::DerivedIdentity;
use crate::key::{ConnectionKey, KEY_LENGTH};

/// Common name used as both subject and issuer of every derived certificate.
pub(crate) const COMMON_NAME: &str = "kbtls";

/// Fixed validity window shared by the CA and its leaves. Expiry is not a
/// security boundary here; the far-future bound keeps the DER constant.
pub(crate) fn validity() -> (time::OffsetDateTime, time::OffsetDateTime) {
    (
        rcgen::date_time_ymd(1975, 1, 1),
        rcgen::date_time_ymd(4096, 1, 1),
    )
}

/// The self-signed certificate authority derived from a connection key.
///
/// For a fixed key, [`CertificateAuthority::generate`] produces the exact
/// same DER on every call, so two peers that share the key also share the
/// trust anchor without ever exchanging it.
pub struct CertificateAuthority {
    cert: Certificate,
    key_pair: KeyPair,
    key_der: Zeroizing<Vec<u8>>,
    serial: [u8; KEY_LENGTH],
}

impl CertificateAuthority {
    /// Derive the CA for a connection key.
    ///
    /// Fails with [`crate::Error::ZeroKey`] for the all-zero key and with
    /// [`crate::Error::Certificate`] if the signer reports an error, which
    /// does not happen for valid Ed25519 inputs.
    pub fn generate(key: &ConnectionKey) -> Result<Self> {
        let identity = DerivedIdentity::derive(key)?;
        let key_pair = identity.rcgen_key_pair()?;
        let serial = identity.verifying_key_bytes();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, COMMON_NAME);

        let mut params = CertificateParams::default();
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign];

        // The public key doubles as the serial, interpreted as a big-endian
        // non-negative integer. This makes the key binding observable from
        // the wire.
        params.serial_number = Some(serial.to_vec().into());

        let (not_before, not_after) = validity();
        params.not_before = not_before;
        params.not_after = not_after;

        let cert = params.self_signed(&key_pair)?;
        let key_der = identity.to_pkcs8_der()?;

        Ok(Self {
            cert,
            key_pair,
            key_der,
            serial,
        })
    }

    /// The CA certificate in DER form.
    pub fn cert_der(&self) -> &CertificateDer<'static> {
        self.cert.der()
    }

    /// The CA certificate in PEM form.
    pub fn cert_pem(&self) -> String {
        self.cert.pem()
    }

    /// The serial number bytes: the raw derived Ed25519 public key.
    pub fn serial_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.serial
    }

    pub(crate) fn cert(&self) -> &Certificate {
        &self.cert
    }

    pub(crate) fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub(crate) fn key_der(&self) -> &[u8] {
        &self.key_der
    }
}
