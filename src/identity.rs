//! Deterministic keypair derivation from a connection key.
//!
//! The 32 key bytes are used directly as an Ed25519 seed (RFC 8032 §5.1.5),
//! so a fixed connection key derives a byte-identical keypair on every
//! platform and in every process. Ed25519 also signs deterministically,
//! which is what makes the derived CA certificate reproducible bit for bit.

use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey;
use rcgen::KeyPair;
use rustls::pki_types::PrivatePkcs8KeyDer;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::key::{ConnectionKey, KEY_LENGTH};

/// The signing identity derived from a connection key.
///
/// Holds the Ed25519 keypair that signs the derived CA and leaf certificates
/// and authenticates both TLS roles. The inner signing key is zeroised on
/// drop.
pub struct DerivedIdentity {
    signing_key: SigningKey,
}

impl DerivedIdentity {
    /// Derive the identity for a connection key.
    ///
    /// Fails with [`Error::ZeroKey`] for the all-zero key.
    pub fn derive(key: &ConnectionKey) -> Result<Self> {
        if !key.valid() {
            return Err(Error::ZeroKey);
        }

        Ok(Self {
            signing_key: SigningKey::from_bytes(key.as_bytes()),
        })
    }

    /// The raw 32-byte Ed25519 public key.
    ///
    /// These bytes double as the serial number of the derived CA.
    pub fn verifying_key_bytes(&self) -> [u8; KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// PKCS#8 DER encoding of the private key, as consumed by `rcgen` and
    /// `rustls`. The buffer is zeroised on drop.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let doc = self.signing_key.to_pkcs8_der()?;
        Ok(Zeroizing::new(doc.as_bytes().to_vec()))
    }

    /// Build an `rcgen` signing key for certificate construction.
    pub(crate) fn rcgen_key_pair(&self) -> Result<KeyPair> {
        let der = self.to_pkcs8_der()?;
        let key_pair = KeyPair::from_pkcs8_der_and_sign_algo(
            &PrivatePkcs8KeyDer::from(der.as_slice()),
            &rcgen::PKCS_ED25519,
        )?;

        Ok(key_pair)
    }
}

/// Raw Ed25519 public key for a 32-byte seed, without the zero-key check.
///
/// Used by [`ConnectionKey::public_key`], which is defined for every key
/// value; validity is enforced where certificates are built.
pub(crate) fn verifying_key_bytes(seed: &[u8; KEY_LENGTH]) -> [u8; KEY_LENGTH] {
    SigningKey::from_bytes(seed).verifying_key().to_bytes()
}
