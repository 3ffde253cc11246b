//! Connection key parsing, formatting and generation.
//!
//! A connection key is a 32-byte high-entropy shared secret. It is the sole
//! input to the trust derivation: both peers derive the same certificate
//! authority from it, so whoever holds the key can authenticate the other
//! side. The textual form is URL-safe base64 without padding (43 characters),
//! compact enough to paste into a terminal.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::identity;

/// Length of a connection key in bytes.
pub const KEY_LENGTH: usize = 32;

/// A 32-byte shared secret from which both peers derive their TLS identity.
///
/// The all-zero value is invalid and is rejected by [`ConnectionKey::parse`]
/// as well as by every certificate and TLS-config constructor. Any other
/// value is accepted; the key is assumed high-entropy by contract.
///
/// The buffer is zeroised when the key is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionKey([u8; KEY_LENGTH]);

impl ConnectionKey {
    /// Generate a fresh connection key from the OS entropy source.
    ///
    /// Fails only if the entropy source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(Error::Entropy)?;

        Ok(Self(bytes))
    }

    /// Parse a connection key from its textual form.
    ///
    /// The input must be exactly the URL-safe base64 encoding of 32 bytes,
    /// without padding. Whitespace is not stripped and padding characters are
    /// rejected. The all-zero key is rejected as invalid.
    pub fn parse(text: &str) -> Result<Self> {
        let decoded = URL_SAFE_NO_PAD.decode(text)?;

        let bytes: [u8; KEY_LENGTH] =
            decoded.try_into().map_err(|v: Vec<u8>| Error::KeyLength {
                expected: KEY_LENGTH,
                actual: v.len(),
            })?;

        let key = Self(bytes);
        if !key.valid() {
            return Err(Error::ZeroKey);
        }

        Ok(key)
    }

    /// Whether the key is semantically valid, i.e. not all-zero.
    pub fn valid(&self) -> bool {
        self.0.iter().any(|&b| b != 0)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// URL-safe base64 (no padding) of the Ed25519 public key derived from
    /// this connection key.
    ///
    /// This equals the base64 encoding of the derived CA's serial number
    /// bytes, which ties the on-the-wire certificate to the key.
    pub fn public_key(&self) -> String {
        URL_SAFE_NO_PAD.encode(identity::verifying_key_bytes(&self.0))
    }
}

impl From<[u8; KEY_LENGTH]> for ConnectionKey {
    fn from(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ConnectionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

// The key is a secret; never print it through Debug.
impl fmt::Debug for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionKey(..)")
    }
}

impl Drop for ConnectionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl serde::Serialize for ConnectionKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ConnectionKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}
