//! Encryption of provider webhook secrets at rest.
//!
//! Secrets are sealed with AES-256-GCM under a key derived from the process
//! master key. Every call draws a fresh 96-bit nonce, and a constant
//! associated-data label binds ciphertexts to this use so they cannot be
//! replayed into another encrypted column.
//!
//! # Stored format
//!
//! ```text
//! {"v":1,"alg":"A256GCM","iv":"<b64>","tag":"<b64>","ct":"<b64>"}
//! ```
//!
//! Unknown `v`/`alg` pairs fail closed so a future algorithm can be rolled
//! out next to this one.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Associated data bound into every ciphertext.
const AAD_LABEL: &[u8] = b"paygate:webhook-secret:v1";

const BLOB_VERSION: u8 = 1;
const BLOB_ALGORITHM: &str = "A256GCM";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Errors raised while deriving the key or opening a stored secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    /// The master key is empty, so no key can be derived from it.
    #[error("Master key cannot be used to derive an encryption key")]
    KeyDerivation,

    /// The blob is not valid JSON, base64, or has wrong field lengths.
    #[error("Malformed secret blob: {0}")]
    Malformed(String),

    /// The blob was written by a scheme this build does not know.
    #[error("Unsupported secret blob version {version} ({algorithm})")]
    UnsupportedVersion { version: u8, algorithm: String },

    /// The authentication tag did not verify (wrong key or tampered blob).
    #[error("Secret blob failed authentication")]
    AuthenticationFailed,

    /// The decrypted bytes are not UTF-8.
    #[error("Decrypted secret is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised while sealing a secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    #[error("Secret cannot be empty")]
    EmptySecret,

    #[error("Encryption failed")]
    Failed,

    #[error("Failed to encode secret blob: {0}")]
    Encoding(String),
}

/// Self-describing serialized form of an encrypted secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    #[serde(rename = "v")]
    pub version: u8,
    #[serde(rename = "alg")]
    pub algorithm: String,
    #[serde(rename = "iv")]
    pub nonce: String,
    pub tag: String,
    #[serde(rename = "ct")]
    pub ciphertext: String,
}

impl EncryptedSecret {
    /// Parses the stored string form.
    pub fn parse(blob: &str) -> Result<Self, DecryptionError> {
        serde_json::from_str(blob).map_err(|e| DecryptionError::Malformed(e.to_string()))
    }

    /// Serializes to the stored string form.
    pub fn to_blob(&self) -> Result<String, EncryptionError> {
        serde_json::to_string(self).map_err(|e| EncryptionError::Encoding(e.to_string()))
    }
}

/// Process-wide cipher for webhook secrets.
///
/// Built once at startup from the master key and shared read-only.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Derives the data key from the master key.
    ///
    /// A master key of exactly 64 hex characters is used as the raw 32-byte
    /// key; any other value is hashed with SHA-256.
    pub fn new(master_key: &SecretString) -> Result<Self, DecryptionError> {
        let key = derive_key(master_key.expose_secret())?;
        Ok(Self {
            cipher: Aes256Gcm::new(&key),
        })
    }

    /// Seals a plaintext secret into its stored blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Err(EncryptionError::EmptySecret);
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: AAD_LABEL,
                },
            )
            .map_err(|_| EncryptionError::Failed)?;

        // aes-gcm appends the tag to the ciphertext
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        EncryptedSecret {
            version: BLOB_VERSION,
            algorithm: BLOB_ALGORITHM.to_string(),
            nonce: BASE64.encode(nonce),
            tag: BASE64.encode(tag),
            ciphertext: BASE64.encode(ciphertext),
        }
        .to_blob()
    }

    /// Opens a stored blob.
    pub fn decrypt(&self, blob: &str) -> Result<SecretString, DecryptionError> {
        let sealed = EncryptedSecret::parse(blob)?;

        if sealed.version != BLOB_VERSION || sealed.algorithm != BLOB_ALGORITHM {
            return Err(DecryptionError::UnsupportedVersion {
                version: sealed.version,
                algorithm: sealed.algorithm,
            });
        }

        let nonce = decode_field("iv", &sealed.nonce, Some(NONCE_LEN))?;
        let tag = decode_field("tag", &sealed.tag, Some(TAG_LEN))?;
        let mut combined = decode_field("ct", &sealed.ciphertext, None)?;
        combined.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &combined,
                    aad: AAD_LABEL,
                },
            )
            .map_err(|_| DecryptionError::AuthenticationFailed)?;

        String::from_utf8(plaintext)
            .map(SecretString::new)
            .map_err(|_| DecryptionError::InvalidUtf8)
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher")
            .field("algorithm", &BLOB_ALGORITHM)
            .finish_non_exhaustive()
    }
}

fn derive_key(master_key: &str) -> Result<Key<Aes256Gcm>, DecryptionError> {
    if master_key.is_empty() {
        return Err(DecryptionError::KeyDerivation);
    }

    if master_key.len() == KEY_LEN * 2 {
        if let Ok(raw) = hex::decode(master_key) {
            return Ok(*Key::<Aes256Gcm>::from_slice(&raw));
        }
    }

    let digest = Sha256::digest(master_key.as_bytes());
    Ok(*Key::<Aes256Gcm>::from_slice(&digest))
}

fn decode_field(
    name: &str,
    value: &str,
    expected_len: Option<usize>,
) -> Result<Vec<u8>, DecryptionError> {
    let bytes = BASE64
        .decode(value)
        .map_err(|e| DecryptionError::Malformed(format!("{}: {}", name, e)))?;

    if let Some(len) = expected_len {
        if bytes.len() != len {
            return Err(DecryptionError::Malformed(format!(
                "{}: expected {} bytes, got {}",
                name,
                len,
                bytes.len()
            )));
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn cipher(master: &str) -> SecretCipher {
        SecretCipher::new(&SecretString::new(master.to_string())).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_with_hex_key() {
        let c = cipher(HEX_KEY);
        let blob = c.encrypt("whsec_live_abc").unwrap();
        assert_eq!(c.decrypt(&blob).unwrap().expose_secret(), "whsec_live_abc");
    }

    #[test]
    fn encrypt_then_decrypt_with_derived_key() {
        let c = cipher("correct horse battery staple");
        let blob = c.encrypt("shared-secret").unwrap();
        assert_eq!(c.decrypt(&blob).unwrap().expose_secret(), "shared-secret");
    }

    #[test]
    fn hex_key_is_used_directly_not_hashed() {
        let raw = hex::decode(HEX_KEY).unwrap();
        let direct = SecretCipher {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&raw)),
        };
        let blob = cipher(HEX_KEY).encrypt("s").unwrap();
        assert_eq!(direct.decrypt(&blob).unwrap().expose_secret(), "s");
    }

    #[test]
    fn non_hex_key_of_hex_length_is_hashed() {
        let blob = cipher(HEX_KEY).encrypt("s").unwrap();
        assert_eq!(
            cipher(&"z".repeat(64)).decrypt(&blob).unwrap_err(),
            DecryptionError::AuthenticationFailed
        );
    }

    #[test]
    fn blob_is_self_describing() {
        let blob = cipher(HEX_KEY).encrypt("secret").unwrap();
        let parsed = EncryptedSecret::parse(&blob).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.algorithm, "A256GCM");
        assert_eq!(BASE64.decode(&parsed.nonce).unwrap().len(), NONCE_LEN);
        assert_eq!(BASE64.decode(&parsed.tag).unwrap().len(), TAG_LEN);
        assert!(!blob.contains("secret\""));
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let c = cipher(HEX_KEY);
        let a = EncryptedSecret::parse(&c.encrypt("same").unwrap()).unwrap();
        let b = EncryptedSecret::parse(&c.encrypt("same").unwrap()).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_master_key_fails_authentication() {
        let blob = cipher("key-one").encrypt("secret").unwrap();
        assert_eq!(
            cipher("key-two").decrypt(&blob).unwrap_err(),
            DecryptionError::AuthenticationFailed
        );
    }

    #[test]
    fn unknown_version_fails_closed() {
        let c = cipher(HEX_KEY);
        let mut sealed = EncryptedSecret::parse(&c.encrypt("secret").unwrap()).unwrap();
        sealed.version = 2;
        let blob = sealed.to_blob().unwrap();
        assert!(matches!(
            c.decrypt(&blob),
            Err(DecryptionError::UnsupportedVersion { version: 2, .. })
        ));
    }

    #[test]
    fn unknown_algorithm_fails_closed() {
        let c = cipher(HEX_KEY);
        let mut sealed = EncryptedSecret::parse(&c.encrypt("secret").unwrap()).unwrap();
        sealed.algorithm = "XCHACHA20".to_string();
        assert!(matches!(
            c.decrypt(&sealed.to_blob().unwrap()),
            Err(DecryptionError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn malformed_blob_is_rejected() {
        let c = cipher(HEX_KEY);
        assert!(matches!(c.decrypt("not json"), Err(DecryptionError::Malformed(_))));
        assert!(matches!(
            c.decrypt(r#"{"v":1,"alg":"A256GCM","iv":"AAAA","tag":"AAAA","ct":""}"#),
            Err(DecryptionError::Malformed(_))
        ));
    }

    #[test]
    fn empty_master_key_cannot_derive() {
        let err = SecretCipher::new(&SecretString::new(String::new())).unwrap_err();
        assert_eq!(err, DecryptionError::KeyDerivation);
    }

    #[test]
    fn empty_plaintext_is_refused() {
        assert_eq!(
            cipher(HEX_KEY).encrypt("").unwrap_err(),
            EncryptionError::EmptySecret
        );
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let rendered = format!("{:?}", cipher(HEX_KEY));
        assert!(!rendered.contains("0102"));
        assert!(rendered.contains("A256GCM"));
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_any_plaintext(plaintext in "\\PC{1,128}", derived in any::<bool>()) {
            let c = if derived { cipher("some passphrase") } else { cipher(HEX_KEY) };
            let blob = c.encrypt(&plaintext).unwrap();
            let opened = c.decrypt(&blob).unwrap();
            prop_assert_eq!(opened.expose_secret(), &plaintext);
        }

        #[test]
        fn tampering_any_sealed_byte_fails(
            plaintext in "[a-zA-Z0-9_]{1,64}",
            field in 0usize..3,
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let c = cipher(HEX_KEY);
            let mut sealed = EncryptedSecret::parse(&c.encrypt(&plaintext).unwrap()).unwrap();
            let target = match field {
                0 => &mut sealed.nonce,
                1 => &mut sealed.tag,
                _ => &mut sealed.ciphertext,
            };
            let mut bytes = BASE64.decode(target.as_str()).unwrap();
            let i = index.index(bytes.len());
            bytes[i] ^= flip;
            *target = BASE64.encode(&bytes);

            prop_assert_eq!(
                c.decrypt(&sealed.to_blob().unwrap()).unwrap_err(),
                DecryptionError::AuthenticationFailed
            );
        }
    }
}
