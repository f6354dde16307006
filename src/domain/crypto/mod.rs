//! Cryptographic primitives for secrets at rest.

mod secret_cipher;

pub use secret_cipher::{DecryptionError, EncryptedSecret, EncryptionError, SecretCipher};
