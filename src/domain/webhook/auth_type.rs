//! Enumerations that describe how a provider signs its webhooks.
//!
//! Each is stored as a lowercase string on the webhook config row and parsed
//! when a verifier is built, so an unrecognised stored value surfaces as a
//! configuration error rather than a silent default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a provider authenticates its notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAuthType {
    /// A static secret sent verbatim in a header.
    SharedSecretHeader,
    /// An HMAC over the body (optionally prefixed with a timestamp).
    Hmac,
}

/// Digest used for HMAC signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

/// Text encoding of the signature in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureEncoding {
    Hex,
    Base64,
}

/// Which bytes the provider signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFormat {
    /// The raw request body.
    Raw,
    /// `"{timestamp}.{body}"`, timestamp taken from the signature header.
    TimestampDotBody,
}

/// A stored enum value that this build does not recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text $(| $alias)* => Ok($ty::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(WebhookAuthType, "auth type", {
    SharedSecretHeader => "shared_secret_header" | "shared-secret-header" | "api_key_header",
    Hmac => "hmac",
});

string_enum!(SignatureAlgorithm, "signature algorithm", {
    Sha256 => "sha256" | "sha-256",
    Sha384 => "sha384" | "sha-384",
    Sha512 => "sha512" | "sha-512",
});

string_enum!(SignatureEncoding, "signature encoding", {
    Hex => "hex",
    Base64 => "base64",
});

string_enum!(BodyFormat, "body format", {
    Raw => "raw",
    TimestampDotBody => "timestamp_dot_body" | "timestamp.body",
});
