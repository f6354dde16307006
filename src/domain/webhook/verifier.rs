//! Webhook signature verification.
//!
//! Two schemes are supported, one verifier variant per `WebhookAuthType`:
//! a static shared secret carried in a header, and an HMAC over the body
//! (optionally bound to a timestamp to limit replay). All comparisons of
//! secret-derived bytes are constant-time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;

use super::{BodyFormat, SignatureAlgorithm, SignatureEncoding, VerificationError, WebhookRequest};

macro_rules! hmac_digest {
    ($digest:ty, $key:expr, $message:expr) => {{
        let mut mac = <Hmac<$digest>>::new_from_slice($key)
            .map_err(|_| VerificationError::MalformedHeader("unusable secret".into()))?;
        mac.update($message);
        mac.finalize().into_bytes().to_vec()
    }};
}

/// Parsed contents of a signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix seconds from a `t=` entry, if present.
    pub timestamp: Option<i64>,
    /// Encoded signatures. More than one when the provider is rotating secrets.
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parses a header value, stripping `prefix` when it leads the value.
    ///
    /// Accepted forms:
    /// - a bare signature: `<sig>` or `sha256=<sig>` with prefix `sha256=`
    /// - a key/value list: `t=<unix>,v1=<sig>[,v1=<sig>...]`
    ///
    /// Unknown keys in the list form are ignored.
    pub fn parse(value: &str, prefix: Option<&str>) -> Result<Self, VerificationError> {
        let mut value = value.trim();
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            value = value.strip_prefix(prefix).unwrap_or(value).trim();
        }

        if value.is_empty() {
            return Err(VerificationError::MalformedHeader("empty signature".into()));
        }

        if !is_key_value_list(value) {
            return Ok(SignatureHeader {
                timestamp: None,
                signatures: vec![value.to_string()],
            });
        }

        let mut timestamp: Option<i64> = None;
        let mut signatures = Vec::new();

        for part in value.split(',') {
            let (key, value) = part.trim().split_once('=').ok_or_else(|| {
                VerificationError::MalformedHeader("invalid header format".to_string())
            })?;

            match key.trim() {
                "t" => {
                    timestamp = Some(value.trim().parse().map_err(|_| {
                        VerificationError::MalformedHeader("invalid timestamp".to_string())
                    })?);
                }
                "v1" => signatures.push(value.trim().to_string()),
                _ => {}
            }
        }

        if signatures.is_empty() {
            return Err(VerificationError::MalformedHeader(
                "missing v1 signature".to_string(),
            ));
        }

        Ok(SignatureHeader {
            timestamp,
            signatures,
        })
    }
}

/// A base64 signature can contain `=` only as trailing padding, so a leading
/// `t=` or `v1=` entry marks the key/value form.
fn is_key_value_list(value: &str) -> bool {
    value
        .split(',')
        .any(|part| matches!(part.trim().split_once('='), Some(("t" | "v1", _))))
}

/// Compares a header value against a static secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSecretHeaderVerifier {
    header: String,
    prefix: Option<String>,
}

impl SharedSecretHeaderVerifier {
    pub fn new(header: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            header: header.into(),
            prefix,
        }
    }

    pub fn verify(
        &self,
        request: &WebhookRequest,
        secret: &SecretString,
    ) -> Result<bool, VerificationError> {
        let raw = request
            .header(&self.header)?
            .ok_or_else(|| VerificationError::MissingHeader(self.header.clone()))?;

        let mut presented = raw.trim();
        if let Some(prefix) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            presented = presented.strip_prefix(prefix).unwrap_or(presented).trim();
        }

        // Hash both sides so the comparison does not reveal the secret length.
        let expected = Sha256::digest(secret.expose_secret().as_bytes());
        let presented = Sha256::digest(presented.as_bytes());
        Ok(expected.as_slice().ct_eq(presented.as_slice()).into())
    }
}

/// Verifies an HMAC signature over the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacVerifier {
    header: String,
    prefix: Option<String>,
    algorithm: SignatureAlgorithm,
    encoding: SignatureEncoding,
    body_format: BodyFormat,
    tolerance_secs: i64,
}

impl HmacVerifier {
    pub fn new(
        header: impl Into<String>,
        prefix: Option<String>,
        algorithm: SignatureAlgorithm,
        encoding: SignatureEncoding,
        body_format: BodyFormat,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            header: header.into(),
            prefix,
            algorithm,
            encoding,
            body_format,
            tolerance_secs,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header
    }

    /// Verification steps:
    ///
    /// 1. Parse the signature header
    /// 2. Reject a timestamp outside tolerance
    /// 3. Compute the expected MAC over the configured body format
    /// 4. Compare against every presented signature in constant time
    pub fn verify(
        &self,
        request: &WebhookRequest,
        secret: &SecretString,
        now: Timestamp,
    ) -> Result<bool, VerificationError> {
        let raw = request
            .header(&self.header)?
            .ok_or_else(|| VerificationError::MissingHeader(self.header.clone()))?;
        let header = SignatureHeader::parse(raw, self.prefix.as_deref())?;

        if let Some(t) = header.timestamp {
            let skew = now.as_unix_secs().saturating_sub(t).saturating_abs();
            if skew > self.tolerance_secs {
                tracing::debug!(timestamp = t, "signature timestamp outside tolerance");
                return Ok(false);
            }
        }

        let expected = self.compute(secret, header.timestamp, request.body())?;

        let mut decoded_any = false;
        let mut matched = false;
        for candidate in &header.signatures {
            let Some(candidate) = self.decode(candidate) else {
                continue;
            };
            decoded_any = true;
            matched |= constant_time_compare(&expected, &candidate);
        }

        if !decoded_any {
            return Err(VerificationError::InvalidEncoding(self.encoding.as_str()));
        }
        Ok(matched)
    }

    /// Produces the header value a provider would send for `body`.
    ///
    /// With `timestamp` set the value uses the `t=...,v1=...` form, otherwise
    /// the bare signature (with prefix, if configured).
    pub fn sign(
        &self,
        secret: &SecretString,
        timestamp: Option<i64>,
        body: &[u8],
    ) -> Result<String, VerificationError> {
        let mac = self.compute(secret, timestamp, body)?;
        let encoded = self.encode(&mac);
        let prefix = self.prefix.as_deref().unwrap_or("");
        Ok(match timestamp {
            Some(t) => format!("{}t={},v1={}", prefix, t, encoded),
            None => format!("{}{}", prefix, encoded),
        })
    }

    fn compute(
        &self,
        secret: &SecretString,
        timestamp: Option<i64>,
        body: &[u8],
    ) -> Result<Vec<u8>, VerificationError> {
        let message = match self.body_format {
            BodyFormat::Raw => body.to_vec(),
            BodyFormat::TimestampDotBody => {
                let t = timestamp.ok_or(VerificationError::MissingTimestamp)?;
                let mut message = format!("{}.", t).into_bytes();
                message.extend_from_slice(body);
                message
            }
        };

        let key = secret.expose_secret().as_bytes();
        Ok(match self.algorithm {
            SignatureAlgorithm::Sha256 => hmac_digest!(Sha256, key, &message),
            SignatureAlgorithm::Sha384 => hmac_digest!(Sha384, key, &message),
            SignatureAlgorithm::Sha512 => hmac_digest!(Sha512, key, &message),
        })
    }

    fn encode(&self, mac: &[u8]) -> String {
        match self.encoding {
            SignatureEncoding::Hex => hex::encode(mac),
            SignatureEncoding::Base64 => BASE64.encode(mac),
        }
    }

    fn decode(&self, signature: &str) -> Option<Vec<u8>> {
        match self.encoding {
            SignatureEncoding::Hex => hex::decode(signature).ok(),
            SignatureEncoding::Base64 => BASE64.decode(signature).ok(),
        }
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// A verifier selected for one provider's auth type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureVerifier {
    SharedSecretHeader(SharedSecretHeaderVerifier),
    Hmac(HmacVerifier),
}

impl SignatureVerifier {
    /// `Ok(false)` means the request is not authentic. `Err` means it was too
    /// malformed to judge, which callers also treat as a rejection.
    pub fn verify(
        &self,
        request: &WebhookRequest,
        secret: &SecretString,
        now: Timestamp,
    ) -> Result<bool, VerificationError> {
        match self {
            SignatureVerifier::SharedSecretHeader(v) => v.verify(request, secret),
            SignatureVerifier::Hmac(v) => v.verify(request, secret, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn secret() -> SecretString {
        SecretString::new(TEST_SECRET.to_string())
    }

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).unwrap()
    }

    fn hmac(body_format: BodyFormat, encoding: SignatureEncoding) -> HmacVerifier {
        HmacVerifier::new(
            "Wave-Signature",
            None,
            SignatureAlgorithm::Sha256,
            encoding,
            body_format,
            300,
        )
    }

    fn request(header: &str, value: &str, body: &[u8]) -> WebhookRequest {
        WebhookRequest::from_pairs([(header, value)], body.to_vec())
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_bare_signature() {
        let header = SignatureHeader::parse("abc123", None).unwrap();
        assert_eq!(header.timestamp, None);
        assert_eq!(header.signatures, vec!["abc123".to_string()]);
    }

    #[test]
    fn strips_configured_prefix() {
        let header = SignatureHeader::parse("sha256=abc123", Some("sha256=")).unwrap();
        assert_eq!(header.signatures, vec!["abc123".to_string()]);
    }

    #[test]
    fn bare_base64_with_padding_is_not_a_key_value_list() {
        let header = SignatureHeader::parse("q1w2e3==", None).unwrap();
        assert_eq!(header.signatures, vec!["q1w2e3==".to_string()]);
    }

    #[test]
    fn parses_timestamped_form_with_multiple_signatures() {
        let header = SignatureHeader::parse("t=1700000000,v1=aa,v0=legacy,v1=bb==", None).unwrap();
        assert_eq!(header.timestamp, Some(1_700_000_000));
        assert_eq!(header.signatures, vec!["aa".to_string(), "bb==".to_string()]);
    }

    #[test]
    fn rejects_list_without_v1() {
        let result = SignatureHeader::parse("t=1700000000,v0=aa", None);
        assert!(matches!(result, Err(VerificationError::MalformedHeader(_))));
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        let result = SignatureHeader::parse("t=yesterday,v1=aa", None);
        assert!(matches!(result, Err(VerificationError::MalformedHeader(_))));
    }

    #[test]
    fn rejects_empty_value() {
        let result = SignatureHeader::parse("  sha256=", Some("sha256="));
        assert!(matches!(result, Err(VerificationError::MalformedHeader(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // HMAC Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn raw_hex_signature_verifies() {
        let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Hex);
        let value = verifier.sign(&secret(), None, BODY).unwrap();
        let req = request("wave-signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn uppercase_hex_signature_verifies() {
        let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Hex);
        let value = verifier.sign(&secret(), None, BODY).unwrap().to_uppercase();
        let req = request("Wave-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn base64_signature_verifies() {
        let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Base64);
        let value = verifier.sign(&secret(), None, BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn prefixed_signature_verifies() {
        let verifier = HmacVerifier::new(
            "X-Hub-Signature-256",
            Some("sha256=".into()),
            SignatureAlgorithm::Sha256,
            SignatureEncoding::Hex,
            BodyFormat::Raw,
            0,
        );
        let value = verifier.sign(&secret(), None, BODY).unwrap();
        assert!(value.starts_with("sha256="));
        let req = request("x-hub-signature-256", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn sha512_signature_verifies() {
        let verifier = HmacVerifier::new(
            "X-Signature",
            None,
            SignatureAlgorithm::Sha512,
            SignatureEncoding::Hex,
            BodyFormat::Raw,
            0,
        );
        let value = verifier.sign(&secret(), None, BODY).unwrap();
        assert_eq!(value.len(), 128);
        let req = request("X-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn matches_known_hmac_sha256_vector() {
        // RFC 4231 test case 2.
        let verifier = HmacVerifier::new(
            "X-Signature",
            None,
            SignatureAlgorithm::Sha256,
            SignatureEncoding::Hex,
            BodyFormat::Raw,
            0,
        );
        let value = verifier
            .sign(
                &SecretString::new("Jefe".to_string()),
                None,
                b"what do ya want for nothing?",
            )
            .unwrap();
        assert_eq!(
            value,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn timestamp_dot_body_signature_verifies() {
        let verifier = hmac(BodyFormat::TimestampDotBody, SignatureEncoding::Hex);
        let t = now().as_unix_secs();
        let value = verifier.sign(&secret(), Some(t), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn timestamp_dot_body_without_timestamp_is_error() {
        let verifier = hmac(BodyFormat::TimestampDotBody, SignatureEncoding::Hex);
        let req = request("Wave-Signature", "deadbeef", BODY);
        assert_eq!(
            verifier.verify(&req, &secret(), now()),
            Err(VerificationError::MissingTimestamp)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let verifier = hmac(BodyFormat::TimestampDotBody, SignatureEncoding::Hex);
        let t = now().as_unix_secs() - 301;
        let value = verifier.sign(&secret(), Some(t), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(!verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn future_timestamp_beyond_tolerance_is_rejected() {
        let verifier = hmac(BodyFormat::TimestampDotBody, SignatureEncoding::Hex);
        let t = now().as_unix_secs() + 301;
        let value = verifier.sign(&secret(), Some(t), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(!verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn timestamp_at_tolerance_boundary_is_accepted() {
        let verifier = hmac(BodyFormat::TimestampDotBody, SignatureEncoding::Hex);
        let t = now().as_unix_secs() - 300;
        let value = verifier.sign(&secret(), Some(t), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn zero_tolerance_admits_only_an_exact_timestamp() {
        let verifier = HmacVerifier::new(
            "Wave-Signature",
            None,
            SignatureAlgorithm::Sha256,
            SignatureEncoding::Hex,
            BodyFormat::TimestampDotBody,
            0,
        );

        let year_old = now().as_unix_secs() - 365 * 24 * 3600;
        let value = verifier.sign(&secret(), Some(year_old), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(!verifier.verify(&req, &secret(), now()).unwrap());

        let value = verifier.sign(&secret(), Some(now().as_unix_secs() - 1), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(!verifier.verify(&req, &secret(), now()).unwrap());

        let value = verifier.sign(&secret(), Some(now().as_unix_secs()), BODY).unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn wrong_secret_is_rejected_not_error() {
        let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Hex);
        let value = verifier
            .sign(&SecretString::new("other".to_string()), None, BODY)
            .unwrap();
        let req = request("Wave-Signature", &value, BODY);
        assert_eq!(verifier.verify(&req, &secret(), now()), Ok(false));
    }

    #[test]
    fn any_matching_v1_signature_is_accepted() {
        let verifier = hmac(BodyFormat::TimestampDotBody, SignatureEncoding::Hex);
        let t = now().as_unix_secs();
        let good = verifier.sign(&secret(), Some(t), BODY).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let value = format!("t={},v1={},v1={}", t, "00".repeat(32), good_sig);
        let req = request("Wave-Signature", &value, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    #[test]
    fn missing_header_is_error() {
        let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Hex);
        let req = request("Other", "x", BODY);
        assert_eq!(
            verifier.verify(&req, &secret(), now()),
            Err(VerificationError::MissingHeader("Wave-Signature".into()))
        );
    }

    #[test]
    fn undecodable_signature_is_error() {
        let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Hex);
        let req = request("Wave-Signature", "not-hex!", BODY);
        assert_eq!(
            verifier.verify(&req, &secret(), now()),
            Err(VerificationError::InvalidEncoding("hex"))
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Shared Secret Header Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn shared_secret_matches() {
        let verifier = SharedSecretHeaderVerifier::new("X-Webhook-Secret", None);
        let req = request("x-webhook-secret", &format!(" {} ", TEST_SECRET), BODY);
        assert!(verifier.verify(&req, &secret()).unwrap());
    }

    #[test]
    fn shared_secret_with_prefix_matches() {
        let verifier = SharedSecretHeaderVerifier::new("Authorization", Some("Bearer ".into()));
        let req = request("Authorization", &format!("Bearer {}", TEST_SECRET), BODY);
        assert!(verifier.verify(&req, &secret()).unwrap());
    }

    #[test]
    fn shared_secret_mismatch_is_false() {
        let verifier = SharedSecretHeaderVerifier::new("X-Webhook-Secret", None);
        let req = request("X-Webhook-Secret", "whsec_test_secret_1234", BODY);
        assert!(!verifier.verify(&req, &secret()).unwrap());
    }

    #[test]
    fn shared_secret_missing_header_is_error() {
        let verifier = SharedSecretHeaderVerifier::new("X-Webhook-Secret", None);
        let req = request("X-Other", TEST_SECRET, BODY);
        assert!(matches!(
            verifier.verify(&req, &secret()),
            Err(VerificationError::MissingHeader(_))
        ));
    }

    #[test]
    fn enum_dispatches_to_variant() {
        let verifier = SignatureVerifier::SharedSecretHeader(SharedSecretHeaderVerifier::new(
            "X-Webhook-Secret",
            None,
        ));
        let req = request("X-Webhook-Secret", TEST_SECRET, BODY);
        assert!(verifier.verify(&req, &secret(), now()).unwrap());
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    fn any_verifier() -> impl Strategy<Value = HmacVerifier> {
        (
            prop_oneof![
                Just(SignatureAlgorithm::Sha256),
                Just(SignatureAlgorithm::Sha384),
                Just(SignatureAlgorithm::Sha512),
            ],
            prop_oneof![Just(SignatureEncoding::Hex), Just(SignatureEncoding::Base64)],
            prop_oneof![Just(BodyFormat::Raw), Just(BodyFormat::TimestampDotBody)],
        )
            .prop_map(|(alg, enc, fmt)| {
                HmacVerifier::new("X-Signature", None, alg, enc, fmt, 300)
            })
    }

    proptest! {
        #[test]
        fn signed_body_always_verifies(
            verifier in any_verifier(),
            secret in "[ -~]{1,64}",
            body in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let secret = SecretString::new(secret);
            let t = now().as_unix_secs();
            let value = verifier.sign(&secret, Some(t), &body).unwrap();
            let req = WebhookRequest::from_pairs([("X-Signature", value.as_str())], body);
            prop_assert!(verifier.verify(&req, &secret, now()).unwrap());
        }

        #[test]
        fn any_body_bit_flip_fails(
            verifier in any_verifier(),
            body in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let t = now().as_unix_secs();
            let value = verifier.sign(&secret(), Some(t), &body).unwrap();
            let mut tampered = body.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= 1 << bit;
            let req = WebhookRequest::from_pairs([("X-Signature", value.as_str())], tampered);
            prop_assert!(!verifier.verify(&req, &secret(), now()).unwrap());
        }

        #[test]
        fn any_signature_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 0..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let verifier = hmac(BodyFormat::Raw, SignatureEncoding::Hex);
            let mut mac = verifier.compute(&secret(), None, &body).unwrap();
            let i = index.index(mac.len());
            mac[i] ^= 1 << bit;
            let value = hex::encode(&mac);
            let req = WebhookRequest::from_pairs([("Wave-Signature", value.as_str())], body);
            prop_assert!(!verifier.verify(&req, &secret(), now()).unwrap());
        }
    }
}
