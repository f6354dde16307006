//! The inbound webhook as seen by the verifiers.

use http::HeaderMap;

use super::VerificationError;

/// Raw headers and body of an inbound notification.
///
/// The body is kept as the exact bytes received; re-serialising JSON before
/// verification would break provider signatures.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    headers: HeaderMap,
    body: Vec<u8>,
}

impl WebhookRequest {
    pub fn new(headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Convenience constructor for callers that only have string pairs.
    ///
    /// Pairs that are not valid HTTP header names or values are skipped.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            if let (Ok(name), Ok(value)) = (
                http::header::HeaderName::from_bytes(name.as_bytes()),
                http::header::HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        Self::new(headers, body)
    }

    /// Case-insensitive header lookup.
    ///
    /// A header that is present but not visible ASCII is malformed.
    pub fn header(&self, name: &str) -> Result<Option<&str>, VerificationError> {
        match self.headers.get(name.to_ascii_lowercase().as_str()) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .map(Some)
                .map_err(|_| VerificationError::MalformedHeader("non-ASCII header value".into())),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
