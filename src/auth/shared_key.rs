//! HMAC-SHA256 "SharedKey" request signing.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use sha2::Sha256;

use super::error::AuthError;
use super::provider::ParameterSource;

pub const DEFAULT_SHARED_KEY_SCHEME: &str = "SharedKey";
pub const DEFAULT_DATE_HEADER: &str = "x-ms-date";

/// `strftime` pattern for the signed date header (RFC 1123, always GMT).
pub const RFC1123_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

type HmacSha256 = Hmac<Sha256>;

/// Signs requests with a pre-shared key.
///
/// The string to sign is the newline-joined method, content length, content
/// type, `<date-header>:<date>` and decoded URL path. The date header name
/// is signed exactly as configured, case included. Requests without a date header
/// get one attached before signing, so the signature always covers the date
/// that is actually sent.
///
/// # Example
/// ```no_run
/// use apikit::auth::{HeaderAuth, SharedKeySigner};
///
/// let signer = SharedKeySigner::from_base64("c2VjcmV0LWtleQ==")?;
/// let auth = HeaderAuth::shared_key(signer);
/// # Ok::<(), apikit::auth::AuthError>(())
/// ```
#[derive(Clone)]
pub struct SharedKeySigner {
    date_header: HeaderName,
    date_label: String,
    key: Vec<u8>,
}

impl std::fmt::Debug for SharedKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeySigner")
            .field("date_header", &self.date_label)
            .field("key", &"..")
            .finish()
    }
}

impl SharedKeySigner {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            date_header: HeaderName::from_static(DEFAULT_DATE_HEADER),
            date_label: DEFAULT_DATE_HEADER.to_string(),
            key: key.into(),
        }
    }

    pub fn from_base64(key: &str) -> Result<Self, AuthError> {
        let key = STANDARD
            .decode(key.trim())
            .map_err(|e| AuthError::Configuration(format!("shared key is not valid base64: {e}")))?;
        Ok(Self::new(key))
    }

    pub fn with_date_header(mut self, name: &str) -> Result<Self, AuthError> {
        self.date_header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("invalid date header name {name:?}: {e}")))?;
        self.date_label = name.to_string();
        Ok(self)
    }

    pub fn date_header(&self) -> &HeaderName {
        &self.date_header
    }

    /// The exact text that gets signed.
    pub fn string_to_sign(
        &self,
        method: &str,
        content_length: u64,
        content_type: &str,
        date: &str,
        resource: &str,
    ) -> String {
        [
            method.to_string(),
            content_length.to_string(),
            content_type.to_string(),
            format!("{}:{date}", self.date_label),
            resource.to_string(),
        ]
        .join("\n")
    }

    /// Base64 HMAC-SHA256 over [`Self::string_to_sign`]. `None` if signing fails.
    pub fn sign(
        &self,
        method: &str,
        content_length: u64,
        content_type: &str,
        date: &str,
        resource: &str,
    ) -> Option<String> {
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(err) => {
                tracing::warn!(error = %err, "Unable to initialise HMAC, request will be unsigned");
                return None;
            }
        };
        let payload = self.string_to_sign(method, content_length, content_type, date, resource);
        mac.update(&ascii_bytes(&payload));
        Some(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ParameterSource for SharedKeySigner {
    async fn parameter(
        &self,
        request: &mut reqwest::Request,
    ) -> Result<Option<String>, AuthError> {
        let existing = request
            .headers()
            .get(&self.date_header)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let date = match existing {
            Some(existing) => existing,
            None => {
                let generated = rfc1123_date(Utc::now());
                let value = HeaderValue::from_str(&generated)
                    .map_err(|e| AuthError::Signing(e.to_string()))?;
                request.headers_mut().insert(self.date_header.clone(), value);
                generated
            }
        };

        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let resource = decoded_path(request.url());
        Ok(self.sign(
            request.method().as_str(),
            content_length(request),
            &content_type,
            &date,
            &resource,
        ))
    }
}

/// Format `at` the way the date header expects, e.g. `Wed, 07 Mar 2018 09:05:03 GMT`.
pub fn rfc1123_date(at: DateTime<Utc>) -> String {
    at.format(RFC1123_DATE_FORMAT).to_string()
}

fn content_length(request: &reqwest::Request) -> u64 {
    if let Some(bytes) = request.body().and_then(|body| body.as_bytes()) {
        return bytes.len() as u64;
    }
    request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

// Servers verify against the unescaped path.
fn decoded_path(url: &reqwest::Url) -> String {
    percent_decode_str(url.path()).decode_utf8_lossy().into_owned()
}

// Non-ASCII characters are signed as '?'.
fn ascii_bytes(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use reqwest::{Method, Url};

    const KEY_B64: &str = "c2VjcmV0LWtleQ==";

    #[test]
    fn string_to_sign_orders_fields() {
        let signer = SharedKeySigner::new(b"k".to_vec());
        assert_eq!(
            signer.string_to_sign(
                "POST",
                42,
                "application/json",
                "Wed, 07 Mar 2018 09:05:03 GMT",
                "/v1/payments"
            ),
            "POST\n42\napplication/json\nx-ms-date:Wed, 07 Mar 2018 09:05:03 GMT\n/v1/payments"
        );
    }

    #[test]
    fn signature_is_deterministic() {
        let signer = SharedKeySigner::from_base64(KEY_B64).unwrap();
        let date = "Wed, 07 Mar 2018 09:05:03 GMT";
        let first = signer.sign("GET", 0, "", date, "/v1/items").unwrap();
        let second = signer.sign("GET", 0, "", date, "/v1/items").unwrap();
        assert_eq!(first, second);
        assert_eq!(STANDARD.decode(&first).unwrap().len(), 32);

        let other = signer.sign("GET", 0, "", date, "/v1/other").unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn signature_matches_manual_hmac() {
        let signer = SharedKeySigner::from_base64(KEY_B64).unwrap();
        let date = "Wed, 07 Mar 2018 09:05:03 GMT";
        let mut mac = HmacSha256::new_from_slice(b"secret-key").unwrap();
        mac.update(b"GET\n0\n\nx-ms-date:Wed, 07 Mar 2018 09:05:03 GMT\n/v1/items");
        let expected = STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(signer.sign("GET", 0, "", date, "/v1/items"), Some(expected));
    }

    #[test]
    fn invalid_base64_key_is_configuration_error() {
        assert!(matches!(
            SharedKeySigner::from_base64("not base64!!"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn rfc1123_format_is_gmt() {
        let at = Utc.with_ymd_and_hms(2018, 3, 7, 9, 5, 3).unwrap();
        assert_eq!(rfc1123_date(at), "Wed, 07 Mar 2018 09:05:03 GMT");
    }

    #[tokio::test]
    async fn missing_date_header_is_generated_and_signed() {
        let signer = SharedKeySigner::from_base64(KEY_B64).unwrap();
        let mut req = reqwest::Request::new(
            Method::GET,
            Url::parse("https://api.example.com/v1/items?page=2").unwrap(),
        );
        let signature = signer.parameter(&mut req).await.unwrap().unwrap();

        let sent_date = req.headers()[DEFAULT_DATE_HEADER].to_str().unwrap().to_string();
        assert!(sent_date.ends_with(" GMT"));
        assert_eq!(
            signer.sign("GET", 0, "", &sent_date, "/v1/items"),
            Some(signature)
        );
    }

    #[tokio::test]
    async fn existing_date_and_body_are_used() {
        let signer = SharedKeySigner::from_base64(KEY_B64)
            .unwrap()
            .with_date_header("x-date")
            .unwrap();
        let client = reqwest::Client::new();
        let mut req = client
            .post("https://api.example.com/v1/payments")
            .header("x-date", "Wed, 07 Mar 2018 09:05:03 GMT")
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"amount":10}"#)
            .build()
            .unwrap();
        let signature = signer.parameter(&mut req).await.unwrap();
        assert_eq!(
            signature,
            signer.sign(
                "POST",
                13,
                "application/json",
                "Wed, 07 Mar 2018 09:05:03 GMT",
                "/v1/payments"
            )
        );
        assert_eq!(req.headers()["x-date"], "Wed, 07 Mar 2018 09:05:03 GMT");
    }

    #[test]
    fn date_header_name_is_signed_as_configured() {
        let signer = SharedKeySigner::new(b"k".to_vec())
            .with_date_header("X-Date")
            .unwrap();
        assert_eq!(signer.date_header().as_str(), "x-date");
        assert_eq!(
            signer.string_to_sign("GET", 0, "", "d", "/p"),
            "GET\n0\n\nX-Date:d\n/p"
        );
    }

    #[tokio::test]
    async fn configured_header_case_still_finds_existing_date() {
        let signer = SharedKeySigner::from_base64(KEY_B64)
            .unwrap()
            .with_date_header("X-Date")
            .unwrap();
        let mut req = reqwest::Client::new()
            .get("https://api.example.com/v1/items")
            .header("x-date", "Wed, 07 Mar 2018 09:05:03 GMT")
            .build()
            .unwrap();
        let signature = signer.parameter(&mut req).await.unwrap();
        assert_eq!(
            signature,
            signer.sign("GET", 0, "", "Wed, 07 Mar 2018 09:05:03 GMT", "/v1/items")
        );
        assert_eq!(req.headers().get_all("x-date").iter().count(), 1);
    }

    #[tokio::test]
    async fn escaped_path_is_signed_decoded() {
        let signer = SharedKeySigner::from_base64(KEY_B64).unwrap();
        let date = "Wed, 07 Mar 2018 09:05:03 GMT";
        let mut req = reqwest::Client::new()
            .get("https://api.example.com/v1/items/a b")
            .header(DEFAULT_DATE_HEADER, date)
            .build()
            .unwrap();
        assert_eq!(req.url().path(), "/v1/items/a%20b");

        let signature = signer.parameter(&mut req).await.unwrap();

        assert_eq!(signature, signer.sign("GET", 0, "", date, "/v1/items/a b"));
        assert_ne!(signature, signer.sign("GET", 0, "", date, "/v1/items/a%20b"));
    }

    #[tokio::test]
    async fn non_ascii_path_is_signed_with_placeholders() {
        let signer = SharedKeySigner::from_base64(KEY_B64).unwrap();
        let date = "Wed, 07 Mar 2018 09:05:03 GMT";
        let mut req = reqwest::Client::new()
            .get("https://api.example.com/v1/caf\u{e9}")
            .header(DEFAULT_DATE_HEADER, date)
            .build()
            .unwrap();

        let signature = signer.parameter(&mut req).await.unwrap();

        assert_eq!(signature, signer.sign("GET", 0, "", date, "/v1/caf?"));
    }
}
