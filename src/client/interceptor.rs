use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

pub const APP_PACKAGE_ID_HEADER: &str = "x-app-package-id";
pub const APP_VERSION_NAME_HEADER: &str = "x-app-version-name";
pub const APP_VERSION_CODE_HEADER: &str = "x-app-version-code";

/// Identifies the calling application on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    pub package_id: String,
    pub version_name: String,
    pub version_code: u32,
}

impl AppDetails {
    pub fn new(package_id: impl Into<String>, version_name: impl Into<String>, version_code: u32) -> Self {
        Self {
            package_id: package_id.into(),
            version_name: version_name.into(),
            version_code,
        }
    }

    /// Set the app headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let entries = [
            (APP_PACKAGE_ID_HEADER, self.package_id.clone()),
            (APP_VERSION_NAME_HEADER, self.version_name.clone()),
            (APP_VERSION_CODE_HEADER, self.version_code.to_string()),
        ];
        for (name, value) in entries {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(name), value);
                }
                Err(err) => tracing::warn!(header = name, error = %err, "Skipping invalid app header"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_all_three_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(APP_VERSION_CODE_HEADER, HeaderValue::from_static("1"));
        AppDetails::new("com.example.app", "2.4.0", 240).apply(&mut headers);
        assert_eq!(headers["X-App-Package-Id"], "com.example.app");
        assert_eq!(headers["X-App-Version-Name"], "2.4.0");
        assert_eq!(headers["X-App-Version-Code"], "240");
        assert_eq!(headers.get_all(APP_VERSION_CODE_HEADER).iter().count(), 1);
    }

    #[test]
    fn invalid_values_are_skipped() {
        let mut headers = HeaderMap::new();
        AppDetails::new("bad\nid", "1.0", 1).apply(&mut headers);
        assert!(headers.get(APP_PACKAGE_ID_HEADER).is_none());
        assert_eq!(headers[APP_VERSION_NAME_HEADER], "1.0");
    }
}
