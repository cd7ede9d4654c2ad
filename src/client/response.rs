use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::StatusCode;

use crate::error::ProblemDetails;

/// Outcome of an API call.
///
/// `resource` is populated for 200/201/204 responses with a JSON body,
/// `error` for 400 responses. Any other status leaves both unset and the
/// caller goes by `status`.
#[derive(Debug, Clone)]
pub struct ResourceResponse<T, E = ProblemDetails> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub resource: Option<T>,
    pub error: Option<E>,
}

impl<T, E> ResourceResponse<T, E> {
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// 2xx and no error body.
    pub fn is_successful(&self) -> bool {
        self.status.is_success() && self.error.is_none()
    }

    /// Schemes the server advertised on a 401.
    pub fn www_authenticate(&self) -> Vec<&str> {
        self.headers
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    /// Keep the resource, or fail with whatever the server sent back.
    pub fn into_result(self) -> Result<Option<T>, UnsuccessfulResponse<E>> {
        if self.is_successful() {
            Ok(self.resource)
        } else {
            Err(UnsuccessfulResponse {
                status: self.status,
                error: self.error,
            })
        }
    }
}

/// Status and optional error body of a response that did not succeed.
#[derive(Debug, Clone)]
pub struct UnsuccessfulResponse<E> {
    pub status: StatusCode,
    pub error: Option<E>,
}

impl<E> std::fmt::Display for UnsuccessfulResponse<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request failed with status {}", self.status)
    }
}

impl<E: std::fmt::Debug> std::error::Error for UnsuccessfulResponse<E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response(status: u16, error: Option<ProblemDetails>) -> ResourceResponse<String> {
        ResourceResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            resource: None,
            error,
        }
    }

    #[test]
    fn success_requires_2xx_without_error() {
        assert!(response(200, None).is_successful());
        assert!(response(204, None).is_successful());
        assert!(!response(200, Some(ProblemDetails::default())).is_successful());
        assert!(!response(404, None).is_successful());
    }

    #[test]
    fn unauthorized_and_challenges() {
        let mut resp = response(401, None);
        resp.headers
            .append(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"api\""));
        resp.headers
            .append(WWW_AUTHENTICATE, HeaderValue::from_static("SharedKey"));
        assert!(resp.is_unauthorized());
        assert_eq!(resp.www_authenticate(), vec!["Bearer realm=\"api\"", "SharedKey"]);
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
