//! RFC 7807 problem details with a legacy `error_code`/`error_description` fallback.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Machine-readable error payload returned by an API, typically with a 400.
///
/// Servers in the wild send either the RFC 7807 fields (`title`, `detail`, ...)
/// or the older `error_code`/`error_description` pair, sometimes both. Use
/// [`ProblemDetails::code`] and [`ProblemDetails::description`] instead of
/// reading the raw fields.
///
/// # Example
/// ```
/// use apikit::error::ProblemDetails;
///
/// let problem: ProblemDetails = serde_json::from_str(
///     r#"{"error_code":"zero_balance","error_description":"go away"}"#,
/// ).unwrap();
/// assert_eq!(problem.code(), Some("zero_balance"));
/// assert_eq!(problem.description(), Some("go away"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// Short, human-readable summary of the problem type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// URI reference identifying this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Validation messages keyed by field, in the order the server sent them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(rename = "error_code", default, skip_serializing_if = "Option::is_none")]
    pub legacy_code: Option<String>,
    #[serde(
        rename = "error_description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_description: Option<String>,
}

impl ProblemDetails {
    /// `title`, falling back to the legacy `error_code`.
    pub fn code(&self) -> Option<&str> {
        self.title.as_deref().or(self.legacy_code.as_deref())
    }

    /// `detail`, then the legacy `error_description`, then the first
    /// validation message.
    pub fn description(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or(self.legacy_description.as_deref())
            .or_else(|| self.errors.as_ref().and_then(FieldErrors::first_message))
    }
}

impl fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code(), self.description()) {
            (Some(code), Some(description)) => write!(f, "{code}: {description}"),
            (Some(code), None) => f.write_str(code),
            (None, Some(description)) => f.write_str(description),
            (None, None) => f.write_str("unknown problem"),
        }
    }
}

/// Ordered mapping of field name to validation messages.
///
/// Kept as a list of pairs so iteration order matches the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append messages for a field. Repeated fields are merged into the first entry.
    pub fn insert(&mut self, field: impl Into<String>, messages: Vec<String>) {
        let field = field.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => existing.extend(messages),
            None => self.0.push((field, messages)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First message of the first field.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .first()
            .and_then(|(_, messages)| messages.first())
            .map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (field, messages) in iter {
            errors.insert(field, messages);
        }
        errors
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldErrorsVisitor;

        impl<'de> Visitor<'de> for FieldErrorsVisitor {
            type Value = FieldErrors;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to message arrays")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut errors = FieldErrors::new();
                while let Some((field, messages)) =
                    access.next_entry::<String, Option<Vec<String>>>()?
                {
                    errors.insert(field, messages.unwrap_or_default());
                }
                Ok(errors)
            }
        }

        deserializer.deserialize_map(FieldErrorsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session_problem() -> ProblemDetails {
        ProblemDetails {
            title: Some("insufficient_balance".to_string()),
            detail: Some("Add more money!".to_string()),
            errors: Some(
                [("SessionId", vec!["The SessionId is required".to_string()])]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let json = serde_json::to_string(&session_problem()).unwrap();
        assert_eq!(
            json,
            r#"{"title":"insufficient_balance","detail":"Add more money!","errors":{"SessionId":["The SessionId is required"]}}"#
        );
    }

    #[test]
    fn rfc_fields_take_precedence() {
        let problem = session_problem();
        assert_eq!(problem.code(), Some("insufficient_balance"));
        assert_eq!(problem.description(), Some("Add more money!"));
    }

    #[test]
    fn rfc_fields_win_over_legacy_pair() {
        let problem: ProblemDetails = serde_json::from_str(
            r#"{"title":"insufficient_balance","detail":"who cares","error_code":"zero_balance","error_description":"go away"}"#,
        )
        .unwrap();
        assert_eq!(problem.code(), Some("insufficient_balance"));
        assert_eq!(problem.legacy_code.as_deref(), Some("zero_balance"));
        assert_eq!(problem.description(), Some("who cares"));
        assert_eq!(problem.legacy_description.as_deref(), Some("go away"));
    }

    #[test]
    fn explicit_nulls_fall_back_to_legacy_pair() {
        let problem: ProblemDetails = serde_json::from_str(
            r#"{"title":null,"detail":null,"error_code":"zero_balance","error_description":"go away"}"#,
        )
        .unwrap();
        assert!(problem.title.is_none());
        assert_eq!(problem.code(), Some("zero_balance"));
        assert!(problem.detail.is_none());
        assert_eq!(problem.description(), Some("go away"));
    }

    #[test]
    fn description_uses_first_validation_message() {
        let problem: ProblemDetails = serde_json::from_str(
            r#"{"errors":{"label":["The Label field is required."],"name":["Too short"]},"type":"https://tools.ietf.org/html/rfc7231#section-6.5.1","title":"One or more validation errors occurred.","status":400,"traceId":"00-74ffb625"}"#,
        )
        .unwrap();
        assert_eq!(problem.code(), Some("One or more validation errors occurred."));
        assert_eq!(problem.description(), Some("The Label field is required."));
        let fields: Vec<&str> = problem.errors.as_ref().unwrap().iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["label", "name"]);
    }

    #[test]
    fn empty_problem_resolves_to_nothing() {
        let problem: ProblemDetails = serde_json::from_str("{}").unwrap();
        assert_eq!(problem.code(), None);
        assert_eq!(problem.description(), None);

        let problem: ProblemDetails = serde_json::from_str(r#"{"errors":{"a":[]}}"#).unwrap();
        assert_eq!(problem.description(), None);
        assert_eq!(problem.to_string(), "unknown problem");
    }
}
