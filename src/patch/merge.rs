use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON Merge Patch body.
///
/// Keys keep insertion order. Removing a key emits an explicit `null`,
/// which is how a merge patch deletes a member.
///
/// # Example
/// ```
/// use apikit::patch::MergePatch;
///
/// let patch = MergePatch::new()
///     .set("firstName", "John")
///     .remove("secondName")
///     .nested("address", MergePatch::new().set("city", "Anytown"));
/// assert_eq!(
///     serde_json::to_string(&patch).unwrap(),
///     r#"{"firstName":"John","secondName":null,"address":{"city":"Anytown"}}"#,
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergePatch {
    members: Map<String, Value>,
}

impl MergePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(key.into(), value.into());
        self
    }

    pub fn remove(self, key: impl Into<String>) -> Self {
        self.set(key, Value::Null)
    }

    pub fn nested(self, key: impl Into<String>, patch: MergePatch) -> Self {
        self.set(key, Value::Object(patch.members))
    }

    /// Smallest merge patch that turns `before` into `after`.
    ///
    /// Non-object documents are replaced wholesale, so the result for them is
    /// just `after`.
    pub fn diff(before: &Value, after: &Value) -> Value {
        match (before, after) {
            (Value::Object(old), Value::Object(new)) => {
                let mut patch = Map::new();
                for key in old.keys() {
                    if !new.contains_key(key) {
                        patch.insert(key.clone(), Value::Null);
                    }
                }
                for (key, value) in new {
                    match old.get(key) {
                        Some(previous) if previous == value => {}
                        Some(previous @ Value::Object(_)) if value.is_object() => {
                            patch.insert(key.clone(), Self::diff(previous, value));
                        }
                        _ => {
                            patch.insert(key.clone(), value.clone());
                        }
                    }
                }
                Value::Object(patch)
            }
            _ => after.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.members)
    }
}
