//! JSON Patch (RFC 6902) documents and JSON Merge Patch (RFC 7386) bodies.
//!
//! Only building and (de)serialization live here. Nothing in this crate
//! applies a patch to a document.

pub mod merge;

pub use merge::MergePatch;

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// The `op` discriminant of a patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// One JSON Patch operation.
///
/// Serializes with only the fields of its variant, in a fixed order, and
/// `op` last:
///
/// | variant   | wire fields                |
/// |-----------|----------------------------|
/// | `add`     | `path`, `value`, `op`      |
/// | `remove`  | `path`, `op`               |
/// | `replace` | `path`, `value`, `op`      |
/// | `move`    | `from`, `path`, `op`       |
/// | `copy`    | `path`, `from`, `op`       |
/// | `test`    | `path`, `value`, `op`      |
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

impl PatchOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Add { .. } => OperationKind::Add,
            Self::Remove { .. } => OperationKind::Remove,
            Self::Replace { .. } => OperationKind::Replace,
            Self::Move { .. } => OperationKind::Move,
            Self::Copy { .. } => OperationKind::Copy,
            Self::Test { .. } => OperationKind::Test,
        }
    }

    /// Target location of the operation.
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. }
            | Self::Test { path, .. } => path,
        }
    }
}

impl Serialize for PatchOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let op = self.kind().to_string();
        match self {
            Self::Add { path, value } | Self::Replace { path, value } | Self::Test { path, value } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("path", path)?;
                map.serialize_entry("value", value)?;
                map.serialize_entry("op", &op)?;
                map.end()
            }
            Self::Remove { path } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("path", path)?;
                map.serialize_entry("op", &op)?;
                map.end()
            }
            Self::Move { from, path } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("from", from)?;
                map.serialize_entry("path", path)?;
                map.serialize_entry("op", &op)?;
                map.end()
            }
            Self::Copy { from, path } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("path", path)?;
                map.serialize_entry("from", from)?;
                map.serialize_entry("op", &op)?;
                map.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawOperation {
    op: OperationKind,
    path: Option<String>,
    from: Option<String>,
    #[serde(default, deserialize_with = "present_value")]
    value: Option<Value>,
}

// Distinguishes `"value": null` (Some(Null)) from a missing field (None).
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl<'de> Deserialize<'de> for PatchOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawOperation::deserialize(deserializer)?;
        let op = raw.op;
        let path: String = require::<_, D::Error>(raw.path, op, "path")?;
        Ok(match op {
            OperationKind::Add => Self::Add {
                path,
                value: require::<_, D::Error>(raw.value, op, "value")?,
            },
            OperationKind::Remove => Self::Remove { path },
            OperationKind::Replace => Self::Replace {
                path,
                value: require::<_, D::Error>(raw.value, op, "value")?,
            },
            OperationKind::Move => Self::Move {
                from: require::<_, D::Error>(raw.from, op, "from")?,
                path,
            },
            OperationKind::Copy => Self::Copy {
                from: require::<_, D::Error>(raw.from, op, "from")?,
                path,
            },
            OperationKind::Test => Self::Test {
                path,
                value: require::<_, D::Error>(raw.value, op, "value")?,
            },
        })
    }
}

fn require<T, E: de::Error>(field: Option<T>, op: OperationKind, name: &str) -> Result<T, E> {
    field.ok_or_else(|| E::custom(format!("`{op}` operation requires `{name}`")))
}

/// Ordered, append-only list of patch operations.
///
/// Operations apply sequentially on the server, so insertion order is the
/// wire order. The builder never validates paths, reorders or de-duplicates.
///
/// # Example
/// ```
/// use apikit::patch::PatchDocument;
/// use serde_json::json;
///
/// let doc = PatchDocument::new()
///     .replace("/name", "Jane")
///     .remove("/nickname")
///     .add("/tags/-", "vip");
/// assert_eq!(doc.len(), 3);
/// assert_eq!(
///     serde_json::to_value(&doc).unwrap()[0],
///     json!({"path": "/name", "value": "Jane", "op": "replace"}),
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchDocument {
    operations: Vec<PatchOperation>,
}

impl PatchDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Add {
            path: path.into(),
            value: value.into(),
        })
    }

    pub fn remove(self, path: impl Into<String>) -> Self {
        self.push(PatchOperation::Remove { path: path.into() })
    }

    pub fn replace(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Replace {
            path: path.into(),
            value: value.into(),
        })
    }

    /// Move the value at `from` to `path`.
    pub fn move_to(self, from: impl Into<String>, path: impl Into<String>) -> Self {
        self.push(PatchOperation::Move {
            from: from.into(),
            path: path.into(),
        })
    }

    /// Copy the value at `from` to `path`.
    pub fn copy(self, from: impl Into<String>, path: impl Into<String>) -> Self {
        self.push(PatchOperation::Copy {
            from: from.into(),
            path: path.into(),
        })
    }

    pub fn test(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Test {
            path: path.into(),
            value: value.into(),
        })
    }

    pub fn push(mut self, operation: PatchOperation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Operations in insertion order.
    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<PatchOperation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl From<Vec<PatchOperation>> for PatchDocument {
    fn from(operations: Vec<PatchOperation>) -> Self {
        Self { operations }
    }
}

impl<'a> IntoIterator for &'a PatchDocument {
    type Item = &'a PatchOperation;
    type IntoIter = std::slice::Iter<'a, PatchOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move { from, path } | Self::Copy { from, path } => {
                write!(f, "{} {from} -> {path}", self.kind())
            }
            other => write!(f, "{} {}", other.kind(), other.path()),
        }
    }
}
