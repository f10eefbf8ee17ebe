use std::fmt::{Display, Formatter};

use campus_core::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One step of a change path: a record field or a sequence position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name within a record.
    Field(String),
    /// Position within an ordered sequence.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Field(value.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Classification of a single structural difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Value exists only in the after state.
    Added,
    /// Value exists only in the before state.
    Deleted,
    /// Value exists in both states with different content.
    Edited,
    /// Sequence element at a shared position differs.
    ArrayChanged,
}

impl ChangeKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Edited => "edited",
            Self::ArrayChanged => "array_changed",
        }
    }

    fn expects_previous_value(self) -> bool {
        !matches!(self, Self::Added)
    }

    fn expects_new_value(self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

/// Field-level difference between two entity states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChangeEntryPayload")]
pub struct ChangeEntry {
    path: Vec<PathSegment>,
    kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_value: Option<Value>,
}

impl ChangeEntry {
    /// Creates an entry for a value present only in the after state.
    #[must_use]
    pub fn added(path: Vec<PathSegment>, new_value: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Added,
            previous_value: None,
            new_value: Some(new_value),
        }
    }

    /// Creates an entry for a value present only in the before state.
    #[must_use]
    pub fn deleted(path: Vec<PathSegment>, previous_value: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Deleted,
            previous_value: Some(previous_value),
            new_value: None,
        }
    }

    /// Creates an entry for a value replaced in place.
    #[must_use]
    pub fn edited(path: Vec<PathSegment>, previous_value: Value, new_value: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::Edited,
            previous_value: Some(previous_value),
            new_value: Some(new_value),
        }
    }

    /// Creates an entry for a sequence element replaced at the same position.
    #[must_use]
    pub fn array_changed(path: Vec<PathSegment>, previous_value: Value, new_value: Value) -> Self {
        Self {
            path,
            kind: ChangeKind::ArrayChanged,
            previous_value: Some(previous_value),
            new_value: Some(new_value),
        }
    }

    /// Returns the location of the change within the entity.
    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Returns the change classification.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Returns the value before the change, if the kind carries one.
    #[must_use]
    pub fn previous_value(&self) -> Option<&Value> {
        self.previous_value.as_ref()
    }

    /// Returns the value after the change, if the kind carries one.
    #[must_use]
    pub fn new_value(&self) -> Option<&Value> {
        self.new_value.as_ref()
    }

    /// Returns a dotted rendering of the path, e.g. `guardians[0].phone`.
    #[must_use]
    pub fn path_label(&self) -> String {
        ChangePath(&self.path).to_string()
    }
}

struct ChangePath<'a>(&'a [PathSegment]);

impl Display for ChangePath<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return formatter.write_str("(root)");
        }

        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if position == 0 => write!(formatter, "{name}")?,
                PathSegment::Field(name) => write!(formatter, ".{name}")?,
                PathSegment::Index(index) => write!(formatter, "[{index}]")?,
            }
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct ChangeEntryPayload {
    path: Vec<PathSegment>,
    kind: ChangeKind,
    #[serde(default, deserialize_with = "present_value")]
    previous_value: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    new_value: Option<Value>,
}

// An explicit JSON null is a present value, only a missing key is absent.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<ChangeEntryPayload> for ChangeEntry {
    type Error = AppError;

    fn try_from(payload: ChangeEntryPayload) -> Result<Self, Self::Error> {
        if payload.kind.expects_previous_value() != payload.previous_value.is_some()
            || payload.kind.expects_new_value() != payload.new_value.is_some()
        {
            return Err(AppError::Validation(format!(
                "change entry of kind '{}' at '{}' has inconsistent values",
                payload.kind.as_str(),
                ChangePath(&payload.path)
            )));
        }

        Ok(Self {
            path: payload.path,
            kind: payload.kind,
            previous_value: payload.previous_value,
            new_value: payload.new_value,
        })
    }
}
