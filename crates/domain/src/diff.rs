//! Structural diff between two entity states.
//!
//! Records are compared field by field, sequences position by position. The
//! result names every differing leaf; containers that only hold differing
//! leaves never produce an entry of their own.

use std::collections::BTreeSet;

use campus_core::{AppError, AppResult};
use chrono::DateTime;
use serde_json::{Map, Number, Value};

use crate::{ChangeEntry, ChangeKind, PathSegment};

/// Computes the ordered change list turning `before` into `after`.
///
/// Non-record roots are compared as opaque values and yield at most one
/// `Edited` entry with an empty path.
#[must_use]
pub fn compute_diff(before: &Value, after: &Value) -> Vec<ChangeEntry> {
    let mut changes = Vec::new();

    match (before, after) {
        (Value::Object(before), Value::Object(after)) => {
            diff_records(&mut Vec::new(), before, after, &mut changes);
        }
        _ => {
            if !values_equal(before, after) {
                changes.push(ChangeEntry::edited(
                    Vec::new(),
                    before.clone(),
                    after.clone(),
                ));
            }
        }
    }

    changes
}

/// Deep value equality used by the diff engine.
///
/// Numbers compare numerically and strings holding RFC 3339 timestamps compare
/// by instant, so `"2024-06-01T08:00:00Z"` equals `"2024-06-01T10:00:00+02:00"`.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::String(left), Value::String(right)) => {
            left == right || same_instant(left, right)
        }
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(name, left)| {
                    right
                        .get(name)
                        .is_some_and(|right| values_equal(left, right))
                })
        }
        _ => false,
    }
}

/// Replays a change list onto `base` and returns the reconstructed state.
///
/// Entries are applied in order, which matches the order produced by
/// [`compute_diff`].
pub fn apply_changes(base: &Value, changes: &[ChangeEntry]) -> AppResult<Value> {
    let mut target = base.clone();
    for change in changes {
        apply_change(&mut target, change)?;
    }

    Ok(target)
}

fn diff_records(
    path: &mut Vec<PathSegment>,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    changes: &mut Vec<ChangeEntry>,
) {
    let names = before.keys().chain(after.keys()).collect::<BTreeSet<_>>();

    for name in names {
        path.push(PathSegment::Field(name.clone()));
        match (before.get(name), after.get(name)) {
            (Some(previous), Some(next)) => diff_values(path, previous, next, changes),
            (Some(previous), None) => {
                changes.push(ChangeEntry::deleted(path.clone(), previous.clone()));
            }
            (None, Some(next)) => changes.push(ChangeEntry::added(path.clone(), next.clone())),
            (None, None) => {}
        }
        path.pop();
    }
}

fn diff_values(
    path: &mut Vec<PathSegment>,
    before: &Value,
    after: &Value,
    changes: &mut Vec<ChangeEntry>,
) {
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => {
            diff_records(path, before, after, changes);
        }
        (Value::Array(before), Value::Array(after)) => {
            diff_sequences(path, before, after, changes);
        }
        _ => {
            if !values_equal(before, after) {
                changes.push(ChangeEntry::edited(
                    path.clone(),
                    before.clone(),
                    after.clone(),
                ));
            }
        }
    }
}

fn diff_sequences(
    path: &mut Vec<PathSegment>,
    before: &[Value],
    after: &[Value],
    changes: &mut Vec<ChangeEntry>,
) {
    let shared = before.len().min(after.len());

    for (index, (previous, next)) in before.iter().zip(after).enumerate() {
        if !values_equal(previous, next) {
            path.push(PathSegment::Index(index));
            changes.push(ChangeEntry::array_changed(
                path.clone(),
                previous.clone(),
                next.clone(),
            ));
            path.pop();
        }
    }

    for (index, next) in after.iter().enumerate().skip(shared) {
        path.push(PathSegment::Index(index));
        changes.push(ChangeEntry::added(path.clone(), next.clone()));
        path.pop();
    }

    // Highest position first so in-order replay removes from the tail.
    for (index, previous) in before.iter().enumerate().skip(shared).rev() {
        path.push(PathSegment::Index(index));
        changes.push(ChangeEntry::deleted(path.clone(), previous.clone()));
        path.pop();
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if left == right {
        return true;
    }

    if (left.is_i64() || left.is_u64()) && (right.is_i64() || right.is_u64()) {
        return false;
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn same_instant(left: &str, right: &str) -> bool {
    match (
        DateTime::parse_from_rfc3339(left),
        DateTime::parse_from_rfc3339(right),
    ) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn apply_change(target: &mut Value, change: &ChangeEntry) -> AppResult<()> {
    let Some((last, parents)) = change.path().split_last() else {
        return match (change.kind(), change.new_value()) {
            (ChangeKind::Deleted, _) | (_, None) => Err(invalid_path(change)),
            (_, Some(next)) => {
                *target = next.clone();
                Ok(())
            }
        };
    };

    let mut container = target;
    for segment in parents {
        container = match segment {
            PathSegment::Field(name) => container
                .as_object_mut()
                .and_then(|record| record.get_mut(name)),
            PathSegment::Index(index) => container
                .as_array_mut()
                .and_then(|sequence| sequence.get_mut(*index)),
        }
        .ok_or_else(|| invalid_path(change))?;
    }

    match last {
        PathSegment::Field(name) => {
            let record = container
                .as_object_mut()
                .ok_or_else(|| invalid_path(change))?;
            match change.new_value() {
                Some(next) => {
                    record.insert(name.clone(), next.clone());
                }
                None => {
                    record.remove(name).ok_or_else(|| invalid_path(change))?;
                }
            }
        }
        PathSegment::Index(index) => {
            let index = *index;
            let sequence = container
                .as_array_mut()
                .ok_or_else(|| invalid_path(change))?;
            match (change.kind(), change.new_value()) {
                (ChangeKind::Added, Some(next)) if index <= sequence.len() => {
                    sequence.insert(index, next.clone());
                }
                (ChangeKind::Deleted, _) if index < sequence.len() => {
                    sequence.remove(index);
                }
                (ChangeKind::Edited | ChangeKind::ArrayChanged, Some(next))
                    if index < sequence.len() =>
                {
                    sequence[index] = next.clone();
                }
                _ => return Err(invalid_path(change)),
            }
        }
    }

    Ok(())
}

fn invalid_path(change: &ChangeEntry) -> AppError {
    AppError::Validation(format!(
        "cannot apply '{}' change at '{}'",
        change.kind().as_str(),
        change.path_label()
    ))
}
