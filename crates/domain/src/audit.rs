use std::str::FromStr;

use campus_core::{ActorIdentity, AppError, AppResult, NonEmptyString, RequestContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{ChangeEntry, EntitySnapshot, compute_diff};

/// Classification of an audited mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A document was inserted.
    Create,
    /// An existing document was overwritten.
    Update,
    /// A document was moved into its archive collection.
    Archive,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Archive => "archive",
        }
    }

    fn carries_before_state(self) -> bool {
        matches!(self, Self::Update)
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "archive" => Ok(Self::Archive),
            _ => Err(AppError::Validation(format!(
                "unknown audit action value '{value}'"
            ))),
        }
    }
}

/// Stored parts of an audit record, used to rehydrate persisted rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordParts {
    /// Stable record identifier.
    pub audit_id: Uuid,
    /// Mutation classification.
    pub action: AuditAction,
    /// Collection of the mutated document.
    pub entity_type: String,
    /// Identifier of the mutated document.
    pub entity_id: String,
    /// Acting user.
    pub actor: ActorIdentity,
    /// Record creation instant.
    pub timestamp: DateTime<Utc>,
    /// Document state before the mutation.
    pub before: Option<Value>,
    /// Document state after the mutation.
    pub after: Value,
    /// Field-level differences between `before` and `after`.
    pub diff: Option<Vec<ChangeEntry>>,
    /// Request metadata.
    pub context: Option<RequestContext>,
}

/// Immutable audit trail entry for one tracked mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    audit_id: Uuid,
    action: AuditAction,
    entity_type: NonEmptyString,
    entity_id: NonEmptyString,
    actor: ActorIdentity,
    timestamp: DateTime<Utc>,
    before: Option<Value>,
    after: Value,
    diff: Option<Vec<ChangeEntry>>,
    context: Option<RequestContext>,
}

impl AuditRecord {
    /// Records the insertion of `created`. No before state and no diff.
    #[must_use]
    pub fn created(
        created: &EntitySnapshot,
        actor: ActorIdentity,
        context: Option<RequestContext>,
    ) -> Self {
        Self::without_before_state(AuditAction::Create, created, actor, context)
    }

    /// Records an overwrite of a document whose durable state was `before`.
    #[must_use]
    pub fn updated(
        before: Value,
        updated: &EntitySnapshot,
        actor: ActorIdentity,
        context: Option<RequestContext>,
    ) -> Self {
        let diff = compute_diff(&before, updated.data());

        Self {
            audit_id: Uuid::new_v4(),
            action: AuditAction::Update,
            entity_type: updated.entity_type().clone(),
            entity_id: updated.entity_id().clone(),
            actor,
            timestamp: Utc::now(),
            before: Some(before),
            after: updated.data().clone(),
            diff: Some(diff),
            context: context.filter(|context| !context.is_empty()),
        }
    }

    /// Records that `archived` now exists in an archive collection.
    ///
    /// The prior live state is not attached and no diff is computed.
    #[must_use]
    pub fn archived(
        archived: &EntitySnapshot,
        actor: ActorIdentity,
        context: Option<RequestContext>,
    ) -> Self {
        Self::without_before_state(AuditAction::Archive, archived, actor, context)
    }

    /// Rebuilds a persisted record, enforcing before/diff consistency.
    pub fn from_parts(parts: AuditRecordParts) -> AppResult<Self> {
        if parts.action.carries_before_state() != parts.before.is_some() {
            return Err(AppError::Validation(format!(
                "audit record '{}' with action '{}' has an inconsistent before state",
                parts.audit_id,
                parts.action.as_str()
            )));
        }

        if parts.before.is_some() != parts.diff.is_some() {
            return Err(AppError::Validation(format!(
                "audit record '{}' must carry a diff exactly when it carries a before state",
                parts.audit_id
            )));
        }

        Ok(Self {
            audit_id: parts.audit_id,
            action: parts.action,
            entity_type: NonEmptyString::new(parts.entity_type)?,
            entity_id: NonEmptyString::new(parts.entity_id)?,
            actor: parts.actor,
            timestamp: parts.timestamp,
            before: parts.before,
            after: parts.after,
            diff: parts.diff,
            context: parts.context.filter(|context| !context.is_empty()),
        })
    }

    fn without_before_state(
        action: AuditAction,
        snapshot: &EntitySnapshot,
        actor: ActorIdentity,
        context: Option<RequestContext>,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            action,
            entity_type: snapshot.entity_type().clone(),
            entity_id: snapshot.entity_id().clone(),
            actor,
            timestamp: Utc::now(),
            before: None,
            after: snapshot.data().clone(),
            diff: None,
            context: context.filter(|context| !context.is_empty()),
        }
    }

    /// Returns the stable record identifier.
    #[must_use]
    pub fn audit_id(&self) -> Uuid {
        self.audit_id
    }

    /// Returns the mutation classification.
    #[must_use]
    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns the collection of the mutated document.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_str()
    }

    /// Returns the identifier of the mutated document.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_str()
    }

    /// Returns the acting user.
    #[must_use]
    pub fn actor(&self) -> &ActorIdentity {
        &self.actor
    }

    /// Returns the record creation instant.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the durable state observed before the mutation.
    #[must_use]
    pub fn before(&self) -> Option<&Value> {
        self.before.as_ref()
    }

    /// Returns the state written by the mutation.
    #[must_use]
    pub fn after(&self) -> &Value {
        &self.after
    }

    /// Returns the computed change list for updates.
    #[must_use]
    pub fn diff(&self) -> Option<&[ChangeEntry]> {
        self.diff.as_deref()
    }

    /// Returns captured request metadata.
    #[must_use]
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use campus_core::{ActorIdentity, RequestContext};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::{AuditAction, AuditRecord, AuditRecordParts};
    use crate::{ChangeKind, EntitySnapshot};

    fn registrar() -> ActorIdentity {
        ActorIdentity::new("user-1", "Registrar").unwrap_or_else(|_| unreachable!())
    }

    fn student(data: serde_json::Value) -> EntitySnapshot {
        EntitySnapshot::new("stu-1", "Student", data).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn created_record_has_no_before_state_or_diff() {
        let created = student(json!({"name": "Ana"}));
        let record = AuditRecord::created(&created, registrar(), None);

        assert_eq!(record.action(), AuditAction::Create);
        assert!(record.before().is_none());
        assert!(record.diff().is_none());
        assert_eq!(record.after(), created.data());
        assert_eq!(record.entity_type(), "Student");
        assert_eq!(record.entity_id(), "stu-1");
    }

    #[test]
    fn updated_record_carries_diff_against_before_state() {
        let updated = student(json!({"name": "Anna", "grade": 8}));
        let record = AuditRecord::updated(
            json!({"name": "Ana", "grade": 8}),
            &updated,
            registrar(),
            Some(RequestContext {
                ip: Some("10.0.0.4".to_owned()),
                user_agent: None,
            }),
        );

        assert_eq!(record.action(), AuditAction::Update);
        let diff = record.diff().unwrap_or_default();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].kind(), ChangeKind::Edited);
        assert_eq!(
            record.context().and_then(|context| context.ip.as_deref()),
            Some("10.0.0.4")
        );
    }

    #[test]
    fn archived_record_skips_diff() {
        let archived = EntitySnapshot::new("stu-1", "StudentArchive", json!({"name": "Ana"}))
            .unwrap_or_else(|_| unreachable!());
        let record = AuditRecord::archived(&archived, registrar(), Some(RequestContext::default()));

        assert_eq!(record.action(), AuditAction::Archive);
        assert!(record.before().is_none());
        assert!(record.diff().is_none());
        assert!(record.context().is_none());
        assert_eq!(record.entity_type(), "StudentArchive");
    }

    #[test]
    fn from_parts_rejects_update_without_before_state() {
        let result = AuditRecord::from_parts(AuditRecordParts {
            audit_id: Uuid::new_v4(),
            action: AuditAction::Update,
            entity_type: "Section".to_owned(),
            entity_id: "sec-1".to_owned(),
            actor: registrar(),
            timestamp: Utc::now(),
            before: None,
            after: json!({}),
            diff: None,
            context: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn from_parts_rejects_create_with_diff() {
        let result = AuditRecord::from_parts(AuditRecordParts {
            audit_id: Uuid::new_v4(),
            action: AuditAction::Create,
            entity_type: "Section".to_owned(),
            entity_id: "sec-1".to_owned(),
            actor: registrar(),
            timestamp: Utc::now(),
            before: None,
            after: json!({}),
            diff: Some(Vec::new()),
            context: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn action_roundtrip_storage_value() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Archive] {
            assert_eq!(AuditAction::from_str(action.as_str()).ok(), Some(action));
        }
        assert!(AuditAction::from_str("delete").is_err());
    }
}
