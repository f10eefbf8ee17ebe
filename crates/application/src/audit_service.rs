use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use campus_core::{ActorIdentity, AppError, AppResult, RequestContext};
use campus_domain::{AuditRecord, EntitySnapshot};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{AuditLogRepository, AuditRecordQuery, EntityRepository, FieldMatch};


/// Caller identity and request metadata attached to one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteScope {
    /// Acting user, when the request layer resolved one.
    pub actor: Option<ActorIdentity>,
    /// Request metadata, when captured.
    pub context: Option<RequestContext>,
}

impl WriteScope {
    /// Creates a scope for an identified actor.
    #[must_use]
    pub fn for_actor(actor: ActorIdentity, context: Option<RequestContext>) -> Self {
        Self {
            actor: Some(actor),
            context,
        }
    }

    /// Returns true when writes in this scope are audited.
    #[must_use]
    pub fn is_audited(&self) -> bool {
        self.actor.is_some()
    }
}

/// Change interceptor and read surface for the audit trail.
///
/// Audit capture is observational: failures reading snapshots or appending
/// records are logged and never reach the caller of the primary write.
#[derive(Clone)]
pub struct AuditService {
    entity_repository: Arc<dyn EntityRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
}

impl AuditService {
    /// Creates a service from repository implementations.
    #[must_use]
    pub fn new(
        entity_repository: Arc<dyn EntityRepository>,
        audit_log_repository: Arc<dyn AuditLogRepository>,
    ) -> Self {
        Self {
            entity_repository,
            audit_log_repository,
        }
    }

    /// Reads the durable state of a document before it is written.
    ///
    /// Returns `None` for fresh inserts and when the read fails.
    pub async fn before_write(&self, entity_type: &str, entity_id: Option<&str>) -> Option<Value> {
        let entity_id = entity_id?;

        match self
            .entity_repository
            .find_entity(entity_type, entity_id)
            .await
        {
            Ok(snapshot) => snapshot.map(EntitySnapshot::into_data),
            Err(error) => {
                warn!(
                    entity_type,
                    entity_id,
                    %error,
                    "failed to read before snapshot, write will be audited as a create"
                );
                None
            }
        }
    }

    /// Emits the audit record for a committed write.
    ///
    /// `before` decides between create and update. Nothing is emitted when the
    /// scope carries no actor or when the append fails.
    pub async fn after_write(
        &self,
        written: &EntitySnapshot,
        before: Option<Value>,
        scope: &WriteScope,
    ) -> Option<AuditRecord> {
        let Some(actor) = scope.actor.clone() else {
            debug!(
                entity_type = written.entity_type().as_str(),
                entity_id = written.entity_id().as_str(),
                "skipping audit record without a resolvable actor"
            );
            return None;
        };

        let record = match before {
            Some(before) => AuditRecord::updated(before, written, actor, scope.context.clone()),
            None => AuditRecord::created(written, actor, scope.context.clone()),
        };

        self.append(record).await
    }

    /// Emits an archive record for a document copied into an archive collection.
    pub async fn record_archive(
        &self,
        archived: &EntitySnapshot,
        scope: &WriteScope,
    ) -> Option<AuditRecord> {
        let Some(actor) = scope.actor.clone() else {
            debug!(
                entity_type = archived.entity_type().as_str(),
                entity_id = archived.entity_id().as_str(),
                "skipping archive audit record without a resolvable actor"
            );
            return None;
        };

        self.append(AuditRecord::archived(
            archived,
            actor,
            scope.context.clone(),
        ))
        .await
    }

    /// Runs a single-document write between the before and after hooks.
    ///
    /// The mutation result is returned unchanged; a failed mutation emits no
    /// record.
    pub async fn with_audit<F, Fut>(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
        scope: &WriteScope,
        mutation: F,
    ) -> AppResult<EntitySnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<EntitySnapshot>>,
    {
        if !scope.is_audited() {
            return mutation().await;
        }

        let before = self.before_write(entity_type, entity_id).await;
        let written = mutation().await?;
        self.after_write(&written, before, scope).await;

        Ok(written)
    }

    /// Runs an update-by-query write, emitting one record per written document.
    pub async fn with_audit_many<F, Fut>(
        &self,
        entity_type: &str,
        filter: &FieldMatch,
        scope: &WriteScope,
        mutation: F,
    ) -> AppResult<Vec<EntitySnapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<EntitySnapshot>>>,
    {
        if !scope.is_audited() {
            return mutation().await;
        }

        let mut before_by_id = match self
            .entity_repository
            .list_entities(entity_type, Some(filter))
            .await
        {
            Ok(snapshots) => snapshots
                .into_iter()
                .map(|snapshot| {
                    (
                        snapshot.entity_id().as_str().to_owned(),
                        snapshot.into_data(),
                    )
                })
                .collect::<HashMap<_, _>>(),
            Err(error) => {
                warn!(
                    entity_type,
                    field = filter.field.as_str(),
                    %error,
                    "failed to read before snapshots, writes will be audited as creates"
                );
                HashMap::new()
            }
        };

        let written = mutation().await?;
        for snapshot in &written {
            let before = before_by_id.remove(snapshot.entity_id().as_str());
            self.after_write(snapshot, before, scope).await;
        }

        Ok(written)
    }

    /// Lists audit records newest-first, optionally for one entity type.
    pub async fn list_records(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        self.audit_log_repository.list_records(query).await
    }

    /// Lists the audit history of one document, newest first.
    pub async fn entity_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> AppResult<Vec<AuditRecord>> {
        self.audit_log_repository
            .list_entity_history(
                entity_type,
                entity_id,
                limit.clamp(1, AuditRecordQuery::MAX_LIMIT),
            )
            .await
    }

    /// Returns one audit record.
    pub async fn find_record(&self, audit_id: &str) -> AppResult<AuditRecord> {
        self.audit_log_repository
            .find_record(audit_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("audit record '{audit_id}' does not exist")))
    }

    async fn append(&self, record: AuditRecord) -> Option<AuditRecord> {
        match self.audit_log_repository.append_record(record.clone()).await {
            Ok(()) => {
                debug!(
                    audit_id = %record.audit_id(),
                    action = record.action().as_str(),
                    entity_type = record.entity_type(),
                    entity_id = record.entity_id(),
                    "audit record appended"
                );
                Some(record)
            }
            Err(append_error) => {
                error!(
                    audit_id = %record.audit_id(),
                    action = record.action().as_str(),
                    entity_type = record.entity_type(),
                    entity_id = record.entity_id(),
                    error = %append_error,
                    "failed to append audit record"
                );
                None
            }
        }
    }
}
