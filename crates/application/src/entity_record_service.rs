use std::sync::Arc;

use campus_core::{AppError, AppResult};
use campus_domain::{EntitySnapshot, TrackedEntityType};
use serde_json::Value;
use tracing::info;

use crate::{AuditService, EntityPatch, EntityRepository, FieldMatch, WriteScope};


/// Audited write paths for tracked business documents.
#[derive(Clone)]
pub struct EntityRecordService {
    repository: Arc<dyn EntityRepository>,
    audit_service: AuditService,
}

impl EntityRecordService {
    /// Creates a service from an entity store and the audit interceptor.
    #[must_use]
    pub fn new(repository: Arc<dyn EntityRepository>, audit_service: AuditService) -> Self {
        Self {
            repository,
            audit_service,
        }
    }

    /// Lists live documents of one entity type.
    pub async fn list_records(
        &self,
        entity_type: TrackedEntityType,
    ) -> AppResult<Vec<EntitySnapshot>> {
        self.repository
            .list_entities(entity_type.as_str(), None)
            .await
    }

    /// Lists archived documents of one entity type.
    pub async fn list_archived_records(
        &self,
        entity_type: TrackedEntityType,
    ) -> AppResult<Vec<EntitySnapshot>> {
        self.repository
            .list_entities(entity_type.archive_collection(), None)
            .await
    }

    /// Returns one live document.
    pub async fn get_record(
        &self,
        entity_type: TrackedEntityType,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot> {
        self.repository
            .find_entity(entity_type.as_str(), entity_id)
            .await?
            .ok_or_else(|| missing_record(entity_type.as_str(), entity_id))
    }

    /// Inserts a document and records a create.
    pub async fn create_record(
        &self,
        scope: &WriteScope,
        entity_type: TrackedEntityType,
        data: Value,
    ) -> AppResult<EntitySnapshot> {
        ensure_document_object(&data)?;

        self.audit_service
            .with_audit(entity_type.as_str(), None, scope, || {
                self.repository
                    .insert_entity(entity_type.as_str(), None, data)
            })
            .await
    }

    /// Replaces a document by identifier and records an update.
    pub async fn update_record(
        &self,
        scope: &WriteScope,
        entity_type: TrackedEntityType,
        entity_id: &str,
        data: Value,
    ) -> AppResult<EntitySnapshot> {
        ensure_document_object(&data)?;

        self.audit_service
            .with_audit(entity_type.as_str(), Some(entity_id), scope, || {
                self.repository
                    .replace_entity(entity_type.as_str(), entity_id, data)
            })
            .await
    }

    /// Patches every document matching `filter`, recording one update each.
    pub async fn update_records_matching(
        &self,
        scope: &WriteScope,
        entity_type: TrackedEntityType,
        filter: FieldMatch,
        patch: EntityPatch,
    ) -> AppResult<Vec<EntitySnapshot>> {
        patch.validate()?;

        let updated = self
            .audit_service
            .with_audit_many(entity_type.as_str(), &filter, scope, || {
                self.repository
                    .update_matching(entity_type.as_str(), &filter, &patch)
            })
            .await?;

        info!(
            entity_type = entity_type.as_str(),
            field = filter.field.as_str(),
            updated = updated.len(),
            "updated documents by query"
        );

        Ok(updated)
    }

    /// Moves a live document into its archive collection.
    ///
    /// The archive copy keeps the live identifier and is recorded with an
    /// archive action. The move is atomic in the store, so a failure leaves
    /// the live document in place and records nothing.
    pub async fn archive_record(
        &self,
        scope: &WriteScope,
        entity_type: TrackedEntityType,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot> {
        let archived = self
            .repository
            .move_entity(
                entity_type.as_str(),
                entity_type.archive_collection(),
                entity_id,
            )
            .await?;

        self.audit_service.record_archive(&archived, scope).await;
        info!(
            entity_type = entity_type.as_str(),
            entity_id, "archived document"
        );

        Ok(archived)
    }

    /// Moves an archived document back into its live collection.
    ///
    /// The restored document is recorded as a create in the live collection.
    pub async fn restore_record(
        &self,
        scope: &WriteScope,
        entity_type: TrackedEntityType,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot> {
        let restored = self
            .audit_service
            .with_audit(entity_type.as_str(), Some(entity_id), scope, || {
                self.repository.move_entity(
                    entity_type.archive_collection(),
                    entity_type.as_str(),
                    entity_id,
                )
            })
            .await?;

        info!(
            entity_type = entity_type.as_str(),
            entity_id, "restored archived document"
        );

        Ok(restored)
    }
}

fn ensure_document_object(data: &Value) -> AppResult<()> {
    if data.is_object() {
        return Ok(());
    }

    Err(AppError::Validation(
        "entity document data must be a JSON object".to_owned(),
    ))
}

fn missing_record(collection: &str, entity_id: &str) -> AppError {
    AppError::NotFound(format!(
        "document '{entity_id}' does not exist in '{collection}'"
    ))
}
