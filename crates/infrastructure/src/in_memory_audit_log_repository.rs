use std::cmp::Reverse;

use async_trait::async_trait;
use campus_application::{AuditLogRepository, AuditRecordQuery};
use campus_core::{AppError, AppResult};
use campus_domain::AuditRecord;
use tokio::sync::RwLock;
use uuid::Uuid;


/// In-memory append-only audit record store.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogRepository {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLogRepository {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

/// Newest-first ordering; records sharing a timestamp keep reverse append order.
fn newest_first<'a>(records: impl DoubleEndedIterator<Item = &'a AuditRecord>) -> Vec<AuditRecord> {
    let mut ordered = records.rev().cloned().collect::<Vec<_>>();
    ordered.sort_by_key(|record| Reverse(record.timestamp()));
    ordered
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append_record(&self, record: AuditRecord) -> AppResult<()> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|stored| stored.audit_id() == record.audit_id())
        {
            return Err(AppError::Conflict(format!(
                "audit record '{}' already exists",
                record.audit_id()
            )));
        }

        records.push(record);
        Ok(())
    }

    async fn list_records(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        let records = self.records.read().await;
        let entity_type = query.entity_type.as_deref();

        Ok(newest_first(records.iter().filter(|record| {
            entity_type.is_none_or(|entity_type| record.entity_type() == entity_type)
        }))
        .into_iter()
        .skip(query.offset)
        .take(query.capped_limit())
        .collect())
    }

    async fn list_entity_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> AppResult<Vec<AuditRecord>> {
        let records = self.records.read().await;

        let mut history = newest_first(records.iter().filter(|record| {
            record.entity_type() == entity_type && record.entity_id() == entity_id
        }));
        history.truncate(limit.clamp(1, AuditRecordQuery::MAX_LIMIT));

        Ok(history)
    }

    async fn find_record(&self, audit_id: &str) -> AppResult<Option<AuditRecord>> {
        let audit_id = Uuid::parse_str(audit_id).map_err(|error| {
            AppError::Validation(format!("invalid audit record id '{audit_id}': {error}"))
        })?;

        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.audit_id() == audit_id)
            .cloned())
    }
}
