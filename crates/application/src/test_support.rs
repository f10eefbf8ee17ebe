use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use campus_core::{ActorIdentity, AppError, AppResult, RequestContext};
use campus_domain::{AuditRecord, EntitySnapshot};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    AuditLogRepository, AuditRecordQuery, EntityPatch, EntityRepository, FieldMatch, WriteScope,
};

pub(crate) fn registrar_scope() -> WriteScope {
    WriteScope::for_actor(
        ActorIdentity::new("user-1", "Registrar Office").unwrap_or_else(|_| unreachable!()),
        Some(RequestContext {
            ip: Some("10.1.2.3".to_owned()),
            user_agent: Some("campus-tests".to_owned()),
        }),
    )
}

#[derive(Default)]
pub(crate) struct FakeEntityRepository {
    documents: Mutex<BTreeMap<(String, String), Value>>,
    next_id: AtomicUsize,
    pub(crate) fail_reads: AtomicBool,
    pub(crate) fail_moves: AtomicBool,
}

impl FakeEntityRepository {
    pub(crate) async fn seed(&self, entity_type: &str, entity_id: &str, data: Value) {
        self.documents
            .lock()
            .await
            .insert((entity_type.to_owned(), entity_id.to_owned()), data);
    }

    pub(crate) async fn stored(&self, entity_type: &str, entity_id: &str) -> Option<Value> {
        self.documents
            .lock()
            .await
            .get(&(entity_type.to_owned(), entity_id.to_owned()))
            .cloned()
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Internal("entity store unavailable".to_owned()));
        }

        Ok(())
    }
}

#[async_trait]
impl EntityRepository for FakeEntityRepository {
    async fn find_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>> {
        self.check_reads()?;
        self.stored(entity_type, entity_id)
            .await
            .map(|data| EntitySnapshot::new(entity_id, entity_type, data))
            .transpose()
    }

    async fn list_entities(
        &self,
        entity_type: &str,
        filter: Option<&FieldMatch>,
    ) -> AppResult<Vec<EntitySnapshot>> {
        self.check_reads()?;
        self.documents
            .lock()
            .await
            .iter()
            .filter(|((stored_type, _), data)| {
                stored_type == entity_type && filter.is_none_or(|filter| filter.matches(data))
            })
            .map(|((stored_type, entity_id), data)| {
                EntitySnapshot::new(entity_id.as_str(), stored_type.as_str(), data.clone())
            })
            .collect()
    }

    async fn insert_entity(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
        data: Value,
    ) -> AppResult<EntitySnapshot> {
        let entity_id = entity_id.map(ToOwned::to_owned).unwrap_or_else(|| {
            format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        });
        let snapshot = EntitySnapshot::new(entity_id.as_str(), entity_type, data)?;

        let mut documents = self.documents.lock().await;
        let key = (entity_type.to_owned(), entity_id);
        if documents.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "{} '{}' already exists",
                key.0, key.1
            )));
        }
        documents.insert(key, snapshot.data().clone());

        Ok(snapshot)
    }

    async fn replace_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        data: Value,
    ) -> AppResult<EntitySnapshot> {
        let snapshot = EntitySnapshot::new(entity_id, entity_type, data)?;
        let mut documents = self.documents.lock().await;
        let stored = documents
            .get_mut(&(entity_type.to_owned(), entity_id.to_owned()))
            .ok_or_else(|| AppError::NotFound(format!("{entity_type} '{entity_id}'")))?;
        *stored = snapshot.data().clone();

        Ok(snapshot)
    }

    async fn update_matching(
        &self,
        entity_type: &str,
        filter: &FieldMatch,
        patch: &EntityPatch,
    ) -> AppResult<Vec<EntitySnapshot>> {
        let mut documents = self.documents.lock().await;
        let mut updated = Vec::new();
        for ((stored_type, entity_id), data) in documents.iter_mut() {
            if stored_type == entity_type && filter.matches(data) {
                patch.apply_to(data)?;
                updated.push(EntitySnapshot::new(
                    entity_id.as_str(),
                    stored_type.as_str(),
                    data.clone(),
                )?);
            }
        }

        Ok(updated)
    }

    async fn delete_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<()> {
        self.documents
            .lock()
            .await
            .remove(&(entity_type.to_owned(), entity_id.to_owned()))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("{entity_type} '{entity_id}'")))
    }

    async fn move_entity(
        &self,
        from_type: &str,
        to_type: &str,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot> {
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(AppError::Internal("entity store unavailable".to_owned()));
        }

        let mut documents = self.documents.lock().await;
        let source = (from_type.to_owned(), entity_id.to_owned());
        let target = (to_type.to_owned(), entity_id.to_owned());
        if documents.contains_key(&target) {
            return Err(AppError::Conflict(format!(
                "{to_type} '{entity_id}' already exists"
            )));
        }
        let data = documents
            .remove(&source)
            .ok_or_else(|| AppError::NotFound(format!("{from_type} '{entity_id}'")))?;
        let snapshot = EntitySnapshot::new(entity_id, to_type, data)?;
        documents.insert(target, snapshot.data().clone());

        Ok(snapshot)
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditLogRepository {
    records: Mutex<Vec<AuditRecord>>,
    pub(crate) fail_appends: AtomicBool,
}

impl FakeAuditLogRepository {
    pub(crate) async fn appended(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditLogRepository for FakeAuditLogRepository {
    async fn append_record(&self, record: AuditRecord) -> AppResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit store unavailable".to_owned()));
        }

        self.records.lock().await.push(record);
        Ok(())
    }

    async fn list_records(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        let mut records = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| {
                query
                    .entity_type
                    .as_deref()
                    .is_none_or(|entity_type| record.entity_type() == entity_type)
            })
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by_key(|record| std::cmp::Reverse(record.timestamp()));

        Ok(records
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
        let mut records = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| record.entity_type() == entity_type && record.entity_id() == entity_id)
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by_key(|record| std::cmp::Reverse(record.timestamp()));
        records.truncate(limit);

        Ok(records)
    }

    async fn find_record(&self, audit_id: &str) -> AppResult<Option<AuditRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|record| record.audit_id().to_string() == audit_id)
            .cloned())
    }
}
