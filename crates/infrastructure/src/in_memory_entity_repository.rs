use std::collections::HashMap;

use async_trait::async_trait;
use campus_application::{EntityPatch, EntityRepository, FieldMatch};
use campus_core::{AppError, AppResult};
use campus_domain::EntitySnapshot;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;


/// In-memory entity document repository.
#[derive(Debug, Default)]
pub struct InMemoryEntityRepository {
    documents: RwLock<HashMap<(String, String), Value>>,
}

impl InMemoryEntityRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }
}

fn document_key(entity_type: &str, entity_id: &str) -> (String, String) {
    (entity_type.to_owned(), entity_id.to_owned())
}

fn sorted_snapshots(
    documents: impl Iterator<Item = (String, String, Value)>,
) -> AppResult<Vec<EntitySnapshot>> {
    let mut snapshots = documents
        .map(|(entity_type, entity_id, data)| {
            EntitySnapshot::new(entity_id, entity_type, data)
        })
        .collect::<AppResult<Vec<_>>>()?;
    snapshots.sort_by(|left, right| left.entity_id().as_str().cmp(right.entity_id().as_str()));

    Ok(snapshots)
}

#[async_trait]
impl EntityRepository for InMemoryEntityRepository {
    async fn find_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>> {
        self.documents
            .read()
            .await
            .get(&document_key(entity_type, entity_id))
            .cloned()
            .map(|data| EntitySnapshot::new(entity_id, entity_type, data))
            .transpose()
    }

    async fn list_entities(
        &self,
        entity_type: &str,
        filter: Option<&FieldMatch>,
    ) -> AppResult<Vec<EntitySnapshot>> {
        let documents = self.documents.read().await;

        sorted_snapshots(
            documents
                .iter()
                .filter(|((stored_type, _), data)| {
                    stored_type == entity_type && filter.is_none_or(|filter| filter.matches(data))
                })
                .map(|((stored_type, entity_id), data)| {
                    (stored_type.clone(), entity_id.clone(), data.clone())
                }),
        )
    }

    async fn insert_entity(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
        data: Value,
    ) -> AppResult<EntitySnapshot> {
        let entity_id = entity_id
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let snapshot = EntitySnapshot::new(entity_id.as_str(), entity_type, data)?;

        let key = document_key(entity_type, entity_id.as_str());
        let mut documents = self.documents.write().await;
        if documents.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "document '{}' already exists in '{}'",
                key.1, key.0
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

        let mut documents = self.documents.write().await;
        let stored = documents
            .get_mut(&document_key(entity_type, entity_id))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "document '{entity_id}' does not exist in '{entity_type}'"
                ))
            })?;
        *stored = snapshot.data().clone();

        Ok(snapshot)
    }

    async fn update_matching(
        &self,
        entity_type: &str,
        filter: &FieldMatch,
        patch: &EntityPatch,
    ) -> AppResult<Vec<EntitySnapshot>> {
        let mut documents = self.documents.write().await;
        let mut updated = Vec::new();

        for ((stored_type, entity_id), data) in documents.iter_mut() {
            if stored_type != entity_type || !filter.matches(data) {
                continue;
            }

            patch.apply_to(data)?;
            updated.push((stored_type.clone(), entity_id.clone(), data.clone()));
        }

        sorted_snapshots(updated.into_iter())
    }

    async fn delete_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<()> {
        self.documents
            .write()
            .await
            .remove(&document_key(entity_type, entity_id))
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "document '{entity_id}' does not exist in '{entity_type}'"
                ))
            })
    }

    async fn move_entity(
        &self,
        from_type: &str,
        to_type: &str,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot> {
        let source = document_key(from_type, entity_id);
        let target = document_key(to_type, entity_id);

        let mut documents = self.documents.write().await;
        if documents.contains_key(&target) {
            return Err(AppError::Conflict(format!(
                "document '{entity_id}' already exists in '{to_type}'"
            )));
        }

        let data = documents.remove(&source).ok_or_else(|| {
            AppError::NotFound(format!(
                "document '{entity_id}' does not exist in '{from_type}'"
            ))
        })?;
        let snapshot = EntitySnapshot::new(entity_id, to_type, data)?;
        documents.insert(target, snapshot.data().clone());

        Ok(snapshot)
    }
}
