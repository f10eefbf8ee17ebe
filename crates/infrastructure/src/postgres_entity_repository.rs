use async_trait::async_trait;
use campus_application::{EntityPatch, EntityRepository, FieldMatch};
use campus_core::{AppError, AppResult};
use campus_domain::EntitySnapshot;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;


/// PostgreSQL-backed repository for entity documents and their archives.
#[derive(Clone)]
pub struct PostgresEntityRepository {
    pool: PgPool,
}

impl PostgresEntityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EntityDocumentRow {
    entity_type: String,
    entity_id: String,
    data: Value,
}

fn snapshot_from_row(row: EntityDocumentRow) -> AppResult<EntitySnapshot> {
    EntitySnapshot::new(row.entity_id, row.entity_type, row.data)
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some("23505")
    )
}

fn missing_document(entity_type: &str, entity_id: &str) -> AppError {
    AppError::NotFound(format!(
        "document '{entity_id}' does not exist in '{entity_type}'"
    ))
}

#[async_trait]
impl EntityRepository for PostgresEntityRepository {
    async fn find_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>> {
        let row = sqlx::query_as::<_, EntityDocumentRow>(
            r#"
            SELECT entity_type, entity_id, data
            FROM entity_documents
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find document '{entity_id}' in '{entity_type}': {error}"
            ))
        })?;

        row.map(snapshot_from_row).transpose()
    }

    async fn list_entities(
        &self,
        entity_type: &str,
        filter: Option<&FieldMatch>,
    ) -> AppResult<Vec<EntitySnapshot>> {
        let rows = sqlx::query_as::<_, EntityDocumentRow>(
            r#"
            SELECT entity_type, entity_id, data
            FROM entity_documents
            WHERE entity_type = $1
                AND ($2::TEXT IS NULL OR data -> $2 = $3::JSONB)
            ORDER BY entity_id
            "#,
        )
        .bind(entity_type)
        .bind(filter.map(|filter| filter.field.as_str()))
        .bind(filter.map(|filter| filter.value.clone()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list documents in '{entity_type}': {error}"
            ))
        })?;

        rows.into_iter().map(snapshot_from_row).collect()
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

        let result = sqlx::query(
            r#"
            INSERT INTO entity_documents (entity_type, entity_id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(entity_type)
        .bind(entity_id.as_str())
        .bind(snapshot.data())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(snapshot),
            Err(error) if is_unique_violation(&error) => Err(AppError::Conflict(format!(
                "document '{entity_id}' already exists in '{entity_type}'"
            ))),
            Err(error) => Err(AppError::Internal(format!(
                "failed to insert document into '{entity_type}': {error}"
            ))),
        }
    }

    async fn replace_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        data: Value,
    ) -> AppResult<EntitySnapshot> {
        let snapshot = EntitySnapshot::new(entity_id, entity_type, data)?;

        let result = sqlx::query(
            r#"
            UPDATE entity_documents
            SET data = $3, updated_at = now()
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(snapshot.data())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to replace document '{entity_id}' in '{entity_type}': {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(missing_document(entity_type, entity_id));
        }

        Ok(snapshot)
    }

    async fn update_matching(
        &self,
        entity_type: &str,
        filter: &FieldMatch,
        patch: &EntityPatch,
    ) -> AppResult<Vec<EntitySnapshot>> {
        let rows = sqlx::query_as::<_, EntityDocumentRow>(
            r#"
            UPDATE entity_documents
            SET data = (data || $4::JSONB) - $5::TEXT[], updated_at = now()
            WHERE entity_type = $1 AND data -> $2 = $3::JSONB
            RETURNING entity_type, entity_id, data
            "#,
        )
        .bind(entity_type)
        .bind(filter.field.as_str())
        .bind(&filter.value)
        .bind(Value::Object(patch.set.clone()))
        .bind(&patch.unset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update documents in '{entity_type}' matching '{}': {error}",
                filter.field
            ))
        })?;

        let mut updated = rows
            .into_iter()
            .map(snapshot_from_row)
            .collect::<AppResult<Vec<_>>>()?;
        updated.sort_by(|left, right| left.entity_id().as_str().cmp(right.entity_id().as_str()));

        Ok(updated)
    }

    async fn delete_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM entity_documents
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete document '{entity_id}' from '{entity_type}': {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(missing_document(entity_type, entity_id));
        }

        Ok(())
    }

    async fn move_entity(
        &self,
        from_type: &str,
        to_type: &str,
        entity_id: &str,
    ) -> AppResult<EntitySnapshot> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start move transaction for document '{entity_id}': {error}"
            ))
        })?;

        let row = sqlx::query_as::<_, EntityDocumentRow>(
            r#"
            DELETE FROM entity_documents
            WHERE entity_type = $1 AND entity_id = $2
            RETURNING entity_type, entity_id, data
            "#,
        )
        .bind(from_type)
        .bind(entity_id)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to remove document '{entity_id}' from '{from_type}': {error}"
            ))
        })?
        .ok_or_else(|| missing_document(from_type, entity_id))?;

        let snapshot = EntitySnapshot::new(entity_id, to_type, row.data)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO entity_documents (entity_type, entity_id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(to_type)
        .bind(entity_id)
        .bind(snapshot.data())
        .execute(&mut *transaction)
        .await;

        match inserted {
            Ok(_) => {}
            Err(error) if is_unique_violation(&error) => {
                return Err(AppError::Conflict(format!(
                    "document '{entity_id}' already exists in '{to_type}'"
                )));
            }
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to insert document '{entity_id}' into '{to_type}': {error}"
                )));
            }
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit move of document '{entity_id}' from '{from_type}' to '{to_type}': {error}"
            ))
        })?;

        Ok(snapshot)
    }
}
