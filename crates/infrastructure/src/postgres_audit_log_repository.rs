use async_trait::async_trait;
use campus_application::{AuditLogRepository, AuditRecordQuery};
use campus_core::{ActorIdentity, AppError, AppResult, RequestContext};
use campus_domain::{AuditAction, AuditRecord, AuditRecordParts, ChangeEntry};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;


/// PostgreSQL-backed append-only audit record store.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRecordRow {
    id: Uuid,
    action: String,
    entity_type: String,
    entity_id: String,
    actor_id: String,
    actor_label: String,
    before_state: Option<Value>,
    after_state: Value,
    diff: Option<Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_audit_id(audit_id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(audit_id).map_err(|error| {
        AppError::Validation(format!("invalid audit record id '{audit_id}': {error}"))
    })
}

fn audit_record_from_row(row: AuditRecordRow) -> AppResult<AuditRecord> {
    let diff = row
        .diff
        .map(serde_json::from_value::<Vec<ChangeEntry>>)
        .transpose()
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to decode diff of audit record '{}': {error}",
                row.id
            ))
        })?;

    let context = RequestContext {
        ip: row.ip_address,
        user_agent: row.user_agent,
    };

    AuditRecord::from_parts(AuditRecordParts {
        audit_id: row.id,
        action: row.action.parse::<AuditAction>()?,
        entity_type: row.entity_type,
        entity_id: row.entity_id,
        actor: ActorIdentity::new(row.actor_id, row.actor_label)?,
        timestamp: row.created_at,
        before: row.before_state,
        after: row.after_state,
        diff,
        context: (!context.is_empty()).then_some(context),
    })
}

fn audit_records_from_rows(rows: Vec<AuditRecordRow>) -> AppResult<Vec<AuditRecord>> {
    rows.into_iter().map(audit_record_from_row).collect()
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append_record(&self, record: AuditRecord) -> AppResult<()> {
        let diff = record
            .diff()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to encode diff of audit record '{}': {error}",
                    record.audit_id()
                ))
            })?;
        let context = record.context();

        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id,
                action,
                entity_type,
                entity_id,
                actor_id,
                actor_label,
                before_state,
                after_state,
                diff,
                ip_address,
                user_agent,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.audit_id())
        .bind(record.action().as_str())
        .bind(record.entity_type())
        .bind(record.entity_id())
        .bind(record.actor().id())
        .bind(record.actor().label())
        .bind(record.before())
        .bind(record.after())
        .bind(diff)
        .bind(context.and_then(|context| context.ip.as_deref()))
        .bind(context.and_then(|context| context.user_agent.as_deref()))
        .bind(record.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit record for {} '{}': {error}",
                record.entity_type(),
                record.entity_id()
            ))
        })?;

        Ok(())
    }

    async fn list_records(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        let capped_limit = query.capped_limit() as i64;
        let offset = i64::try_from(query.offset).map_err(|_| {
            AppError::Validation(format!("audit log offset {} is out of range", query.offset))
        })?;

        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT
                id,
                action,
                entity_type,
                entity_id,
                actor_id,
                actor_label,
                before_state,
                after_state,
                diff,
                ip_address,
                user_agent,
                created_at
            FROM audit_records
            WHERE ($1::TEXT IS NULL OR entity_type = $1)
            ORDER BY created_at DESC, seq DESC
            LIMIT $2
            OFFSET $3
            "#,
        )
        .bind(query.entity_type)
        .bind(capped_limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit records: {error}")))?;

        audit_records_from_rows(rows)
    }

    async fn list_entity_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> AppResult<Vec<AuditRecord>> {
        let capped_limit = limit.clamp(1, AuditRecordQuery::MAX_LIMIT) as i64;

        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT
                id,
                action,
                entity_type,
                entity_id,
                actor_id,
                actor_label,
                before_state,
                after_state,
                diff,
                ip_address,
                user_agent,
                created_at
            FROM audit_records
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC, seq DESC
            LIMIT $3
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(capped_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list audit history for {entity_type} '{entity_id}': {error}"
            ))
        })?;

        audit_records_from_rows(rows)
    }

    async fn find_record(&self, audit_id: &str) -> AppResult<Option<AuditRecord>> {
        let audit_uuid = parse_audit_id(audit_id)?;

        let row = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT
                id,
                action,
                entity_type,
                entity_id,
                actor_id,
                actor_label,
                before_state,
                after_state,
                diff,
                ip_address,
                user_agent,
                created_at
            FROM audit_records
            WHERE id = $1
            "#,
        )
        .bind(audit_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find audit record '{audit_id}': {error}"))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        audit_record_from_row(row).map(Some).inspect_err(|error| {
            warn!(audit_id, %error, "stored audit record failed validation");
        })
    }
}
