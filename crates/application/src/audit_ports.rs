use async_trait::async_trait;
use campus_core::AppResult;
use campus_domain::AuditRecord;

/// Query parameters for audit record listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecordQuery {
    /// Optional entity type filter.
    pub entity_type: Option<String>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination. Not capped.
    pub offset: usize,
}

impl AuditRecordQuery {
    /// Upper bound applied to `limit` by every adapter.
    pub const MAX_LIMIT: usize = 500;

    /// Returns `limit` clamped into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }
}

impl Default for AuditRecordQuery {
    fn default() -> Self {
        Self {
            entity_type: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Port for the append-only audit record store.
///
/// Implementations expose no update or delete operations.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Persists one audit record.
    async fn append_record(&self, record: AuditRecord) -> AppResult<()>;

    /// Lists records newest-first, optionally filtered by entity type.
    async fn list_records(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>>;

    /// Lists the newest-first history of one document.
    async fn list_entity_history(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: usize,
    ) -> AppResult<Vec<AuditRecord>>;

    /// Returns one record by identifier.
    async fn find_record(&self, audit_id: &str) -> AppResult<Option<AuditRecord>>;
}
