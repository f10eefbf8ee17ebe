use axum::Json;
use axum::extract::{Path, Query, State};
use campus_application::AuditRecordQuery;

use crate::dto::AuditRecordResponse;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct AuditHistoryQuery {
    pub limit: Option<usize>,
}

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<Vec<AuditRecordResponse>>> {
    let defaults = AuditRecordQuery::default();
    let records = state
        .audit_service
        .list_records(AuditRecordQuery {
            entity_type: query
                .entity_type
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            limit: query.limit.unwrap_or(defaults.limit),
            offset: query.offset.unwrap_or(defaults.offset),
        })
        .await?
        .into_iter()
        .map(AuditRecordResponse::from)
        .collect();

    Ok(Json(records))
}

pub async fn entity_audit_history_handler(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(query): Query<AuditHistoryQuery>,
) -> ApiResult<Json<Vec<AuditRecordResponse>>> {
    let records = state
        .audit_service
        .entity_history(
            entity_type.as_str(),
            entity_id.as_str(),
            query.limit.unwrap_or(AuditRecordQuery::default().limit),
        )
        .await?
        .into_iter()
        .map(AuditRecordResponse::from)
        .collect();

    Ok(Json(records))
}

pub async fn get_audit_record_handler(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> ApiResult<Json<AuditRecordResponse>> {
    let record = state.audit_service.find_record(audit_id.as_str()).await?;

    Ok(Json(AuditRecordResponse::from(record)))
}
