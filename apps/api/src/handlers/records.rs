use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use campus_application::{EntityPatch, FieldMatch, WriteScope};
use campus_domain::{EntitySnapshot, TrackedEntityType};

use crate::dto::{EntityRecordRequest, EntityRecordResponse, UpdateMatchingRequest};
use crate::error::ApiResult;
use crate::state::AppState;

fn into_responses(snapshots: Vec<EntitySnapshot>) -> Json<Vec<EntityRecordResponse>> {
    Json(
        snapshots
            .into_iter()
            .map(EntityRecordResponse::from)
            .collect(),
    )
}

pub async fn list_records_handler(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> ApiResult<Json<Vec<EntityRecordResponse>>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let records = state
        .entity_record_service
        .list_records(entity_type)
        .await?;

    Ok(into_responses(records))
}

pub async fn list_archived_records_handler(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> ApiResult<Json<Vec<EntityRecordResponse>>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let records = state
        .entity_record_service
        .list_archived_records(entity_type)
        .await?;

    Ok(into_responses(records))
}

pub async fn get_record_handler(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<Json<EntityRecordResponse>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let record = state
        .entity_record_service
        .get_record(entity_type, entity_id.as_str())
        .await?;

    Ok(Json(EntityRecordResponse::from(record)))
}

pub async fn create_record_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<WriteScope>,
    Path(entity_type): Path<String>,
    Json(payload): Json<EntityRecordRequest>,
) -> ApiResult<(StatusCode, Json<EntityRecordResponse>)> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let record = state
        .entity_record_service
        .create_record(&scope, entity_type, payload.data)
        .await?;

    Ok((StatusCode::CREATED, Json(EntityRecordResponse::from(record))))
}

pub async fn update_record_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<WriteScope>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Json(payload): Json<EntityRecordRequest>,
) -> ApiResult<Json<EntityRecordResponse>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let record = state
        .entity_record_service
        .update_record(&scope, entity_type, entity_id.as_str(), payload.data)
        .await?;

    Ok(Json(EntityRecordResponse::from(record)))
}

pub async fn update_matching_records_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<WriteScope>,
    Path(entity_type): Path<String>,
    Json(payload): Json<UpdateMatchingRequest>,
) -> ApiResult<Json<Vec<EntityRecordResponse>>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let filter = FieldMatch {
        field: payload.field,
        value: payload.equals,
    };
    let patch = EntityPatch {
        set: payload.set.into_iter().collect(),
        unset: payload.unset,
    };

    let records = state
        .entity_record_service
        .update_records_matching(&scope, entity_type, filter, patch)
        .await?;

    Ok(into_responses(records))
}

pub async fn archive_record_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<WriteScope>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<Json<EntityRecordResponse>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let record = state
        .entity_record_service
        .archive_record(&scope, entity_type, entity_id.as_str())
        .await?;

    Ok(Json(EntityRecordResponse::from(record)))
}

pub async fn restore_record_handler(
    State(state): State<AppState>,
    Extension(scope): Extension<WriteScope>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<Json<EntityRecordResponse>> {
    let entity_type = entity_type.parse::<TrackedEntityType>()?;
    let record = state
        .entity_record_service
        .restore_record(&scope, entity_type, entity_id.as_str())
        .await?;

    Ok(Json(EntityRecordResponse::from(record)))
}
