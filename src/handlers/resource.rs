//! Handlers shared by every entity kind, instantiated per [`Resource`] in the router.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::utils::object_id;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Resource;
use crate::store::Document;

/// GET /{kind}
pub async fn list<R: Resource>(State(state): State<AppState>) -> ApiResult<Vec<R>> {
    let records = state.service::<R>().get_all().await?;
    Ok(ApiResponse::success(
        records,
        format!("{} returned successfully", R::PLURAL),
    ))
}

/// GET /{kind}/:id
pub async fn show<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<R> {
    let id = object_id(&id)?;
    let record = state.service::<R>().get_404(&id).await?;
    tracing::info!("{} {} returned", R::LABEL, id);
    Ok(ApiResponse::success(
        record,
        format!("{} returned successfully", R::LABEL),
    ))
}

/// POST /{kind}
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    payload: Result<Json<R>, JsonRejection>,
) -> ApiResult<R> {
    let Json(record) = payload?;
    let created = state.service::<R>().add(record).await?;
    Ok(ApiResponse::created(
        created,
        format!("{} added successfully", R::LABEL),
    ))
}

/// DELETE /{kind}/:id
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let id = object_id(&id)?;
    state.service::<R>().remove(&id).await?;
    Ok(ApiResponse::success(
        format!("{} {} deleted from the database", R::LABEL, id),
        format!("{} deleted successfully", R::LABEL),
    ))
}

/// PATCH /{kind}/:id - merge the given fields into the record
pub async fn patch<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<R> {
    let id = object_id(&id)?;
    let Json(fields) = payload?;
    let record = state.service::<R>().patch_additional(&id, fields).await?;
    Ok(ApiResponse::success(
        record,
        format!("{} patched successfully", R::LABEL),
    ))
}

/// PUT /{kind}/:id - replace the record contents, keeping its id
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<R>, JsonRejection>,
) -> ApiResult<R> {
    let id = object_id(&id)?;
    let Json(record) = payload?;
    let record = state.service::<R>().replace(&id, record).await?;
    Ok(ApiResponse::success(
        record,
        format!("{} updated successfully", R::LABEL),
    ))
}
