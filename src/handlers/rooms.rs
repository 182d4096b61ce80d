use axum::extract::{Path, State};
use serde_json::Value;

use super::utils::object_id;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{Equipment, Room};

/// GET /rooms/:id/equipment
///
/// Equipment points at its room either by ObjectId or by room name, so both
/// are matched. Deleted rooms leave their equipment in place.
pub async fn list_room_equipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Equipment>> {
    let id = object_id(&id)?;
    let room = state.service::<Room>().get_404(&id).await?;

    let mut keys = vec![Value::String(id.to_hex())];
    if let Some(name) = room.name {
        keys.push(Value::String(name));
    }

    let equipment = state
        .service::<Equipment>()
        .find_by_field("room_id", &keys)
        .await?;
    Ok(ApiResponse::success(
        equipment,
        "Room equipment returned successfully",
    ))
}
