use bson::oid::ObjectId;

use crate::error::ApiError;
use crate::store::parse_object_id;

/// Validate a path identifier before anything touches the store
pub fn object_id(raw: &str) -> Result<ObjectId, ApiError> {
    parse_object_id(raw).ok_or_else(|| {
        tracing::info!("Rejected malformed ObjectId '{}'", raw);
        ApiError::bad_request("ObjectId is written in the wrong format")
    })
}
