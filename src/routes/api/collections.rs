use axum::Json;

use crate::models::collection::Collection;

pub async fn list() -> Json<Vec<&'static str>> {
    Json(Collection::choices())
}
