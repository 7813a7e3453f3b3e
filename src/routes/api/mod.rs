pub mod collections;
pub mod scrape;

use axum::Router;
use axum::routing::{get, post};

use crate::routes::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/collections", get(collections::list))
        .route("/scrape", post(scrape::start))
        .route("/jobs/{id}", get(scrape::status))
        .with_state(state);

    Router::new().nest("/api", api)
}
