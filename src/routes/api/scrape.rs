use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::extraction_job::{ExtractionJob, ScrapeRequest};
use crate::routes::AppState;

pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<Value>, AppError> {
    let job = state.runner.submit(request).await?;
    Ok(Json(json!({
        "job_id": job.id,
        "status": job.state,
        "message": "Scrape job started in background",
    })))
}

pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExtractionJob>, AppError> {
    let not_found = || AppError::NotFound(format!("Job {id} not found"));
    let id: Uuid = id.parse().map_err(|_| not_found())?;
    let job = state.runner.store().get(id).await.ok_or_else(not_found)?;
    Ok(Json(job))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::routes::router;
    use crate::routes::test_support::{json_body, state};

    fn post_scrape(body: &str) -> Request<Body> {
        Request::post("/api/scrape")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_collection_is_bad_request() {
        let response = router(state())
            .oneshot(post_scrape(r#"{"collection": "moon-jobs"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Invalid collection: 'moon-jobs'"));
    }

    #[tokio::test]
    async fn zero_pages_is_bad_request() {
        let response = router(state())
            .oneshot(post_scrape(r#"{"collection": "remote-jobs", "pages": 0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_job_can_be_polled() {
        let app = router(state());

        let response = app
            .clone()
            .oneshot(post_scrape(r#"{"collection": "remote-jobs", "limit": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["message"], "Scrape job started in background");
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::get(format!("/api/jobs/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let job = json_body(response).await;
        assert_eq!(job["id"], job_id.as_str());
        assert_eq!(job["collection"], "remote-jobs");
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let app = router(state());
        for id in ["3f1c2d9e-8a7b-4c6d-9e0f-112233445566", "not-a-uuid"] {
            let response = app
                .clone()
                .oneshot(
                    Request::get(format!("/api/jobs/{id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }
}
