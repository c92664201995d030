use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::feedback::{CreateFeedbackRequest, FeedbackList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Feedback,
    response::ApiResponse,
    services::feedback_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_feedback))
        .route("/trip/{trip_id}", get(trip_feedback))
}

#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = CreateFeedbackRequest,
    responses(
        (status = 200, description = "Feedback recorded", body = ApiResponse<Feedback>),
        (status = 400, description = "Rating out of range"),
        (status = 403, description = "No booking on this trip"),
        (status = 409, description = "Trip not completed or feedback already given")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateFeedbackRequest>,
) -> AppResult<Json<ApiResponse<Feedback>>> {
    let resp = feedback_service::submit_feedback(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/feedback/trip/{trip_id}",
    params(("trip_id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Feedback for the trip", body = ApiResponse<FeedbackList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn trip_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FeedbackList>>> {
    let resp = feedback_service::list_for_trip(&state, &user, trip_id).await?;
    Ok(Json(resp))
}
