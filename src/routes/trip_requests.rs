use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::trip_requests::{AcceptTripRequestRequest, CreateTripRequestRequest, TripRequestList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::TripRequest,
    response::ApiResponse,
    services::trip_request_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_request))
        .route("/me", get(my_requests))
        .route("/driver", get(unclaimed_requests))
        .route("/{id}/accept", post(accept_request))
        .route("/{id}/reject", post(reject_request))
}

#[utoipa::path(
    post,
    path = "/api/trip-requests",
    request_body = CreateTripRequestRequest,
    responses(
        (status = 200, description = "Request created, matched when a trip fits", body = ApiResponse<TripRequest>),
        (status = 400, description = "Date in the past"),
        (status = 403, description = "Only passengers can request trips")
    ),
    security(("bearer_auth" = [])),
    tag = "Trip Requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTripRequestRequest>,
) -> AppResult<Json<ApiResponse<TripRequest>>> {
    let resp = trip_request_service::create_request(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/trip-requests/me",
    responses(
        (status = 200, description = "Own upcoming requests", body = ApiResponse<TripRequestList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Trip Requests"
)]
pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TripRequestList>>> {
    let resp = trip_request_service::list_my_requests(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/trip-requests/driver",
    responses(
        (status = 200, description = "Pending requests a driver can claim", body = ApiResponse<TripRequestList>),
        (status = 403, description = "Only drivers can browse requests")
    ),
    security(("bearer_auth" = [])),
    tag = "Trip Requests"
)]
pub async fn unclaimed_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TripRequestList>>> {
    let resp = trip_request_service::list_unclaimed_for_driver(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/trip-requests/{id}/accept",
    params(("id" = Uuid, Path, description = "Trip request ID")),
    request_body = AcceptTripRequestRequest,
    responses(
        (status = 200, description = "Request accepted", body = ApiResponse<TripRequest>),
        (status = 403, description = "Trip belongs to another driver"),
        (status = 409, description = "Request is not pending or trip is not planned")
    ),
    security(("bearer_auth" = [])),
    tag = "Trip Requests"
)]
pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptTripRequestRequest>,
) -> AppResult<Json<ApiResponse<TripRequest>>> {
    let resp = trip_request_service::accept_request(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/trip-requests/{id}/reject",
    params(("id" = Uuid, Path, description = "Trip request ID")),
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<TripRequest>),
        (status = 409, description = "Request is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Trip Requests"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TripRequest>>> {
    let resp = trip_request_service::reject_request(&state, &user, id).await?;
    Ok(Json(resp))
}
