use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::trips::{CreateTripRequest, TripList, UpdateTripRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Trip,
    response::ApiResponse,
    services::trip_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip).get(list_trips))
        .route("/my", get(my_trips))
        .route("/{id}", get(get_trip).put(update_trip).delete(delete_trip))
        .route("/{id}/cancel", post(cancel_trip))
        .route("/{id}/complete", post(complete_trip))
        .route("/{id}/photo", put(upload_photo).get(serve_photo))
}

#[utoipa::path(
    post,
    path = "/api/trips",
    request_body = CreateTripRequest,
    responses(
        (status = 200, description = "Trip created", body = ApiResponse<Trip>),
        (status = 403, description = "Only drivers can create trips")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn create_trip(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTripRequest>,
) -> AppResult<Json<ApiResponse<Trip>>> {
    let resp = trip_service::create_trip(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/trips",
    responses(
        (status = 200, description = "Trips with available seats", body = ApiResponse<TripList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn list_trips(State(state): State<AppState>) -> AppResult<Json<ApiResponse<TripList>>> {
    let resp = trip_service::list_available(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/trips/my",
    responses(
        (status = 200, description = "Own trips", body = ApiResponse<TripList>),
        (status = 403, description = "Only drivers can view their trips")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn my_trips(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TripList>>> {
    let resp = trip_service::list_my_trips(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip", body = ApiResponse<Trip>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn get_trip(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Trip>>> {
    let resp = trip_service::get_trip(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = UpdateTripRequest,
    responses(
        (status = 200, description = "Trip updated", body = ApiResponse<Trip>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn update_trip(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTripRequest>,
) -> AppResult<Json<ApiResponse<Trip>>> {
    let resp = trip_service::update_trip(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn delete_trip(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = trip_service::delete_trip(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/trips/{id}/cancel",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip cancelled", body = ApiResponse<Trip>),
        (status = 409, description = "Trip is not planned")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn cancel_trip(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Trip>>> {
    let resp = trip_service::cancel_trip(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/trips/{id}/complete",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip completed", body = ApiResponse<Trip>),
        (status = 409, description = "Trip is not in progress")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn complete_trip(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Trip>>> {
    let resp = trip_service::complete_trip(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/trips/{id}/photo",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body(content = Vec<u8>, content_type = "image/jpeg"),
    responses(
        (status = 200, description = "Photo stored", body = ApiResponse<Trip>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    bytes: Bytes,
) -> AppResult<Json<ApiResponse<Trip>>> {
    let resp = trip_service::upload_photo(&state, &user, id, &bytes).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/trips/{id}/photo",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Photo bytes", content_type = "image/jpeg"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Trips"
)]
pub async fn serve_photo(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let bytes = trip_service::get_photo(&state, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "public, max-age=31536000"),
        ],
        bytes,
    ))
}
