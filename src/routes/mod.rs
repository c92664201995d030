use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod doc;
pub mod feedback;
pub mod health;
pub mod notifications;
pub mod trip_requests;
pub mod trips;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/trips", trips::router())
        .nest("/bookings", bookings::router())
        .nest("/trip-requests", trip_requests::router())
        .nest("/feedback", feedback::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
