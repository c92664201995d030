use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub sexe: Option<String>,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Trip {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub departure_city: String,
    pub destination: String,
    pub date_time: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub available_seats: i32,
    /// Price per seat in cents.
    pub price: i64,
    pub status: String,
    pub car_type: Option<String>,
    pub description: Option<String>,
    pub photo_path: Option<String>,
    pub sexe: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub passenger_id: Uuid,
    pub seats_booked: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TripRequest {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub departure_city: String,
    pub destination: String,
    pub date_time: DateTime<Utc>,
    pub sexe: Option<String>,
    pub status: String,
    pub trip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub passenger_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub message: String,
    pub email_status: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
