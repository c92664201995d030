use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Trip;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTripRequest {
    pub departure_city: String,
    pub destination: String,
    pub date_time: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub available_seats: i32,
    /// Price per seat in cents.
    pub price: i64,
    pub car_type: Option<String>,
    pub description: Option<String>,
    pub sexe: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTripRequest {
    pub departure_city: Option<String>,
    pub destination: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub available_seats: Option<i32>,
    pub price: Option<i64>,
    pub car_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TripList {
    pub items: Vec<Trip>,
}
