use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::TripRequest;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTripRequestRequest {
    pub departure_city: String,
    pub destination: String,
    pub date_time: DateTime<Utc>,
    pub sexe: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptTripRequestRequest {
    /// One of the accepting driver's planned trips.
    pub trip_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TripRequestList {
    pub items: Vec<TripRequest>,
}
