use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Feedback;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFeedbackRequest {
    pub trip_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub booking_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedbackList {
    pub items: Vec<Feedback>,
}
