use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Notification;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    pub passenger_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub message: String,
}

/// Outcome of a notification send: the row always exists; `email_status`
/// reports what the delivery collaborator did with it.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationReceipt {
    pub notification_id: Uuid,
    pub email_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}
