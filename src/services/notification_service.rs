use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::notifications::{CreateNotificationRequest, NotificationList, NotificationReceipt},
    entity::{
        notifications::{
            ActiveModel as NotificationActive, Column as NotificationCol, Entity as Notifications,
            Model as NotificationModel,
        },
        trips::{Entity as Trips, Model as TripModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_driver},
    models::Notification,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Persist a notification row with `email_status = pending`, then attempt
/// delivery and record the outcome. The row is committed before the first
/// delivery attempt, so a failed send never loses the notification.
pub async fn record_and_deliver(
    state: &AppState,
    driver_id: Uuid,
    passenger_id: Uuid,
    passenger_email: &str,
    trip: Option<&TripModel>,
    subject: &str,
    message: String,
) -> AppResult<NotificationReceipt> {
    let notification = NotificationActive {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        passenger_id: Set(passenger_id),
        trip_id: Set(trip.map(|t| t.id)),
        message: Set(message.clone()),
        email_status: Set("pending".to_string()),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let body = email_body(&message, trip);
    let email_status = match state.mailer.send(passenger_email, subject, body).await {
        Ok(()) => "sent",
        Err(err) => {
            tracing::warn!(
                error = %err,
                notification_id = %notification.id,
                "email delivery failed"
            );
            "failed"
        }
    };

    let id = notification.id;
    let mut active: NotificationActive = notification.into();
    active.email_status = Set(email_status.to_string());
    let notification = active.update(&state.orm).await?;

    tracing::info!(notification_id = %id, email_status, "notification recorded");

    Ok(NotificationReceipt {
        notification_id: notification.id,
        email_status: notification.email_status,
    })
}

fn email_body(message: &str, trip: Option<&TripModel>) -> String {
    let mut body = format!(
        "You have received a new message from your driver:\n\n{message}\n"
    );
    match trip {
        Some(trip) => {
            body.push_str(&format!(
                "\nTrip: {} to {}\nDate and time: {}\n",
                trip.departure_city,
                trip.destination,
                trip.date_time.with_timezone(&Utc).format("%Y-%m-%d %H:%M"),
            ));
        }
        None => {
            body.push_str("\nThis notification is not associated with a specific trip.\n");
        }
    }
    body.push_str("\nBest regards,\nThe Carpool Team\n");
    body
}

pub async fn send_notification(
    state: &AppState,
    user: &AuthUser,
    payload: CreateNotificationRequest,
) -> AppResult<ApiResponse<NotificationReceipt>> {
    ensure_driver(user)?;

    let passenger = Users::find_by_id(payload.passenger_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let trip = match payload.trip_id {
        Some(trip_id) => {
            let trip = Trips::find_by_id(trip_id)
                .one(&state.orm)
                .await?
                .ok_or(AppError::NotFound)?;
            if trip.driver_id != user.user_id {
                return Err(AppError::Forbidden);
            }
            Some(trip)
        }
        None => None,
    };

    let receipt = record_and_deliver(
        state,
        user.user_id,
        passenger.id,
        &passenger.email,
        trip.as_ref(),
        "New notification from your driver",
        payload.message,
    )
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "notification_send",
        "notifications",
        serde_json::json!({
            "notification_id": receipt.notification_id,
            "email_status": receipt.email_status,
        }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Notification created and email processed",
        receipt,
        Some(Meta::empty()),
    ))
}

/// Admins see everything; everyone else sees the rows they sent or received.
pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<NotificationList>> {
    let mut finder = Notifications::find().order_by_desc(NotificationCol::CreatedAt);
    if user.role != "admin" {
        finder = finder.filter(
            Condition::any()
                .add(NotificationCol::DriverId.eq(user.user_id))
                .add(NotificationCol::PassengerId.eq(user.user_id)),
        );
    }

    let items: Vec<_> = finder
        .all(&state.orm)
        .await?
        .into_iter()
        .map(notification_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(meta),
    ))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if notification.passenger_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let mut active: NotificationActive = notification.into();
    active.is_read = Set(true);
    let notification = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Notification read",
        notification_from_entity(notification),
        Some(Meta::empty()),
    ))
}

pub(crate) fn notification_from_entity(model: NotificationModel) -> Notification {
    Notification {
        id: model.id,
        driver_id: model.driver_id,
        passenger_id: model.passenger_id,
        trip_id: model.trip_id,
        message: model.message,
        email_status: model.email_status,
        is_read: model.is_read,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
