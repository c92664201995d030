use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::feedback::{CreateFeedbackRequest, FeedbackList},
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        feedbacks::{
            ActiveModel as FeedbackActive, Column as FeedbackCol, Entity as Feedbacks,
            Model as FeedbackModel,
        },
        trips::Entity as Trips,
    },
    error::{AppError, AppResult},
    lifecycle::TripStatus,
    middleware::auth::AuthUser,
    models::Feedback,
    response::{ApiResponse, Meta},
    services::trip_service,
    state::AppState,
};

/// Record feedback for a completed trip. The submitter must hold a
/// non-cancelled booking on the trip, and only one feedback per (user, trip)
/// is accepted.
pub async fn submit_feedback(
    state: &AppState,
    user: &AuthUser,
    payload: CreateFeedbackRequest,
) -> AppResult<ApiResponse<Feedback>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }

    let trip = Trips::find_by_id(payload.trip_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let trip = trip_service::refresh_status(&state.orm, trip).await?;

    if trip_service::status_of(&trip) != TripStatus::Completed {
        return Err(AppError::Conflict(
            "feedback can only be submitted for completed trips".into(),
        ));
    }

    let booking = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::TripId.eq(trip.id))
                .add(BookingCol::PassengerId.eq(user.user_id))
                .add(BookingCol::Status.ne("cancelled")),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::Forbidden)?;

    let existing = Feedbacks::find()
        .filter(
            Condition::all()
                .add(FeedbackCol::UserId.eq(user.user_id))
                .add(FeedbackCol::TripId.eq(trip.id)),
        )
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "feedback already submitted for this trip".into(),
        ));
    }

    // The pre-check above races with concurrent submissions; the UNIQUE
    // (user_id, trip_id) constraint is the authority, so its violation is the
    // same duplicate answer.
    let feedback = FeedbackActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        trip_id: Set(trip.id),
        booking_id: Set(payload.booking_id.or(Some(booking.id))),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("feedback already submitted for this trip".into())
        }
        _ => err.into(),
    })?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "feedback_create",
        "feedbacks",
        serde_json::json!({ "feedback_id": feedback.id, "trip_id": trip.id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Feedback created",
        feedback_from_entity(feedback),
        Some(Meta::empty()),
    ))
}

/// Feedback for a trip, visible to its driver and to admins.
pub async fn list_for_trip(
    state: &AppState,
    user: &AuthUser,
    trip_id: Uuid,
) -> AppResult<ApiResponse<FeedbackList>> {
    let trip = Trips::find_by_id(trip_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if trip.driver_id != user.user_id && user.role != "admin" {
        return Err(AppError::Forbidden);
    }

    let items: Vec<_> = Feedbacks::find()
        .filter(FeedbackCol::TripId.eq(trip_id))
        .order_by_desc(FeedbackCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(feedback_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Feedback",
        FeedbackList { items },
        Some(meta),
    ))
}

pub(crate) fn feedback_from_entity(model: FeedbackModel) -> Feedback {
    Feedback {
        id: model.id,
        user_id: model.user_id,
        trip_id: model.trip_id,
        booking_id: model.booking_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
