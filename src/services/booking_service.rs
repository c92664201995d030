use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::bookings::{BookingList, CreateBookingRequest},
    entity::{
        bookings::{
            ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings,
            Model as BookingModel,
        },
        trips::{ActiveModel as TripActive, Entity as Trips, Model as TripModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    lifecycle::TripStatus,
    middleware::auth::{AuthUser, ensure_passenger},
    models::Booking,
    response::{ApiResponse, Meta},
    services::{notification_service, trip_service},
    state::AppState,
};

/// Policy cap on seats per booking.
pub const MAX_SEATS_PER_BOOKING: i32 = 3;

/// Book seats on a trip. The seat decrement and the booking insert commit in
/// one transaction over a locked trip row; concurrent attempts serialize
/// through the database and fail with `Conflict` once seats run out.
pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<Booking>> {
    ensure_passenger(user)?;

    if payload.seats_booked < 1 {
        return Err(AppError::BadRequest("seats_booked must be positive".into()));
    }
    if payload.seats_booked > MAX_SEATS_PER_BOOKING {
        return Err(AppError::BadRequest(format!(
            "seats_booked must not exceed {MAX_SEATS_PER_BOOKING}"
        )));
    }

    let txn = state.orm.begin().await?;

    let trip = Trips::find_by_id(payload.trip_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let trip = trip_service::refresh_status(&txn, trip).await?;

    match trip_service::status_of(&trip) {
        TripStatus::Cancelled => {
            return Err(AppError::Conflict("trip is cancelled".into()));
        }
        TripStatus::Completed => {
            return Err(AppError::Conflict("trip is completed".into()));
        }
        TripStatus::Planned | TripStatus::InProgress => {}
    }

    if trip.available_seats < payload.seats_booked {
        return Err(AppError::Conflict("not enough available seats".into()));
    }

    let remaining = trip.available_seats - payload.seats_booked;
    let driver_id = trip.driver_id;

    let mut active: TripActive = trip.into();
    active.available_seats = Set(remaining);
    let trip = active.update(&txn).await?;

    let booking = BookingActive {
        id: Set(Uuid::new_v4()),
        trip_id: Set(trip.id),
        passenger_id: Set(user.user_id),
        seats_booked: Set(payload.seats_booked),
        status: Set("confirmed".to_string()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_create",
        "bookings",
        serde_json::json!({
            "booking_id": booking.id,
            "trip_id": trip.id,
            "seats_booked": booking.seats_booked,
        }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    // Confirmation email rides on the notification log; its failure never
    // touches the committed booking.
    if let Err(err) = send_confirmation(state, user.user_id, driver_id, &trip, &booking).await {
        tracing::warn!(error = %err, booking_id = %booking.id, "booking confirmation failed");
    }

    Ok(ApiResponse::success(
        "Booking confirmed",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

async fn send_confirmation(
    state: &AppState,
    passenger_id: Uuid,
    driver_id: Uuid,
    trip: &TripModel,
    booking: &BookingModel,
) -> AppResult<()> {
    let passenger = Users::find_by_id(passenger_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let total = trip.price * booking.seats_booked as i64;
    let message = format!(
        "Your booking has been confirmed.\n\
         Departure: {}\n\
         Destination: {}\n\
         Date and time: {}\n\
         Seats booked: {}\n\
         Total price: {}.{:02}",
        trip.departure_city,
        trip.destination,
        trip.date_time.with_timezone(&Utc).format("%Y-%m-%d %H:%M"),
        booking.seats_booked,
        total / 100,
        total % 100,
    );

    notification_service::record_and_deliver(
        state,
        driver_id,
        passenger_id,
        &passenger.email,
        Some(trip),
        "Your booking confirmation",
        message,
    )
    .await?;

    Ok(())
}

/// Reverse a booking: add its seats back to the trip and flag the booking
/// cancelled, atomically. A second cancellation of the same booking is
/// rejected with `Conflict` and restores nothing.
pub async fn cancel_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    let txn = state.orm.begin().await?;

    let booking = Bookings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if booking.passenger_id != user.user_id && user.role != "admin" {
        return Err(AppError::Forbidden);
    }
    if booking.status == "cancelled" {
        return Err(AppError::Conflict("booking is already cancelled".into()));
    }

    let trip = Trips::find_by_id(booking.trip_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let trip = trip_service::refresh_status(&txn, trip).await?;

    // Seats only return to trips that can still be booked; completed and
    // cancelled trips keep their final counts. Same rule as the admin-side
    // release on user deletion.
    match trip_service::status_of(&trip) {
        TripStatus::Planned | TripStatus::InProgress => {
            let restored = trip.available_seats + booking.seats_booked;
            let mut trip_active: TripActive = trip.into();
            trip_active.available_seats = Set(restored);
            trip_active.update(&txn).await?;
        }
        TripStatus::Completed | TripStatus::Cancelled => {}
    }

    let mut active: BookingActive = booking.into();
    active.status = Set("cancelled".to_string());
    let booking = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_cancel",
        "bookings",
        serde_json::json!({ "booking_id": booking.id, "trip_id": booking.trip_id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking cancelled",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_bookings(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_passenger(user)?;
    let items: Vec<_> = Bookings::find()
        .filter(BookingCol::PassengerId.eq(user.user_id))
        .order_by_desc(BookingCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(booking_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items },
        Some(meta),
    ))
}

pub(crate) fn booking_from_entity(model: BookingModel) -> Booking {
    Booking {
        id: model.id,
        trip_id: model.trip_id,
        passenger_id: model.passenger_id,
        seats_booked: model.seats_booked,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
