use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::trips::{CreateTripRequest, TripList, UpdateTripRequest},
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        trips::{ActiveModel as TripActive, Column as TripCol, Entity as Trips, Model as TripModel},
    },
    error::{AppError, AppResult},
    lifecycle::{TripStatus, derive_status},
    middleware::auth::{AuthUser, ensure_driver},
    models::Trip,
    response::{ApiResponse, Meta},
    state::AppState,
    storage,
};

pub(crate) fn status_of(model: &TripModel) -> TripStatus {
    TripStatus::parse(&model.status).unwrap_or(TripStatus::Planned)
}

/// Re-derive the lifecycle status from the clock and persist it when it moved.
/// Works inside or outside a transaction; callers that are about to mutate
/// seats run this on a row they already locked.
pub(crate) async fn refresh_status<C: ConnectionTrait>(
    conn: &C,
    model: TripModel,
) -> Result<TripModel, sea_orm::DbErr> {
    let derived = derive_status(
        status_of(&model),
        model.date_time.with_timezone(&Utc),
        model.return_date.map(|d| d.with_timezone(&Utc)),
        Utc::now(),
    );
    if derived.as_str() == model.status {
        return Ok(model);
    }

    let mut active: TripActive = model.into();
    active.status = Set(derived.as_str().to_string());
    active.update(conn).await
}

pub async fn create_trip(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTripRequest,
) -> AppResult<ApiResponse<Trip>> {
    ensure_driver(user)?;

    if payload.available_seats < 1 {
        return Err(AppError::BadRequest("available_seats must be positive".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if let Some(ret) = payload.return_date
        && ret <= payload.date_time
    {
        return Err(AppError::BadRequest(
            "return_date must be after date_time".into(),
        ));
    }

    let trip = TripActive {
        id: Set(Uuid::new_v4()),
        driver_id: Set(user.user_id),
        departure_city: Set(payload.departure_city),
        destination: Set(payload.destination),
        date_time: Set(payload.date_time.into()),
        return_date: Set(payload.return_date.map(Into::into)),
        available_seats: Set(payload.available_seats),
        price: Set(payload.price),
        status: Set(TripStatus::Planned.as_str().to_string()),
        car_type: Set(payload.car_type),
        description: Set(payload.description),
        photo_path: Set(None),
        sexe: Set(payload.sexe),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "trip_create",
        "trips",
        serde_json::json!({ "trip_id": trip.id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Trip created",
        trip_from_entity(trip),
        Some(Meta::empty()),
    ))
}

/// Trips open for booking. Statuses are refreshed on read, so a trip whose
/// departure passed shows up as in_progress here without a background job.
pub async fn list_available(state: &AppState) -> AppResult<ApiResponse<TripList>> {
    let trips = Trips::find()
        .filter(TripCol::AvailableSeats.gt(0))
        .order_by_asc(TripCol::DateTime)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(trips.len());
    for trip in trips {
        let trip = refresh_status(&state.orm, trip).await?;
        items.push(trip_from_entity(trip));
    }

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Trips",
        TripList { items },
        Some(meta),
    ))
}

pub async fn list_my_trips(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<TripList>> {
    ensure_driver(user)?;
    let trips = Trips::find()
        .filter(TripCol::DriverId.eq(user.user_id))
        .order_by_asc(TripCol::DateTime)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(trips.len());
    for trip in trips {
        let trip = refresh_status(&state.orm, trip).await?;
        items.push(trip_from_entity(trip));
    }

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Trips",
        TripList { items },
        Some(meta),
    ))
}

pub async fn get_trip(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Trip>> {
    let trip = Trips::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let trip = refresh_status(&state.orm, trip).await?;
    Ok(ApiResponse::success("Trip", trip_from_entity(trip), None))
}

pub async fn update_trip(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateTripRequest,
) -> AppResult<ApiResponse<Trip>> {
    ensure_driver(user)?;
    let existing = find_owned_trip(state, user, id).await?;

    if let Some(seats) = payload.available_seats {
        if seats < 0 {
            return Err(AppError::BadRequest(
                "available_seats must not be negative".into(),
            ));
        }
        // Seats are a ledger once bookings hold some of them; free-form edits
        // would desync available seats from the booked total.
        let confirmed = Bookings::find()
            .filter(
                Condition::all()
                    .add(BookingCol::TripId.eq(id))
                    .add(BookingCol::Status.eq("confirmed")),
            )
            .count(&state.orm)
            .await?;
        if confirmed > 0 {
            return Err(AppError::Conflict(
                "cannot change seats while confirmed bookings exist".into(),
            ));
        }
    }

    let mut active: TripActive = existing.into();
    if let Some(departure_city) = payload.departure_city {
        active.departure_city = Set(departure_city);
    }
    if let Some(destination) = payload.destination {
        active.destination = Set(destination);
    }
    if let Some(date_time) = payload.date_time {
        active.date_time = Set(date_time.into());
    }
    if let Some(return_date) = payload.return_date {
        active.return_date = Set(Some(return_date.into()));
    }
    if let Some(seats) = payload.available_seats {
        active.available_seats = Set(seats);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(car_type) = payload.car_type {
        active.car_type = Set(Some(car_type));
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }

    let trip = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "trip_update",
        "trips",
        serde_json::json!({ "trip_id": trip.id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Trip updated",
        trip_from_entity(trip),
        Some(Meta::empty()),
    ))
}

pub async fn delete_trip(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_driver(user)?;
    find_owned_trip(state, user, id).await?;

    Bookings::delete_many()
        .filter(BookingCol::TripId.eq(id))
        .exec(&state.orm)
        .await?;
    Trips::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "trip_delete",
        "trips",
        serde_json::json!({ "trip_id": id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Trip deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Explicit driver transition: planned -> cancelled.
pub async fn cancel_trip(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Trip>> {
    ensure_driver(user)?;
    let trip = transition(state, user, id, TripStatus::Planned, TripStatus::Cancelled).await?;
    Ok(ApiResponse::success(
        "Trip cancelled",
        trip_from_entity(trip),
        Some(Meta::empty()),
    ))
}

/// Explicit driver transition: in_progress -> completed. The only way a
/// one-way trip ever completes.
pub async fn complete_trip(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Trip>> {
    ensure_driver(user)?;
    let trip = transition(state, user, id, TripStatus::InProgress, TripStatus::Completed).await?;
    Ok(ApiResponse::success(
        "Trip completed",
        trip_from_entity(trip),
        Some(Meta::empty()),
    ))
}

async fn transition(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    from: TripStatus,
    to: TripStatus,
) -> AppResult<TripModel> {
    use sea_orm::TransactionTrait;

    let txn = state.orm.begin().await?;

    let trip = Trips::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if trip.driver_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let trip = refresh_status(&txn, trip).await?;
    if status_of(&trip) != from {
        return Err(AppError::Conflict(format!(
            "trip is {}, expected {}",
            trip.status,
            from.as_str()
        )));
    }

    let mut active: TripActive = trip.into();
    active.status = Set(to.as_str().to_string());
    let trip = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "trip_status_change",
        "trips",
        serde_json::json!({ "trip_id": trip.id, "status": trip.status }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(trip)
}

pub async fn upload_photo(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    bytes: &[u8],
) -> AppResult<ApiResponse<Trip>> {
    ensure_driver(user)?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty photo upload".into()));
    }
    let trip = find_owned_trip(state, user, id).await?;

    let relative = storage::store_photo(&state.config.upload_dir, "trips", bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("photo store failed: {e}")))?;

    let mut active: TripActive = trip.into();
    active.photo_path = Set(Some(relative));
    let trip = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Photo uploaded",
        trip_from_entity(trip),
        Some(Meta::empty()),
    ))
}

pub async fn get_photo(state: &AppState, id: Uuid) -> AppResult<Vec<u8>> {
    let trip = Trips::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let relative = trip.photo_path.ok_or(AppError::NotFound)?;
    storage::load_photo(&state.config.upload_dir, &relative)
        .await
        .map_err(|_| AppError::NotFound)
}

async fn find_owned_trip(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<TripModel> {
    let trip = Trips::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if trip.driver_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(trip)
}

pub(crate) fn trip_from_entity(model: TripModel) -> Trip {
    Trip {
        id: model.id,
        driver_id: model.driver_id,
        departure_city: model.departure_city,
        destination: model.destination,
        date_time: model.date_time.with_timezone(&Utc),
        return_date: model.return_date.map(|d| d.with_timezone(&Utc)),
        available_seats: model.available_seats,
        price: model.price,
        status: model.status,
        car_type: model.car_type,
        description: model.description,
        photo_path: model.photo_path,
        sexe: model.sexe,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
