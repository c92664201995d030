use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::trip_requests::{AcceptTripRequestRequest, CreateTripRequestRequest, TripRequestList},
    entity::{
        trip_requests::{
            ActiveModel as RequestActive, Column as ReqCol, Entity as TripRequests,
            Model as RequestModel,
        },
        trips::{Column as TripCol, Entity as Trips},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    lifecycle::TripStatus,
    middleware::auth::{AuthUser, ensure_admin, ensure_driver, ensure_passenger},
    models::TripRequest,
    response::{ApiResponse, Meta},
    services::trip_service,
    state::AppState,
};

/// Trips departing within this window of the requested time are candidates.
const MATCH_WINDOW_MINUTES: i64 = 30;

/// The inclusive time bracket a candidate trip's departure must fall into.
pub fn match_window(desired: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        desired - Duration::minutes(MATCH_WINDOW_MINUTES),
        desired + Duration::minutes(MATCH_WINDOW_MINUTES),
    )
}

/// Create a request and passively try to match it against an existing planned
/// trip. Tie-break when several trips fit the window: earliest departure,
/// then lowest id.
pub async fn create_request(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTripRequestRequest,
) -> AppResult<ApiResponse<TripRequest>> {
    ensure_passenger(user)?;

    let now = Utc::now();
    if payload.date_time < now {
        return Err(AppError::BadRequest(
            "Trip request date cannot be in the past".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let (window_start, window_end) = match_window(payload.date_time);
    let candidates = Trips::find()
        .filter(
            Condition::all()
                .add(TripCol::DepartureCity.eq(payload.departure_city.clone()))
                .add(TripCol::Destination.eq(payload.destination.clone()))
                .add(TripCol::DateTime.gte(window_start))
                .add(TripCol::DateTime.lte(window_end))
                .add(TripCol::AvailableSeats.gt(0))
                .add(TripCol::Status.eq(TripStatus::Planned.as_str())),
        )
        .order_by_asc(TripCol::DateTime)
        .order_by_asc(TripCol::Id)
        .all(&txn)
        .await?;

    // A stored `planned` can be stale for a trip that already departed; only
    // link trips that are still planned after re-deriving the lifecycle.
    let mut matching_trip = None;
    for candidate in candidates {
        let candidate = trip_service::refresh_status(&txn, candidate).await?;
        if trip_service::status_of(&candidate) == TripStatus::Planned {
            matching_trip = Some(candidate);
            break;
        }
    }

    let (status, trip_id) = match &matching_trip {
        Some(trip) => ("matched", Some(trip.id)),
        None => ("pending", None),
    };

    let request = RequestActive {
        id: Set(Uuid::new_v4()),
        passenger_id: Set(user.user_id),
        departure_city: Set(payload.departure_city),
        destination: Set(payload.destination),
        date_time: Set(payload.date_time.into()),
        sexe: Set(payload.sexe),
        status: Set(status.to_string()),
        trip_id: Set(trip_id),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        request_id = %request.id,
        status = %request.status,
        trip_id = ?request.trip_id,
        "trip request created"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "trip_request_create",
        "trip_requests",
        serde_json::json!({ "request_id": request.id, "status": request.status }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Trip request created",
        request_from_entity(request),
        Some(Meta::empty()),
    ))
}

/// A passenger's own upcoming requests.
pub async fn list_my_requests(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<TripRequestList>> {
    ensure_passenger(user)?;
    let items: Vec<_> = TripRequests::find()
        .filter(
            Condition::all()
                .add(ReqCol::PassengerId.eq(user.user_id))
                .add(ReqCol::DateTime.gte(Utc::now())),
        )
        .order_by_asc(ReqCol::DateTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(request_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Trip requests",
        TripRequestList { items },
        Some(meta),
    ))
}

/// Unclaimed pending future requests a driver can browse. A driver with a set
/// gender preference only sees requests whose `sexe` is absent or equal.
pub async fn list_unclaimed_for_driver(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<TripRequestList>> {
    ensure_driver(user)?;

    let driver = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut condition = Condition::all()
        .add(ReqCol::TripId.is_null())
        .add(ReqCol::Status.eq("pending"))
        .add(ReqCol::DateTime.gte(Utc::now()));

    if let Some(sexe) = driver.sexe {
        condition = condition.add(
            Condition::any()
                .add(ReqCol::Sexe.is_null())
                .add(ReqCol::Sexe.eq(sexe)),
        );
    }

    let items: Vec<_> = TripRequests::find()
        .filter(condition)
        .order_by_asc(ReqCol::DateTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(request_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Trip requests",
        TripRequestList { items },
        Some(meta),
    ))
}

/// Driver claims a pending request by linking it to one of their planned
/// trips.
pub async fn accept_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AcceptTripRequestRequest,
) -> AppResult<ApiResponse<TripRequest>> {
    ensure_driver(user)?;

    let txn = state.orm.begin().await?;

    let request = TripRequests::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if request.status != "pending" {
        return Err(AppError::Conflict(format!(
            "request is {}, expected pending",
            request.status
        )));
    }

    let trip = Trips::find_by_id(payload.trip_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if trip.driver_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if trip.status != TripStatus::Planned.as_str() {
        return Err(AppError::Conflict("trip is not planned".into()));
    }

    let mut active: RequestActive = request.into();
    active.status = Set("accepted".to_string());
    active.trip_id = Set(Some(trip.id));
    let request = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "trip_request_accept",
        "trip_requests",
        serde_json::json!({ "request_id": request.id, "trip_id": trip.id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Trip request accepted",
        request_from_entity(request),
        Some(Meta::empty()),
    ))
}

pub async fn reject_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<TripRequest>> {
    ensure_driver(user)?;

    let request = TripRequests::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if request.status != "pending" {
        return Err(AppError::Conflict(format!(
            "request is {}, expected pending",
            request.status
        )));
    }

    let mut active: RequestActive = request.into();
    active.status = Set("rejected".to_string());
    let request = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Trip request rejected",
        request_from_entity(request),
        Some(Meta::empty()),
    ))
}

pub async fn list_all(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<TripRequestList>> {
    ensure_admin(user)?;
    let items: Vec<_> = TripRequests::find()
        .order_by_desc(ReqCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(request_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Trip requests",
        TripRequestList { items },
        Some(meta),
    ))
}

pub(crate) fn request_from_entity(model: RequestModel) -> TripRequest {
    TripRequest {
        id: model.id,
        passenger_id: model.passenger_id,
        departure_city: model.departure_city,
        destination: model.destination,
        date_time: model.date_time.with_timezone(&Utc),
        sexe: model.sexe,
        status: model.status,
        trip_id: model.trip_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_spans_thirty_minutes_each_way() {
        let desired = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let (start, end) = match_window(desired);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 11, 30, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap());

        // A trip 20 minutes after the desired time is in the window, one 40
        // minutes after is not.
        let plus_20 = desired + Duration::minutes(20);
        let plus_40 = desired + Duration::minutes(40);
        assert!(plus_20 >= start && plus_20 <= end);
        assert!(plus_40 > end);
    }
}
