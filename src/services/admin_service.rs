use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::trips::TripList,
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        trips::{Column as TripCol, Entity as Trips},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    routes::admin::{AdminStats, UserList},
    services::{trip_service, user_service},
    state::AppState,
};

/// All non-admin accounts.
pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let items = Users::find()
        .filter(UserCol::Role.ne("admin"))
        .order_by_asc(UserCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_service::user_from_entity)
        .collect::<Vec<User>>();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(meta),
    ))
}

pub async fn list_trips(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<TripList>> {
    ensure_admin(user)?;
    let items: Vec<_> = Trips::find()
        .order_by_desc(TripCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(trip_service::trip_from_entity)
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success(
        "Trips",
        TripList { items },
        Some(meta),
    ))
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<AdminStats>> {
    ensure_admin(user)?;

    let week_ago = Utc::now() - Duration::days(7);

    let total_users = Users::find()
        .filter(UserCol::Role.ne("admin"))
        .count(&state.orm)
        .await? as i64;
    let total_trips = Trips::find().count(&state.orm).await? as i64;
    let new_users_week = Users::find()
        .filter(
            Condition::all()
                .add(UserCol::Role.ne("admin"))
                .add(UserCol::CreatedAt.gte(week_ago)),
        )
        .count(&state.orm)
        .await? as i64;
    let recent_trips_week = Trips::find()
        .filter(TripCol::CreatedAt.gte(week_ago))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "Stats",
        AdminStats {
            total_users,
            total_trips,
            new_users_week,
            recent_trips_week,
        },
        Some(Meta::empty()),
    ))
}

/// Delete a user without cascading their trips away: trips are reassigned to
/// the fallback admin account, and the user's confirmed bookings hand their
/// seats back to still-active trips first.
pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let target = Users::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if target.role == "admin" {
        return Err(AppError::Forbidden);
    }

    let fallback = Users::find()
        .filter(UserCol::Email.eq(state.config.fallback_admin_email.clone()))
        .one(&txn)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("fallback admin account is missing"))
        })?;

    let bookings = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::PassengerId.eq(id))
                .add(BookingCol::Status.eq("confirmed")),
        )
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    for booking in &bookings {
        Trips::update_many()
            .col_expr(
                TripCol::AvailableSeats,
                Expr::col(TripCol::AvailableSeats).add(booking.seats_booked),
            )
            .filter(
                Condition::all()
                    .add(TripCol::Id.eq(booking.trip_id))
                    .add(TripCol::Status.is_in(["planned", "in_progress"])),
            )
            .exec(&txn)
            .await?;
    }

    let reassigned = Trips::update_many()
        .col_expr(TripCol::DriverId, Expr::value(fallback.id))
        .filter(TripCol::DriverId.eq(id))
        .exec(&txn)
        .await?;

    // Bookings, requests, feedback and notifications cascade with the row.
    Users::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "user_delete",
        "users",
        serde_json::json!({
            "user_id": id,
            "trips_reassigned": reassigned.rows_affected,
            "bookings_released": bookings.len(),
        }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "User deleted",
        serde_json::json!({ "trips_reassigned": reassigned.rows_affected }),
        Some(Meta::empty()),
    ))
}
