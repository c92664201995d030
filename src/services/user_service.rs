use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    entity::{
        trip_requests::{Column as ReqCol, Entity as TripRequests},
        users::{ActiveModel as UserActive, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
    storage,
};

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let me = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", user_from_entity(me), None))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_can_view_profile(state, user, id).await?;

    Ok(ApiResponse::success("OK", user_from_entity(target), None))
}

/// A profile is visible to its owner, to admins, and to drivers while the
/// target passenger still has an unassigned pending request (so the driver can
/// decide whether to claim it).
async fn ensure_can_view_profile(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    if user.user_id == id || user.role == "admin" {
        return Ok(());
    }
    if user.role == "driver" {
        let pending = TripRequests::find()
            .filter(
                Condition::all()
                    .add(ReqCol::PassengerId.eq(id))
                    .add(ReqCol::TripId.is_null())
                    .add(ReqCol::Status.eq("pending")),
            )
            .one(&state.orm)
            .await?;
        if pending.is_some() {
            return Ok(());
        }
    }
    tracing::warn!(user_id = %user.user_id, target = %id, "profile access denied");
    Err(AppError::Forbidden)
}

pub async fn upload_my_photo(
    state: &AppState,
    user: &AuthUser,
    bytes: &[u8],
) -> AppResult<ApiResponse<User>> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty photo upload".into()));
    }

    let me = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let relative = storage::store_photo(&state.config.upload_dir, "users", bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("photo store failed: {e}")))?;

    let mut active: UserActive = me.into();
    active.photo_path = Set(Some(relative));
    let updated = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "user_photo_upload",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Photo uploaded",
        user_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn get_user_photo(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Vec<u8>> {
    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_can_view_profile(state, user, id).await?;

    let relative = target.photo_path.ok_or(AppError::NotFound)?;
    storage::load_photo(&state.config.upload_dir, &relative)
        .await
        .map_err(|_| AppError::NotFound)
}

pub(crate) fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        email: model.email,
        role: model.role,
        sexe: model.sexe,
        photo_path: model.photo_path,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
