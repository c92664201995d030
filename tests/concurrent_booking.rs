use axum_carpool_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool},
    dto::bookings::CreateBookingRequest,
    entity::{trips::ActiveModel as TripActive, users::ActiveModel as UserActive},
    error::AppError,
    mailer::Mailer,
    middleware::auth::AuthUser,
    services::{booking_service, trip_service},
    state::AppState,
};
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use std::sync::Arc;
use uuid::Uuid;

// Concurrent bookings against a trip with fewer seats than the combined
// demand must serialize through the row lock: exactly as many succeed as
// seats exist, the rest get a conflict, and the trip never goes negative.
#[tokio::test]
async fn concurrent_bookings_never_oversell() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };

    let state = setup_state(&database_url).await?;

    let driver_id = create_user(&state, "driver", "driver@example.com").await?;
    let passenger_id = create_user(&state, "passenger", "passenger@example.com").await?;

    let trip = TripActive {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        departure_city: Set("Paris".into()),
        destination: Set("Bordeaux".into()),
        date_time: Set((Utc::now() + Duration::days(2)).into()),
        return_date: Set(None),
        available_seats: Set(2),
        price: Set(200_00),
        status: Set("planned".into()),
        car_type: Set(None),
        description: Set(None),
        photo_path: Set(None),
        sexe: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let auth_passenger = AuthUser {
        user_id: passenger_id,
        role: "passenger".into(),
    };

    let mut handles = Vec::new();
    for _ in 0..4 {
        let state = state.clone();
        let auth = auth_passenger.clone();
        let trip_id = trip.id;
        handles.push(tokio::spawn(async move {
            booking_service::create_booking(
                &state,
                &auth,
                CreateBookingRequest {
                    trip_id,
                    seats_booked: 1,
                },
            )
            .await
        }));
    }

    let mut confirmed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => confirmed += 1,
            Err(AppError::Conflict(_)) => rejected += 1,
            Err(err) => return Err(err.into()),
        }
    }
    assert_eq!(confirmed, 2);
    assert_eq!(rejected, 2);

    let remaining = trip_service::get_trip(&state, trip.id)
        .await?
        .data
        .unwrap()
        .available_seats;
    assert_eq!(remaining, 0);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = create_orm_conn(database_url).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE feedbacks, notifications, trip_requests, bookings, trips, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        upload_dir: std::env::temp_dir().join("carpool-test-uploads"),
        fallback_admin_email: "admin@example.com".into(),
        smtp: None,
    };

    Ok(AppState {
        pool,
        orm,
        config: Arc::new(config),
        mailer: Mailer::new(None),
    })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        sexe: Set(None),
        photo_path: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
