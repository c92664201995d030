use axum_carpool_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool},
    dto::trip_requests::{AcceptTripRequestRequest, CreateTripRequestRequest},
    entity::{trips::ActiveModel as TripActive, users::ActiveModel as UserActive},
    error::AppError,
    mailer::Mailer,
    middleware::auth::AuthUser,
    services::trip_request_service,
    state::AppState,
};
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use std::sync::Arc;
use uuid::Uuid;

// A trip request matches a planned trip whose departure falls inside the
// half-hour window around the requested time; a pending request can then be
// claimed by a driver.
#[tokio::test]
async fn trip_request_matching_and_claim_flow() -> anyhow::Result<()> {
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

    let departure = Utc::now() + Duration::days(3);
    let trip = TripActive {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        departure_city: Set("Lyon".into()),
        destination: Set("Marseille".into()),
        date_time: Set(departure.into()),
        return_date: Set(None),
        available_seats: Set(2),
        price: Set(180_00),
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
    let auth_driver = AuthUser {
        user_id: driver_id,
        role: "driver".into(),
    };

    // Twenty minutes off the trip's departure: inside the window.
    let matched = trip_request_service::create_request(
        &state,
        &auth_passenger,
        CreateTripRequestRequest {
            departure_city: "Lyon".into(),
            destination: "Marseille".into(),
            date_time: departure + Duration::minutes(20),
            sexe: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(matched.status, "matched");
    assert_eq!(matched.trip_id, Some(trip.id));

    // Two hours off: no candidate, the request stays pending.
    let pending = trip_request_service::create_request(
        &state,
        &auth_passenger,
        CreateTripRequestRequest {
            departure_city: "Lyon".into(),
            destination: "Marseille".into(),
            date_time: departure + Duration::hours(2),
            sexe: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(pending.status, "pending");
    assert_eq!(pending.trip_id, None);

    // The pending request shows up for the driver and can be claimed.
    let unclaimed = trip_request_service::list_unclaimed_for_driver(&state, &auth_driver)
        .await?
        .data
        .unwrap();
    assert!(unclaimed.items.iter().any(|r| r.id == pending.id));

    let accepted = trip_request_service::accept_request(
        &state,
        &auth_driver,
        pending.id,
        AcceptTripRequestRequest { trip_id: trip.id },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(accepted.status, "accepted");
    assert_eq!(accepted.trip_id, Some(trip.id));

    // Accepting the same request again is rejected.
    let err = trip_request_service::accept_request(
        &state,
        &auth_driver,
        pending.id,
        AcceptTripRequestRequest { trip_id: trip.id },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // A trip that already departed with a stale stored `planned` is not a
    // candidate even though its departure sits inside the window.
    TripActive {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        departure_city: Set("Nice".into()),
        destination: Set("Toulon".into()),
        date_time: Set((Utc::now() - Duration::minutes(10)).into()),
        return_date: Set(None),
        available_seats: Set(2),
        price: Set(90_00),
        status: Set("planned".into()),
        car_type: Set(None),
        description: Set(None),
        photo_path: Set(None),
        sexe: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let unmatched = trip_request_service::create_request(
        &state,
        &auth_passenger,
        CreateTripRequestRequest {
            departure_city: "Nice".into(),
            destination: "Toulon".into(),
            date_time: Utc::now() + Duration::minutes(15),
            sexe: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(unmatched.status, "pending");
    assert_eq!(unmatched.trip_id, None);

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
