use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_carpool_api::{config::AppConfig, db::create_pool};
use chrono::{Duration, Utc};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    // The fallback admin must exist before any user deletion reassigns trips.
    let admin_id =
        ensure_user_with_role(&pool, &config.fallback_admin_email, "admin123", "admin").await?;
    let driver_id = ensure_user_with_role(&pool, "driver@example.com", "driver123", "driver").await?;
    let passenger_id =
        ensure_user_with_role(&pool, "passenger@example.com", "passenger123", "passenger").await?;

    seed_trips(&pool, driver_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Driver ID: {driver_id}, Passenger ID: {passenger_id}"
    );
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_trips(pool: &sqlx::PgPool, driver_id: Uuid) -> anyhow::Result<()> {
    let tomorrow = Utc::now() + Duration::days(1);
    let next_week = Utc::now() + Duration::days(7);

    let trips = vec![
        ("Paris", "Lyon", tomorrow, 3, 250_00_i64),
        ("Lyon", "Marseille", tomorrow + Duration::hours(6), 2, 180_00),
        ("Paris", "Lille", next_week, 4, 150_00),
    ];

    for (departure, destination, date_time, seats, price) in trips {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM trips
            WHERE driver_id = $1 AND departure_city = $2 AND destination = $3
            "#,
        )
        .bind(driver_id)
        .bind(departure)
        .bind(destination)
        .fetch_optional(pool)
        .await?;
        if existing.is_some() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO trips
                (id, driver_id, departure_city, destination, date_time,
                 available_seats, price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'planned')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(driver_id)
        .bind(departure)
        .bind(destination)
        .bind(date_time)
        .bind(seats)
        .bind(price)
        .execute(pool)
        .await?;
        println!("Seeded trip {departure} -> {destination}");
    }

    Ok(())
}
