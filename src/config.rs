use std::env;
use std::path::PathBuf;

/// SMTP settings for outbound notification email. Optional: when absent the
/// mailer reports delivery failure and committed domain writes stand on their
/// own.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    /// Trips owned by a deleted user are reassigned to this account instead of
    /// being cascaded away.
    pub fallback_admin_email: String,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")?;
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let fallback_admin_email =
            env::var("FALLBACK_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());

        let smtp = match env::var("SMTP_SERVER") {
            Ok(server) => Some(SmtpConfig {
                server,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(587),
                username: env::var("SMTP_USERNAME")?,
                password: env::var("SMTP_PASSWORD")?,
                from_email: env::var("SMTP_FROM_EMAIL")?,
                from_name: env::var("SMTP_FROM_NAME")
                    .unwrap_or_else(|_| "Carpool Team".to_string()),
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            upload_dir,
            fallback_admin_email,
            smtp,
        })
    }
}
