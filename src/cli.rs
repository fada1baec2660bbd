//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::{AuthConfig, AuthSettings, ConfigError, MAX_TTL_SECS};
use crate::db::Database;
use crate::rate_limit::LoginQuota;
use chrono::Duration;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Cinegate", about = "Movie catalog API with token authentication")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CINEGATE_PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "CINEGATE_DATABASE", default_value = "cinegate.db")]
    pub database: String,

    /// Issuer bound into access tokens and required on verification
    #[arg(long, env = "CINEGATE_JWT_ISSUER", default_value = "example.com")]
    pub jwt_issuer: String,

    /// Audience bound into access tokens
    #[arg(long, env = "CINEGATE_JWT_AUDIENCE", default_value = "example.com")]
    pub jwt_audience: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "CINEGATE_TOKEN_TTL_SECS", default_value = "900",
        value_parser = clap::value_parser!(i64).range(1..=MAX_TTL_SECS))]
    pub token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "CINEGATE_REFRESH_TTL_SECS", default_value = "86400",
        value_parser = clap::value_parser!(i64).range(1..=MAX_TTL_SECS))]
    pub refresh_ttl_secs: i64,

    /// Domain attribute of the refresh cookie
    #[arg(long, env = "CINEGATE_COOKIE_DOMAIN", default_value = "localhost")]
    pub cookie_domain: String,

    /// Path attribute of the refresh cookie
    #[arg(long, env = "CINEGATE_COOKIE_PATH", default_value = "/")]
    pub cookie_path: String,

    /// Name of the refresh cookie
    #[arg(long, env = "CINEGATE_COOKIE_NAME", default_value = "refresh_token")]
    pub cookie_name: String,

    /// Create a user on startup if the email is unknown, as email:First:Last
    #[arg(long, value_parser = parse_seed_user)]
    pub seed_user: Option<SeedUser>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// A user to create at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

fn parse_seed_user(s: &str) -> Result<SeedUser, String> {
    let mut parts = s.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(email), Some(first), Some(last))
            if email.contains('@') && !first.is_empty() && !last.is_empty() =>
        {
            Ok(SeedUser {
                email: email.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
            })
        }
        _ => Err(format!("Expected email:First:Last, got: {}", s)),
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Why no usable signing secret could be loaded.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error(
        "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
    )]
    Missing,
    #[error("failed to read JWT secret file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JWT secret is {0} bytes, at least {min} are required", min = MIN_JWT_SECRET_LENGTH)]
    TooShort(usize),
}

/// Load the JWT secret, preferring `JWT_SECRET` over `--jwt-secret-file`.
///
/// The variable is removed from the environment once read.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Result<String, SecretError> {
    let secret = match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            // SAFETY: runs during startup, before anything else touches the environment.
            unsafe { std::env::remove_var("JWT_SECRET") };
            secret
        }
        Err(_) => read_secret_file(jwt_secret_file.ok_or(SecretError::Missing)?)?,
    };
    check_secret_length(secret)
}

fn read_secret_file(path: &str) -> Result<String, SecretError> {
    std::fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .map_err(|source| SecretError::Unreadable {
            path: path.to_string(),
            source,
        })
}

fn check_secret_length(secret: String) -> Result<String, SecretError> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(SecretError::TooShort(secret.len()));
    }
    Ok(secret)
}

/// Build the authentication settings from validated arguments.
pub fn auth_settings(args: &Args, jwt_secret: String) -> AuthSettings {
    AuthSettings {
        issuer: args.jwt_issuer.clone(),
        audience: args.jwt_audience.clone(),
        secret: jwt_secret.into_bytes(),
        token_ttl: Duration::seconds(args.token_ttl_secs),
        refresh_ttl: Duration::seconds(args.refresh_ttl_secs),
        cookie_domain: args.cookie_domain.clone(),
        cookie_path: args.cookie_path.clone(),
        cookie_name: args.cookie_name.clone(),
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
) -> Result<ServerConfig, ConfigError> {
    let auth = AuthConfig::new(auth_settings(args, jwt_secret))?;

    Ok(ServerConfig {
        db,
        auth,
        login_quota: LoginQuota::default(),
    })
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Handle the --seed-user flag: create the user unless the email is taken.
pub async fn handle_seed_user(db: &Database, seed: &SeedUser) -> bool {
    match db.users().lookup_by_email(&seed.email).await {
        Ok(Some(existing)) => {
            info!(user_id = existing.id, "Seed user already exists");
            true
        }
        Ok(None) => match db
            .users()
            .create(&seed.email, &seed.first_name, &seed.last_name)
            .await
        {
            Ok(id) => {
                info!(user_id = id, "Seed user created");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to create seed user");
                false
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to check for seed user");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_user() {
        assert_eq!(
            parse_seed_user("ada@example.com:Ada:Lovelace").unwrap(),
            SeedUser {
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            }
        );
        assert!(parse_seed_user("ada@example.com:Ada").is_err());
        assert!(parse_seed_user("not-an-email:Ada:Lovelace").is_err());
        assert!(parse_seed_user("ada@example.com::Lovelace").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["cinegate"]);
        assert_eq!(args.token_ttl_secs, 900);
        assert_eq!(args.refresh_ttl_secs, 86400);
        assert_eq!(args.cookie_name, "refresh_token");
        assert_eq!(args.cookie_path, "/");
    }

    #[test]
    fn test_auth_settings_from_args() {
        let args = Args::parse_from([
            "cinegate",
            "--jwt-issuer",
            "api.example.com",
            "--token-ttl-secs",
            "60",
        ]);
        let settings = auth_settings(&args, "x".repeat(32));
        assert_eq!(settings.issuer, "api.example.com");
        assert_eq!(settings.token_ttl, Duration::seconds(60));
        assert_eq!(settings.refresh_ttl, Duration::hours(24));
    }

    #[test]
    fn test_ttl_bounds_enforced() {
        assert!(Args::try_parse_from(["cinegate", "--refresh-ttl-secs", "0"]).is_err());
        assert!(Args::try_parse_from(["cinegate", "--token-ttl-secs", "-5"]).is_err());
        assert!(
            Args::try_parse_from(["cinegate", "--token-ttl-secs", "999999999999999"]).is_err()
        );
    }

    #[test]
    fn test_build_config() {
        let args = Args::parse_from(["cinegate"]);
        let settings = auth_settings(&args, "x".repeat(32));
        let config = AuthConfig::new(settings).unwrap();
        assert_eq!(config.cookie_domain, "localhost");
        assert_eq!(config.issuer, "example.com");
    }

    #[test]
    fn test_secret_length_enforced() {
        assert!(matches!(
            check_secret_length("short".to_string()),
            Err(SecretError::TooShort(5))
        ));
        assert!(check_secret_length("x".repeat(MIN_JWT_SECRET_LENGTH)).is_ok());
    }

    #[test]
    fn test_secret_file_is_trimmed() {
        let path = std::env::temp_dir().join(format!("cinegate-secret-{}", std::process::id()));
        std::fs::write(&path, format!("{}\n", "s".repeat(40))).unwrap();

        let secret = read_secret_file(path.to_str().unwrap()).unwrap();
        assert_eq!(secret, "s".repeat(40));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_secret_file() {
        assert!(matches!(
            read_secret_file("/nonexistent/cinegate/secret"),
            Err(SecretError::Unreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_seed_user_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        let seed = parse_seed_user("ada@example.com:Ada:Lovelace").unwrap();

        assert!(handle_seed_user(&db, &seed).await);
        assert!(handle_seed_user(&db, &seed).await);

        let ada = db.users().lookup_by_email("ada@example.com").await.unwrap();
        assert_eq!(ada.unwrap().full_name(), "Ada Lovelace");
    }
}
