use anyhow::{Context, Result};

/// Sessions longer than a year are cut down to one.
pub const MAX_SESSION_HOURS: u64 = 24 * 365;
const DEFAULT_SESSION_HOURS: u64 = 24;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./zaplink.db"
    pub database_url: String,

    /// Plain-text admin password loaded from the environment at startup.
    /// Hashed with Argon2 before the server starts accepting logins.
    pub admin_password: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL shown next to each slug on the dashboard, e.g.
    /// "https://go.example.com". Must NOT have a trailing slash.
    pub base_url: String,

    /// How many hours an admin session token remains valid, at most
    /// `MAX_SESSION_HOURS`
    pub session_duration_hours: u64,

    /// URL to redirect visitors to when they hit the root path ("/").
    pub root_redirect_url: String,

    /// Interstitial delay applied to slugs created without an explicit one.
    pub default_delay_ms: i64,

    /// Optional JSON file of slugs to import at startup.
    pub links_file: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let admin_password = std::env::var("ADMIN_PASSWORD")
            .context("ADMIN_PASSWORD must be set in the environment or .env file")?;

        if admin_password.trim().is_empty() {
            anyhow::bail!("ADMIN_PASSWORD must not be empty");
        }

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let session_duration_hours =
            parse_session_hours(std::env::var("SESSION_DURATION_HOURS").ok().as_deref());

        let default_delay_ms = std::env::var("DEFAULT_DELAY_MS")
            .unwrap_or_else(|_| "1500".into())
            .parse::<i64>()
            .ok()
            .filter(|ms| *ms >= 0)
            .context("DEFAULT_DELAY_MS must be a non-negative number of milliseconds")?;

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let root_redirect_url = std::env::var("ROOT_REDIRECT_URL")
            .unwrap_or_else(|_| "https://www.whatsapp.com".into())
            .trim_end_matches('/')
            .to_owned();

        let links_file = std::env::var("LINKS_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./zaplink.db".into()),
            admin_password,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            base_url,
            session_duration_hours,
            root_redirect_url,
            default_delay_ms,
            links_file,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Unset or unparsable values fall back to a day; anything above
/// `MAX_SESSION_HOURS` is clamped.
fn parse_session_hours(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_SESSION_HOURS)
        .min(MAX_SESSION_HOURS)
}
