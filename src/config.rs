use std::env;

/// AppConfig
///
/// Holds the portal's configuration. Immutable once loaded and pulled into handlers via
/// `FromRef`, alongside the repository and the navigation rules.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string for the profiles store. `None` selects the in-memory
    // demo profiles (local only).
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the dev bypass and the log format.
    pub env: Env,
    // Secret used to validate incoming HS256 session tokens (Supabase-issued).
    pub jwt_secret: String,
    // Listen address of the HTTP server.
    pub bind_addr: String,
    // Appended to every document title as " | {app_name}".
    pub app_name: String,
    // Title used when no route matches.
    pub default_title: String,
    // Whether the app name suffix is applied.
    pub title_suffix: bool,
}

/// Env
///
/// Runtime context: local development utilities versus hardened production settings.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_APP_NAME: &str = "Aula Virtual";
pub const DEFAULT_TITLE: &str = "Plataforma de aprendizaje";
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            title_suffix: true,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast.
    ///
    /// # Panics
    /// Panics in `Env::Production` when `DATABASE_URL` or `SUPABASE_JWT_SECRET` is missing,
    /// so the server never starts with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("SUPABASE_JWT_SECRET")
                    .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("SUPABASE_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        Self {
            db_url,
            env,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            app_name: env::var("APP_NAME").unwrap_or_else(|_| DEFAULT_APP_NAME.to_string()),
            default_title: env::var("DEFAULT_TITLE").unwrap_or_else(|_| DEFAULT_TITLE.to_string()),
            title_suffix: env::var("TITLE_SUFFIX")
                .map(|value| parse_flag(&value))
                .unwrap_or(true),
        }
    }
}

// Anything but an explicit "off" value keeps the flag enabled.
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "off" | "no"
    )
}
