use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// When unset the in-memory store is used.
    pub database_url: Option<String>,
    /// YAML seed applied at startup. See `store::seed`.
    pub seed_file: Option<PathBuf>,
    /// Lifetime of tokens issued by `POST /v2.0/tokens`.
    pub token_ttl_secs: i64,
    /// How long an expired token is kept before the cleanup job destroys it.
    /// Until then it still classifies as expired rather than unrecognized.
    pub token_retention_secs: i64,
    pub cleanup_interval_secs: u64,
    pub log_json: bool,
    /// Refuse to serve from a store that does not survive restarts.
    pub production: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8081,
            database_url: None,
            seed_file: None,
            token_ttl_secs: 86_400,
            token_retention_secs: 604_800,
            cleanup_interval_secs: 3_600,
            log_json: false,
            production: false,
        }
    }
}

/// Upper bound for lifetime settings: one hundred years.
pub const MAX_LIFETIME_SECS: i64 = 100 * 365 * 86_400;

/// A lifetime in seconds as a duration, or `None` when it is not positive
/// or exceeds [`MAX_LIFETIME_SECS`].
pub fn lifetime(secs: i64) -> Option<chrono::Duration> {
    if secs <= 0 || secs > MAX_LIFETIME_SECS {
        return None;
    }
    chrono::Duration::try_seconds(secs)
}

impl Config {
    pub fn token_ttl(&self) -> chrono::Duration {
        lifetime(self.token_ttl_secs)
            .unwrap_or_else(|| chrono::Duration::seconds(Config::default().token_ttl_secs))
    }

    pub fn token_retention(&self) -> chrono::Duration {
        lifetime(self.token_retention_secs)
            .unwrap_or_else(|| chrono::Duration::seconds(Config::default().token_retention_secs))
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    let defaults = Config::default();

    let env_mode = std::env::var("IDENTITY_ENV")
        .or_else(|_| std::env::var("RUST_ENV"))
        .unwrap_or_default();

    Ok(Config {
        port: parsed("IDENTITY_PORT", defaults.port),
        database_url: std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty()),
        seed_file: std::env::var("IDENTITY_SEED_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from),
        token_ttl_secs: parsed_lifetime("IDENTITY_TOKEN_TTL_SECS", defaults.token_ttl_secs),
        token_retention_secs: parsed_lifetime(
            "IDENTITY_TOKEN_RETENTION_SECS",
            defaults.token_retention_secs,
        ),
        cleanup_interval_secs: parsed(
            "IDENTITY_CLEANUP_INTERVAL_SECS",
            defaults.cleanup_interval_secs,
        ),
        log_json: std::env::var("IDENTITY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false),
        production: env_mode == "production",
    })
}

/// Malformed values fall back to the default.
fn parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`parsed`], but out-of-range lifetimes also fall back.
fn parsed_lifetime(var: &str, default: i64) -> i64 {
    Some(parsed(var, default))
        .filter(|secs| lifetime(*secs).is_some())
        .unwrap_or(default)
}
