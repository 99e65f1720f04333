//! Tracker configuration, loaded from environment variables.

/// Signing secret used when `PM_JWT_SECRET` is unset. Development only.
pub const DEV_JWT_SECRET: &str = "defense-pm-dev-secret-change-me";

/// Work factors bcrypt accepts.
const BCRYPT_COSTS: std::ops::RangeInclusive<u32> = 4..=31;

/// Token lifetimes accepted from the environment, one hour to one year.
const TOKEN_TTL_HOURS: std::ops::RangeInclusive<i64> = 1..=8_760;

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// HMAC secret for bearer tokens and approval signatures.
    pub jwt_secret: String,
    /// Bearer token lifetime in hours.
    pub token_ttl_hours: i64,
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Attempts a version-checked write makes before reporting a conflict.
    pub max_write_attempts: usize,
    /// PostgreSQL pool size.
    pub db_max_connections: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cors_origins: Vec::new(),
            max_write_attempts: 5,
            db_max_connections: 10,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = std::env::var("PM_JWT_SECRET").unwrap_or_default();
        let token_ttl_hours = env_parse("PM_TOKEN_TTL_HOURS", defaults.token_ttl_hours);
        let bcrypt_cost = env_parse("PM_BCRYPT_COST", defaults.bcrypt_cost);
        let cors_origins: Vec<String> = std::env::var("PM_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let max_write_attempts = env_parse("PM_MAX_WRITE_ATTEMPTS", defaults.max_write_attempts);
        let db_max_connections = env_parse("PM_DB_MAX_CONNECTIONS", defaults.db_max_connections);

        let jwt_secret = if jwt_secret.is_empty() {
            tracing::warn!("PM_JWT_SECRET not set -- using the development signing secret");
            defaults.jwt_secret
        } else {
            jwt_secret
        };
        let bcrypt_cost = if BCRYPT_COSTS.contains(&bcrypt_cost) {
            bcrypt_cost
        } else {
            tracing::warn!(
                bcrypt_cost,
                "PM_BCRYPT_COST out of range -- falling back to {}",
                defaults.bcrypt_cost
            );
            defaults.bcrypt_cost
        };
        let token_ttl_hours = if TOKEN_TTL_HOURS.contains(&token_ttl_hours) {
            token_ttl_hours
        } else {
            tracing::warn!(
                token_ttl_hours,
                "PM_TOKEN_TTL_HOURS out of range -- falling back to {}",
                defaults.token_ttl_hours
            );
            defaults.token_ttl_hours
        };
        if cors_origins.is_empty() {
            tracing::warn!("PM_CORS_ORIGINS not set -- allowing any origin");
        }

        Self {
            jwt_secret,
            token_ttl_hours,
            bcrypt_cost,
            cors_origins,
            max_write_attempts: max_write_attempts.max(1),
            db_max_connections: db_max_connections.max(1),
        }
    }
}
