use ndsom_core::AppError;
use url::Url;

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL`, or the parts `PG_HOST`, `PG_PORT` (default 5432),
    ///   `PG_USER`, `PG_PASSWORD` (optional), `PG_DATABASE`
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => url_from_parts(&lookup)?,
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => 5,
            Some(raw) => {
                let parsed: u32 = raw.parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid DATABASE_MAX_CONNECTIONS '{raw}': must be a positive integer"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
                    ));
                }
                parsed
            }
        };

        Ok(Self {
            url,
            max_connections,
        })
    }
}

fn url_from_parts(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, AppError> {
    let required = |key: &str| {
        lookup(key).ok_or_else(|| {
            AppError::ConfigError(format!(
                "Neither DATABASE_URL nor {key} is set. Required for database operations."
            ))
        })
    };

    let host = required("PG_HOST")?;
    let user = required("PG_USER")?;
    let database = required("PG_DATABASE")?;
    let port = match lookup("PG_PORT") {
        None => 5432,
        Some(raw) => raw.parse::<u16>().map_err(|_| {
            AppError::ConfigError(format!("Invalid PG_PORT '{raw}': must be a port number"))
        })?,
    };

    let invalid = |_| AppError::ConfigError(format!("Invalid PG_HOST '{host}'"));
    let mut url = Url::parse(&format!("postgresql://{host}:{port}")).map_err(invalid)?;
    url.set_path(&database);
    url.set_username(&user)
        .map_err(|_| AppError::ConfigError("Invalid PG_USER".into()))?;
    if let Some(password) = lookup("PG_PASSWORD") {
        url.set_password(Some(&password))
            .map_err(|_| AppError::ConfigError("Invalid PG_PASSWORD".into()))?;
    }

    Ok(url.to_string())
}
