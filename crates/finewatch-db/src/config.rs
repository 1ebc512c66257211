use finewatch_core::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite:data.sqlite?mode=rwc";

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 1,
        }
    }
}

impl DatabaseConfig {
    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (optional, defaults to `sqlite:data.sqlite?mode=rwc`)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 1)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_values(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("DATABASE_MAX_CONNECTIONS").ok(),
        )
    }

    fn from_values(url: Option<String>, max_connections: Option<String>) -> Result<Self, AppError> {
        let url = match url {
            Some(url) if !url.trim().is_empty() => url,
            Some(_) => {
                return Err(AppError::ConfigError("DATABASE_URL must not be empty".into()));
            }
            None => DEFAULT_DATABASE_URL.to_string(),
        };

        let max_connections = match max_connections {
            None => 1,
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

    /// Override the connection URL, keeping the pool size.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}
