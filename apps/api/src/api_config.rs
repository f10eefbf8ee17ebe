use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use campus_core::AppError;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 3001;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub migrate_only: bool,
    /// PostgreSQL connection string. In-memory adapters are used when absent.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|connections| *connections > 0)
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{value}'"
                    ))
                })?,
            None => DEFAULT_DATABASE_MAX_CONNECTIONS,
        };

        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_owned());
        let api_host = lookup("API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_owned());
        let api_port = lookup("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_API_PORT);

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            frontend_url,
            api_host,
            api_port,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use campus_core::AppError;

    use super::ApiConfig;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = ApiConfig::from_lookup(false, lookup_from(&[]));
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(
            config.socket_address().map(|address| address.to_string()).ok(),
            Some("127.0.0.1:3001".to_owned())
        );
    }

    #[test]
    fn blank_database_url_selects_in_memory_storage() {
        let config = ApiConfig::from_lookup(false, lookup_from(&[("DATABASE_URL", "  ")]));
        assert_eq!(config.map(|config| config.database_url).ok(), Some(None));
    }

    #[test]
    fn migrate_mode_requires_database_url() {
        let config = ApiConfig::from_lookup(true, lookup_from(&[]));
        assert!(matches!(config, Err(AppError::Validation(_))));

        let config = ApiConfig::from_lookup(
            true,
            lookup_from(&[("DATABASE_URL", "postgres://localhost/campus")]),
        );
        assert!(config.is_ok());
    }

    #[test]
    fn invalid_pool_size_is_rejected() {
        for value in ["0", "ten"] {
            let config = ApiConfig::from_lookup(
                false,
                lookup_from(&[("DATABASE_MAX_CONNECTIONS", value)]),
            );
            assert!(matches!(config, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn invalid_host_fails_socket_resolution() {
        let config = ApiConfig::from_lookup(false, lookup_from(&[("API_HOST", "campus.local")]))
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            config.socket_address(),
            Err(AppError::Internal(_))
        ));
    }
}
