use std::env;
use std::time::Duration;

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Connection-pool sizing and deadlines.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    /// How long a request may wait for a pooled connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            max_connections: 20,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Settings for the metadata extraction service, carried in `AppState` so
/// handlers never read the environment per request.
#[derive(Clone, Debug)]
pub struct MetadataSettings {
    /// Upper bound on each outbound fetch. The wait is always bounded; a slow
    /// upstream produces a uniform failure instead of blocking the request.
    pub fetch_timeout: Duration,
    /// Maximum number of in-flight fetches during batch hydration.
    pub batch_concurrency: usize,
    /// When enabled, refuse to fetch URLs that resolve to private, loopback,
    /// or link-local addresses. Off by default: the extraction contract
    /// fetches any http(s) URL the caller supplies (documented SSRF exposure).
    pub block_private_addresses: bool,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        MetadataSettings {
            fetch_timeout: Duration::from_secs(8),
            batch_concurrency: 8,
            block_private_addresses: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database: DatabaseSettings,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub metadata: MetadataSettings,
    pub is_dev: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        let db_defaults = DatabaseSettings::default();
        let database = DatabaseSettings {
            max_connections: env_u32("DATABASE_MAX_CONNECTIONS", db_defaults.max_connections),
            acquire_timeout: env_secs(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                db_defaults.acquire_timeout,
            ),
        };

        let md_defaults = MetadataSettings::default();
        let metadata = MetadataSettings {
            fetch_timeout: env_secs("METADATA_FETCH_TIMEOUT_SECS", md_defaults.fetch_timeout),
            batch_concurrency: env::var("METADATA_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(md_defaults.batch_concurrency),
            block_private_addresses: env::var("BLOCK_PRIVATE_ADDRESSES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(md_defaults.block_private_addresses),
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            database,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev_secret_change_in_production".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            metadata,
            is_dev: env::var("APP_ENV").as_deref() != Ok("production"),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_defaults() {
        let settings = DatabaseSettings::default();
        assert_eq!(settings.max_connections, 20);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn metadata_defaults() {
        let settings = MetadataSettings::default();
        assert_eq!(settings.fetch_timeout, Duration::from_secs(8));
        assert_eq!(settings.batch_concurrency, 8);
        assert!(!settings.block_private_addresses);
    }

    // Each test uses its own variable name so parallel tests never race on
    // shared environment state.

    #[test]
    fn env_u32_reads_override() {
        env::set_var("DEVSHELF_TEST_POOL_SIZE", "40");
        assert_eq!(env_u32("DEVSHELF_TEST_POOL_SIZE", 20), 40);
        env::remove_var("DEVSHELF_TEST_POOL_SIZE");
    }

    #[test]
    fn env_u32_falls_back_on_garbage() {
        env::set_var("DEVSHELF_TEST_POOL_GARBAGE", "plenty");
        assert_eq!(env_u32("DEVSHELF_TEST_POOL_GARBAGE", 20), 20);
        env::remove_var("DEVSHELF_TEST_POOL_GARBAGE");
    }

    #[test]
    fn env_secs_reads_override() {
        env::set_var("DEVSHELF_TEST_ACQUIRE_SECS", "11");
        assert_eq!(
            env_secs("DEVSHELF_TEST_ACQUIRE_SECS", Duration::from_secs(5)),
            Duration::from_secs(11)
        );
        env::remove_var("DEVSHELF_TEST_ACQUIRE_SECS");
    }

    #[test]
    fn env_secs_falls_back_when_unset() {
        assert_eq!(
            env_secs("DEVSHELF_TEST_NEVER_SET", Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }
}
