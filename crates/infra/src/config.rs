//! Store configuration from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | unset | Postgres URL; unset selects the in-memory store |
//! | `PRINTWORKS_DB_MAX_CONNECTIONS` | `10` | Pool size for Postgres |
//! | `PRINTWORKS_DB_MIGRATE` | `false` | Apply bundled migrations on open |

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::store::{InMemoryStore, PostgresStore, Store};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: false,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (env, file, test map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let max_connections = match lookup("PRINTWORKS_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("PRINTWORKS_DB_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            bail!("PRINTWORKS_DB_MAX_CONNECTIONS must be at least 1");
        }

        let run_migrations = match lookup("PRINTWORKS_DB_MIGRATE").as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => bail!("PRINTWORKS_DB_MIGRATE must be true/false, got {other}"),
        };

        Ok(Self {
            database_url,
            max_connections,
            run_migrations,
        })
    }

    /// Open the store this config selects.
    pub async fn open(&self) -> Result<Arc<dyn Store>> {
        let Some(url) = &self.database_url else {
            info!("DATABASE_URL unset; using in-memory store");
            return Ok(Arc::new(InMemoryStore::new()));
        };

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(url)
            .await
            .context("failed to connect to Postgres")?;
        let store = PostgresStore::new(pool);

        if self.run_migrations {
            store.migrate().await.context("failed to apply migrations")?;
        }

        info!(max_connections = self.max_connections, "using Postgres store");
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_selects_in_memory_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn reads_database_url_and_pool_size() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/printworks"),
            ("PRINTWORKS_DB_MAX_CONNECTIONS", "4"),
            ("PRINTWORKS_DB_MIGRATE", "true"),
        ]))
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/printworks")
        );
        assert_eq!(config.max_connections, 4);
        assert!(config.run_migrations);
    }

    #[test]
    fn blank_database_url_is_treated_as_unset() {
        let config = StoreConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn rejects_bad_pool_size() {
        assert!(
            StoreConfig::from_lookup(lookup(&[("PRINTWORKS_DB_MAX_CONNECTIONS", "many")])).is_err()
        );
        assert!(
            StoreConfig::from_lookup(lookup(&[("PRINTWORKS_DB_MAX_CONNECTIONS", "0")])).is_err()
        );
    }

    #[tokio::test]
    async fn open_without_url_gives_working_in_memory_store() {
        let store = StoreConfig::default().open().await.unwrap();
        let uow = store.begin().await.unwrap();
        uow.commit().await.unwrap();
    }
}
