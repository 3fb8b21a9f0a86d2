//! PostgreSQL connection pool with PostGIS version gating.

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Timeouts};
use semver::Version;
use std::time::Duration;
use tokio_postgres::NoTls;

use crate::error::{Result, TileServerError};

/// Minimum PostgreSQL version required.
pub const MINIMUM_POSTGRES_VERSION: Version = Version::new(11, 0, 0);

/// Minimum PostGIS version required (for `ST_AsMVTGeom`/`ST_ClusterDBSCAN`).
pub const MINIMUM_POSTGIS_VERSION: Version = Version::new(3, 0, 0);

#[derive(Clone, Debug)]
pub struct PoolSettings {
    pub max_size: usize,
    pub wait_timeout_ms: u64,
    pub create_timeout_ms: u64,
    pub recycle_timeout_ms: u64,
    /// Upper bound applied via `tokio::time::timeout` around every query.
    pub query_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 16,
            wait_timeout_ms: 5_000,
            create_timeout_ms: 5_000,
            recycle_timeout_ms: 5_000,
            query_timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostgresPool {
    id: String,
    pool: Pool,
    settings: PoolSettings,
    postgres_version: Version,
    postgis_version: Version,
}

impl PostgresPool {
    pub async fn new(connection_string: &str, settings: PoolSettings) -> Result<Self> {
        let pg_config: tokio_postgres::Config = connection_string.parse().map_err(|e| {
            TileServerError::Internal(anyhow::anyhow!("invalid connection string: {e}"))
        })?;

        let id = pg_config
            .get_dbname()
            .map(ToString::to_string)
            .unwrap_or_else(|| "postgres".to_string());

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);

        let timeouts = Timeouts {
            wait: Some(Duration::from_millis(settings.wait_timeout_ms)),
            create: Some(Duration::from_millis(settings.create_timeout_ms)),
            recycle: Some(Duration::from_millis(settings.recycle_timeout_ms)),
        };

        let pool = Pool::builder(mgr)
            .max_size(settings.max_size)
            .timeouts(timeouts)
            .build()
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("failed to build pool: {e}")))?;

        let mut result = Self {
            id: id.clone(),
            pool,
            settings: settings.clone(),
            postgres_version: Version::new(0, 0, 0),
            postgis_version: Version::new(0, 0, 0),
        };

        let conn = result.get().await?;

        let pg_version = Self::get_postgres_version(&conn).await?;
        if pg_version < MINIMUM_POSTGRES_VERSION {
            return Err(TileServerError::Internal(anyhow::anyhow!(
                "PostgreSQL {pg_version} is older than minimum required {MINIMUM_POSTGRES_VERSION}"
            )));
        }

        let postgis_version = Self::get_postgis_version(&conn).await?;
        if postgis_version < MINIMUM_POSTGIS_VERSION {
            return Err(TileServerError::Internal(anyhow::anyhow!(
                "PostGIS {postgis_version} is older than minimum required {MINIMUM_POSTGIS_VERSION}"
            )));
        }

        result.postgres_version = pg_version;
        result.postgis_version = postgis_version;

        tracing::info!(
            "connected to PostgreSQL {} / PostGIS {} ({})",
            result.postgres_version,
            result.postgis_version,
            id
        );

        Ok(result)
    }

    pub async fn get(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| TileServerError::Internal(anyhow::anyhow!("pool checkout failed: {e}")))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.query_timeout_ms)
    }

    pub fn postgres_version(&self) -> &Version {
        &self.postgres_version
    }

    pub fn postgis_version(&self) -> &Version {
        &self.postgis_version
    }

    /// Cheap liveness probe for the `/healthz` route.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.get().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(|e| {
            TileServerError::Internal(anyhow::anyhow!("health check query failed: {e}"))
        })?;
        Ok(())
    }

    async fn get_postgres_version(conn: &Object) -> Result<Version> {
        let row = conn
            .query_one(
                r"SELECT (regexp_matches(
                    current_setting('server_version'),
                    '^(\d+\.\d+)',
                    'g'
                ))[1] || '.0' as version;",
                &[],
            )
            .await
            .map_err(|e| {
                TileServerError::Internal(anyhow::anyhow!("failed to query PostgreSQL version: {e}"))
            })?;

        let version_str: String = row.get("version");
        version_str.parse().map_err(|e| {
            TileServerError::Internal(anyhow::anyhow!(
                "invalid PostgreSQL version '{version_str}': {e}"
            ))
        })
    }

    async fn get_postgis_version(conn: &Object) -> Result<Version> {
        let row = conn
            .query_one(
                r"SELECT (regexp_matches(
                    PostGIS_Lib_Version(),
                    '^(\d+\.\d+\.\d+)',
                    'g'
                ))[1] as version;",
                &[],
            )
            .await
            .map_err(|e| {
                TileServerError::Internal(anyhow::anyhow!("failed to query PostGIS version: {e}"))
            })?;

        let version_str: String = row.get("version");
        version_str.parse().map_err(|e| {
            TileServerError::Internal(anyhow::anyhow!(
                "invalid PostGIS version '{version_str}': {e}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_comparison() {
        let v11 = Version::new(11, 0, 0);
        let v12 = Version::new(12, 0, 0);
        let v3_0 = Version::new(3, 0, 0);

        assert!(v11 >= MINIMUM_POSTGRES_VERSION);
        assert!(v12 >= MINIMUM_POSTGRES_VERSION);
        assert!(v3_0 >= MINIMUM_POSTGIS_VERSION);
    }

    #[test]
    fn test_default_pool_settings() {
        let settings = PoolSettings::default();
        assert_eq!(settings.query_timeout_ms, 30_000);
        assert!(settings.max_size > 0);
    }
}
