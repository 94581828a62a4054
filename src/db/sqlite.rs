use std::str::FromStr;

use crate::db::models::DbInstallation;
use crate::db::schema::SQLITE_INIT;
use crate::error::GateError;
use crate::service::installation_store::InstallationStore;
use crate::types::installation::{Claim, InstallationRecord, Lookup};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct SqliteInstallations {
    pool: SqlitePool,
}

impl SqliteInstallations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and make sure
    /// the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, GateError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_opts = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            // Every connection to `:memory:` is its own database.
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None::<std::time::Duration>)
                .max_lifetime(None::<std::time::Duration>);
        }
        let pool = pool_opts.connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url, "installations storage ready");
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), GateError> {
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get_by_app_id(&self, app_id: &str) -> Result<Option<DbInstallation>, GateError> {
        let row = sqlx::query(
            "SELECT app_id, initialized, updated_at FROM installations WHERE app_id = ?",
        )
        .bind(app_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    /// Upsert by unique app_id.
    pub async fn upsert(&self, app_id: &str, initialized: bool) -> Result<(), GateError> {
        sqlx::query(
            r#"
            INSERT INTO installations (app_id, initialized, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(app_id) DO UPDATE SET
                initialized = excluded.initialized,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(app_id)
        .bind(initialized as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbInstallation, GateError> {
        let app_id: String = row.try_get("app_id")?;
        let initialized_i: i64 = row.try_get("initialized")?;
        let updated_at_str: String = row.try_get("updated_at")?;

        let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_at_str)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(DbInstallation {
            app_id,
            initialized: initialized_i != 0,
            updated_at,
        })
    }
}

impl InstallationStore for SqliteInstallations {
    async fn find(&self, app_id: &str) -> Result<Lookup<InstallationRecord>, GateError> {
        Ok(match self.get_by_app_id(app_id).await? {
            Some(row) => Lookup::Found(row.into()),
            None => Lookup::NotFound,
        })
    }

    async fn mark_initialized(&self, app_id: &str) -> Result<(), GateError> {
        self.upsert(app_id, true).await
    }

    async fn claim(&self, app_id: &str) -> Result<Claim, GateError> {
        // The conditional DO UPDATE touches no row when already initialized.
        let result = sqlx::query(
            r#"
            INSERT INTO installations (app_id, initialized, updated_at)
            VALUES (?, 1, ?)
            ON CONFLICT(app_id) DO UPDATE SET
                initialized = 1,
                updated_at = excluded.updated_at
            WHERE installations.initialized = 0
            "#,
        )
        .bind(app_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        let won = result.rows_affected() == 1;
        debug!(app_id, won, "local claim resolved");
        Ok(if won {
            Claim::Won
        } else {
            Claim::AlreadyInitialized
        })
    }

    async fn release(&self, app_id: &str) -> Result<(), GateError> {
        sqlx::query("UPDATE installations SET initialized = 0, updated_at = ? WHERE app_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(app_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
