//! Async persistence over SQLite. One `Db` handle wraps the pool; query
//! helpers are grouped by table family in the submodules, all as methods on
//! `Db` so handlers see a single surface.

pub mod accounts;
pub mod characters;
pub mod items;
pub mod schema;
pub mod world;

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open the pool and run the schema bootstrap.
    pub async fn connect(database_url: &str) -> Result<Db, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        schema::initialize(&pool).await?;
        Ok(Db { pool })
    }

    /// In-memory database for tests. A single connection keeps every query
    /// on the same transient database.
    pub async fn connect_in_memory() -> Result<Db, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        schema::initialize(&pool).await?;
        Ok(Db { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
