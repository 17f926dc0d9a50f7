use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, PoolError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;

use crate::config::Config;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Error)]
pub enum DbSetupError {
    #[error("failed to connect to database: {0}")]
    Connect(#[from] PoolError),
    #[error("failed to run database migrations: {0}")]
    Migrations(Box<dyn std::error::Error + Send + Sync>),
}

/// Build the pool, check a connection out once and apply pending migrations.
pub fn create_pool(config: &Config) -> Result<DbPool, DbSetupError> {
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connect_timeout)
        .build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

pub fn run_migrations(conn: &mut PgConnection) -> Result<(), DbSetupError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(DbSetupError::Migrations)?;
    for version in &applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(())
}
