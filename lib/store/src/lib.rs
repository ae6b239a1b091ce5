//! Postgres persistence for the arbor share-grant engine.
//!
//! Implements the `arbor-access` store traits over a `sqlx::PgPool`. The
//! ownership oracle is deliberately absent: ownership lives in the
//! resource graph (an external triple store), which this workspace
//! queries but does not persist.

mod postgres;

pub use postgres::{PgAliasStore, PgGrantStore, PgIdentityStore};

/// Applies the embedded schema migrations to the given pool.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
