//! SQLite pool factory and the migration runner for module-contributed
//! migrations.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use biblio_kernel::settings::DatabaseSettings;
use biblio_kernel::ModuleRegistry;

pub type Db = sqlx::SqlitePool;

/// Open a connection pool against the configured database.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Db> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // A pooled in-memory SQLite database is one database per connection; a
    // single connection keeps it coherent.
    let max_connections = if settings.url.contains(":memory:") || settings.url.contains("mode=memory")
    {
        1
    } else {
        settings.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    Ok(pool)
}

/// Apply every module-contributed migration that has not run yet.
///
/// Applied migrations are recorded in `_migrations` keyed by
/// `{module}/{migration id}`, so each one executes exactly once per database.
pub async fn run_migrations(pool: &Db, registry: &ModuleRegistry) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .context("failed to create migration ledger")?;

    for module in registry.modules() {
        for migration in module.migrations() {
            let key = format!("{}/{}", module.name(), migration.id);

            let applied: Option<String> =
                sqlx::query_scalar("SELECT id FROM _migrations WHERE id = ?")
                    .bind(&key)
                    .fetch_optional(pool)
                    .await?;
            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(migration.up)
                .execute(pool)
                .await
                .with_context(|| format!("migration '{key}' failed"))?;

            sqlx::query("INSERT INTO _migrations (id) VALUES (?)")
                .bind(&key)
                .execute(pool)
                .await?;

            tracing::info!(migration = %key, "applied migration");
        }
    }

    Ok(())
}
