//! Database layer — migrations and namespaced key-value reads/writes.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    // Create the file on first start.
    let url = if url.contains('?') || url.contains(":memory:") {
        url
    } else {
        format!("{url}?mode=rwc")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Read the document stored under `namespace`, if any.
pub async fn get_value(pool: &SqlitePool, namespace: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE namespace = ?1")
        .bind(namespace)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v))
}

/// Replace the document stored under `namespace` in a single statement.
pub async fn put_value(pool: &SqlitePool, namespace: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO kv_store (namespace, value, updated_at)
        VALUES (?1, ?2, strftime('%s', 'now'))
        ON CONFLICT(namespace) DO UPDATE
            SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(namespace)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}
