//! SQLite connection management and embedded migrations.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::CoreError;

pub use sqlx::SqlitePool as DbPool;

/// Opens the SQLite database at `db_path`, creating the file (and its parent
/// directory) when missing, and applies pending migrations.
///
/// The pool holds exactly one connection. SQLite serializes writes anyway,
/// and a single shared connection guarantees that a committed write is
/// visible to the very next statement; with several pooled connections a
/// reader can still be on an older WAL snapshot.
pub async fn establish_connection(db_path: &str) -> Result<SqlitePool, CoreError> {
    if !db_path.starts_with("sqlite:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        if !Path::new(db_path).exists() {
            tokio::fs::File::create(db_path).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(db_path)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
