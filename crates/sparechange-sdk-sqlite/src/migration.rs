// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use deadpool_sqlite::Object;

use super::Error;

/// Latest database version
pub const DB_VERSION: usize = 1;

/// Startup DB Pragmas
pub const STARTUP_SQL: &str = r##"
PRAGMA main.synchronous = NORMAL;
PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
"##;

const INIT_SQL: &str = r##"
CREATE TABLE IF NOT EXISTS plugin_data (
    root TEXT PRIMARY KEY NOT NULL,
    data TEXT NOT NULL
);
"##;

/// Run startup pragmas and bring the schema to [`DB_VERSION`]
pub async fn run(conn: &Object) -> Result<(), Error> {
    conn.interact(|conn| {
        conn.execute_batch(STARTUP_SQL)?;

        let version: usize = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if version < DB_VERSION {
            conn.execute_batch(INIT_SQL)?;
            conn.execute_batch(&format!("PRAGMA user_version = {DB_VERSION};"))?;
            tracing::info!("Database migrated from v{version} to v{DB_VERSION}");
        } else {
            tracing::debug!("Database already at v{version}");
        }

        Ok::<(), Error>(())
    })
    .await??;
    Ok(())
}
