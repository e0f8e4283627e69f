use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Ordered schema steps; entry `n` upgrades `user_version` from `n` to `n + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("schema_v1.sql", include_str!("schemas/schema_v1.sql")),
    ("schema_v2.sql", include_str!("schemas/schema_v2.sql")),
];

const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the schema up to date in a single transaction. Returns the number
/// of steps applied.
pub fn run_migrations(conn: &mut Connection) -> Result<usize> {
    let found: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if found > CURRENT_SCHEMA_VERSION {
        bail!("database schema v{found} is newer than this build (v{CURRENT_SCHEMA_VERSION})");
    }

    let pending = &MIGRATIONS[usize::try_from(found).unwrap_or(0)..];
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (name, sql) in pending {
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply {name}"))?;
        info!("Applied {name}");
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(pending.len())
}
