// ABOUTME: Pre-flight validation for the migration command
// ABOUTME: Confirms the WordPress schema already has native term meta

use anyhow::{bail, Context, Result};

use crate::platform::Platform;

/// `db_version` at which WordPress core gained the term meta table
/// (WordPress 4.4).
pub const TERM_META_DB_VERSION: u64 = 34370;

/// Abort unless the database schema supports native term meta.
///
/// Runs before any scan so a failed check touches no state.
pub async fn ensure_term_meta_ready<P: Platform>(db: &P) -> Result<()> {
    let version = db
        .schema_version()
        .await
        .context("Failed to read the database schema version")?;

    if version < TERM_META_DB_VERSION {
        bail!(
            "This WordPress installation is not ready for term meta! You must be \
             running WordPress 4.4 and the database update must be complete."
        );
    }

    tracing::debug!("Schema version {} supports term meta", version);
    Ok(())
}
