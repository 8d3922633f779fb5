// ABOUTME: Platform trait describing every WordPress database touchpoint
// ABOUTME: Keeps the migration engine independent of the MySQL driver

use anyhow::Result;
use async_trait::async_trait;

/// A hidden post whose name carries a term id and taxonomy slug.
///
/// Fieldmanager created one of these per term to hold term meta before
/// WordPress had a native term meta table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierPost {
    /// `ID` column of the posts table.
    pub id: u64,
    /// `post_name` column, e.g. `fm-term-meta-42-category`.
    pub name: String,
}

/// A taxonomy term, identified by (term id, taxonomy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub term_id: u64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
}

/// Outcome of a single native term meta write.
///
/// Write failures are reported here rather than as an `Err` so callers
/// handle them exhaustively and a partial write never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaAddOutcome {
    /// Row inserted; carries the new meta id.
    Added(u64),
    /// Insert rejected. The reason is the server's error code and
    /// message when available, otherwise the raw error rendering.
    Failed(String),
}

/// Database operations the migration engine needs.
///
/// The production implementation talks to a WordPress MySQL database;
/// tests substitute an in-memory store.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Schema version recorded by the platform's upgrade routine
    /// (the `db_version` option). Returns 0 when the option is absent.
    async fn schema_version(&self) -> Result<u64>;

    /// Every post whose name starts with the reserved carrier prefix,
    /// in the store's enumeration order.
    async fn carrier_posts(&self) -> Result<Vec<CarrierPost>>;

    /// Look up a term by id within one taxonomy. `None` covers both a
    /// missing term and a taxonomy mismatch.
    async fn get_term(&self, term_id: u64, taxonomy: &str) -> Result<Option<Term>>;

    /// Legacy meta attached to a term through its carrier post, grouped
    /// by key in first-seen order, values in insertion order.
    async fn legacy_term_meta(
        &self,
        term_id: u64,
        taxonomy: &str,
    ) -> Result<Vec<(String, Vec<String>)>>;

    /// Delete every legacy value stored under one key for a term.
    async fn delete_legacy_term_meta(
        &self,
        term_id: u64,
        taxonomy: &str,
        meta_key: &str,
    ) -> Result<()>;

    /// Additive write to native term meta. Never updates or replaces
    /// existing rows; duplicate keys accumulate values.
    async fn add_term_meta(&self, term_id: u64, meta_key: &str, meta_value: &str)
        -> MetaAddOutcome;

    /// Whether a post row still exists.
    async fn post_exists(&self, post_id: u64) -> Result<bool>;

    /// Hard-delete a post: the row itself, its post meta, and its term
    /// relationships. Bypasses any trash stage.
    async fn delete_post(&self, post_id: u64) -> Result<()>;
}
