// ABOUTME: MySQL-backed Platform implementation for a WordPress database
// ABOUTME: Table name handling, connection setup, and the SQL for each operation

use anyhow::{Context, Result};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{params, Opts, Pool, TxOpts};

use crate::carriers::{carrier_name_for, CARRIER_NAME_PREFIX};
use crate::platform::{CarrierPost, MetaAddOutcome, Platform, Term};
use crate::utils::{quote_ident, validate_connection_string, validate_table_prefix};

/// Fully quoted table names under one WordPress table prefix.
#[derive(Debug, Clone)]
struct Tables {
    posts: String,
    postmeta: String,
    terms: String,
    term_taxonomy: String,
    term_relationships: String,
    termmeta: String,
    options: String,
}

impl Tables {
    fn new(prefix: &str) -> Self {
        let table = |suffix: &str| quote_ident(&format!("{prefix}{suffix}"));
        Self {
            posts: table("posts"),
            postmeta: table("postmeta"),
            terms: table("terms"),
            term_taxonomy: table("term_taxonomy"),
            term_relationships: table("term_relationships"),
            termmeta: table("termmeta"),
            options: table("options"),
        }
    }
}

/// Connection pool plus resolved table names for one WordPress install.
pub struct WordPressDb {
    pool: Pool,
    tables: Tables,
}

/// Validate inputs, open a pool, and confirm the database is reachable.
pub async fn connect(database_url: &str, table_prefix: &str) -> Result<WordPressDb> {
    validate_connection_string(database_url)?;
    validate_table_prefix(table_prefix)?;

    let opts = Opts::from_url(database_url).context("Failed to parse database URL")?;
    let pool = Pool::new(opts);

    let mut conn = pool
        .get_conn()
        .await
        .context("Failed to connect to the WordPress database")?;
    conn.ping()
        .await
        .context("Failed to ping the WordPress database")?;
    drop(conn);

    tracing::debug!("Connected to WordPress database (prefix '{}')", table_prefix);

    Ok(WordPressDb {
        pool,
        tables: Tables::new(table_prefix),
    })
}

impl WordPressDb {
    /// Close the pool cleanly. Call once at the end of a run.
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .context("Failed to close the database connection pool")
    }

    /// `ID` of the carrier post for a (term, taxonomy) pair, if any.
    async fn carrier_post_id(&self, term_id: u64, taxonomy: &str) -> Result<Option<u64>> {
        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT `ID` FROM {} WHERE `post_name` = :name LIMIT 1",
            self.tables.posts
        );
        let id = conn
            .exec_first::<u64, _, _>(query, params! { "name" => carrier_name_for(term_id, taxonomy) })
            .await
            .context("Failed to look up carrier post")?;
        Ok(id)
    }
}

#[async_trait]
impl Platform for WordPressDb {
    async fn schema_version(&self) -> Result<u64> {
        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT `option_value` FROM {} WHERE `option_name` = 'db_version' LIMIT 1",
            self.tables.options
        );
        let value: Option<String> = conn
            .query_first(query)
            .await
            .context("Failed to read db_version")?;

        // An absent or malformed option reads as version 0, which fails
        // the readiness check downstream.
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    async fn carrier_posts(&self) -> Result<Vec<CarrierPost>> {
        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT `ID`, `post_name` FROM {} WHERE `post_name` LIKE :pattern",
            self.tables.posts
        );
        let rows: Vec<(u64, String)> = conn
            .exec(query, params! { "pattern" => format!("{CARRIER_NAME_PREFIX}%") })
            .await
            .context("Failed to scan for term meta posts")?;

        tracing::debug!("Found {} term meta posts", rows.len());

        Ok(rows
            .into_iter()
            .map(|(id, name)| CarrierPost { id, name })
            .collect())
    }

    async fn get_term(&self, term_id: u64, taxonomy: &str) -> Result<Option<Term>> {
        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT t.`term_id`, tt.`taxonomy`, t.`name`, t.`slug` \
             FROM {terms} AS t \
             INNER JOIN {term_taxonomy} AS tt ON tt.`term_id` = t.`term_id` \
             WHERE t.`term_id` = :term_id AND tt.`taxonomy` = :taxonomy \
             LIMIT 1",
            terms = self.tables.terms,
            term_taxonomy = self.tables.term_taxonomy,
        );
        let row: Option<(u64, String, String, String)> = conn
            .exec_first(
                query,
                params! { "term_id" => term_id, "taxonomy" => taxonomy },
            )
            .await
            .context("Failed to look up term")?;

        Ok(row.map(|(term_id, taxonomy, name, slug)| Term {
            term_id,
            taxonomy,
            name,
            slug,
        }))
    }

    async fn legacy_term_meta(
        &self,
        term_id: u64,
        taxonomy: &str,
    ) -> Result<Vec<(String, Vec<String>)>> {
        let Some(post_id) = self.carrier_post_id(term_id, taxonomy).await? else {
            return Ok(Vec::new());
        };

        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT `meta_key`, `meta_value` FROM {} \
             WHERE `post_id` = :post_id ORDER BY `meta_id`",
            self.tables.postmeta
        );
        let rows: Vec<(String, Option<String>)> = conn
            .exec(query, params! { "post_id" => post_id })
            .await
            .context("Failed to read legacy term meta")?;

        // Group by key in first-seen order, values in meta_id order.
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in rows {
            let value = value.unwrap_or_default();
            match grouped.iter().position(|(k, _)| *k == key) {
                Some(i) => grouped[i].1.push(value),
                None => grouped.push((key, vec![value])),
            }
        }
        Ok(grouped)
    }

    async fn delete_legacy_term_meta(
        &self,
        term_id: u64,
        taxonomy: &str,
        meta_key: &str,
    ) -> Result<()> {
        let Some(post_id) = self.carrier_post_id(term_id, taxonomy).await? else {
            return Ok(());
        };

        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "DELETE FROM {} WHERE `post_id` = :post_id AND `meta_key` = :meta_key",
            self.tables.postmeta
        );
        conn.exec_drop(
            query,
            params! { "post_id" => post_id, "meta_key" => meta_key },
        )
        .await
        .context("Failed to delete legacy term meta")?;
        Ok(())
    }

    async fn add_term_meta(
        &self,
        term_id: u64,
        meta_key: &str,
        meta_value: &str,
    ) -> MetaAddOutcome {
        let mut conn = match self.pool.get_conn().await {
            Ok(conn) => conn,
            Err(e) => return MetaAddOutcome::Failed(e.to_string()),
        };

        let query = format!(
            "INSERT INTO {} (`term_id`, `meta_key`, `meta_value`) \
             VALUES (:term_id, :meta_key, :meta_value)",
            self.tables.termmeta
        );
        let result = conn
            .exec_drop(
                query,
                params! {
                    "term_id" => term_id,
                    "meta_key" => meta_key,
                    "meta_value" => meta_value,
                },
            )
            .await;

        match result {
            Ok(()) => MetaAddOutcome::Added(conn.last_insert_id().unwrap_or(0)),
            Err(mysql_async::Error::Server(e)) => {
                MetaAddOutcome::Failed(format!("{}: {}", e.code, e.message))
            }
            Err(e) => MetaAddOutcome::Failed(e.to_string()),
        }
    }

    async fn post_exists(&self, post_id: u64) -> Result<bool> {
        let mut conn = self.pool.get_conn().await?;
        let query = format!(
            "SELECT `ID` FROM {} WHERE `ID` = :post_id LIMIT 1",
            self.tables.posts
        );
        let row: Option<u64> = conn
            .exec_first(query, params! { "post_id" => post_id })
            .await
            .context("Failed to check post existence")?;
        Ok(row.is_some())
    }

    async fn delete_post(&self, post_id: u64) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .await
            .context("Failed to start transaction")?;

        let delete_meta = format!(
            "DELETE FROM {} WHERE `post_id` = :post_id",
            self.tables.postmeta
        );
        tx.exec_drop(delete_meta, params! { "post_id" => post_id })
            .await
            .context("Failed to delete post meta")?;

        let delete_relationships = format!(
            "DELETE FROM {} WHERE `object_id` = :post_id",
            self.tables.term_relationships
        );
        tx.exec_drop(delete_relationships, params! { "post_id" => post_id })
            .await
            .context("Failed to delete term relationships")?;

        let delete_post = format!("DELETE FROM {} WHERE `ID` = :post_id", self.tables.posts);
        tx.exec_drop(delete_post, params! { "post_id" => post_id })
            .await
            .context("Failed to delete post")?;

        tx.commit().await.context("Failed to commit post deletion")?;
        Ok(())
    }
}
