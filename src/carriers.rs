// ABOUTME: Carrier post discovery and term resolution
// ABOUTME: Parses fm-term-meta post names and maps them to taxonomy terms

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use crate::platform::{CarrierPost, Platform, Term};

/// Reserved prefix of every carrier post name.
pub const CARRIER_NAME_PREFIX: &str = "fm-term-meta-";

static CARRIER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)fm-term-meta-(\d+)-(.*)").unwrap());

/// Name of the carrier post for one (term, taxonomy) pair.
pub fn carrier_name_for(term_id: u64, taxonomy: &str) -> String {
    format!("{CARRIER_NAME_PREFIX}{term_id}-{taxonomy}")
}

/// Parse a carrier post name into (term id, taxonomy slug).
///
/// Returns `None` when the name does not match the reserved pattern or
/// the digits do not fit a `u64`.
pub fn parse_carrier_name(name: &str) -> Option<(u64, String)> {
    let caps = CARRIER_NAME_RE.captures(name)?;
    let term_id: u64 = caps.get(1)?.as_str().parse().ok()?;
    let taxonomy = caps.get(2)?.as_str().to_string();
    Some((term_id, taxonomy))
}

/// A term annotated with the carrier post it was discovered through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTerm {
    pub term: Term,
    pub carrier: CarrierPost,
}

/// Memoized carrier post listing, scoped to one invocation.
///
/// The listing is queried once and reused; `force_refresh` is the
/// explicit invalidation entry point.
#[derive(Debug, Default)]
pub struct CarrierIndex {
    cached: Option<Vec<CarrierPost>>,
}

impl CarrierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All carrier posts, from the cache unless unpopulated or forced.
    pub async fn carrier_posts<P: Platform>(
        &mut self,
        db: &P,
        force_refresh: bool,
    ) -> Result<&[CarrierPost]> {
        if force_refresh || self.cached.is_none() {
            self.cached = Some(db.carrier_posts().await?);
        }
        Ok(self.cached.as_deref().unwrap_or_default())
    }

    /// Resolve every cached carrier post to its taxonomy term.
    ///
    /// Carriers with unparseable names, and carriers whose term no
    /// longer exists in the named taxonomy, are logged and excluded.
    /// The survivors come back in discovery order, which follows the
    /// store's enumeration order and is not stable across runs.
    pub async fn resolve_terms<P: Platform>(&mut self, db: &P) -> Result<Vec<ResolvedTerm>> {
        let carriers = self.carrier_posts(db, false).await?.to_vec();
        let mut resolved = Vec::new();

        for carrier in carriers {
            let Some((term_id, taxonomy)) = parse_carrier_name(&carrier.name) else {
                tracing::warn!("Invalid term meta post name: {}", carrier.name);
                continue;
            };

            match db.get_term(term_id, &taxonomy).await {
                Ok(Some(term)) => resolved.push(ResolvedTerm { term, carrier }),
                Ok(None) => {
                    tracing::warn!(
                        "Term meta post found for invalid term; perhaps this was an old \
                         taxonomy? Taxonomy: {}, Term ID: {}",
                        taxonomy,
                        term_id
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to look up term {} in taxonomy {}: {:#}",
                        term_id,
                        taxonomy,
                        e
                    );
                }
            }
        }

        Ok(resolved)
    }
}
