// In-memory Platform mimicking the WordPress tables, with injectable
// write failures. Each integration test binary compiles this module
// separately and uses a different subset of the helpers.
#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use fm_term_meta_migrator::carriers::{carrier_name_for, CARRIER_NAME_PREFIX};
use fm_term_meta_migrator::platform::{CarrierPost, MetaAddOutcome, Platform, Term};
use fm_term_meta_migrator::preflight::TERM_META_DB_VERSION;

#[derive(Debug, Default)]
struct MemoryState {
    db_version: u64,
    posts: Vec<CarrierPost>,
    terms: Vec<Term>,
    /// (post_id, meta_key, meta_value) in insertion order.
    postmeta: Vec<(u64, String, String)>,
    /// (term_id, meta_key, meta_value) in insertion order.
    termmeta: Vec<(u64, String, String)>,
    /// (term_id, meta_key) pairs whose native adds are rejected.
    failing_adds: Vec<(u64, String)>,
    next_post_id: u64,
    next_meta_id: u64,
}

pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::with_db_version(TERM_META_DB_VERSION)
    }

    pub fn with_db_version(db_version: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                db_version,
                next_post_id: 1000,
                next_meta_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    pub fn insert_term(&self, term_id: u64, taxonomy: &str, name: &str, slug: &str) {
        self.state.lock().unwrap().terms.push(Term {
            term_id,
            taxonomy: taxonomy.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
        });
    }

    /// Create a carrier post for (term, taxonomy) and return its post id.
    pub fn insert_carrier(&self, term_id: u64, taxonomy: &str) -> u64 {
        self.insert_post_named(&carrier_name_for(term_id, taxonomy))
    }

    /// Create a post with an arbitrary name and return its id.
    pub fn insert_post_named(&self, name: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_post_id;
        state.next_post_id += 1;
        state.posts.push(CarrierPost {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn insert_postmeta(&self, post_id: u64, meta_key: &str, meta_value: &str) {
        self.state.lock().unwrap().postmeta.push((
            post_id,
            meta_key.to_string(),
            meta_value.to_string(),
        ));
    }

    /// Reject every future native add for (term_id, meta_key).
    pub fn fail_adds_for(&self, term_id: u64, meta_key: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_adds
            .push((term_id, meta_key.to_string()));
    }

    pub fn termmeta_rows(&self) -> Vec<(u64, String, String)> {
        self.state.lock().unwrap().termmeta.clone()
    }

    pub fn postmeta_rows(&self) -> Vec<(u64, String, String)> {
        self.state.lock().unwrap().postmeta.clone()
    }

    pub fn has_post(&self, post_id: u64) -> bool {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .any(|p| p.id == post_id)
    }

    fn post_id_for_name(state: &MemoryState, name: &str) -> Option<u64> {
        state
            .posts
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.id)
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    async fn schema_version(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().db_version)
    }

    async fn carrier_posts(&self) -> Result<Vec<CarrierPost>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .posts
            .iter()
            .filter(|p| {
                p.name
                    .to_ascii_lowercase()
                    .starts_with(CARRIER_NAME_PREFIX)
            })
            .cloned()
            .collect())
    }

    async fn get_term(&self, term_id: u64, taxonomy: &str) -> Result<Option<Term>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .terms
            .iter()
            .find(|t| t.term_id == term_id && t.taxonomy == taxonomy)
            .cloned())
    }

    async fn legacy_term_meta(
        &self,
        term_id: u64,
        taxonomy: &str,
    ) -> Result<Vec<(String, Vec<String>)>> {
        let state = self.state.lock().unwrap();
        let Some(post_id) = Self::post_id_for_name(&state, &carrier_name_for(term_id, taxonomy))
        else {
            return Ok(Vec::new());
        };

        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (_, key, value) in state.postmeta.iter().filter(|(id, _, _)| *id == post_id) {
            match grouped.iter().position(|(k, _)| k == key) {
                Some(i) => grouped[i].1.push(value.clone()),
                None => grouped.push((key.clone(), vec![value.clone()])),
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
        let mut state = self.state.lock().unwrap();
        let Some(post_id) = Self::post_id_for_name(&state, &carrier_name_for(term_id, taxonomy))
        else {
            return Ok(());
        };
        state
            .postmeta
            .retain(|(id, key, _)| *id != post_id || key != meta_key);
        Ok(())
    }

    async fn add_term_meta(
        &self,
        term_id: u64,
        meta_key: &str,
        meta_value: &str,
    ) -> MetaAddOutcome {
        let mut state = self.state.lock().unwrap();
        if state
            .failing_adds
            .iter()
            .any(|(id, key)| *id == term_id && key == meta_key)
        {
            return MetaAddOutcome::Failed(format!(
                "1406: Data too long for column 'meta_value' (term {term_id}, key {meta_key})"
            ));
        }
        state
            .termmeta
            .push((term_id, meta_key.to_string(), meta_value.to_string()));
        let id = state.next_meta_id;
        state.next_meta_id += 1;
        MetaAddOutcome::Added(id)
    }

    async fn post_exists(&self, post_id: u64) -> Result<bool> {
        Ok(self.has_post(post_id))
    }

    async fn delete_post(&self, post_id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.posts.retain(|p| p.id != post_id);
        state.postmeta.retain(|(id, _, _)| *id != post_id);
        Ok(())
    }
}

/// The worked example from the operator docs: term 42 in `category`
/// with legacy meta `{color: [red, blue], size: [M]}`.
pub fn seed_category_term(db: &MemoryPlatform) -> u64 {
    db.insert_term(42, "category", "News", "news");
    let post_id = db.insert_carrier(42, "category");
    db.insert_postmeta(post_id, "color", "red");
    db.insert_postmeta(post_id, "color", "blue");
    db.insert_postmeta(post_id, "size", "M");
    post_id
}
