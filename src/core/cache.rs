//! Client-side query cache.
//!
//! Entries are keyed by a structured [`QueryKey`] such as `users/detail/u-1` or
//! `buses/list?status=active`. Concurrent reads of the same key share one in-flight
//! fetch. Mutations mark every key under a resource prefix stale so the next read
//! refetches; there is no background refresh.
//!
//! Every entry carries a generation. Invalidation, direct writes and `clear` move it on,
//! and a fetch only records its result if the generation it started under is still
//! current, so a response that was already in flight cannot undo a mutation.
use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use futures_util::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use scc::hash_map::Entry;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::core::{
    api_client::QueryParams,
    error::{ApiError, ApiResult},
};

/// Resource categories used as the first key segment.
pub mod resources {
    pub const AUTH: &str = "auth";
    pub const USERS: &str = "users";
    pub const STUDENTS: &str = "students";
    pub const ROUTES: &str = "routes";
    pub const BUSES: &str = "buses";
    pub const ATTENDANCE: &str = "attendance";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const DASHBOARD: &str = "dashboard";
    pub const PROFILE: &str = "profile";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Segment(String),
    Params(QueryParams),
}

/// Request identity inside the cache. Keys compare segment by segment, so
/// `users` is a prefix of both `users/list` and `users/detail/u-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Key covering a whole resource category.
    pub fn all(resource: &str) -> Self {
        Self(vec![KeyPart::Segment(resource.to_string())])
    }

    pub fn detail(resource: &str, id: &str) -> Self {
        Self::all(resource).push("detail").push(id)
    }

    pub fn list(resource: &str, params: QueryParams) -> Self {
        Self::all(resource).push("list").with_params(params)
    }

    /// The signed-in user's profile.
    pub fn auth_me() -> Self {
        Self::all(resources::AUTH).push("me")
    }

    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(KeyPart::Segment(segment.into()));
        self
    }

    /// Append a parameter set. Empty sets are skipped so `list` and `list?` match.
    pub fn with_params(mut self, params: QueryParams) -> Self {
        if !params.is_empty() {
            self.0.push(KeyPart::Params(params));
        }
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            match part {
                KeyPart::Segment(segment) => {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    f.write_str(segment)?;
                }
                KeyPart::Params(params) => {
                    f.write_str("?")?;
                    let pairs: Vec<String> =
                        params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    f.write_str(&pairs.join("&"))?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Last successfully fetched (or directly written) value.
    pub data: Option<Value>,
    pub status: FetchStatus,
    pub error: Option<ApiError>,
    pub is_stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            error: None,
            is_stale: false,
            updated_at: None,
            generation: 0,
        }
    }
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.status == FetchStatus::Success && !self.is_stale && self.data.is_some()
    }

    fn apply(&mut self, result: &ApiResult<Value>) {
        match result {
            Ok(value) => {
                self.data = Some(value.clone());
                self.status = FetchStatus::Success;
                self.error = None;
                self.is_stale = false;
                self.updated_at = Some(Utc::now());
            }
            Err(err) => {
                // keep the previous value around, only the status changes
                self.status = FetchStatus::Error;
                self.error = Some(err.clone());
            }
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, ApiResult<Value>>>;

struct InFlight {
    fetch: SharedFetch,
    generation: u64,
}

#[derive(Default)]
pub struct QueryCache {
    entries: scc::HashMap<QueryKey, CacheEntry>,
    in_flight: scc::HashMap<QueryKey, InFlight>,
    generations: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Return the cached value for `key`, or run `fetcher` to obtain it.
    ///
    /// A fresh entry is returned without calling `fetcher`. Otherwise the caller joins
    /// the fetch already running for `key`, or starts one. The outcome is recorded in
    /// the entry either way.
    pub async fn fetch<T, F, Fut>(self: &Arc<Self>, key: QueryKey, fetcher: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        if let Some(value) = self.fresh_value(&key).await {
            tracing::trace!("Cache hit for {}", key);
            return serde_json::from_value(value).map_err(ApiError::invalid_response);
        }

        let shared = match self.in_flight.entry_async(key.clone()).await {
            Entry::Occupied(running) => {
                tracing::debug!("Joining in-flight fetch for {}", key);
                running.get().fetch.clone()
            }
            Entry::Vacant(slot) => {
                tracing::debug!("Fetching {}", key);
                let generation = self.mark_loading(&key).await;
                let cache = Arc::clone(self);
                let settle_key = key.clone();
                let request = fetcher();
                let shared = async move {
                    let result = request.await.and_then(|payload| {
                        serde_json::to_value(payload).map_err(ApiError::invalid_response)
                    });
                    cache.settle(&settle_key, generation, &result).await;
                    cache
                        .in_flight
                        .remove_if_async(&settle_key, |running| running.generation == generation)
                        .await;
                    result
                }
                .boxed()
                .shared();
                slot.insert_entry(InFlight {
                    fetch: shared.clone(),
                    generation,
                });
                shared
            }
        };

        let value = shared.await?;
        serde_json::from_value(value).map_err(ApiError::invalid_response)
    }

    async fn fresh_value(&self, key: &QueryKey) -> Option<Value> {
        let entry = self.entries.get_async(key).await?;
        let entry = entry.get();
        if entry.is_fresh() {
            entry.data.clone()
        } else {
            None
        }
    }

    /// Flag `key` as loading and return the generation the fetch runs under.
    async fn mark_loading(&self, key: &QueryKey) -> u64 {
        match self.entries.entry_async(key.clone()).await {
            Entry::Occupied(mut existing) => {
                let entry = existing.get_mut();
                entry.status = FetchStatus::Loading;
                entry.generation
            }
            Entry::Vacant(slot) => {
                let generation = self.next_generation();
                slot.insert_entry(CacheEntry {
                    status: FetchStatus::Loading,
                    generation,
                    ..CacheEntry::default()
                });
                generation
            }
        }
    }

    /// Record a fetch outcome, unless the entry moved on while it was running.
    async fn settle(&self, key: &QueryKey, generation: u64, result: &ApiResult<Value>) {
        if let Err(err) = result {
            tracing::debug!("Fetch for {} failed: {}", key, err);
        }
        match self.entries.get_async(key).await {
            Some(mut existing) if existing.get().generation == generation => {
                existing.get_mut().apply(result)
            }
            _ => tracing::debug!("Discarding outdated result for {}", key),
        }
    }

    /// Mark every entry under `prefix` stale. Returns how many were affected.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut affected = 0;
        let affected_ref = &mut affected;
        self.entries
            .retain_async(|key, entry| {
                if key.starts_with(prefix) {
                    entry.is_stale = true;
                    entry.generation = self.next_generation();
                    *affected_ref += 1;
                }
                true
            })
            .await;
        // later readers start over instead of joining a pre-mutation fetch
        self.in_flight
            .retain_async(|key, _| !key.starts_with(prefix))
            .await;
        tracing::debug!("Invalidated {} entries under {}", affected, prefix);
        affected
    }

    /// Write a value directly, as if it had just been fetched.
    pub async fn set_query_data<T: Serialize>(&self, key: QueryKey, data: &T) -> ApiResult<()> {
        let value = serde_json::to_value(data).map_err(ApiError::invalid_response)?;
        let generation = self.next_generation();
        let result = Ok(value);
        match self.entries.entry_async(key).await {
            Entry::Occupied(mut existing) => {
                let entry = existing.get_mut();
                entry.apply(&result);
                entry.generation = generation;
            }
            Entry::Vacant(slot) => {
                let mut entry = CacheEntry {
                    generation,
                    ..CacheEntry::default()
                };
                entry.apply(&result);
                slot.insert_entry(entry);
            }
        }
        Ok(())
    }

    pub async fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.entries.get_async(key).await?;
        let value = entry.get().data.clone()?;
        serde_json::from_value(value).ok()
    }

    pub async fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries
            .get_async(key)
            .await
            .map(|entry| entry.get().clone())
    }

    pub async fn remove(&self, key: &QueryKey) -> bool {
        self.in_flight.remove_async(key).await;
        self.entries.remove_async(key).await.is_some()
    }

    /// Drop every entry. Fetches still running are detached and their results dropped.
    pub async fn clear(&self) {
        self.in_flight.retain_async(|_, _| false).await;
        self.entries.retain_async(|_, _| false).await;
        tracing::debug!("Query cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
