//! Keyed query cache for the data-table screens.
//!
//! Every screen fetches one or more endpoints under a cache key, renders from
//! the cached value on revisit, and invalidates the key after a mutation to
//! force a refetch. Fetch errors are never cached.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::error::Error;

/// Cache key for a query (screen + endpoint, by convention `"clients"`,
/// `"tenants"`, `"sms-history/average"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::From)]
pub struct QueryKey(pub String);

impl From<&str> for QueryKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Render state of a data-table screen.
///
/// Pending shows the skeleton loader, `NotFound` the not-found view,
/// `Failed` the screen's own error state.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Pending,
    Ready(T),
    NotFound,
    Failed(String),
}

impl<T> QueryState<T> {
    /// Map a fetch result into a render state: 404s become the not-found
    /// view, every other error the generic failure state.
    pub fn from_result(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) if e.is_not_found() => Self::NotFound,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// In-process query cache.
///
/// Values are stored as JSON so heterogeneous screens can share one cache.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, serde_json::Value>>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    ///
    /// Errors from `fetch` propagate to the caller and leave the cache
    /// untouched, so the next call retries.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, Error>>,
    {
        // Fast path: read lock
        {
            let entries = self.entries.read().await;
            if let Some(value) = entries.get(key) {
                return Ok(serde_json::from_value(value.clone())?);
            }
        }

        let fetched = fetch().await?;
        let value = serde_json::to_value(&fetched)?;

        let mut entries = self.entries.write().await;
        entries.insert(key.clone(), value);
        Ok(fetched)
    }

    /// Drop the cached value for `key`, forcing the next read to refetch.
    ///
    /// Call after any mutation that changes what the keyed query returns.
    pub async fn invalidate(&self, key: &QueryKey) {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            tracing::debug!(%key, "query cache invalidated");
        }
    }

    /// Drop every cached value (logout path).
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
