//! Plan cache.
//!
//! Compiled plans are cached per mapping shape: the event and record types,
//! the configuration path, the output format and a hash of the declared
//! names. Entries are never evicted; mapping configuration is static for the
//! life of a process.
//!
//! [`PlanCache::get_or_compile`] never holds the lock while compiling. Two
//! threads racing on the same key may both compile; the first insert wins
//! and both callers get the cached plan.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use xxhash_rust::xxh3::Xxh3;

use crate::diagnostic::{ConfigPath, Result};
use crate::ir::OutputFormat;
use crate::plan::{ColumnPlan, JsonPlan};
use crate::shape::ShapeId;

/// Identity of a compiled plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub event: ShapeId,
    pub record: ShapeId,
    pub path: ConfigPath,
    pub format: OutputFormat,
    /// [`signature`] of the mapping's column (or top-level field) names.
    pub signature: u64,
}

/// A cached plan.
#[derive(Debug, Clone)]
pub enum CachedPlan {
    Rows(Arc<ColumnPlan>),
    Json(Arc<JsonPlan>),
}

/// Hashes an ordered list of names. Order matters.
pub fn signature<'a>(names: impl IntoIterator<Item = &'a str>) -> u64 {
    let mut hasher = Xxh3::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.digest()
}

/// Concurrent insert-if-absent cache of compiled plans.
#[derive(Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<PlanKey, CachedPlan>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PlanKey) -> Option<CachedPlan> {
        self.plans.read().get(key).cloned()
    }

    /// Returns the cached plan for `key`, compiling it on a miss.
    ///
    /// A failed compilation caches nothing.
    pub fn get_or_compile<F>(&self, key: PlanKey, compile: F) -> Result<CachedPlan>
    where
        F: FnOnce() -> Result<CachedPlan>,
    {
        if let Some(plan) = self.get(&key) {
            tracing::trace!(path = %key.path, format = %key.format, "plan cache hit");
            return Ok(plan);
        }

        let compiled = compile()?;

        let mut plans = self.plans.write();
        if let Some(existing) = plans.get(&key) {
            tracing::debug!(path = %key.path, "plan compiled concurrently; keeping cached plan");
            return Ok(existing.clone());
        }
        plans.insert(key, compiled.clone());
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("entries", &self.len())
            .finish()
    }
}
