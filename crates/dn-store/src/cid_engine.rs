//! Content-identifier cache using moka
//!
//! [`CidEngine`] owns the document id -> CID side-table. Clones share the same
//! cache, so every writer holding a handle can invalidate its document.

use dn_artifact::{Cid, DocId, MachineRepresentation};
use moka::future::Cache;

/// Default number of cached CIDs
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Keyed CID cache with explicit invalidation
///
/// Concurrent misses for the same document are coalesced: the CID is
/// computed once and every waiter receives it. Recomputation is pure, so a
/// miss after invalidation is always safe.
#[derive(Debug, Clone)]
pub struct CidEngine {
    inner: Cache<DocId, Cid>,
}

impl CidEngine {
    /// Create engine with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Compute the CID of a snapshot (no caching)
    #[inline]
    #[must_use]
    pub fn compute(mr: &MachineRepresentation) -> Cid {
        Cid::compute(mr)
    }

    /// Cached CID for a document, if any
    pub async fn get(&self, doc: DocId) -> Option<Cid> {
        self.inner.get(&doc).await
    }

    /// Cached CID for `doc`, computing and storing it from `mr` on a miss
    pub async fn get_or_compute(&self, doc: DocId, mr: &MachineRepresentation) -> Cid {
        self.inner
            .get_with(doc, async {
                let cid = Cid::compute(mr);
                tracing::trace!(doc_id = %doc, cid = %cid, "cid computed");
                cid
            })
            .await
    }

    /// Record a CID learned from an authoritative source
    pub async fn store(&self, doc: DocId, cid: Cid) {
        self.inner.insert(doc, cid).await;
    }

    /// Drop the cached CID; the next read recomputes it
    pub async fn invalidate(&self, doc: DocId) {
        self.inner.invalidate(&doc).await;
        tracing::debug!(doc_id = %doc, "cid invalidated");
    }

    /// Drop every cached CID
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for CidEngine {
    /// Create engine with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
