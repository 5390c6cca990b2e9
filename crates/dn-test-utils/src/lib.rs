//! Testing utilities for the dual-native workspace
//!
//! Shared fixtures, scripted providers and instrumented stores.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dn_artifact::{etag, Block, Cid, DocId, DocStatus, MachineRepresentation};
use dn_core::{GenerationError, GenerationParams, GenerationProvider};
use dn_store::{
    CatalogQuery, Document, DocumentStore, InMemoryStore, InsertRequest, StoreError, StoreReply,
    TitleWrite, HEADER_COUNT_AFTER, HEADER_COUNT_BEFORE, HEADER_ETAG, HEADER_INSERTED_AT,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

// ---- fixtures ------------------------------------------------------------

pub const SAMPLE_ID: DocId = DocId(42);

pub fn sample_blocks() -> Vec<Block> {
    vec![
        Block::heading(2, "Why caching matters"),
        Block::paragraph("Caching reduces latency for repeated reads of the same content."),
        Block::list(false, ["validation", "invalidation"]),
    ]
}

pub fn sample_document(id: DocId) -> Document {
    let mut doc = Document::new(id, "Caching notes", sample_blocks());
    doc.modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single();
    doc
}

pub fn sample_mr() -> MachineRepresentation {
    sample_document(SAMPLE_ID).to_mr()
}

pub fn seeded_store() -> InMemoryStore {
    let mut published = Document::new(DocId(7), "Release notes", vec![Block::paragraph("v1")]);
    published.status = DocStatus::Publish;
    published.modified = Utc.with_ymd_and_hms(2024, 4, 1, 8, 30, 0).single();
    InMemoryStore::from_documents([sample_document(SAMPLE_ID), published])
}

// ---- providers -----------------------------------------------------------

/// Provider answering from a queue; answers `Unavailable` once drained
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().push_back(Ok(text.to_string()));
        self
    }

    #[must_use]
    pub fn fail(self) -> Self {
        self.replies
            .lock()
            .push_back(Err(GenerationError::Failed("scripted failure".to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(GenerationError::Unavailable))
    }
}

// ---- stores --------------------------------------------------------------

/// Wraps a store and counts calls
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// `build_mr` calls
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// `insert_blocks` and `update_title` calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for CountingStore<S> {
    async fn build_mr(&self, doc: DocId) -> Result<Option<MachineRepresentation>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.build_mr(doc).await
    }

    async fn insert_blocks(
        &self,
        doc: DocId,
        request: InsertRequest,
        if_match: Option<&str>,
    ) -> Result<StoreReply, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_blocks(doc, request, if_match).await
    }

    async fn update_title(
        &self,
        doc: DocId,
        title: &str,
        if_match: Option<&str>,
    ) -> Result<TitleWrite, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_title(doc, title, if_match).await
    }

    async fn list(&self, query: &CatalogQuery) -> Result<Vec<DocId>, StoreError> {
        self.inner.list(query).await
    }
}

#[derive(Debug)]
struct FakeState {
    doc: Document,
    current: Cid,
    conflicts: VecDeque<Cid>,
    next: VecDeque<Cid>,
    if_matches: Vec<Option<String>>,
    reads: usize,
    writes: usize,
}

impl FakeState {
    /// Consume an injected conflict or check the token against `current`
    fn precondition(&mut self, if_match: Option<&str>) -> Result<(), Cid> {
        self.if_matches.push(if_match.map(ToString::to_string));
        if let Some(conflict) = self.conflicts.pop_front() {
            self.current = conflict;
            return Err(self.current.clone());
        }
        match etag::non_empty(if_match) {
            Some(token) if !self.current.matches(token) => Err(self.current.clone()),
            _ => Ok(()),
        }
    }

    fn advance(&mut self) -> Cid {
        self.writes += 1;
        self.current = self
            .next
            .pop_front()
            .unwrap_or_else(|| Cid::compute_parts(&self.doc.title, &self.doc.blocks));
        self.current.clone()
    }
}

/// Single-document store with scripted CIDs and injected conflicts
///
/// Each injected conflict makes the next write fail with 412 and moves the
/// current CID to the injected value, as if another writer got there first.
#[derive(Debug)]
pub struct ConflictingStore {
    state: Mutex<FakeState>,
}

impl ConflictingStore {
    pub fn new(doc: Document, current: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                doc,
                current: Cid::new(current),
                conflicts: VecDeque::new(),
                next: VecDeque::new(),
                if_matches: Vec::new(),
                reads: 0,
                writes: 0,
            }),
        }
    }

    /// Fail the next write, leaving `current` as the store's CID
    #[must_use]
    pub fn conflict_with(self, current: &str) -> Self {
        self.state.lock().conflicts.push_back(Cid::new(current));
        self
    }

    /// CID assigned by the next successful write
    #[must_use]
    pub fn then_cid(self, cid: &str) -> Self {
        self.state.lock().next.push_back(Cid::new(cid));
        self
    }

    pub fn current(&self) -> Cid {
        self.state.lock().current.clone()
    }

    pub fn document(&self) -> Document {
        self.state.lock().doc.clone()
    }

    /// Raw If-Match values seen by writes, in order
    pub fn if_match_log(&self) -> Vec<Option<String>> {
        self.state.lock().if_matches.clone()
    }

    /// Unwrapped If-Match tokens seen by writes
    pub fn if_match_tokens(&self) -> Vec<String> {
        self.if_match_log()
            .iter()
            .map(|v| v.as_deref().map(etag::unwrap).unwrap_or_default().to_string())
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    /// Successful mutations
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl DocumentStore for ConflictingStore {
    async fn build_mr(&self, doc: DocId) -> Result<Option<MachineRepresentation>, StoreError> {
        let mut state = self.state.lock();
        state.reads += 1;
        Ok((state.doc.id == doc).then(|| state.doc.to_mr()))
    }

    async fn insert_blocks(
        &self,
        doc: DocId,
        request: InsertRequest,
        if_match: Option<&str>,
    ) -> Result<StoreReply, StoreError> {
        let mut state = self.state.lock();
        if state.doc.id != doc {
            return Ok(StoreReply::error(404, "not_found", "Document not found"));
        }
        if let Err(current) = state.precondition(if_match) {
            return Ok(StoreReply::precondition_failed(&current));
        }

        let before = state.doc.blocks.len();
        let at = request.position(before);
        state.doc.blocks.splice(at..at, request.blocks);
        state.doc.modified = Some(Utc::now());
        let cid = state.advance();
        let after = state.doc.blocks.len();
        let body = serde_json::to_value(state.doc.to_mr().with_cid(cid.clone()))?;

        Ok(StoreReply::new(200, body)
            .with_header(HEADER_ETAG, cid.quoted())
            .with_header(HEADER_COUNT_BEFORE, before.to_string())
            .with_header(HEADER_INSERTED_AT, at.to_string())
            .with_header(HEADER_COUNT_AFTER, after.to_string()))
    }

    async fn update_title(
        &self,
        doc: DocId,
        title: &str,
        if_match: Option<&str>,
    ) -> Result<TitleWrite, StoreError> {
        let mut state = self.state.lock();
        if state.doc.id != doc {
            return Ok(TitleWrite::NotFound);
        }
        if let Err(current) = state.precondition(if_match) {
            return Ok(TitleWrite::Conflict { current });
        }
        state.doc.title = title.to_string();
        state.doc.modified = Some(Utc::now());
        Ok(TitleWrite::Updated {
            cid: state.advance(),
        })
    }

    async fn list(&self, _query: &CatalogQuery) -> Result<Vec<DocId>, StoreError> {
        Ok(vec![self.state.lock().doc.id])
    }
}

/// Store whose writes answer with a body that is not a Machine Representation
#[derive(Debug, Default)]
pub struct MalformedStore {
    inner: InMemoryStore,
}

impl MalformedStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for MalformedStore {
    async fn build_mr(&self, doc: DocId) -> Result<Option<MachineRepresentation>, StoreError> {
        self.inner.build_mr(doc).await
    }

    async fn insert_blocks(
        &self,
        _doc: DocId,
        _request: InsertRequest,
        _if_match: Option<&str>,
    ) -> Result<StoreReply, StoreError> {
        Ok(StoreReply::new(200, serde_json::json!({ "ok": true })))
    }

    async fn update_title(
        &self,
        doc: DocId,
        title: &str,
        if_match: Option<&str>,
    ) -> Result<TitleWrite, StoreError> {
        self.inner.update_title(doc, title, if_match).await
    }

    async fn list(&self, query: &CatalogQuery) -> Result<Vec<DocId>, StoreError> {
        self.inner.list(query).await
    }
}
