//! In-memory reference store
//!
//! Implements the [`DocumentStore`] contract with a single `RwLock`, so the
//! If-Match check and the mutation happen atomically. Used by the server
//! binary (seeded from JSON) and by tests.

use crate::error::StoreError;
use crate::store::{
    CatalogQuery, DocumentStore, InsertRequest, StatusFilter, StoreReply, TitleWrite,
    HEADER_COUNT_AFTER, HEADER_COUNT_BEFORE, HEADER_ETAG, HEADER_INSERTED_AT,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dn_artifact::{etag, Block, Cid, DocId, DocStatus, MachineRepresentation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: DocId,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Publication status
    #[serde(default)]
    pub status: DocStatus,
    /// Content type (`post`, `page`, ...)
    #[serde(rename = "type", default = "default_doc_type")]
    pub doc_type: String,
    /// Last modification time
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    /// Ordered top-level blocks
    #[serde(default)]
    pub blocks: Vec<Block>,
}

fn default_doc_type() -> String {
    "post".to_string()
}

impl Document {
    /// New draft post
    #[must_use]
    pub fn new(id: DocId, title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            id,
            title: title.into(),
            status: DocStatus::Draft,
            doc_type: default_doc_type(),
            modified: None,
            blocks,
        }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn to_mr(&self) -> MachineRepresentation {
        MachineRepresentation::new(
            self.id,
            self.title.clone(),
            self.status,
            self.modified,
            self.blocks.clone(),
        )
    }

    /// Authoritative CID of the current state
    #[must_use]
    pub fn cid(&self) -> Cid {
        Cid::compute_parts(&self.title, &self.blocks)
    }

    fn matches(&self, query: &CatalogQuery) -> bool {
        let status_ok = match query.status {
            StatusFilter::Any => true,
            StatusFilter::Draft => self.status == DocStatus::Draft,
            StatusFilter::Publish => self.status == DocStatus::Publish,
        };
        let type_ok = query.types.iter().any(|t| t == &self.doc_type);
        let since_ok = match (query.since, self.modified) {
            (None, _) => true,
            (Some(since), Some(modified)) => modified > since,
            (Some(_), None) => false,
        };
        status_ok && type_ok && since_ok
    }
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<DocId, Document>>,
}

impl InMemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with documents
    #[must_use]
    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.docs.write();
            for doc in docs {
                guard.insert(doc.id, doc);
            }
        }
        store
    }

    /// Load a JSON array of documents
    ///
    /// # Errors
    /// - `StoreError::Unavailable` if the file cannot be read
    /// - `StoreError::Malformed` if it is not a document array
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        let docs: Vec<Document> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), documents = docs.len(), "seeded in-memory store");
        Ok(Self::from_documents(docs))
    }

    /// Insert or replace a document
    pub fn put(&self, doc: Document) {
        self.docs.write().insert(doc.id, doc);
    }

    /// Copy of a stored document
    #[must_use]
    pub fn get(&self, id: DocId) -> Option<Document> {
        self.docs.read().get(&id).cloned()
    }

    /// Mutate a document outside the protocol (simulates another editor)
    ///
    /// Returns false if the document does not exist.
    pub fn edit(&self, id: DocId, f: impl FnOnce(&mut Document)) -> bool {
        let mut guard = self.docs.write();
        match guard.get_mut(&id) {
            Some(doc) => {
                f(doc);
                doc.modified = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

/// Whether a raw If-Match value admits the current CID
fn precondition_holds(if_match: Option<&str>, current: &Cid) -> bool {
    etag::non_empty(if_match).map_or(true, |token| current.matches(token))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn build_mr(&self, doc: DocId) -> Result<Option<MachineRepresentation>, StoreError> {
        Ok(self.docs.read().get(&doc).map(Document::to_mr))
    }

    async fn insert_blocks(
        &self,
        doc: DocId,
        request: InsertRequest,
        if_match: Option<&str>,
    ) -> Result<StoreReply, StoreError> {
        let mut guard = self.docs.write();
        let Some(stored) = guard.get_mut(&doc) else {
            return Ok(StoreReply::error(404, "not_found", "Document not found"));
        };

        let current = stored.cid();
        if !precondition_holds(if_match, &current) {
            return Ok(StoreReply::precondition_failed(&current));
        }
        if request.blocks.is_empty() {
            return Ok(StoreReply::error(400, "invalid_input", "No blocks to insert"));
        }

        let before = stored.blocks.len();
        let at = request.position(before);
        stored.blocks.splice(at..at, request.blocks);
        stored.modified = Some(Utc::now());

        let after = stored.blocks.len();
        let cid = stored.cid();
        let body = serde_json::to_value(stored.to_mr().with_cid(cid.clone()))?;

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
        let mut guard = self.docs.write();
        let Some(stored) = guard.get_mut(&doc) else {
            return Ok(TitleWrite::NotFound);
        };

        let current = stored.cid();
        if !precondition_holds(if_match, &current) {
            return Ok(TitleWrite::Conflict { current });
        }

        stored.title = title.to_string();
        stored.modified = Some(Utc::now());
        Ok(TitleWrite::Updated { cid: stored.cid() })
    }

    async fn list(&self, query: &CatalogQuery) -> Result<Vec<DocId>, StoreError> {
        let guard = self.docs.read();
        let mut hits: Vec<&Document> = guard.values().filter(|d| d.matches(query)).collect();
        hits.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(hits.into_iter().map(|d| d.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InsertMode;
    use chrono::TimeZone;

    fn store() -> InMemoryStore {
        InMemoryStore::from_documents([Document::new(
            DocId(42),
            "Hello",
            vec![Block::paragraph("one"), Block::paragraph("two")],
        )])
    }

    #[tokio::test]
    async fn insert_without_precondition_appends() {
        let store = store();
        let reply = store
            .insert_blocks(
                DocId(42),
                InsertRequest::append(vec![Block::paragraph("three")]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.header_usize(HEADER_COUNT_BEFORE), Some(2));
        assert_eq!(reply.header_usize(HEADER_INSERTED_AT), Some(2));
        assert_eq!(reply.header_usize(HEADER_COUNT_AFTER), Some(3));
        assert_eq!(reply.etag(), Some(store.get(DocId(42)).unwrap().cid()));
        assert_eq!(reply.body["cid"], reply.etag().unwrap().as_str());
    }

    #[tokio::test]
    async fn insert_at_index_is_clamped() {
        let store = store();
        let request = InsertRequest {
            mode: InsertMode::Index,
            index: Some(99),
            blocks: vec![Block::paragraph("tail")],
        };
        let reply = store.insert_blocks(DocId(42), request, None).await.unwrap();
        assert_eq!(reply.header_usize(HEADER_INSERTED_AT), Some(2));
    }

    #[tokio::test]
    async fn prepend_lands_first() {
        let store = store();
        let request = InsertRequest {
            mode: InsertMode::Prepend,
            index: None,
            blocks: vec![Block::heading(2, "Top")],
        };
        store.insert_blocks(DocId(42), request, None).await.unwrap();
        let doc = store.get(DocId(42)).unwrap();
        assert_eq!(doc.blocks[0], Block::heading(2, "Top"));
    }

    #[tokio::test]
    async fn stale_if_match_is_rejected_without_mutation() {
        let store = store();
        let before = store.get(DocId(42)).unwrap();
        let reply = store
            .insert_blocks(
                DocId(42),
                InsertRequest::append(vec![Block::paragraph("x")]),
                Some("\"stale\""),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, 412);
        assert_eq!(reply.etag(), Some(before.cid()));
        assert_eq!(store.get(DocId(42)).unwrap(), before);
    }

    #[tokio::test]
    async fn weak_quoted_if_match_is_accepted() {
        let store = store();
        let cid = store.get(DocId(42)).unwrap().cid();
        let header = format!("W/{}", cid.quoted());
        let reply = store
            .insert_blocks(
                DocId(42),
                InsertRequest::append(vec![Block::paragraph("x")]),
                Some(&header),
            )
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
    }

    #[tokio::test]
    async fn missing_document_is_404() {
        let reply = store()
            .insert_blocks(DocId(1), InsertRequest::append(vec![]), None)
            .await
            .unwrap();
        assert_eq!(reply.status, 404);
    }

    #[tokio::test]
    async fn update_title_is_compare_and_swap() {
        let store = store();
        let cid = store.get(DocId(42)).unwrap().cid();

        let conflict = store
            .update_title(DocId(42), "New", Some("nope"))
            .await
            .unwrap();
        assert_eq!(conflict, TitleWrite::Conflict { current: cid.clone() });

        let updated = store
            .update_title(DocId(42), "New", Some(cid.as_str()))
            .await
            .unwrap();
        let TitleWrite::Updated { cid: new_cid } = updated else {
            panic!("expected update");
        };
        assert_ne!(new_cid, cid);
        assert_eq!(store.get(DocId(42)).unwrap().title, "New");
    }

    #[tokio::test]
    async fn list_filters_and_orders_by_modified() {
        let at = |d| Some(Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap());
        let mut a = Document::new(DocId(1), "a", vec![]);
        a.modified = at(1);
        let mut b = Document::new(DocId(2), "b", vec![]);
        b.modified = at(3);
        b.status = DocStatus::Publish;
        let mut c = Document::new(DocId(3), "c", vec![]);
        c.modified = at(2);
        c.doc_type = "attachment".into();
        let store = InMemoryStore::from_documents([a, b, c]);

        let all = store.list(&CatalogQuery::default()).await.unwrap();
        assert_eq!(all, vec![DocId(2), DocId(1)]);

        let drafts = store
            .list(&CatalogQuery {
                status: StatusFilter::Draft,
                ..CatalogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(drafts, vec![DocId(1)]);

        let recent = store
            .list(&CatalogQuery {
                since: at(1),
                ..CatalogQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(recent, vec![DocId(2)]);
    }
}
