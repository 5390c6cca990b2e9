//! Document store contract
//!
//! The store is an external collaborator. It owns documents, builds their
//! Machine Representation and performs block insertion with an atomic
//! If-Match check against its own authoritative CID.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dn_artifact::{etag, Block, Cid, DocId, MachineRepresentation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `ETag` response header
pub const HEADER_ETAG: &str = "ETag";
/// Top-level block count before an insert
pub const HEADER_COUNT_BEFORE: &str = "X-Top-Level-Count-Before";
/// Position of the first inserted block
pub const HEADER_INSERTED_AT: &str = "X-Inserted-At";
/// Top-level block count after an insert
pub const HEADER_COUNT_AFTER: &str = "X-Top-Level-Count";

/// Where new blocks go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// After the last block
    #[default]
    Append,
    /// Before the first block
    Prepend,
    /// At an explicit position
    Index,
}

impl InsertMode {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Index => "index",
        }
    }
}

/// Block insertion request passed through to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRequest {
    /// Insert mode
    pub mode: InsertMode,
    /// Target position for [`InsertMode::Index`]
    pub index: Option<usize>,
    /// Blocks to insert, in order
    pub blocks: Vec<Block>,
}

impl InsertRequest {
    /// Append blocks
    #[must_use]
    pub fn append(blocks: Vec<Block>) -> Self {
        Self {
            mode: InsertMode::Append,
            index: None,
            blocks,
        }
    }

    /// Position the blocks will land at in a document of `len` blocks
    #[must_use]
    pub fn position(&self, len: usize) -> usize {
        match self.mode {
            InsertMode::Append => len,
            InsertMode::Prepend => 0,
            InsertMode::Index => self.index.unwrap_or(0).min(len),
        }
    }
}

/// Raw reply of the store's write primitive
///
/// Kept as status + JSON body + headers so the write protocol can detect an
/// unexpected shape instead of trusting the collaborator blindly.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreReply {
    /// HTTP-like status code
    pub status: u16,
    /// JSON body
    pub body: serde_json::Value,
    /// Response headers
    pub headers: BTreeMap<String, String>,
}

impl StoreReply {
    /// Build a reply
    #[must_use]
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body,
            headers: BTreeMap::new(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Error reply with a stable code
    #[must_use]
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::new(
            status,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    /// 412 reply carrying the current CID
    #[must_use]
    pub fn precondition_failed(current: &Cid) -> Self {
        Self::error(
            412,
            "precondition_failed",
            "If-Match did not match current CID",
        )
        .with_header(HEADER_ETAG, current.quoted())
    }

    /// Case-insensitive header lookup
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Header parsed as an integer
    #[must_use]
    pub fn header_usize(&self, name: &str) -> Option<usize> {
        self.header(name).and_then(|v| v.trim().parse().ok())
    }

    /// Unwrapped `ETag` header
    #[must_use]
    pub fn etag(&self) -> Option<Cid> {
        self.header(HEADER_ETAG)
            .map(etag::unwrap)
            .filter(|t| !t.is_empty())
            .map(Cid::new)
    }

    /// Whether the status is 2xx
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of a compare-and-swap title update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleWrite {
    /// Title replaced
    Updated {
        /// The store's new CID
        cid: Cid,
    },
    /// If-Match did not match
    Conflict {
        /// The store's current CID
        current: Cid,
    },
    /// No such document
    NotFound,
}

/// Status filter for catalog listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Drafts only
    Draft,
    /// Published only
    Publish,
    /// Everything
    #[default]
    Any,
}

impl StatusFilter {
    /// Lenient parse; unknown values mean [`StatusFilter::Any`]
    #[must_use]
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("draft") => Self::Draft,
            Some("publish") => Self::Publish,
            _ => Self::Any,
        }
    }
}

/// Default content types listed by the catalog
pub const DEFAULT_CATALOG_TYPES: [&str; 2] = ["post", "page"];

/// Catalog listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Only documents modified strictly after this instant
    pub since: Option<DateTime<Utc>>,
    /// Status filter
    pub status: StatusFilter,
    /// Content types to include
    pub types: Vec<String>,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            since: None,
            status: StatusFilter::Any,
            types: DEFAULT_CATALOG_TYPES.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Document store collaborator
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Build a fresh Machine Representation, `None` if the document is absent
    async fn build_mr(&self, doc: DocId) -> Result<Option<MachineRepresentation>, StoreError>;

    /// Insert blocks, checking `if_match` atomically against the current CID
    ///
    /// `if_match` is the raw header value; the store unwraps it.
    async fn insert_blocks(
        &self,
        doc: DocId,
        request: InsertRequest,
        if_match: Option<&str>,
    ) -> Result<StoreReply, StoreError>;

    /// Replace the title, checking `if_match` atomically against the current CID
    async fn update_title(
        &self,
        doc: DocId,
        title: &str,
        if_match: Option<&str>,
    ) -> Result<TitleWrite, StoreError>;

    /// Ids matching a catalog query, most recently modified first
    async fn list(&self, query: &CatalogQuery) -> Result<Vec<DocId>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_clamps_index() {
        let mut req = InsertRequest::append(vec![]);
        assert_eq!(req.position(3), 3);
        req.mode = InsertMode::Prepend;
        assert_eq!(req.position(3), 0);
        req.mode = InsertMode::Index;
        req.index = Some(10);
        assert_eq!(req.position(3), 3);
        req.index = Some(1);
        assert_eq!(req.position(3), 1);
    }

    #[test]
    fn reply_header_lookup_is_case_insensitive() {
        let reply = StoreReply::new(200, serde_json::json!({}))
            .with_header(HEADER_COUNT_AFTER, "4")
            .with_header(HEADER_ETAG, "W/\"abc\"");
        assert_eq!(reply.header("x-top-level-count"), Some("4"));
        assert_eq!(reply.header_usize(HEADER_COUNT_AFTER), Some(4));
        assert_eq!(reply.etag(), Some(Cid::new("abc")));
    }

    #[test]
    fn precondition_reply_quotes_etag() {
        let reply = StoreReply::precondition_failed(&Cid::new("def456"));
        assert_eq!(reply.status, 412);
        assert_eq!(reply.header(HEADER_ETAG), Some("\"def456\""));
        assert_eq!(reply.body["code"], "precondition_failed");
    }

    #[test]
    fn status_filter_is_lenient() {
        assert_eq!(StatusFilter::parse_lenient(Some("draft")), StatusFilter::Draft);
        assert_eq!(StatusFilter::parse_lenient(Some("publish")), StatusFilter::Publish);
        assert_eq!(StatusFilter::parse_lenient(Some("trash")), StatusFilter::Any);
        assert_eq!(StatusFilter::parse_lenient(None), StatusFilter::Any);
    }

    #[test]
    fn catalog_query_defaults_to_two_types() {
        let q = CatalogQuery::default();
        assert_eq!(q.types, vec!["post".to_string(), "page".to_string()]);
    }
}
