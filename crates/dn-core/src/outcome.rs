//! Operation results
//!
//! Plain serde structs; both surfaces serialize them as-is and only add
//! transport metadata (status codes, headers).

use chrono::{DateTime, Utc};
use dn_artifact::{CatalogEntry, Cid, MachineRepresentation};
use serde::{Deserialize, Serialize};

/// Result of a conditional read
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T> {
    /// The caller's entity tag matched
    NotModified {
        /// Current entity tag, unquoted
        etag: String,
    },
    /// Fresh representation
    Modified {
        /// Response body
        body: T,
        /// Current entity tag, unquoted
        etag: String,
        /// `Last-Modified` header value, if the document has a timestamp
        last_modified: Option<String>,
    },
}

impl<T> Conditional<T> {
    /// Current entity tag
    #[must_use]
    pub fn etag(&self) -> &str {
        match self {
            Self::NotModified { etag } | Self::Modified { etag, .. } => etag,
        }
    }

    /// HTTP status equivalent
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::NotModified { .. } => 304,
            Self::Modified { .. } => 200,
        }
    }

    /// Body, if modified
    #[must_use]
    pub fn into_body(self) -> Option<T> {
        match self {
            Self::NotModified { .. } => None,
            Self::Modified { body, .. } => Some(body),
        }
    }
}

/// Version metadata of a read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMeta {
    /// Entity tag of this representation
    pub etag: String,
    /// Document modification time
    pub last_modified: Option<DateTime<Utc>>,
}

/// `mr/{id}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrDocument {
    /// Snapshot with its CID attached
    pub mr: MachineRepresentation,
    /// Version metadata
    pub meta: ReadMeta,
}

/// `md/{id}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownDocument {
    /// Rendered Markdown
    pub markdown: String,
    /// Version metadata (`sha256-` entity tag)
    pub meta: ReadMeta,
}

/// `catalog` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Number of items
    pub count: usize,
    /// Entries, most recently modified first
    pub items: Vec<CatalogEntry>,
}

/// Top-level block counts around an insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Before the insert
    pub before: Option<usize>,
    /// After the insert
    pub after: Option<usize>,
}

/// Version metadata of a block insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMeta {
    /// New CID
    pub etag: Cid,
    /// Position of the first inserted block
    pub inserted_at: Option<usize>,
    /// Block counts
    pub counts: Counts,
}

/// Result of a block insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// Updated document projection
    pub mr: MachineRepresentation,
    /// Version metadata
    pub meta: WriteMeta,
}

/// Summary and tags for a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Summary text
    pub summary: String,
    /// Topic tags
    pub tags: Vec<String>,
    /// Provider name or `heuristic`
    pub provider: String,
}

/// Result of the agentic summarize operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeOutcome {
    /// Updated document projection
    pub mr: MachineRepresentation,
    /// Inserted summary text
    pub summary: String,
    /// Provider name or `heuristic`
    pub provider: String,
    /// Version metadata of the insert
    pub meta: WriteMeta,
}

/// Version metadata of a title update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMeta {
    /// CID after the operation
    pub etag: Cid,
    /// CID the write was conditioned on
    pub previous_etag: Cid,
}

/// Result of title generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleOutcome {
    /// Title before the operation
    pub old_title: String,
    /// Generated title
    pub new_title: String,
    /// Document projection after the operation
    pub mr: MachineRepresentation,
    /// Version metadata
    pub meta: TitleMeta,
    /// Provider name or `heuristic`
    pub provider: String,
    /// Set when the generated title equalled the current one
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_change: bool,
}
