//! Machine Representation
//!
//! [`MachineRepresentation`] is a point-in-time snapshot of a document. It is
//! built fresh on every read and never mutated in place by the protocol layer.

use crate::block::Block;
use crate::cid::Cid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub u64);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Publication status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    /// Work in progress
    #[default]
    Draft,
    /// Awaiting review
    Pending,
    /// Visible only to editors
    Private,
    /// Scheduled
    Future,
    /// Public
    Publish,
}

impl DocStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
            Self::Future => "future",
            Self::Publish => "publish",
        }
    }
}

/// Point-in-time snapshot of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRepresentation {
    /// Document id
    pub id: DocId,
    /// Document title
    pub title: String,
    /// Publication status
    pub status: DocStatus,
    /// Last modification time
    pub modified: Option<DateTime<Utc>>,
    /// Ordered top-level blocks
    pub blocks: Vec<Block>,
    /// Plain text of all blocks, separated by blank lines
    pub core_content_text: String,
    /// CID attached by the reader, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
}

impl MachineRepresentation {
    /// Build a snapshot, deriving `core_content_text` from the blocks
    #[must_use]
    pub fn new(
        id: DocId,
        title: impl Into<String>,
        status: DocStatus,
        modified: Option<DateTime<Utc>>,
        blocks: Vec<Block>,
    ) -> Self {
        let core_content_text = core_text(&blocks);
        Self {
            id,
            title: title.into(),
            status,
            modified,
            blocks,
            core_content_text,
            cid: None,
        }
    }

    /// Attach a CID to the snapshot
    #[inline]
    #[must_use]
    pub fn with_cid(mut self, cid: Cid) -> Self {
        self.cid = Some(cid);
        self
    }

    /// Texts of all non-empty heading blocks, in document order
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(Block::heading_text)
    }

    /// Number of top-level blocks
    #[inline]
    #[must_use]
    pub fn top_level_count(&self) -> usize {
        self.blocks.len()
    }

    /// `Last-Modified` header value (IMF-fixdate)
    #[must_use]
    pub fn last_modified_http(&self) -> Option<String> {
        self.modified.map(http_date)
    }
}

/// Lightweight projection for incremental sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Document id
    pub rid: DocId,
    /// Current CID
    pub cid: Cid,
    /// Last modification time
    pub modified: Option<DateTime<Utc>>,
    /// Publication status
    pub status: DocStatus,
    /// Title
    pub title: String,
}

impl CatalogEntry {
    /// Project a snapshot and its CID
    #[must_use]
    pub fn from_mr(mr: &MachineRepresentation, cid: Cid) -> Self {
        Self {
            rid: mr.id,
            cid,
            modified: mr.modified,
            status: mr.status,
            title: mr.title.clone(),
        }
    }
}

/// Format a timestamp as an HTTP date
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn core_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter_map(Block::plain_text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn core_text_joins_block_texts() {
        let mr = MachineRepresentation::new(
            DocId(1),
            "T",
            DocStatus::Draft,
            None,
            vec![
                Block::heading(2, "Intro"),
                Block::paragraph("  body  "),
                Block::paragraph(""),
                Block::list(false, ["x", "y"]),
            ],
        );
        assert_eq!(mr.core_content_text, "Intro\n\nbody\n\nx\ny");
    }

    #[test]
    fn headings_skip_empty() {
        let mr = MachineRepresentation::new(
            DocId(1),
            "T",
            DocStatus::Draft,
            None,
            vec![Block::heading(2, ""), Block::heading(3, "B")],
        );
        assert_eq!(mr.headings().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn last_modified_is_imf_fixdate() {
        let at = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        let mr = MachineRepresentation::new(DocId(1), "T", DocStatus::Draft, Some(at), vec![]);
        assert_eq!(
            mr.last_modified_http().as_deref(),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn cid_is_omitted_until_attached() {
        let mr = MachineRepresentation::new(DocId(1), "T", DocStatus::Publish, None, vec![]);
        let value = serde_json::to_value(&mr).unwrap();
        assert!(value.get("cid").is_none());
        assert_eq!(value["status"], "publish");

        let value = serde_json::to_value(mr.with_cid(Cid::new("c1"))).unwrap();
        assert_eq!(value["cid"], "c1");
    }

    #[test]
    fn doc_id_parses_trimmed() {
        assert_eq!(" 42 ".parse::<DocId>().unwrap(), DocId(42));
        assert!("x".parse::<DocId>().is_err());
    }
}
