//! Content identifiers
//!
//! A [`Cid`] is the version token of a document's content. It is derived from
//! the title and the block sequence only; the document id, status and
//! modification time are metadata and never influence it.

use crate::block::Block;
use crate::etag;
use crate::hash::{CanonicalHasher, ContentHash};
use crate::mr::MachineRepresentation;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

const TAG_TITLE: u8 = 0x01;
const TAG_BLOCK_COUNT: u8 = 0x02;

/// Content identifier, used as an entity tag and precondition token
///
/// Stored as an opaque string because the authoritative value may come from
/// the collaborator store rather than from [`Cid::compute`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    /// Wrap an existing token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Compute the CID of a Machine Representation
    ///
    /// Pure and deterministic: equal titles and block sequences always give
    /// equal CIDs.
    #[must_use]
    pub fn compute(mr: &MachineRepresentation) -> Self {
        Self::compute_parts(&mr.title, &mr.blocks)
    }

    /// Compute the CID from the content-relevant fields directly
    #[must_use]
    pub fn compute_parts(title: &str, blocks: &[Block]) -> Self {
        let mut hasher = CanonicalHasher::new();
        hasher
            .field(TAG_TITLE, title)
            .number(TAG_BLOCK_COUNT, blocks.len() as u64);
        for block in blocks {
            block.hash_into(&mut hasher);
        }
        Self::from(hasher.finish())
    }

    /// Token as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token wrapped in double quotes, ready for an `ETag` header
    #[inline]
    #[must_use]
    pub fn quoted(&self) -> String {
        etag::quote(&self.0)
    }

    /// Whether an entity-tag (quoted, weak or bare) names this CID
    #[must_use]
    pub fn matches(&self, entity_tag: &str) -> bool {
        etag::unwrap(entity_tag) == self.0
    }
}

impl From<ContentHash> for Cid {
    fn from(hash: ContentHash) -> Self {
        Self(hash.to_string())
    }
}

impl Display for Cid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mr::{DocId, DocStatus};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn mr(title: &str, blocks: Vec<Block>) -> MachineRepresentation {
        MachineRepresentation::new(DocId(7), title, DocStatus::Draft, None, blocks)
    }

    #[test]
    fn cid_is_deterministic_across_instances() {
        let a = mr("T", vec![Block::heading(2, "H"), Block::paragraph("P")]);
        let b = mr("T", vec![Block::heading(2, "H"), Block::paragraph("P")]);
        assert_eq!(Cid::compute(&a), Cid::compute(&a));
        assert_eq!(Cid::compute(&a), Cid::compute(&b));
    }

    #[test]
    fn cid_ignores_metadata() {
        let base = mr("T", vec![Block::paragraph("P")]);
        let mut other = base.clone();
        other.id = DocId(99);
        other.status = DocStatus::Publish;
        other.modified = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(Cid::compute(&base), Cid::compute(&other));
    }

    #[test]
    fn cid_changes_with_block_order() {
        let a = mr("T", vec![Block::paragraph("a"), Block::paragraph("b")]);
        let b = mr("T", vec![Block::paragraph("b"), Block::paragraph("a")]);
        assert_ne!(Cid::compute(&a), Cid::compute(&b));
    }

    #[test]
    fn cid_changes_with_heading_level() {
        let a = mr("T", vec![Block::heading(2, "H")]);
        let b = mr("T", vec![Block::heading(3, "H")]);
        assert_ne!(Cid::compute(&a), Cid::compute(&b));
    }

    #[test]
    fn cid_matches_entity_tag_forms() {
        let cid = Cid::new("abc123");
        assert!(cid.matches("abc123"));
        assert!(cid.matches("\"abc123\""));
        assert!(cid.matches("W/\"abc123\""));
        assert!(!cid.matches("\"abc124\""));
        assert_eq!(cid.quoted(), "\"abc123\"");
    }

    proptest! {
        #[test]
        fn prop_equal_content_equal_cid(title in ".{0,32}", texts in proptest::collection::vec(".{0,32}", 0..6)) {
            let blocks: Vec<Block> = texts.iter().map(Block::paragraph).collect();
            let a = mr(&title, blocks.clone());
            let b = mr(&title, blocks);
            prop_assert_eq!(Cid::compute(&a), Cid::compute(&b));
        }

        #[test]
        fn prop_paragraph_edit_changes_cid(
            texts in proptest::collection::vec("[a-z]{1,16}", 1..6),
            idx in 0usize..6,
            suffix in "[a-z]{1,4}",
        ) {
            let idx = idx % texts.len();
            let original: Vec<Block> = texts.iter().map(Block::paragraph).collect();
            let mut edited = original.clone();
            edited[idx] = Block::paragraph(format!("{}{}", texts[idx], suffix));
            prop_assert_ne!(
                Cid::compute(&mr("T", original)),
                Cid::compute(&mr("T", edited))
            );
        }

        #[test]
        fn prop_title_edit_changes_cid(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
            prop_assume!(a != b);
            prop_assert_ne!(Cid::compute(&mr(&a, vec![])), Cid::compute(&mr(&b, vec![])));
        }
    }
}
