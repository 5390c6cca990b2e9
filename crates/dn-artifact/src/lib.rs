//! Dual-Native Artifact Model
//!
//! Content-addressed document snapshots.
//!
//! # Core Concepts
//!
//! - [`MachineRepresentation`]: point-in-time snapshot of a document
//! - [`Block`]: typed content block (heading, paragraph, list, ...)
//! - [`Cid`]: content identifier over title + blocks, used as a version token
//! - [`ContentHash`]: 32-byte Blake3 hash backing the CID
//! - [`markdown`]: deterministic Markdown view with its own `sha256-` identity
//! - [`etag`]: entity-tag unwrapping for precondition headers
//!
//! # Example
//!
//! ```rust
//! use dn_artifact::{Block, Cid, DocId, DocStatus, MachineRepresentation};
//!
//! let mr = MachineRepresentation::new(
//!     DocId(42),
//!     "Hello",
//!     DocStatus::Draft,
//!     None,
//!     vec![Block::paragraph("World")],
//! );
//! let cid = Cid::compute(&mr);
//! assert!(cid.matches(&cid.quoted()));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod block;
mod cid;
pub mod etag;
mod hash;
pub mod markdown;
mod mr;

pub use block::Block;
pub use cid::Cid;
pub use hash::{CanonicalHasher, ContentHash, HashError};
pub use mr::{http_date, CatalogEntry, DocId, DocStatus, MachineRepresentation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
