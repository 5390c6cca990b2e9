//! Dual-Native Store Boundary
//!
//! The trusted boundary between the protocol layer and the external world.
//!
//! # Collaborators
//!
//! - [`DocumentStore`]: builds Machine Representations and performs
//!   compare-and-swap writes
//! - [`AccessPolicy`]: binary allow/deny per document per actor
//!
//! # Architecture
//!
//! ```text
//! Protocol ──build_mr──▶ DocumentStore ──▶ MachineRepresentation
//!    │                        ▲
//!    │    insert_blocks(If-Match)   (atomic CID check inside the store)
//!    ▼
//! CidEngine (doc id → CID, invalidated on every content change)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod access;
pub mod cid_engine;
pub mod error;
pub mod memory;
pub mod store;

pub use access::{AccessPolicy, Actor, AllowAuthenticated, Grant, StaticAccessPolicy};
pub use cid_engine::CidEngine;
pub use error::StoreError;
pub use memory::{Document, InMemoryStore};
pub use store::{
    CatalogQuery, DocumentStore, InsertMode, InsertRequest, StatusFilter, StoreReply, TitleWrite,
    DEFAULT_CATALOG_TYPES, HEADER_COUNT_AFTER, HEADER_COUNT_BEFORE, HEADER_ETAG,
    HEADER_INSERTED_AT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
