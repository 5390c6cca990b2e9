//! Dual-Native Core Operations
//!
//! One operation set shared by the REST routes and the ability registry.
//!
//! # Operations
//!
//! | Operation | Kind | Precondition |
//! |-----------|------|--------------|
//! | [`Operations::read_mr`] | conditional read | `If-None-Match` → 304 |
//! | [`Operations::read_markdown`] | conditional read | `If-None-Match` → 304 (`sha256-` tag) |
//! | [`Operations::catalog`] | listing | none |
//! | [`Operations::insert_blocks`] | write | `If-Match` → 412 |
//! | [`Operations::suggest`] | read + generate | none |
//! | [`Operations::agentic_summarize`] | read + generate + write | `If-Match`, one retry |
//! | [`Operations::generate_title`] | read + generate + write | `If-Match` checked before generating, one retry |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dn_artifact::{Block, DocId};
//! use dn_core::Operations;
//! use dn_store::{Actor, Document, InMemoryStore};
//!
//! # tokio_test_block(async {
//! let store = InMemoryStore::from_documents([Document::new(
//!     DocId(1),
//!     "Hello",
//!     vec![Block::paragraph("World")],
//! )]);
//! let ops = Operations::new(Arc::new(store));
//! let read = ops.read_mr(DocId(1), None, &Actor::new("editor")).await.unwrap();
//! assert_eq!(read.status(), 200);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod agentic;
pub mod error;
pub mod heuristic;
mod ops;
pub mod outcome;
pub mod phase;
pub mod prompt;
pub mod provider;
pub mod types;

pub use error::{GenerationError, OperationError};
pub use ops::Operations;
pub use outcome::{
    Catalog, Conditional, Counts, InsertOutcome, MarkdownDocument, MrDocument, ReadMeta,
    SummarizeOutcome, Suggestion, TitleMeta, TitleOutcome, WriteMeta,
};
pub use phase::{Phase, PhaseError, PhaseTracker};
pub use provider::{AbsentProvider, GenerationParams, GenerationProvider};
pub use types::{
    CatalogInput, HeuristicConfig, InsertInput, Limits, OpsConfig, SuggestInput, SummarizeInput,
    TitleInput,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
