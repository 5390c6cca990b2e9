//! Dual-Native Ability Bridge
//!
//! Exposes the shared operation set as named abilities. Every invocation is
//! validated against the ability's JSON schema, then gated by its permission
//! predicate, then executed against [`dn_core::Operations`].
//!
//! | Ability | Category | Permission |
//! |---------|----------|------------|
//! | `dni/get-post-mr` | `content.read` | read document |
//! | `dni/get-post-md` | `content.read` | read document |
//! | `dni/get-catalog` | `catalog` | edit any document |
//! | `dni/insert-blocks` | `content.write` | edit document |
//! | `dni/ai-suggest` | `ai.summarize` | read document |
//! | `dni/agentic-summarize` | `ai.compose` | edit document |
//! | `dni/generate-title` | `content.write` | edit document |
//!
//! Reads through abilities are unconditional; conditional reads are a REST
//! concern. Writes take their precondition from the `if_match` input field.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod abilities;
pub mod error;
pub mod registry;

pub use abilities::{PostRef, SuggestRequest};
pub use error::AbilityError;
pub use registry::{Ability, AbilityDefinition, AbilityRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
