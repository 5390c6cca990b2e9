//! Access policy collaborator
//!
//! Authorization is a binary allow/deny per document per actor. How an actor
//! is authenticated is outside this crate; callers hand over an [`Actor`].

use dn_artifact::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The party on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    id: String,
}

impl Actor {
    /// Named actor
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Actor for requests without a valid credential
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("")
    }

    /// Actor id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this is the anonymous actor
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }
}

/// Permission predicate consumed by every operation
pub trait AccessPolicy: Send + Sync {
    /// May `actor` edit document `doc`
    fn can_edit(&self, doc: DocId, actor: &Actor) -> bool;

    /// May `actor` read the Machine Representation of `doc`
    fn can_read(&self, doc: DocId, actor: &Actor) -> bool {
        self.can_edit(doc, actor)
    }

    /// May `actor` edit documents in general (catalog access)
    fn can_edit_any(&self, actor: &Actor) -> bool;
}

/// Policy granting everything to every non-anonymous actor
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAuthenticated;

impl AccessPolicy for AllowAuthenticated {
    fn can_edit(&self, _doc: DocId, actor: &Actor) -> bool {
        !actor.is_anonymous()
    }

    fn can_edit_any(&self, actor: &Actor) -> bool {
        !actor.is_anonymous()
    }
}

/// Per-actor grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Edit every document
    #[serde(default)]
    pub edit_all: bool,
    /// Documents editable when `edit_all` is false
    #[serde(default)]
    pub docs: HashSet<DocId>,
}

/// Table-driven policy
#[derive(Debug, Clone, Default)]
pub struct StaticAccessPolicy {
    grants: HashMap<String, Grant>,
}

impl StaticAccessPolicy {
    /// Empty policy (denies everything)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grant for an actor id
    #[must_use]
    pub fn with_grant(mut self, actor: impl Into<String>, grant: Grant) -> Self {
        self.grants.insert(actor.into(), grant);
        self
    }
}

impl AccessPolicy for StaticAccessPolicy {
    fn can_edit(&self, doc: DocId, actor: &Actor) -> bool {
        self.grants
            .get(actor.id())
            .is_some_and(|g| g.edit_all || g.docs.contains(&doc))
    }

    fn can_edit_any(&self, actor: &Actor) -> bool {
        self.grants
            .get(actor.id())
            .is_some_and(|g| g.edit_all || !g.docs.is_empty())
    }
}
