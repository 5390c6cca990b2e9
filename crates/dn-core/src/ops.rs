//! The shared operation set
//!
//! [`Operations`] is the single implementation behind both the REST routes
//! and the ability registry. Adapters parse input, pick an [`Actor`] and shape
//! the result; every rule lives here.

use crate::error::OperationError;
use crate::heuristic::{self, HEURISTIC};
use crate::outcome::{
    Catalog, Conditional, Counts, InsertOutcome, MarkdownDocument, MrDocument, ReadMeta,
    Suggestion, WriteMeta,
};
use crate::prompt;
use crate::provider::{AbsentProvider, GenerationParams, GenerationProvider};
use crate::types::{
    clamp_temperature, CatalogInput, InsertInput, OpsConfig, SuggestInput,
    DEFAULT_SUGGEST_TEMPERATURE,
};
use dn_artifact::{etag, markdown, CatalogEntry, Cid, DocId, MachineRepresentation};
use dn_store::{
    AccessPolicy, Actor, AllowAuthenticated, CidEngine, DocumentStore, InsertRequest, StoreReply,
    TitleWrite, HEADER_COUNT_AFTER, HEADER_COUNT_BEFORE, HEADER_INSERTED_AT,
};
use std::sync::Arc;

/// Shared operation set
#[derive(Clone)]
pub struct Operations {
    store: Arc<dyn DocumentStore>,
    cids: CidEngine,
    provider: Arc<dyn GenerationProvider>,
    access: Arc<dyn AccessPolicy>,
    config: OpsConfig,
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Operations {
    /// Create operations over a store, with no provider and the
    /// authenticated-only policy
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cids: CidEngine::default(),
            provider: Arc::new(AbsentProvider),
            access: Arc::new(AllowAuthenticated),
            config: OpsConfig::default(),
        }
    }

    /// With generation provider
    #[inline]
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// With access policy
    #[inline]
    #[must_use]
    pub fn with_access(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    /// With CID engine (share one engine between instances)
    #[inline]
    #[must_use]
    pub fn with_cid_engine(mut self, cids: CidEngine) -> Self {
        self.cids = cids;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: OpsConfig) -> Self {
        self.config = config;
        self
    }

    /// CID engine handle
    #[inline]
    #[must_use]
    pub fn cids(&self) -> &CidEngine {
        &self.cids
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OpsConfig {
        &self.config
    }

    /// Configured provider name
    #[must_use]
    pub fn provider_name(&self) -> String {
        self.provider.name()
    }

    pub(crate) fn provider(&self) -> &dyn GenerationProvider {
        self.provider.as_ref()
    }

    // ---- permissions -------------------------------------------------

    /// Fail with `Forbidden` unless `actor` may read `doc`
    ///
    /// # Errors
    /// - `Forbidden`
    pub fn ensure_can_read(&self, doc: DocId, actor: &Actor) -> Result<(), OperationError> {
        if self.access.can_read(doc, actor) {
            Ok(())
        } else {
            Err(OperationError::Forbidden)
        }
    }

    /// Fail with `Forbidden` unless `actor` may edit `doc`
    ///
    /// # Errors
    /// - `Forbidden`
    pub fn ensure_can_edit(&self, doc: DocId, actor: &Actor) -> Result<(), OperationError> {
        if self.access.can_edit(doc, actor) {
            Ok(())
        } else {
            Err(OperationError::Forbidden)
        }
    }

    /// Fail with `Forbidden` unless `actor` may edit documents at all
    ///
    /// # Errors
    /// - `Forbidden`
    pub fn ensure_can_edit_any(&self, actor: &Actor) -> Result<(), OperationError> {
        if self.access.can_edit_any(actor) {
            Ok(())
        } else {
            Err(OperationError::Forbidden)
        }
    }

    // ---- reads -------------------------------------------------------

    /// Fresh MR and its current CID
    ///
    /// # Errors
    /// - `NotFound` if the store has no such document
    pub async fn snapshot(
        &self,
        doc: DocId,
    ) -> Result<(MachineRepresentation, Cid), OperationError> {
        let mr = self.fetch_mr(doc).await?;
        let cid = self.cids.get_or_compute(doc, &mr).await;
        Ok((mr.with_cid(cid.clone()), cid))
    }

    /// Build the MR without touching the CID cache
    pub(crate) async fn fetch_mr(&self, doc: DocId) -> Result<MachineRepresentation, OperationError> {
        self.store
            .build_mr(doc)
            .await?
            .ok_or(OperationError::NotFound(doc))
    }

    /// Conditional read of the Machine Representation
    ///
    /// # Errors
    /// - `Forbidden`, `NotFound`
    pub async fn read_mr(
        &self,
        doc: DocId,
        if_none_match: Option<&str>,
        actor: &Actor,
    ) -> Result<Conditional<MrDocument>, OperationError> {
        self.ensure_can_read(doc, actor)?;
        let (mr, cid) = self.snapshot(doc).await?;
        let last_modified = mr.last_modified_http();
        let meta = ReadMeta {
            etag: cid.as_str().to_string(),
            last_modified: mr.modified,
        };
        Ok(conditional(doc, if_none_match, MrDocument { mr, meta }, last_modified))
    }

    /// Conditional read of the Markdown rendering
    ///
    /// The entity tag is `sha256-` over the rendered text, independent of the
    /// structural CID.
    ///
    /// # Errors
    /// - `Forbidden`, `NotFound`
    pub async fn read_markdown(
        &self,
        doc: DocId,
        if_none_match: Option<&str>,
        actor: &Actor,
    ) -> Result<Conditional<MarkdownDocument>, OperationError> {
        self.ensure_can_read(doc, actor)?;
        let mr = self
            .store
            .build_mr(doc)
            .await?
            .ok_or(OperationError::NotFound(doc))?;
        let text = markdown::render(&mr);
        let meta = ReadMeta {
            etag: markdown::etag(&text),
            last_modified: mr.modified,
        };
        let body = MarkdownDocument {
            markdown: text,
            meta,
        };
        Ok(conditional(doc, if_none_match, body, mr.last_modified_http()))
    }

    /// Catalog of editable documents
    ///
    /// # Errors
    /// - `Forbidden` without general edit capability
    /// - `InvalidInput` for an unparsable `since`
    pub async fn catalog(
        &self,
        input: &CatalogInput,
        actor: &Actor,
    ) -> Result<Catalog, OperationError> {
        self.ensure_can_edit_any(actor)?;
        let query = input.to_query()?;
        let ids = self.store.list(&query).await?;

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if !self.access.can_edit(id, actor) {
                continue;
            }
            let Some(mr) = self.store.build_mr(id).await? else {
                continue;
            };
            let cid = self.cids.get_or_compute(id, &mr).await;
            items.push(CatalogEntry::from_mr(&mr, cid));
        }
        tracing::debug!(count = items.len(), "catalog listed");
        Ok(Catalog {
            count: items.len(),
            items,
        })
    }

    /// Summary and tags without writing
    ///
    /// # Errors
    /// - `Forbidden`, `NotFound`
    pub async fn suggest(
        &self,
        doc: DocId,
        input: &SuggestInput,
        actor: &Actor,
    ) -> Result<Suggestion, OperationError> {
        self.ensure_can_read(doc, actor)?;
        let mr = self
            .store
            .build_mr(doc)
            .await?
            .ok_or(OperationError::NotFound(doc))?;
        let params = GenerationParams::new(clamp_temperature(
            input.temperature,
            DEFAULT_SUGGEST_TEMPERATURE,
        ))
        .with_model_preference(input.model_pref.clone());
        Ok(self.think_summary(&mr, &params).await)
    }

    /// Provider summary, falling back to the heuristic
    pub(crate) async fn think_summary(
        &self,
        mr: &MachineRepresentation,
        params: &GenerationParams,
    ) -> Suggestion {
        let prompt = prompt::summary(mr, self.config.limits.summary_snippet_chars);
        let provider = self.provider.name();
        match self.provider.generate_text(&prompt, params).await {
            Ok(output) => {
                if let Some((summary, tags)) = prompt::parse_summary(&output) {
                    return Suggestion {
                        summary,
                        tags,
                        provider,
                    };
                }
                tracing::warn!(doc_id = %mr.id, provider = %provider, "unusable summary output, using heuristic");
            }
            Err(err) => {
                tracing::warn!(doc_id = %mr.id, provider = %provider, error = %err, "summary generation failed, using heuristic");
            }
        }
        metrics::counter!("dn_generation_fallbacks_total").increment(1);

        let cfg = &self.config.heuristic;
        Suggestion {
            summary: heuristic::summarize(&mr.core_content_text, cfg),
            tags: heuristic::tags(&mr.core_content_text, cfg),
            provider: HEURISTIC.to_string(),
        }
    }

    // ---- writes ------------------------------------------------------

    /// Insert blocks under an optional If-Match precondition
    ///
    /// # Errors
    /// - `Forbidden`, `InvalidInput`, `NotFound`
    /// - `PreconditionFailed` with the current CID on a stale token
    /// - `UnknownError` if the store misbehaves
    pub async fn insert_blocks(
        &self,
        input: &InsertInput,
        actor: &Actor,
    ) -> Result<InsertOutcome, OperationError> {
        let doc = input.post_id;
        self.ensure_can_edit(doc, actor)?;
        let request = input.to_request()?;
        self.write_blocks(doc, request, input.if_match.as_deref())
            .await
    }

    /// Pass an insert through to the store and interpret its reply
    pub(crate) async fn write_blocks(
        &self,
        doc: DocId,
        request: InsertRequest,
        if_match: Option<&str>,
    ) -> Result<InsertOutcome, OperationError> {
        let mode = request.mode;
        let reply = self.store.insert_blocks(doc, request, if_match).await?;

        if reply.is_success() {
            let outcome = self.accept_write(doc, &reply).await?;
            tracing::info!(
                doc_id = %doc,
                cid = %outcome.meta.etag,
                mode = mode.as_str(),
                inserted_at = ?outcome.meta.inserted_at,
                "blocks inserted"
            );
            return Ok(outcome);
        }

        match reply.status {
            412 => Err(self.reject_stale(doc, reply.etag()).await?),
            404 => Err(OperationError::NotFound(doc)),
            403 => Err(OperationError::Forbidden),
            400 | 422 => Err(OperationError::InvalidInput(reply_message(&reply))),
            status => {
                tracing::error!(doc_id = %doc, status, "store write failed");
                Err(OperationError::UnknownError(format!(
                    "store replied {status}: {}",
                    reply_message(&reply)
                )))
            }
        }
    }

    /// Validate a successful store reply and refresh the cached CID
    async fn accept_write(
        &self,
        doc: DocId,
        reply: &StoreReply,
    ) -> Result<InsertOutcome, OperationError> {
        let mr: MachineRepresentation =
            serde_json::from_value(reply.body.clone()).map_err(|e| {
                tracing::error!(doc_id = %doc, error = %e, "unexpected store reply");
                OperationError::UnknownError(format!("unexpected store reply: {e}"))
            })?;
        let etag = mr.cid.clone().or_else(|| reply.etag()).ok_or_else(|| {
            tracing::error!(doc_id = %doc, "store reply carries no etag");
            OperationError::UnknownError("store reply carries no etag".to_string())
        })?;

        self.cids.invalidate(doc).await;
        self.cids.store(doc, etag.clone()).await;

        let meta = WriteMeta {
            etag: etag.clone(),
            inserted_at: reply.header_usize(HEADER_INSERTED_AT),
            counts: Counts {
                before: reply.header_usize(HEADER_COUNT_BEFORE),
                after: reply.header_usize(HEADER_COUNT_AFTER),
            },
        };
        Ok(InsertOutcome {
            mr: mr.with_cid(etag),
            meta,
        })
    }

    /// Conditional title replacement
    ///
    /// On success the store's new CID replaces the cached one.
    pub(crate) async fn write_title(
        &self,
        doc: DocId,
        title: &str,
        expected: &Cid,
    ) -> Result<Cid, OperationError> {
        match self
            .store
            .update_title(doc, title, Some(&expected.quoted()))
            .await?
        {
            TitleWrite::Updated { cid } => {
                self.cids.invalidate(doc).await;
                self.cids.store(doc, cid.clone()).await;
                tracing::info!(doc_id = %doc, cid = %cid, "title updated");
                Ok(cid)
            }
            TitleWrite::Conflict { current } => Err(self.reject_stale(doc, Some(current)).await?),
            TitleWrite::NotFound => Err(OperationError::NotFound(doc)),
        }
    }

    /// Record a rejected precondition and build the conflict error
    ///
    /// The cached CID is replaced by the store's current one, or dropped when
    /// the store did not say.
    async fn reject_stale(
        &self,
        doc: DocId,
        current: Option<Cid>,
    ) -> Result<OperationError, OperationError> {
        metrics::counter!("dn_write_conflicts_total").increment(1);
        self.cids.invalidate(doc).await;
        let current = match current {
            Some(cid) => {
                self.cids.store(doc, cid.clone()).await;
                cid
            }
            None => self.snapshot(doc).await?.1,
        };
        tracing::warn!(doc_id = %doc, cid = %current, "write precondition failed");
        Ok(OperationError::PreconditionFailed { current })
    }
}

fn conditional<T>(
    doc: DocId,
    if_none_match: Option<&str>,
    body: T,
    last_modified: Option<String>,
) -> Conditional<T>
where
    T: HasEtag,
{
    let current = body.etag().to_string();
    if etag::non_empty(if_none_match).is_some_and(|h| etag::any_matches(h, &current)) {
        metrics::counter!("dn_reads_total", "status" => "304").increment(1);
        tracing::debug!(doc_id = %doc, etag = %current, "not modified");
        return Conditional::NotModified { etag: current };
    }
    metrics::counter!("dn_reads_total", "status" => "200").increment(1);
    Conditional::Modified {
        body,
        etag: current,
        last_modified,
    }
}

trait HasEtag {
    fn etag(&self) -> &str;
}

impl HasEtag for MrDocument {
    fn etag(&self) -> &str {
        &self.meta.etag
    }
}

impl HasEtag for MarkdownDocument {
    fn etag(&self) -> &str {
        &self.meta.etag
    }
}

fn reply_message(reply: &StoreReply) -> String {
    reply
        .body
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("no message")
        .to_string()
}
