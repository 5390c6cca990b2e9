//! Agentic orchestrator
//!
//! Read → generate → write, re-validating the CID right before writing.
//! A conflicting write triggers exactly one re-read and one more write; a
//! second conflict is returned to the caller as `PreconditionFailed` with the
//! store's current CID, and the caller restarts the whole workflow.

use crate::error::OperationError;
use crate::heuristic::{self, HEURISTIC};
use crate::outcome::{SummarizeOutcome, TitleMeta, TitleOutcome};
use crate::ops::Operations;
use crate::phase::{Phase, PhaseTracker};
use crate::prompt;
use crate::provider::GenerationParams;
use crate::types::{
    clamp_temperature, clamp_title_len, SummarizeInput, TitleInput, DEFAULT_SUGGEST_TEMPERATURE,
    DEFAULT_SUMMARY_HEADING, DEFAULT_TITLE_TEMPERATURE,
};
use dn_artifact::block::DEFAULT_HEADING_LEVEL;
use dn_artifact::{etag, Block, Cid, DocId, MachineRepresentation};
use dn_store::{Actor, InsertRequest};
use tracing::Instrument;

impl Operations {
    /// Summarize a document and append the summary as a new section
    ///
    /// # Errors
    /// - `Forbidden`, `NotFound`
    /// - `EmptyOutput` if neither provider nor heuristic yields a summary
    /// - `PreconditionFailed` if the retry write also conflicts
    /// - `UnknownError` if the store misbehaves
    pub async fn agentic_summarize(
        &self,
        input: &SummarizeInput,
        actor: &Actor,
    ) -> Result<SummarizeOutcome, OperationError> {
        let span = tracing::info_span!("agentic_summarize", doc_id = %input.post_id);
        let mut phases = PhaseTracker::new("agentic_summarize");
        let result = self
            .summarize_phases(input, actor, &mut phases)
            .instrument(span)
            .await;
        if result.is_err() {
            phases.fail();
        }
        result
    }

    async fn summarize_phases(
        &self,
        input: &SummarizeInput,
        actor: &Actor,
        phases: &mut PhaseTracker,
    ) -> Result<SummarizeOutcome, OperationError> {
        let doc = input.post_id;
        self.ensure_can_edit(doc, actor)?;

        let (mr, cid) = self.snapshot(doc).await?;

        phases.advance(Phase::Generating)?;
        let params = GenerationParams::new(clamp_temperature(
            input.temperature,
            DEFAULT_SUGGEST_TEMPERATURE,
        ))
        .with_model_preference(input.model_pref.clone());
        let suggestion = self.think_summary(&mr, &params).await;
        if suggestion.summary.trim().is_empty() {
            return Err(OperationError::EmptyOutput("summary"));
        }

        let heading = input
            .heading
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_SUMMARY_HEADING);
        let blocks = vec![
            Block::heading(DEFAULT_HEADING_LEVEL, heading),
            Block::paragraph(suggestion.summary.clone()),
        ];
        let token = etag::non_empty(input.if_match.as_deref())
            .map_or_else(|| cid.quoted(), ToString::to_string);

        phases.advance(Phase::Writing)?;
        let written = match self
            .write_blocks(doc, InsertRequest::append(blocks.clone()), Some(&token))
            .await
        {
            Ok(written) => written,
            Err(OperationError::PreconditionFailed { current }) => {
                let fresh = self.reread_after_conflict(doc, &current, phases).await?.1;
                phases.advance(Phase::Writing)?;
                self.write_blocks(doc, InsertRequest::append(blocks), Some(&fresh.quoted()))
                    .await?
            }
            Err(err) => return Err(err),
        };

        phases.advance(Phase::Succeeded)?;
        tracing::info!(
            doc_id = %doc,
            cid = %written.meta.etag,
            provider = %suggestion.provider,
            attempt = phases.attempt(),
            "summary inserted"
        );
        Ok(SummarizeOutcome {
            mr: written.mr,
            summary: suggestion.summary,
            provider: suggestion.provider,
            meta: written.meta,
        })
    }

    /// Generate a title and store it, skipping content-identical writes
    ///
    /// # Errors
    /// - `Forbidden`, `NotFound`
    /// - `PreconditionFailed` if the caller's If-Match is stale (checked before
    ///   generating) or if the retry write also conflicts
    /// - `EmptyOutput` if no title could be produced
    pub async fn generate_title(
        &self,
        input: &TitleInput,
        actor: &Actor,
    ) -> Result<TitleOutcome, OperationError> {
        let span = tracing::info_span!("generate_title", doc_id = %input.post_id);
        let mut phases = PhaseTracker::new("generate_title");
        let result = self
            .title_phases(input, actor, &mut phases)
            .instrument(span)
            .await;
        if result.is_err() {
            phases.fail();
        }
        result
    }

    async fn title_phases(
        &self,
        input: &TitleInput,
        actor: &Actor,
        phases: &mut PhaseTracker,
    ) -> Result<TitleOutcome, OperationError> {
        let doc = input.post_id;
        self.ensure_can_edit(doc, actor)?;

        let (mr, cid) = self.snapshot(doc).await?;
        if let Some(token) = etag::non_empty(input.if_match.as_deref()) {
            if !cid.matches(token) {
                metrics::counter!("dn_write_conflicts_total").increment(1);
                tracing::warn!(doc_id = %doc, cid = %cid, "stale If-Match, title not generated");
                return Err(OperationError::PreconditionFailed { current: cid });
            }
        }

        phases.advance(Phase::Generating)?;
        let max_len = clamp_title_len(input.max_len, self.config().limits.default_title_max_len);
        let params = GenerationParams::new(clamp_temperature(
            input.temperature,
            DEFAULT_TITLE_TEMPERATURE,
        ))
        .with_model_preference(input.model_pref.clone());
        let (new_title, provider) = self.think_title(&mr, &params, max_len).await;
        if new_title.is_empty() {
            return Err(OperationError::EmptyOutput("title"));
        }

        let old_title = mr.title.clone();
        if old_title.trim() == new_title {
            phases.advance(Phase::Succeeded)?;
            tracing::info!(doc_id = %doc, cid = %cid, "title unchanged, write skipped");
            return Ok(unchanged(old_title, new_title, mr, cid, provider));
        }

        phases.advance(Phase::Writing)?;
        let (previous, etag) = match self.write_title(doc, &new_title, &cid).await {
            Ok(written) => (cid, written),
            Err(OperationError::PreconditionFailed { current }) => {
                let (fresh_mr, fresh) = self.reread_after_conflict(doc, &current, phases).await?;
                if fresh_mr.title.trim() == new_title {
                    phases.advance(Phase::Succeeded)?;
                    return Ok(unchanged(old_title, new_title, fresh_mr, fresh, provider));
                }
                phases.advance(Phase::Writing)?;
                let written = self.write_title(doc, &new_title, &fresh).await?;
                (fresh, written)
            }
            Err(err) => return Err(err),
        };

        // the store's CID is authoritative; only the projection is rebuilt
        let mr = self.fetch_mr(doc).await?.with_cid(etag.clone());
        phases.advance(Phase::Succeeded)?;
        tracing::info!(
            doc_id = %doc,
            cid = %etag,
            provider = %provider,
            attempt = phases.attempt(),
            "title generated"
        );
        Ok(TitleOutcome {
            old_title,
            new_title,
            mr,
            meta: TitleMeta {
                etag,
                previous_etag: previous,
            },
            provider,
            no_change: false,
        })
    }

    /// Enter the single retry and re-read the document
    async fn reread_after_conflict(
        &self,
        doc: DocId,
        current: &Cid,
        phases: &mut PhaseTracker,
    ) -> Result<(MachineRepresentation, Cid), OperationError> {
        phases.advance(Phase::ConflictRetrying)?;
        metrics::counter!("dn_agentic_retries_total").increment(1);
        tracing::warn!(doc_id = %doc, cid = %current, phase = %phases.phase(), "write conflicted, re-reading once");
        phases.advance(Phase::Reading)?;
        self.snapshot(doc).await
    }

    /// Provider title, falling back to the heuristic; cleaned and capped
    async fn think_title(
        &self,
        mr: &MachineRepresentation,
        params: &GenerationParams,
        max_len: usize,
    ) -> (String, String) {
        let prompt = prompt::title(mr, self.config().limits.title_snippet_chars);
        let provider = self.provider().name();
        match self.provider().generate_text(&prompt, params).await {
            Ok(raw) => {
                let title = prompt::clean_title(crate::provider::strip_code_fence(&raw), max_len);
                if !title.is_empty() {
                    return (title, provider);
                }
                tracing::warn!(doc_id = %mr.id, provider = %provider, "empty title output, using heuristic");
            }
            Err(err) => {
                tracing::warn!(doc_id = %mr.id, provider = %provider, error = %err, "title generation failed, using heuristic");
            }
        }
        metrics::counter!("dn_generation_fallbacks_total").increment(1);
        (
            prompt::clean_title(&heuristic::title(mr, max_len), max_len),
            HEURISTIC.to_string(),
        )
    }
}

fn unchanged(
    old_title: String,
    new_title: String,
    mr: MachineRepresentation,
    cid: Cid,
    provider: String,
) -> TitleOutcome {
    TitleOutcome {
        old_title,
        new_title,
        mr,
        meta: TitleMeta {
            etag: cid.clone(),
            previous_etag: cid,
        },
        provider,
        no_change: true,
    }
}
