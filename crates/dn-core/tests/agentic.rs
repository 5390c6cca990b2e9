//! Orchestrator scenarios against scripted stores and providers

use async_trait::async_trait;
use dn_artifact::{Block, Cid, DocId};
use dn_core::{
    GenerationError, GenerationParams, GenerationProvider, InsertInput, OperationError,
    Operations, SummarizeInput, TitleInput,
};
use dn_store::{Actor, Document, InMemoryStore};
use dn_test_utils::{
    sample_document, seeded_store, ConflictingStore, CountingStore, MalformedStore,
    ScriptedProvider, SAMPLE_ID,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn editor() -> Actor {
    Actor::new("editor")
}

async fn ops_over(store: Arc<ConflictingStore>, provider: Arc<ScriptedProvider>) -> Operations {
    let ops = Operations::new(store.clone()).with_provider(provider);
    // Pin the cached CID to the store's scripted value.
    ops.cids().store(SAMPLE_ID, store.current()).await;
    ops
}

#[tokio::test]
async fn summarize_success_writes_with_read_cid() {
    let store = Arc::new(ConflictingStore::new(sample_document(SAMPLE_ID), "abc123").then_cid("ghi789"));
    let provider = Arc::new(ScriptedProvider::new("scripted").reply(r#"{"summary":"S","tags":[]}"#));
    let ops = ops_over(store.clone(), provider.clone()).await;

    let out = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();

    assert_eq!(out.summary, "S");
    assert_eq!(out.provider, "scripted");
    assert_eq!(out.meta.etag, Cid::new("ghi789"));
    assert_ne!(out.meta.etag, Cid::new("abc123"));
    assert_eq!(store.if_match_tokens(), vec!["abc123"]);
    assert_eq!(store.writes(), 1);

    let tail = &out.mr.blocks[out.mr.blocks.len() - 2..];
    assert_eq!(tail, &[Block::heading(2, "Summary"), Block::paragraph("S")]);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn summarize_conflict_then_success_rereads_once() {
    let store = Arc::new(
        ConflictingStore::new(sample_document(SAMPLE_ID), "abc123")
            .conflict_with("def456")
            .then_cid("ghi789"),
    );
    let provider = Arc::new(ScriptedProvider::new("scripted").reply(r#"{"summary":"S","tags":[]}"#));
    let ops = ops_over(store.clone(), provider.clone()).await;

    let out = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();

    assert_eq!(store.if_match_tokens(), vec!["abc123", "def456"]);
    // initial read plus exactly one re-read
    assert_eq!(store.reads(), 2);
    assert_eq!(out.meta.etag, Cid::new("ghi789"));
    // the summary is generated once and reused for the retry
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn summarize_second_conflict_is_terminal() {
    // Open question resolved as: a conflict on the retry write is surfaced as
    // PreconditionFailed with the current CID; the caller restarts the workflow.
    let store = Arc::new(
        ConflictingStore::new(sample_document(SAMPLE_ID), "abc123")
            .conflict_with("def456")
            .conflict_with("xyz999"),
    );
    let provider = Arc::new(ScriptedProvider::new("scripted").reply(r#"{"summary":"S","tags":[]}"#));
    let ops = ops_over(store.clone(), provider).await;

    let err = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OperationError::PreconditionFailed {
            current: Cid::new("xyz999")
        }
    );
    assert_eq!(store.if_match_tokens(), vec!["abc123", "def456"]);
    assert_eq!(store.reads(), 2);
    assert_eq!(store.writes(), 0);
    assert_eq!(ops.cids().get(SAMPLE_ID).await, Some(Cid::new("xyz999")));
}

#[tokio::test]
async fn summarize_uses_caller_if_match() {
    let store = Arc::new(ConflictingStore::new(sample_document(SAMPLE_ID), "abc123"));
    let provider = Arc::new(ScriptedProvider::new("scripted").reply(r#"{"summary":"S","tags":[]}"#));
    let ops = ops_over(store.clone(), provider).await;

    let input = SummarizeInput::new(SAMPLE_ID).with_if_match("W/\"abc123\"");
    ops.agentic_summarize(&input, &editor()).await.unwrap();
    assert_eq!(store.if_match_log(), vec![Some("W/\"abc123\"".to_string())]);
}

#[tokio::test]
async fn summarize_falls_back_to_heuristic() {
    let store = Arc::new(ConflictingStore::new(sample_document(SAMPLE_ID), "abc123"));
    let provider = Arc::new(ScriptedProvider::new("scripted").fail());
    let ops = ops_over(store.clone(), provider).await;

    let out = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();
    assert_eq!(out.provider, "heuristic");
    assert!(out.summary.starts_with("Why caching matters Caching reduces latency"));
}

#[tokio::test]
async fn summarize_empty_document_is_empty_output() {
    let store = Arc::new(ConflictingStore::new(
        Document::new(SAMPLE_ID, "Blank", vec![]),
        "abc123",
    ));
    let ops = ops_over(store.clone(), Arc::new(ScriptedProvider::new("scripted"))).await;

    let err = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "empty_output");
    assert_eq!(err.status(), 422);
    assert!(store.if_match_log().is_empty());
}

#[tokio::test]
async fn summarize_forbidden_touches_nothing() {
    let store = Arc::new(ConflictingStore::new(sample_document(SAMPLE_ID), "abc123"));
    let provider = Arc::new(ScriptedProvider::new("scripted"));
    let ops = ops_over(store.clone(), provider.clone()).await;

    let err = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &Actor::anonymous())
        .await
        .unwrap_err();
    assert_eq!(err, OperationError::Forbidden);
    assert_eq!(store.reads(), 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn malformed_store_reply_is_unknown_error() {
    let ops = Operations::new(Arc::new(MalformedStore::new(seeded_store())))
        .with_provider(Arc::new(ScriptedProvider::new("scripted").reply(r#"{"summary":"S"}"#)));
    let err = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unknown_error");
}

/// Provider that edits the document while "thinking", like a concurrent editor
struct EditingProvider {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl GenerationProvider for EditingProvider {
    fn name(&self) -> String {
        "editing".to_string()
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.store.edit(SAMPLE_ID, |doc| {
            doc.blocks.push(Block::paragraph("added by someone else"));
        });
        Ok(r#"{"summary":"Concise.","tags":["cache"]}"#.to_string())
    }
}

#[tokio::test]
async fn concurrent_edit_during_generation_is_retried() {
    let store = Arc::new(seeded_store());
    let ops = Operations::new(store.clone()).with_provider(Arc::new(EditingProvider {
        store: store.clone(),
    }));

    let out = ops
        .agentic_summarize(&SummarizeInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();

    let doc = store.get(SAMPLE_ID).unwrap();
    let n = doc.blocks.len();
    assert_eq!(doc.blocks[n - 3], Block::paragraph("added by someone else"));
    assert_eq!(doc.blocks[n - 1], Block::paragraph("Concise."));
    assert_eq!(out.meta.etag, doc.cid());
}

// ---- title ------------------------------------------------------------------

#[tokio::test]
async fn title_equal_to_current_skips_write() {
    let store = Arc::new(CountingStore::new(seeded_store()));
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("\"Caching notes\"\n"));
    let ops = Operations::new(store.clone()).with_provider(provider);
    let (_, before) = ops.snapshot(SAMPLE_ID).await.unwrap();

    let out = ops
        .generate_title(&TitleInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();

    assert!(out.no_change);
    assert_eq!(out.new_title, "Caching notes");
    assert_eq!(out.meta.etag, before);
    assert_eq!(out.meta.previous_etag, before);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn title_stale_if_match_fails_before_generation() {
    let store = Arc::new(seeded_store());
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("Anything"));
    let ops = Operations::new(store.clone()).with_provider(provider.clone());
    let (_, current) = ops.snapshot(SAMPLE_ID).await.unwrap();

    let err = ops
        .generate_title(&TitleInput::new(SAMPLE_ID).with_if_match("\"stale\""), &editor())
        .await
        .unwrap_err();

    assert_eq!(err, OperationError::PreconditionFailed { current });
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn title_write_updates_cid() {
    let store = Arc::new(seeded_store());
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("  “Latency, Tamed”  "));
    let ops = Operations::new(store.clone()).with_provider(provider);
    let (_, before) = ops.snapshot(SAMPLE_ID).await.unwrap();

    let out = ops
        .generate_title(&TitleInput::new(SAMPLE_ID).with_if_match(before.quoted()), &editor())
        .await
        .unwrap();

    assert!(!out.no_change);
    assert_eq!(out.old_title, "Caching notes");
    assert_eq!(out.new_title, "Latency, Tamed");
    assert_eq!(out.provider, "scripted");
    assert_eq!(out.meta.previous_etag, before);
    assert_eq!(out.meta.etag, store.get(SAMPLE_ID).unwrap().cid());
    assert_eq!(out.mr.title, "Latency, Tamed");
    assert_eq!(ops.cids().get(SAMPLE_ID).await, Some(out.meta.etag));
}

#[tokio::test]
async fn title_write_keeps_store_cid() {
    let store = Arc::new(ConflictingStore::new(sample_document(SAMPLE_ID), "abc123").then_cid("ghi789"));
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("Fresh title"));
    let ops = ops_over(store.clone(), provider).await;

    let out = ops
        .generate_title(&TitleInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();

    assert_eq!(out.meta.previous_etag, Cid::new("abc123"));
    assert_eq!(out.meta.etag, Cid::new("ghi789"));
    assert_eq!(out.mr.cid, Some(Cid::new("ghi789")));
    assert_eq!(out.mr.title, "Fresh title");
    assert_eq!(ops.cids().get(SAMPLE_ID).await, Some(Cid::new("ghi789")));

    // the returned tag is usable as the next precondition
    let next = InsertInput::append(SAMPLE_ID, vec![Block::paragraph("after")])
        .with_if_match(out.meta.etag.quoted());
    ops.insert_blocks(&next, &editor()).await.unwrap();
    assert_eq!(store.if_match_tokens(), vec!["abc123", "ghi789"]);
}

#[tokio::test]
async fn title_is_truncated_to_max_len() {
    let store = Arc::new(seeded_store());
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("An extremely long generated title"));
    let ops = Operations::new(store).with_provider(provider);

    let mut input = TitleInput::new(SAMPLE_ID);
    input.max_len = Some(2);
    let out = ops.generate_title(&input, &editor()).await.unwrap();
    // the cap is clamped up to 10
    assert_eq!(out.new_title, "An extreme");
}

#[tokio::test]
async fn title_falls_back_to_first_heading() {
    let store = Arc::new(seeded_store());
    let ops = Operations::new(store).with_provider(Arc::new(ScriptedProvider::new("scripted").fail()));

    let out = ops
        .generate_title(&TitleInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();
    assert_eq!(out.provider, "heuristic");
    assert_eq!(out.new_title, "Why caching matters");
}

#[tokio::test]
async fn title_conflict_is_retried_once() {
    let store = Arc::new(ConflictingStore::new(sample_document(SAMPLE_ID), "abc123").conflict_with("def456"));
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("Fresh title"));
    let ops = ops_over(store.clone(), provider).await;

    let out = ops
        .generate_title(&TitleInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap();

    assert_eq!(store.if_match_tokens(), vec!["abc123", "def456"]);
    assert_eq!(out.meta.previous_etag, Cid::new("def456"));
    assert_eq!(store.document().title, "Fresh title");
}

#[tokio::test]
async fn title_second_conflict_is_terminal() {
    let store = Arc::new(
        ConflictingStore::new(sample_document(SAMPLE_ID), "abc123")
            .conflict_with("def456")
            .conflict_with("xyz999"),
    );
    let provider = Arc::new(ScriptedProvider::new("scripted").reply("Fresh title"));
    let ops = ops_over(store.clone(), provider).await;

    let err = ops
        .generate_title(&TitleInput::new(SAMPLE_ID), &editor())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        OperationError::PreconditionFailed {
            current: Cid::new("xyz999")
        }
    );
    assert_eq!(store.document().title, "Caching notes");
}

#[tokio::test]
async fn title_for_missing_document_is_not_found() {
    let ops = Operations::new(Arc::new(seeded_store()));
    let err = ops
        .generate_title(&TitleInput::new(DocId(999)), &editor())
        .await
        .unwrap_err();
    assert_eq!(err, OperationError::NotFound(DocId(999)));
}
