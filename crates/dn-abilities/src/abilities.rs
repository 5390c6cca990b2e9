//! Built-in `dni/*` abilities
//!
//! Each ability is a thin adapter: deserialize the schema-valid input, call
//! the shared operation, serialize its outcome. None of them carries logic
//! of its own, so the ability and REST surfaces cannot drift apart.

use crate::error::AbilityError;
use crate::registry::{Ability, AbilityDefinition};
use async_trait::async_trait;
use dn_artifact::DocId;
use dn_core::{
    CatalogInput, InsertInput, OperationError, Operations, SuggestInput, SummarizeInput,
    TitleInput,
};
use dn_store::Actor;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Read MR ability name
pub const GET_POST_MR: &str = "dni/get-post-mr";
/// Read Markdown ability name
pub const GET_POST_MD: &str = "dni/get-post-md";
/// Catalog ability name
pub const GET_CATALOG: &str = "dni/get-catalog";
/// Block insertion ability name
pub const INSERT_BLOCKS: &str = "dni/insert-blocks";
/// Suggestion ability name
pub const AI_SUGGEST: &str = "dni/ai-suggest";
/// Agentic summarize ability name
pub const AGENTIC_SUMMARIZE: &str = "dni/agentic-summarize";
/// Title generation ability name
pub const GENERATE_TITLE: &str = "dni/generate-title";

/// Input naming one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PostRef {
    /// Target document
    #[schemars(with = "u64", range(min = 1))]
    pub post_id: DocId,
}

/// Input of `dni/ai-suggest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SuggestRequest {
    /// Target document
    #[schemars(with = "u64", range(min = 1))]
    pub post_id: DocId,
    /// Generation options
    #[serde(flatten)]
    pub options: SuggestInput,
}

/// All built-in abilities
#[must_use]
pub fn builtin() -> Vec<Arc<dyn Ability>> {
    vec![
        Arc::new(GetPostMr),
        Arc::new(GetPostMd),
        Arc::new(GetCatalog),
        Arc::new(InsertBlocks),
        Arc::new(AiSuggest),
        Arc::new(AgenticSummarize),
        Arc::new(GenerateTitle),
    ]
}

// ---- helpers -------------------------------------------------------------

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

fn definition<T: JsonSchema>(
    name: &'static str,
    description: &'static str,
    category: &'static str,
    output_keys: &[&str],
) -> AbilityDefinition {
    AbilityDefinition {
        name,
        description,
        category,
        input_schema: schema_of::<T>(),
        output_schema: json!({ "type": "object", "required": output_keys }),
    }
}

fn parse<T: DeserializeOwned>(input: Value) -> Result<T, AbilityError> {
    serde_json::from_value(input).map_err(|e| AbilityError::InvalidInput(vec![e.to_string()]))
}

fn output<T: Serialize>(value: &T) -> Result<Value, AbilityError> {
    serde_json::to_value(value)
        .map_err(|e| AbilityError::Operation(OperationError::UnknownError(e.to_string())))
}

fn post_id(input: &Value) -> Option<DocId> {
    input
        .get("post_id")
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .map(DocId)
}

fn can_read(ops: &Operations, input: &Value, actor: &Actor) -> bool {
    post_id(input).is_some_and(|doc| ops.ensure_can_read(doc, actor).is_ok())
}

fn can_edit(ops: &Operations, input: &Value, actor: &Actor) -> bool {
    post_id(input).is_some_and(|doc| ops.ensure_can_edit(doc, actor).is_ok())
}

fn unconditional<T>(read: dn_core::Conditional<T>) -> Result<T, AbilityError> {
    read.into_body().ok_or_else(|| {
        AbilityError::Operation(OperationError::UnknownError(
            "unconditional read answered not-modified".to_string(),
        ))
    })
}

// ---- reads ---------------------------------------------------------------

/// `dni/get-post-mr`: Machine Representation with CID
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPostMr;

#[async_trait]
impl Ability for GetPostMr {
    fn definition(&self) -> AbilityDefinition {
        definition::<PostRef>(
            GET_POST_MR,
            "Get the Machine Representation (MR) of a post with CID and links.",
            "content.read",
            &["mr", "meta"],
        )
    }

    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool {
        can_read(ops, input, actor)
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let PostRef { post_id } = parse(input)?;
        let read = ops.read_mr(post_id, None, actor).await?;
        output(&unconditional(read)?)
    }
}

/// `dni/get-post-md`: Markdown rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPostMd;

#[async_trait]
impl Ability for GetPostMd {
    fn definition(&self) -> AbilityDefinition {
        definition::<PostRef>(
            GET_POST_MD,
            "Get the Markdown MR representation of a post.",
            "content.read",
            &["markdown", "meta"],
        )
    }

    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool {
        can_read(ops, input, actor)
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let PostRef { post_id } = parse(input)?;
        let read = ops.read_markdown(post_id, None, actor).await?;
        output(&unconditional(read)?)
    }
}

/// `dni/get-catalog`: index of editable documents with CIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCatalog;

#[async_trait]
impl Ability for GetCatalog {
    fn definition(&self) -> AbilityDefinition {
        definition::<CatalogInput>(
            GET_CATALOG,
            "Get a lightweight index of posts with CIDs for incremental sync.",
            "catalog",
            &["count", "items"],
        )
    }

    fn permitted(&self, ops: &Operations, _input: &Value, actor: &Actor) -> bool {
        ops.ensure_can_edit_any(actor).is_ok()
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let input: CatalogInput = parse(input)?;
        output(&ops.catalog(&input, actor).await?)
    }
}

// ---- writes --------------------------------------------------------------

/// `dni/insert-blocks`: conditional block insertion
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertBlocks;

#[async_trait]
impl Ability for InsertBlocks {
    fn definition(&self) -> AbilityDefinition {
        definition::<InsertInput>(
            INSERT_BLOCKS,
            "Safely insert blocks with optional optimistic locking via If-Match.",
            "content.write",
            &["mr", "meta"],
        )
    }

    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool {
        can_edit(ops, input, actor)
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let input: InsertInput = parse(input)?;
        output(&ops.insert_blocks(&input, actor).await?)
    }
}

/// `dni/ai-suggest`: summary and tags without writing
#[derive(Debug, Clone, Copy, Default)]
pub struct AiSuggest;

#[async_trait]
impl Ability for AiSuggest {
    fn definition(&self) -> AbilityDefinition {
        definition::<SuggestRequest>(
            AI_SUGGEST,
            "Suggest a summary and tags for a post, falling back to a local heuristic.",
            "ai.summarize",
            &["summary", "tags", "provider"],
        )
    }

    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool {
        can_read(ops, input, actor)
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let request: SuggestRequest = parse(input)?;
        output(&ops.suggest(request.post_id, &request.options, actor).await?)
    }
}

/// `dni/agentic-summarize`: read, summarize, append
#[derive(Debug, Clone, Copy, Default)]
pub struct AgenticSummarize;

#[async_trait]
impl Ability for AgenticSummarize {
    fn definition(&self) -> AbilityDefinition {
        definition::<SummarizeInput>(
            AGENTIC_SUMMARIZE,
            "Read MR, generate a summary (fallback heuristic), append to post safely.",
            "ai.compose",
            &["mr", "summary", "provider", "meta"],
        )
    }

    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool {
        can_edit(ops, input, actor)
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let input: SummarizeInput = parse(input)?;
        output(&ops.agentic_summarize(&input, actor).await?)
    }
}

/// `dni/generate-title`: generate and conditionally update the title
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateTitle;

#[async_trait]
impl Ability for GenerateTitle {
    fn definition(&self) -> AbilityDefinition {
        definition::<TitleInput>(
            GENERATE_TITLE,
            "Generate and safely update post title using MR context and If-Match.",
            "content.write",
            &["old_title", "new_title", "mr", "meta", "provider"],
        )
    }

    fn permitted(&self, ops: &Operations, input: &Value, actor: &Actor) -> bool {
        can_edit(ops, input, actor)
    }

    async fn execute(
        &self,
        ops: &Operations,
        input: Value,
        actor: &Actor,
    ) -> Result<Value, AbilityError> {
        let input: TitleInput = parse(input)?;
        output(&ops.generate_title(&input, actor).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_requires_positive_integer() {
        assert_eq!(post_id(&json!({ "post_id": 3 })), Some(DocId(3)));
        assert_eq!(post_id(&json!({ "post_id": 0 })), None);
        assert_eq!(post_id(&json!({ "post_id": "3" })), None);
        assert_eq!(post_id(&json!({})), None);
    }

    #[test]
    fn builtin_names_are_unique() {
        let mut names: Vec<_> = builtin().iter().map(|a| a.definition().name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn post_ref_schema_requires_post_id() {
        let schema = schema_of::<PostRef>();
        assert_eq!(schema["required"], json!(["post_id"]));
        assert_eq!(schema["properties"]["post_id"]["minimum"].as_f64(), Some(1.0));
    }
}
