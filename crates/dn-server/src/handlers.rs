//! Route handlers
//!
//! Each handler resolves the actor, calls one shared operation and hands the
//! outcome to [`crate::reply`]. Handlers never fail at the filter level.

use crate::app::App;
use crate::reply;
use dn_artifact::DocId;
use dn_core::{CatalogInput, InsertInput, SuggestInput, SummarizeInput, TitleInput};
use dn_store::Actor;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::Response;

/// Query string of `GET catalog`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogParams {
    /// Modified-after filter
    pub since: Option<String>,
    /// `draft`, `publish` or `any`
    pub status: Option<String>,
    /// Comma-separated content types
    pub types: Option<String>,
}

/// Query string of `GET ai/suggest/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestParams {
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Comma-separated preferred models
    pub model_pref: Option<String>,
}

fn comma_list(raw: Option<String>) -> Option<Vec<String>> {
    let items: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Header precondition wins over a body field
fn precondition(header: Option<String>, body: Option<String>) -> Option<String> {
    header.filter(|h| !h.trim().is_empty()).or(body)
}

pub(crate) async fn health(app: App) -> Result<Response, Infallible> {
    let body = json!({ "status": "ok", "provider": app.ops().provider_name() });
    Ok(reply::json(StatusCode::OK, &body))
}

pub(crate) async fn get_mr(
    id: u64,
    if_none_match: Option<String>,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    Ok(
        match app.ops().read_mr(DocId(id), if_none_match.as_deref(), &actor).await {
            Ok(read) => reply::conditional(read),
            Err(err) => reply::operation_error(&err),
        },
    )
}

pub(crate) async fn get_md(
    id: u64,
    if_none_match: Option<String>,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    Ok(
        match app
            .ops()
            .read_markdown(DocId(id), if_none_match.as_deref(), &actor)
            .await
        {
            Ok(read) => reply::conditional(read),
            Err(err) => reply::operation_error(&err),
        },
    )
}

pub(crate) async fn catalog(
    params: CatalogParams,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    let input = CatalogInput {
        since: params.since,
        status: params.status,
        types: comma_list(params.types),
    };
    Ok(match app.ops().catalog(&input, &actor).await {
        Ok(catalog) => reply::json(StatusCode::OK, &catalog),
        Err(err) => reply::operation_error(&err),
    })
}

pub(crate) async fn insert(
    mut input: InsertInput,
    if_match: Option<String>,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    input.if_match = precondition(if_match, input.if_match.take());
    Ok(match app.ops().insert_blocks(&input, &actor).await {
        Ok(outcome) => reply::written(&outcome, &outcome.meta),
        Err(err) => reply::operation_error(&err),
    })
}

pub(crate) async fn suggest(
    id: u64,
    params: SuggestParams,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    let input = SuggestInput {
        temperature: params.temperature,
        model_pref: comma_list(params.model_pref),
    };
    Ok(match app.ops().suggest(DocId(id), &input, &actor).await {
        Ok(suggestion) => reply::json(StatusCode::OK, &suggestion),
        Err(err) => reply::operation_error(&err),
    })
}

pub(crate) async fn summarize(
    mut input: SummarizeInput,
    if_match: Option<String>,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    input.if_match = precondition(if_match, input.if_match.take());
    Ok(match app.ops().agentic_summarize(&input, &actor).await {
        Ok(outcome) => reply::written(&outcome, &outcome.meta),
        Err(err) => reply::operation_error(&err),
    })
}

pub(crate) async fn generate_title(
    mut input: TitleInput,
    if_match: Option<String>,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    input.if_match = precondition(if_match, input.if_match.take());
    Ok(match app.ops().generate_title(&input, &actor).await {
        Ok(outcome) => reply::tagged(&outcome, outcome.meta.etag.as_str()),
        Err(err) => reply::operation_error(&err),
    })
}

pub(crate) async fn list_abilities(app: App) -> Result<Response, Infallible> {
    let items: Vec<_> = app.abilities().definitions().collect();
    Ok(reply::json(StatusCode::OK, &json!({ "count": items.len(), "items": items })))
}

pub(crate) async fn invoke_ability(
    namespace: String,
    name: String,
    input: Value,
    actor: Actor,
    app: App,
) -> Result<Response, Infallible> {
    let handle = format!("{namespace}/{name}");
    Ok(match app.abilities().invoke(&handle, input, &actor).await {
        Ok(output) => reply::json(StatusCode::OK, &output),
        Err(err) => reply::ability_error(&err),
    })
}
