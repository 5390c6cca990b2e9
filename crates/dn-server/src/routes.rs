//! Route table
//!
//! ```text
//! GET  /healthz
//! GET  /{base}/mr/{id}              If-None-Match → 200 | 304
//! GET  /{base}/md/{id}              If-None-Match → 200 | 304
//! GET  /{base}/catalog?since&status&types
//! POST /{base}/insert               If-Match → 200 | 412
//! GET  /{base}/ai/suggest/{id}?temperature&model_pref
//! POST /{base}/agentic/summarize    If-Match → 200 | 412
//! POST /{base}/title/generate       If-Match → 200 | 412
//! GET  /{base}/abilities
//! POST /{base}/abilities/{namespace}/{name}
//! ```

use crate::app::App;
use crate::handlers::{self, CatalogParams, SuggestParams};
use crate::reply;
use dn_store::Actor;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 1 << 20;

fn with_app(app: App) -> impl Filter<Extract = (App,), Error = Infallible> + Clone {
    warp::any().map(move || app.clone())
}

fn with_actor(app: App) -> impl Filter<Extract = (Actor,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .map(move |auth: Option<String>| app.authenticate(auth.as_deref()))
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn prefix(segments: &[String]) -> BoxedFilter<()> {
    segments
        .iter()
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment.clone())).boxed()
        })
}

/// Every route, with rejections rendered as JSON errors
pub fn routes(app: App, base: &[String]) -> BoxedFilter<(Response,)> {
    let api = prefix(base);
    let ctx = || with_actor(app.clone()).and(with_app(app.clone()));
    let if_none_match = || warp::header::optional::<String>("if-none-match");
    let if_match = || warp::header::optional::<String>("if-match");

    let health = warp::path!("healthz")
        .and(warp::get())
        .and(with_app(app.clone()))
        .and_then(handlers::health)
        .boxed();

    let mr = api
        .clone()
        .and(warp::path!("mr" / u64))
        .and(warp::get())
        .and(if_none_match())
        .and(ctx())
        .and_then(handlers::get_mr)
        .boxed();

    let md = api
        .clone()
        .and(warp::path!("md" / u64))
        .and(warp::get())
        .and(if_none_match())
        .and(ctx())
        .and_then(handlers::get_md)
        .boxed();

    let catalog = api
        .clone()
        .and(warp::path!("catalog"))
        .and(warp::get())
        .and(warp::query::<CatalogParams>())
        .and(ctx())
        .and_then(handlers::catalog)
        .boxed();

    let insert = api
        .clone()
        .and(warp::path!("insert"))
        .and(warp::post())
        .and(json_body())
        .and(if_match())
        .and(ctx())
        .and_then(handlers::insert)
        .boxed();

    let suggest = api
        .clone()
        .and(warp::path!("ai" / "suggest" / u64))
        .and(warp::get())
        .and(warp::query::<SuggestParams>())
        .and(ctx())
        .and_then(handlers::suggest)
        .boxed();

    let summarize = api
        .clone()
        .and(warp::path!("agentic" / "summarize"))
        .and(warp::post())
        .and(json_body())
        .and(if_match())
        .and(ctx())
        .and_then(handlers::summarize)
        .boxed();

    let title = api
        .clone()
        .and(warp::path!("title" / "generate"))
        .and(warp::post())
        .and(json_body())
        .and(if_match())
        .and(ctx())
        .and_then(handlers::generate_title)
        .boxed();

    let abilities = api
        .clone()
        .and(warp::path!("abilities"))
        .and(warp::get())
        .and(with_app(app.clone()))
        .and_then(handlers::list_abilities)
        .boxed();

    let invoke = api
        .and(warp::path!("abilities" / String / String))
        .and(warp::post())
        .and(json_body())
        .and(ctx())
        .and_then(handlers::invoke_ability)
        .boxed();

    health
        .or(mr)
        .unify()
        .or(md)
        .unify()
        .or(catalog)
        .unify()
        .or(insert)
        .unify()
        .or(suggest)
        .unify()
        .or(summarize)
        .unify()
        .or(title)
        .unify()
        .or(abilities)
        .unify()
        .or(invoke)
        .unify()
        .recover(reply::recover)
        .unify()
        .with(warp::trace::request())
        .map(Reply::into_response)
        .boxed()
}
