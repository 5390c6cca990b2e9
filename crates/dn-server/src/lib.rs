//! Dual-Native REST Server
//!
//! warp routes over the shared operation set, TOML configuration, an HTTP
//! generation provider and the logging bootstrap used by the `dn-server`
//! binary.
//!
//! # Example
//!
//! ```rust,no_run
//! use dn_server::{App, ServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load("dn-server.toml")?;
//! let app = App::from_config(&config)?;
//! let routes = dn_server::routes(app, &config.base_segments());
//! warp::serve(routes).run(config.listen_addr()?).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod app;
pub mod config;
mod handlers;
pub mod provider;
mod reply;
mod routes;
pub mod telemetry;

pub use app::App;
pub use config::{ConfigError, ServerConfig};
pub use handlers::{CatalogParams, SuggestParams};
pub use provider::HttpProvider;
pub use routes::{routes, MAX_BODY_BYTES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
