//! `dn-server` binary: load configuration, wire the app, serve.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dn_server::{telemetry, App, ServerConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dn-server", version, about = "Dual-native document service")]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "DN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.listen`
    #[arg(long, env = "DN_LISTEN", global = true)]
    listen: Option<String>,

    /// Default log filter, overrides `logging.level`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Validate the configuration and print the effective values
    Check,
}

impl Cli {
    fn resolve(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::default(),
        };
        if let Some(listen) = &self.listen {
            config.server.listen.clone_from(listen);
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        config.logging.json |= self.log_json;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Check => {
            let rendered = toml::to_string_pretty(&config).context("rendering configuration")?;
            println!("{rendered}");
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    telemetry::init(&config.logging);
    let addr = config.listen_addr()?;
    let app = App::from_config(&config).context("building application")?;
    let routes = dn_server::routes(app, &config.base_segments());

    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            // Ctrl-C failing to install just means no graceful shutdown.
            let _ = tokio::signal::ctrl_c().await;
        })
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(%bound, base_path = %config.server.base_path, "listening");
    server.await;
    tracing::info!("shut down");
    Ok(())
}
