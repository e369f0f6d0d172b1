//! # Simple Web Server
//!
//! A minimal HTTP server for static files and generated directory listings,
//! keeping a daily rotating access log.
//!
//! The `run` function is the command-line entry point; library users build a
//! [`config::ServerConfig`] and drive a [`server::Server`] directly.

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod logger;
pub mod request;
pub mod response;
pub mod server;
pub mod templates;

#[cfg(test)]
mod tests;

use crate::cli::Cli;
use crate::config::{ConfigStore, ServerConfig, StoredConfig, DEFAULT_PORT};
use crate::error::AppError;
use crate::logger::Logger;
use crate::server::{Dispatcher, PooledDispatcher, Server, ThreadPerConnection};
use clap::Parser;
use log::{error, info, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

/// Initializes the logger, parses command-line arguments, and runs the
/// server console until `quit`. Exits the process with status 1 on failure.
pub fn run() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::debug!("Log level set to: {log_level}");

    if let Err(e) = run_console(cli) {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

fn run_console(cli: Cli) -> Result<(), AppError> {
    let store = ConfigStore::new(&cli.config);
    let stored = store.load().unwrap_or_else(|e| {
        warn!("Ignoring config file '{}': {e}", store.path().display());
        StoredConfig::default()
    });
    let config = resolve_config(&cli, &stored)?;

    let dispatcher: Arc<dyn Dispatcher> = match cli.threads {
        Some(threads) => Arc::new(PooledDispatcher::new(threads)),
        None => Arc::new(ThreadPerConnection),
    };
    let server = Server::with_dispatcher(Arc::new(Logger::new()), dispatcher);

    start_and_remember(&server, &config, &store)?;

    for line in std::io::stdin().lock().lines() {
        match line?.trim() {
            "start" => {
                if let Err(e) = start_and_remember(&server, &config, &store) {
                    error!("{e}");
                }
            }
            "stop" => server.stop(),
            "status" => match server.local_addr() {
                Some(addr) => info!("Running on {addr}"),
                None => info!("Stopped"),
            },
            "quit" | "exit" => {
                server.stop();
                return Ok(());
            }
            "" => {}
            other => warn!("Unknown command '{other}' (expected start, stop, status or quit)"),
        }
    }

    // stdin is gone; keep serving until the process is terminated.
    server.wait();
    Ok(())
}

fn resolve_config(cli: &Cli, stored: &StoredConfig) -> Result<ServerConfig, AppError> {
    let port = cli.port.or(stored.port).unwrap_or(DEFAULT_PORT);
    let web_root = cli
        .directory
        .clone()
        .or_else(|| stored.web_directory.clone())
        .ok_or_else(|| AppError::InvalidConfig("no web directory given (use --directory)".into()))?;
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| stored.log_directory.clone())
        .ok_or_else(|| AppError::InvalidConfig("no log directory given (use --log-dir)".into()))?;

    Ok(ServerConfig::new(port, web_root, log_dir)
        .with_listen(cli.listen.clone())
        .with_read_timeout(cli.read_timeout.map(Duration::from_secs)))
}

fn start_and_remember(
    server: &Server,
    config: &ServerConfig,
    store: &ConfigStore,
) -> Result<(), AppError> {
    if server.is_running() {
        return Ok(());
    }
    server.start(config)?;

    let remembered = StoredConfig {
        port: Some(config.port),
        web_directory: Some(config.web_root.clone()),
        log_directory: Some(config.log_dir.clone()),
    };
    if let Err(e) = store.save(&remembered) {
        warn!("Could not save config to '{}': {e}", store.path().display());
    }
    Ok(())
}
