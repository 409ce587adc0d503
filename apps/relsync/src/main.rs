//! relsync - Keep a blob store mirror of the latest GitHub Actions runner
//!
//! This is the CLI invocation wrapper: it assembles configuration, owns the
//! network client cache, drives the ops crate and renders the result.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use rand::Rng;
use relsync_config::Config;
use relsync_events::EventReceiver;
use relsync_net::ClientCache;
use relsync_ops::{net_config, OperationResult, OpsContextBuilder, OpsCtx};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Upper bound for a single backoff sleep between retried cycles
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    let renderer = OutputRenderer::new(json_mode, cli.global.color.unwrap_or_default());
    if let Err(e) = run(cli, &renderer).await {
        error!("Application error: {}", e);
        if json_mode {
            let _ = renderer.render_error(&e);
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli, renderer: &OutputRenderer) -> Result<(), CliError> {
    info!("Starting relsync v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults < file < environment < flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    let command = cli.command();
    apply_cli_config(&mut config, &cli.global, &command)?;
    config.validate()?;

    let clients = Arc::new(ClientCache::with_config(net_config(&config)));
    let mut event_handler = EventHandler::new(renderer.colors_enabled(), cli.global.json);

    let result = match command {
        Commands::Sync { .. } => {
            run_with_retries(&config, &clients, &mut event_handler, command).await?
        }
        Commands::Status => {
            let (ctx, receiver) = build_ops_context(&config, &clients)?;
            execute_command_with_events(command, ctx, receiver, &mut event_handler).await?
        }
    };

    renderer.render_result(&result)?;
    info!(wrote_object = result.wrote_object(), "Command completed successfully");
    Ok(())
}

/// Re-run whole cycles while the failure is transient
///
/// Each attempt gets a fresh context and correlation id; the client cache is
/// shared across attempts.
async fn run_with_retries(
    config: &Config,
    clients: &Arc<ClientCache>,
    event_handler: &mut EventHandler,
    command: Commands,
) -> Result<OperationResult, CliError> {
    let retries = config.network.retries;
    let base_delay = Duration::from_secs(config.network.retry_delay);
    let mut attempt = 0;

    loop {
        let (ctx, receiver) = build_ops_context(config, clients)?;
        match execute_command_with_events(command.clone(), ctx, receiver, event_handler).await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < retries && e.is_retryable() => {
                attempt += 1;
                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    attempt,
                    retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Sync failed with a transient error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exponential backoff with up to 50% random jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = base.saturating_mul(1 << exponent).min(MAX_RETRY_DELAY);
    let jitter_cap = u64::try_from(delay.as_millis() / 2).unwrap_or(0);
    let jitter = if jitter_cap == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_cap)
    };
    delay + Duration::from_millis(jitter)
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ops_ctx: OpsCtx,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ops_ctx));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(command: Commands, ctx: OpsCtx) -> Result<OperationResult, CliError> {
    match command {
        Commands::Sync { .. } => {
            let outcome = relsync_ops::sync(&ctx).await?;
            Ok(OperationResult::Sync(outcome))
        }
        Commands::Status => {
            let plan = relsync_ops::status(&ctx).await?;
            Ok(OperationResult::Status(plan))
        }
    }
}

/// Build the operations context and its event channel
fn build_ops_context(
    config: &Config,
    clients: &Arc<ClientCache>,
) -> Result<(OpsCtx, EventReceiver), CliError> {
    let (event_sender, event_receiver) = relsync_events::channel();
    let ctx = OpsContextBuilder::new()
        .with_event_sender(event_sender)
        .with_config(config.clone())
        .with_client_cache(Arc::clone(clients))
        .build()?;
    Ok((ctx, event_receiver))
}

/// Initialize tracing/logging
///
/// Logs go to stderr; stdout is reserved for rendered results.
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,relsync=debug,relsync_ops=debug,relsync_net=debug"
    } else {
        "warn,relsync=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if json_mode {
        builder.json().init();
    } else {
        builder.with_target(debug_enabled).init();
    }
}

/// Apply CLI configuration overrides
fn apply_cli_config(
    config: &mut Config,
    global: &GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    if let Some(container) = &global.container {
        config.target.container = Some(container.clone());
    }
    if let Some(object_key) = &global.object_key {
        config.target.object_key = Some(object_key.clone());
    }
    if let Some(os) = &global.os {
        config.platform.os.clone_from(os);
    }
    if let Some(arch) = &global.arch {
        config.platform.arch.clone_from(arch);
    }
    if let Some(root) = &global.store_root {
        if root.as_os_str().is_empty() {
            return Err(CliError::InvalidArguments(
                "--store-root must not be empty".to_string(),
            ));
        }
        config.store.root = Some(root.clone());
    }
    if let Some(sse) = &global.sse {
        config.store.sse = Some(sse.clone());
    }

    if let Commands::Sync {
        retries: Some(retries),
    } = command
    {
        config.network.retries = *retries;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "relsync",
            "sync",
            "--retries",
            "2",
            "--container",
            "mirror",
            "--object-key",
            "runner.tar.gz",
            "--arch",
            "arm64",
        ])
        .unwrap();

        let mut config = Config::default();
        config.target.container = Some("from-file".into());
        apply_cli_config(&mut config, &cli.global, &cli.command()).unwrap();

        assert_eq!(config.target.container.as_deref(), Some("mirror"));
        assert_eq!(config.target.object_key.as_deref(), Some("runner.tar.gz"));
        assert_eq!(config.platform.arch, "arm64");
        assert_eq!(config.platform.os, "linux");
        assert_eq!(config.network.retries, 2);
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let base = Duration::from_secs(1);
        let first = backoff_delay(base, 1);
        assert!(first >= base && first <= base + base / 2);

        let third = backoff_delay(base, 3);
        assert!(third >= Duration::from_secs(4));

        let huge = backoff_delay(base, 40);
        assert!(huge <= MAX_RETRY_DELAY + MAX_RETRY_DELAY / 2);
    }
}
