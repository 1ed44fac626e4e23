//! `bosun` — Telegram operations agent for a Docker host.
//!
//! Thin entry point: CLI, logging, config, then hand over to the runtime
//! supervisor. Signal handling lives here so the supervisor stays testable.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use teloxide::Bot;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bosun_telegram::cli::Args;
use bosun_telegram::health::{self, HealthState, HealthVerdict};
use bosun_telegram::runtime::{BotRuntime, IngressMode};
use bosun_telegram::state::BotState;

/// Webhook listen port. Port 80 is refused by the server; 8443 is one of
/// the ports the platform will deliver to.
const WEBHOOK_PORT: u16 = 8443;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.health_check {
        return run_health_check();
    }

    setup_logging(&args.log_level, args.colorize_logs);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::from(1)
        },
    }
}

/// `--health_check`: report the last health snapshot and exit.
fn run_health_check() -> ExitCode {
    match health::check_snapshot(&HealthState::default_snapshot_path()) {
        HealthVerdict::Healthy => {
            println!("healthy");
            ExitCode::SUCCESS
        },
        HealthVerdict::Unhealthy => {
            println!("unhealthy");
            ExitCode::from(1)
        },
        HealthVerdict::Unknown => {
            println!("unknown");
            ExitCode::from(2)
        },
    }
}

fn setup_logging(level: &str, colorize: bool) {
    let directive = match level {
        "DEBUG" => "debug",
        "ERROR" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,bosun={directive},bosun_telegram={directive},bosun_docker={directive},bosun_session={directive},bosun_plugins={directive},bosun_config={directive}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(colorize)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = bosun_config::load(args.config.as_deref())?;

    let token = config.token_for(args.mode).clone();
    if token.is_empty() {
        anyhow::bail!("no bot token configured for mode '{}'", args.mode);
    }

    let bot = Bot::new(token.expose_secret());
    let state = BotState::new(bot.clone(), config, plugins_dir(), token);

    let mode = if args.webhook {
        let host: IpAddr = args
            .socket_host
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid --socket_host '{}'", args.socket_host))?;
        let addr = SocketAddr::new(host, WEBHOOK_PORT);
        register_webhook(&state, &args.socket_host).await?;
        IngressMode::Webhook { addr }
    } else {
        IngressMode::Polling
    };

    let runtime = Arc::new(BotRuntime::new(state, &args.plugins, mode).await);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %args.mode,
        "new instance started"
    );

    let ingress = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { runtime.launch().await }
    });

    wait_for_termination(&runtime, ingress).await
}

/// Block until a termination signal or ingress death, then shut down.
///
/// The first interrupt starts the graceful path; a second interrupt within
/// the shutdown window forces immediate termination.
async fn wait_for_termination(
    runtime: &Arc<BotRuntime>,
    mut ingress: tokio::task::JoinHandle<Result<(), bosun_telegram::BotError>>,
) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = sigterm.recv() => info!("termination signal received"),
        _ = sighup.recv() => info!("hangup received"),
        result = &mut ingress => {
            // Ingress ended on its own: propagate after cleanup.
            let outcome = result.map_err(|e| anyhow::anyhow!("ingress task panicked: {e}"))?;
            runtime.shutdown("ingress ended").await?;
            return outcome.map_err(Into::into);
        },
    }

    // Graceful path, with a second interrupt forcing out immediately.
    tokio::select! {
        result = runtime.shutdown("signal") => {
            result?;
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("second interrupt, terminating immediately");
            std::process::exit(130);
        },
    }

    ingress.abort();
    let _ = ingress.await;
    Ok(())
}

/// Where plugin manifests live: `~/.bosun/plugins`, or the system path
/// when no home directory exists (containerised deployments).
fn plugins_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".bosun").join("plugins"))
        .unwrap_or_else(|| PathBuf::from("/etc/bosun/plugins"))
}

/// Tell the platform where to deliver updates, attaching the self-signed
/// certificate when one is configured.
async fn register_webhook(state: &BotState, public_host: &str) -> anyhow::Result<()> {
    let url: reqwest::Url = format!(
        "https://{public_host}:{WEBHOOK_PORT}/webhook/{}/",
        state.selected_token.expose_secret()
    )
    .parse()?;

    let cert = state
        .config
        .webhook_config
        .as_ref()
        .and_then(|w| w.cert.clone());

    let mut request = state.bot.set_webhook(url).drop_pending_updates(true);
    if let Some(cert_path) = cert {
        request = request.certificate(InputFile::file(cert_path));
    }
    request.await?;
    info!("webhook registered with the platform");
    Ok(())
}
