//! http-echo: answers every request with a JSON description of that request

mod config;
mod logging;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::Config;
use echo_core::{Acceptor, EchoApp, EchoHandler, EchoServer, ServerConfig};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// How long open connections get to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_json)?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    info!(enabled = config.cors, "cors");
    info!(enabled = config.jwt, header = config.token_header(), "jwt");

    let mut app = EchoApp::new(EchoHandler::new(config.token_header()));
    if config.cors {
        app = app.with_cors();
    }
    let server = EchoServer::new(app);
    let mut listeners = JoinSet::new();

    let http = bind(&config.host, config.http)?;
    listeners.spawn(serve(server.clone(), http, Acceptor::Plain));

    if config.https_enabled() {
        let https = bind(&config.host, config.https)?;
        listeners.spawn(serve(server.clone(), https, tls_acceptor(&config)?));
    }

    let outcome = tokio::select! {
        _ = shutdown_requested() => Ok(()),
        Some(joined) = listeners.join_next() => match joined {
            Ok(Ok(())) => Err(anyhow!("listener stopped unexpectedly")),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow!(e).context("listener task failed")),
        },
    };

    if let Err(e) = &outcome {
        error!("listener failed: {e:#}");
    }

    info!(connections = server.tracker().count(), "shutting down");
    server.shutdown();
    while listeners.join_next().await.is_some() {}

    if !server.tracker().drain(DRAIN_TIMEOUT).await {
        warn!(
            connections = server.tracker().count(),
            "connections still open after drain timeout"
        );
    }
    info!(requests = server.app().handler().counter().current(), "stopped");

    outcome
}

fn bind(host: &str, port: u16) -> Result<TcpListener> {
    ServerConfig::new(host, port)
        .bind()
        .with_context(|| format!("failed to listen on {host}:{port}"))
}

async fn serve(server: EchoServer, listener: TcpListener, acceptor: Acceptor) -> Result<()> {
    let scheme = acceptor.scheme();
    let addr = listener.local_addr()?;
    info!(%addr, scheme, "listening");
    server
        .serve(listener, acceptor)
        .await
        .with_context(|| format!("{scheme} listener on {addr}"))
}

#[cfg(feature = "tls")]
fn tls_acceptor(config: &Config) -> Result<Acceptor> {
    let tls = match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => echo_core::TlsConfig::from_pem(cert, key),
        _ => {
            info!("generating self-signed certificate");
            echo_core::TlsConfig::self_signed().with_name(&config.host)
        }
    };
    let acceptor = tls.acceptor().context("failed to set up TLS")?;
    Ok(Acceptor::Tls(acceptor))
}

#[cfg(not(feature = "tls"))]
fn tls_acceptor(_config: &Config) -> Result<Acceptor> {
    Err(anyhow!("built without TLS support, run with --https 0"))
}

/// Resolves on Ctrl-C, or SIGINT / SIGHUP on unix
async fn shutdown_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut interrupt, mut hangup) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::hangup())) {
                (Ok(interrupt), Ok(hangup)) => (interrupt, hangup),
                _ => {
                    warn!("unix signal handlers unavailable, falling back to ctrl-c");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = interrupt.recv() => info!(signal = "SIGINT", "shutdown requested"),
            _ = hangup.recv() => info!(signal = "SIGHUP", "shutdown requested"),
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
    }
}
