//! SoapStack Server - local HTTP host for SOAP services.
//!
//! Adapts plain HTTP requests into proxy-style events so the SOAP handler can
//! be exercised without a function runtime. Ships with a demo calculator.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:4580 soapstack-server
//! curl 'http://localhost:4580/calculator?wsdl'
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4580` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `SOAP_DEBUG` | `false` | Log request and response payloads |
//! | `CALCULATOR_WSDL_PATH` | *(bundled)* | Calculator WSDL file |
//! | `SOAP_API_KEY` | *(unset)* | Required `x-api-key` header value |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod calculator;
mod config;
mod gateway;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use soapstack_core::{
    HandlerOptions, RegistryError, ServerConfig, ServerOptions, ServiceDefinition, SoapServer,
    event_header,
};

use crate::config::HostConfig;
use crate::gateway::{GatewayService, HEALTH_PATH};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the SOAP server from the host configuration.
fn build_server(config: &HostConfig) -> Result<SoapServer, RegistryError> {
    let wsdl_path = config.calculator_wsdl_path.clone();
    let services = move || {
        let service = calculator::service();
        let definition = match &wsdl_path {
            Some(path) => ServiceDefinition::from_path(path, service),
            None => ServiceDefinition::from_contents(calculator::CALCULATOR_WSDL, service),
        };
        vec![(calculator::SERVICE_NAME.to_owned(), definition)]
    };

    let options = match &config.api_key {
        Some(key) => {
            let key = key.clone();
            info!("requests must carry a matching x-api-key header");
            ServerOptions::builder()
                .authorize(Arc::new(move |event: &Value| {
                    event_header(event, "x-api-key") == Some(key.as_str())
                }))
                .build()
        }
        None => ServerOptions::default(),
    };

    SoapServer::new(ServerConfig::new(services).with_options(options))
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

/// Accept connections until `shutdown` resolves, then drain open ones.
async fn serve(listener: TcpListener, gateway: GatewayService, shutdown: impl Future<Output = ()>) {
    let connections = GracefulShutdown::new();
    let builder = HttpConnBuilder::new(TokioExecutor::new());
    tokio::pin!(shutdown);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let conn = builder
            .serve_connection(TokioIo::new(stream), gateway.clone())
            .into_owned();
        let conn = connections.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!(%peer_addr, error = %e, "connection failed");
            }
        });
    }

    info!("stopped accepting, draining open connections");
    connections.shutdown().await;
    info!("gateway stopped");
}

/// Ask a running gateway for its health document.
///
/// Healthy means a `200` status line and a JSON body whose `status` is
/// `running`.
async fn run_health_check(addr: &str) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let request =
        format!("GET {HEALTH_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let response = String::from_utf8_lossy(&raw);
    let (head, body) = response
        .split_once("\r\n\r\n")
        .with_context(|| format!("truncated response from {addr}"))?;

    let status_line = head.lines().next().unwrap_or_default();
    anyhow::ensure!(
        status_line.split_whitespace().nth(1) == Some("200"),
        "unhealthy status from {addr}: {status_line}"
    );
    let health: Value =
        serde_json::from_str(body).with_context(|| format!("invalid health document from {addr}"))?;
    anyhow::ensure!(health["status"] == "running", "gateway at {addr} is not running");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|a| a == "--health-check") {
        let config = HostConfig::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = HostConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        debug = config.debug,
        calculator_wsdl_path = ?config.calculator_wsdl_path,
        version = VERSION,
        "starting SoapStack Server",
    );

    let server = build_server(&config).context("failed to register SOAP services")?;
    let services = server
        .registry()
        .names()
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();
    let handler = server.create_handler(HandlerOptions { debug: config.debug });
    let service = GatewayService::new(handler, services);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service, shutdown_signal()).await;
    Ok(())
}
