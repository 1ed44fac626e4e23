//! Webhook ingress.
//!
//! A small axum application serving exactly one route:
//! `POST /webhook/<bot_token>/`. Every other path is a 404, with a per-IP
//! limiter that answers 429 once an address hammers unknown paths. TLS is
//! terminated in-process by wrapping the TCP listener.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use teloxide::types::Update;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::server::TlsStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BotError, BotResult};

/// 404 hits tolerated per IP within [`NOT_FOUND_WINDOW`].
const NOT_FOUND_LIMIT: usize = 8;

/// Window for the 404 limiter.
const NOT_FOUND_WINDOW: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct WebhookState {
    token: Arc<String>,
    updates: mpsc::UnboundedSender<Update>,
    not_found_hits: Arc<std::sync::Mutex<HashMap<std::net::IpAddr, VecDeque<Instant>>>>,
}

/// The webhook application plus the update channel it feeds.
pub struct WebhookServer {
    router: Router,
    addr: SocketAddr,
    tls: Option<Arc<ServerConfig>>,
}

/// Build the webhook app.
///
/// # Errors
///
/// Refuses to bind port 80 and fails on unreadable TLS material.
pub fn build(
    token: &str,
    addr: SocketAddr,
    tls_material: Option<(&Path, &Path)>,
) -> BotResult<(WebhookServer, mpsc::UnboundedReceiver<Update>)> {
    if addr.port() == 80 {
        return Err(BotError::Webhook(
            "refusing to bind port 80; use a TLS-capable port".to_owned(),
        ));
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let state = WebhookState {
        token: Arc::new(token.to_owned()),
        updates: tx,
        not_found_hits: Arc::new(std::sync::Mutex::new(HashMap::new())),
    };

    let router = Router::new()
        .route("/webhook/{token}/", post(receive_update))
        .fallback(not_found)
        .with_state(state);

    let tls = tls_material.map(|(cert, key)| load_tls(cert, key)).transpose()?;

    Ok((WebhookServer { router, addr, tls }, rx))
}

impl WebhookServer {
    /// Serve until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Webhook`] when binding or serving fails.
    pub async fn serve(self, cancel: CancellationToken) -> BotResult<()> {
        let tcp = TcpListener::bind(self.addr)
            .await
            .map_err(|e| BotError::Webhook(format!("bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, tls = self.tls.is_some(), "webhook listening");

        let make_service = self
            .router
            .into_make_service_with_connect_info::<PeerAddr>();

        match self.tls {
            Some(config) => {
                let listener = TlsListener::spawn(tcp, config)
                    .map_err(|e| BotError::Webhook(format!("listener setup: {e}")))?;
                axum::serve(listener, make_service)
                    .with_graceful_shutdown(cancel.cancelled_owned())
                    .await
                    .map_err(|e| BotError::Webhook(e.to_string()))
            },
            None => axum::serve(tcp, make_service)
                .with_graceful_shutdown(cancel.cancelled_owned())
                .await
                .map_err(|e| BotError::Webhook(e.to_string())),
        }
    }
}

async fn receive_update(
    State(state): State<WebhookState>,
    UrlPath(token): UrlPath<String>,
    ConnectInfo(peer): ConnectInfo<PeerAddr>,
    body: String,
) -> Response {
    let peer = peer.0;
    if token != *state.token {
        debug!(peer = %peer.ip(), "webhook hit with a wrong token path");
        return StatusCode::NOT_FOUND.into_response();
    }
    if body.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match serde_json::from_str::<Update>(&body) {
        Ok(update) => {
            if state.updates.send(update).is_err() {
                // Receiver gone: the runtime is shutting down.
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
        },
        Err(e) => {
            warn!(peer = %peer.ip(), error = %e, "webhook body failed to parse");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

async fn not_found(
    State(state): State<WebhookState>,
    ConnectInfo(peer): ConnectInfo<PeerAddr>,
) -> Response {
    let peer = peer.0;
    let now = Instant::now();
    let over_limit = {
        let mut hits = state
            .not_found_hits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let window = hits.entry(peer.ip()).or_default();
        while let Some(&front) = window.front() {
            if now.duration_since(front) > NOT_FOUND_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        window.push_back(now);
        window.len() > NOT_FOUND_LIMIT
    };

    if over_limit {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Consecutive TCP accept failures tolerated before the listener quits.
const ACCEPT_FAILURE_BUDGET: u32 = 16;

/// Completed handshakes buffered between the accept task and the server.
const HANDSHAKE_BACKLOG: usize = 32;

/// TLS termination for `axum::serve`.
///
/// A background task owns the TCP listener: it accepts sockets, runs every
/// handshake on its own task so one slow or hostile client cannot stall the
/// accept path, and queues the connections that complete. `accept` only
/// takes the next finished connection off the queue.
struct TlsListener {
    ready: mpsc::Receiver<(TlsStream<TcpStream>, SocketAddr)>,
    local_addr: SocketAddr,
    accept_task: tokio::task::JoinHandle<()>,
}

impl TlsListener {
    fn spawn(tcp: TcpListener, config: Arc<ServerConfig>) -> io::Result<Self> {
        let local_addr = tcp.local_addr()?;
        let (tx, ready) = mpsc::channel(HANDSHAKE_BACKLOG);
        let accept_task = tokio::spawn(accept_connections(tcp, TlsAcceptor::from(config), tx));
        Ok(Self {
            ready,
            local_addr,
            accept_task,
        })
    }
}

impl Drop for TlsListener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Peer address, usable as connect-info for both the plain TCP listener and
/// [`TlsListener`] (axum's blanket `Connected` impl only covers
/// [`TcpListener`] directly, not listeners wrapping it).
#[derive(Clone, Copy)]
struct PeerAddr(SocketAddr);

impl axum::extract::connect_info::Connected<axum::serve::IncomingStream<'_, TcpListener>> for PeerAddr {
    fn connect_info(stream: axum::serve::IncomingStream<'_, TcpListener>) -> Self {
        Self(*stream.remote_addr())
    }
}

impl axum::extract::connect_info::Connected<axum::serve::IncomingStream<'_, TlsListener>> for PeerAddr {
    fn connect_info(stream: axum::serve::IncomingStream<'_, TlsListener>) -> Self {
        Self(*stream.remote_addr())
    }
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    fn accept(&mut self) -> impl std::future::Future<Output = (Self::Io, Self::Addr)> + Send {
        let ready = &mut self.ready;
        async move {
            match ready.recv().await {
                Some(connection) => connection,
                // The accept task spent its failure budget and quit; park so
                // graceful shutdown stays in charge of exiting the server.
                None => std::future::pending().await,
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

/// Accept sockets and hand each handshake to its own task.
///
/// TCP-level failures are tolerated with a growing pause between retries;
/// a run of [`ACCEPT_FAILURE_BUDGET`] consecutive failures stops the task
/// (closing the queue), on the theory that the socket is gone for good.
async fn accept_connections(
    tcp: TcpListener,
    acceptor: TlsAcceptor,
    ready: mpsc::Sender<(TlsStream<TcpStream>, SocketAddr)>,
) {
    let mut failures: u32 = 0;
    loop {
        match tcp.accept().await {
            Ok((socket, peer)) => {
                failures = 0;
                let acceptor = acceptor.clone();
                let ready = ready.clone();
                tokio::spawn(async move {
                    match acceptor.accept(socket).await {
                        Ok(tls) => {
                            let _ = ready.send((tls, peer)).await;
                        },
                        Err(e) => debug!(peer = %peer, error = %e, "TLS handshake rejected"),
                    }
                });
            },
            Err(e) => {
                failures = failures.saturating_add(1);
                if failures >= ACCEPT_FAILURE_BUDGET {
                    warn!(error = %e, failures, "accept failure budget spent, TLS listener stopping");
                    return;
                }
                let pause = Duration::from_millis(50u64 << failures.min(7));
                tokio::time::sleep(pause).await;
            },
        }
        if ready.is_closed() {
            return;
        }
    }
}

/// Load the rustls server config from PEM files.
///
/// Both files go through the same reader path, so every failure names the
/// offending file the same way.
fn load_tls(cert_path: &Path, key_path: &Path) -> BotResult<Arc<ServerConfig>> {
    let pem = |path: &Path| {
        std::fs::read(path)
            .map(std::io::Cursor::new)
            .map_err(|e| BotError::Tls(format!("'{}': {e}", path.display())))
    };

    let cert_chain: Vec<_> = rustls_pemfile::certs(&mut pem(cert_path)?)
        .collect::<Result<_, _>>()
        .map_err(|e| BotError::Tls(format!("'{}': {e}", cert_path.display())))?;
    let key = rustls_pemfile::private_key(&mut pem(key_path)?)
        .map_err(|e| BotError::Tls(format!("'{}': {e}", key_path.display())))?;

    match (cert_chain.is_empty(), key) {
        (false, Some(key)) => ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)
            .map(Arc::new)
            .map_err(|e| BotError::Tls(e.to_string())),
        (true, _) => Err(BotError::Tls(format!(
            "'{}' holds no certificates",
            cert_path.display()
        ))),
        (_, None) => Err(BotError::Tls(format!(
            "'{}' holds no private key",
            key_path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_80_is_refused() {
        let addr: SocketAddr = "127.0.0.1:80".parse().unwrap();
        assert!(matches!(
            build("token", addr, None),
            Err(BotError::Webhook(_))
        ));
    }

    #[test]
    fn builds_without_tls_on_other_ports() {
        let addr: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        assert!(build("token", addr, None).is_ok());
    }

    #[test]
    fn missing_tls_material_fails() {
        let addr: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        let result = build(
            "token",
            addr,
            Some((Path::new("/no/cert.pem"), Path::new("/no/key.pem"))),
        );
        assert!(matches!(result, Err(BotError::Tls(_))));
    }

    #[tokio::test]
    async fn end_to_end_roundtrip_over_loopback() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (server, mut rx) = build("sekret", addr, None).unwrap();

        // Bind manually to learn the ephemeral port before serving.
        let tcp = TcpListener::bind(addr).await.unwrap();
        let local = tcp.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let make_service = server
            .router
            .into_make_service_with_connect_info::<PeerAddr>();
        let serve_cancel = cancel.clone();
        let server_task = tokio::spawn(async move {
            axum::serve(tcp, make_service)
                .with_graceful_shutdown(serve_cancel.cancelled_owned())
                .await
                .unwrap();
        });

        let client = reqwest::Client::new();
        let update_body = serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "date": 1_700_000_000,
                "chat": { "id": 10, "type": "private", "first_name": "A" },
                "from": { "id": 42, "is_bot": false, "first_name": "Alice" },
                "text": "/start"
            }
        });

        // Correct path: 200 and the update lands on the channel.
        let ok = client
            .post(format!("http://{local}/webhook/sekret/"))
            .body(update_body.to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), reqwest::StatusCode::OK);
        assert!(rx.recv().await.is_some());

        // Empty body: 400.
        let empty = client
            .post(format!("http://{local}/webhook/sekret/"))
            .body("")
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

        // Wrong token path: 404.
        let wrong = client
            .post(format!("http://{local}/webhook/other/"))
            .body(update_body.to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(wrong.status(), reqwest::StatusCode::NOT_FOUND);

        // Unknown paths 404, then 429 once the limiter trips.
        let mut last = reqwest::StatusCode::NOT_FOUND;
        for _ in 0..=NOT_FOUND_LIMIT {
            last = client
                .get(format!("http://{local}/nope"))
                .send()
                .await
                .unwrap()
                .status();
        }
        assert_eq!(last, reqwest::StatusCode::TOO_MANY_REQUESTS);

        cancel.cancel();
        let _ = server_task.await;
    }
}
