//! Native HTTP server
//!
//! hyper HTTP/1.1 on a tokio listener with:
//! - one task per connection
//! - SO_REUSEADDR and TCP_NODELAY listener sockets
//! - connection tracking and graceful drain on shutdown

use crate::handler::RemoteAddr;
use crate::{EchoApp, Result};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Listener address configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Resolve the listen address (first match for host names)
    pub fn addr(&self) -> Result<SocketAddr> {
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                crate::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no address for {}:{}", self.hostname, self.port),
                ))
            })
    }

    /// Bind a tokio listener on this address
    pub fn bind(&self) -> Result<TcpListener> {
        let socket = create_optimized_socket(&self.addr()?)?;
        socket.set_nonblocking(true)?;
        Ok(TcpListener::from_std(socket.into())?)
    }
}

/// Create a TCP socket with optimizations
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

// ============================================================================
// Connection Tracking for Graceful Shutdown
// ============================================================================

/// Tracks active connections for graceful shutdown
///
/// Used to:
/// - Count active connections
/// - Signal shutdown to accept loops and open connections
/// - Wait for existing connections to drain
#[derive(Debug)]
pub struct ConnectionTracker {
    /// Active connection count
    active: AtomicU64,
    /// Shutdown signal received
    shutting_down: AtomicBool,
    /// Wakes accept loops and connections
    signal: CancellationToken,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    /// Create a new connection tracker
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
            signal: CancellationToken::new(),
        }
    }

    /// Increment active connection count
    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement active connection count
    #[inline]
    pub fn decrement(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Get current active connection count
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Signal that shutdown is in progress
    pub fn start_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.signal.cancel();
    }

    /// Check if shutdown is in progress
    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Token cancelled on shutdown
    pub fn subscribe(&self) -> CancellationToken {
        self.signal.clone()
    }

    /// Wait for connections to drain
    ///
    /// Returns true if all connections closed before the timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.count() == 0 {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Connection acceptor: plain TCP or TLS
#[derive(Clone)]
pub enum Acceptor {
    Plain,
    #[cfg(feature = "tls")]
    Tls(tokio_rustls::TlsAcceptor),
}

impl Acceptor {
    pub fn scheme(&self) -> &'static str {
        match self {
            Acceptor::Plain => "http",
            #[cfg(feature = "tls")]
            Acceptor::Tls(_) => "https",
        }
    }
}

/// Echo server: shared app plus connection bookkeeping
#[derive(Clone)]
pub struct EchoServer {
    app: Arc<EchoApp>,
    tracker: Arc<ConnectionTracker>,
}

impl EchoServer {
    pub fn new(app: EchoApp) -> Self {
        Self {
            app: Arc::new(app),
            tracker: Arc::new(ConnectionTracker::new()),
        }
    }

    pub fn app(&self) -> &Arc<EchoApp> {
        &self.app
    }

    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }

    /// Stop accepting and ask open connections to finish
    pub fn shutdown(&self) {
        self.tracker.start_shutdown();
    }

    /// Accept loop; returns once shutdown starts
    pub async fn serve(&self, listener: TcpListener, acceptor: Acceptor) -> Result<()> {
        let scheme = acceptor.scheme();
        let shutdown = self.tracker.subscribe();

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(scheme, error = %e, "accept failed");
                        continue;
                    }
                },
                _ = shutdown.cancelled() => break,
            };

            // Reject new connections during shutdown
            if self.tracker.is_shutting_down() {
                drop(stream);
                continue;
            }

            let app = self.app.clone();
            let tracker = self.tracker.clone();
            let acceptor = acceptor.clone();
            tracker.increment();

            tokio::spawn(async move {
                let shutdown = tracker.subscribe();
                match acceptor {
                    Acceptor::Plain => serve_connection(stream, peer, app, shutdown).await,
                    #[cfg(feature = "tls")]
                    Acceptor::Tls(tls) => match tls.accept(stream).await {
                        Ok(stream) => serve_connection(stream, peer, app, shutdown).await,
                        Err(e) => tracing::debug!(%peer, error = %e, "TLS handshake failed"),
                    },
                }
                tracker.decrement();
            });
        }

        tracing::debug!(scheme, "accept loop stopped");
        Ok(())
    }
}

async fn serve_connection<S>(stream: S, peer: SocketAddr, app: Arc<EchoApp>, shutdown: CancellationToken)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |mut req: hyper::Request<Incoming>| {
        let app = app.clone();
        req.extensions_mut().insert(RemoteAddr(peer));
        async move { Ok::<_, Infallible>(app.call(req).await.into_hyper()) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    let mut conn = std::pin::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    // Clients dropping the connection is routine
    if let Err(e) = result {
        tracing::debug!(%peer, error = %e, "connection closed with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_addr() {
        let config = ServerConfig::new("127.0.0.1", 9000);
        assert_eq!(config.addr().unwrap(), "127.0.0.1:9000".parse().unwrap());

        let config = ServerConfig::new("::1", 9001);
        assert!(config.addr().unwrap().is_ipv6());
    }

    #[test]
    fn test_connection_tracker() {
        let tracker = ConnectionTracker::new();
        tracker.increment();
        tracker.increment();
        tracker.decrement();
        assert_eq!(tracker.count(), 1);
        assert!(!tracker.is_shutting_down());

        let rx = tracker.subscribe();
        tracker.start_shutdown();
        assert!(tracker.is_shutting_down());
        assert!(rx.is_cancelled());
    }

    #[tokio::test]
    async fn test_drain() {
        let tracker = Arc::new(ConnectionTracker::new());
        assert!(tracker.drain(Duration::from_millis(10)).await);

        tracker.increment();
        assert!(!tracker.drain(Duration::from_millis(30)).await);

        let t = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            t.decrement();
        });
        assert!(tracker.drain(Duration::from_secs(2)).await);
    }
}
