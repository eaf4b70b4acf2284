use crate::report::Report;
use futures_util::SinkExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DialError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] WsError),
    #[error("auth token is not a valid Authorization header value")]
    AuthHeader,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no live connection")]
    NotConnected,
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("websocket write failed: {0}")]
    Write(#[source] WsError),
}

/// Connect was interrupted by shutdown; the retry loop itself never gives up.
#[derive(Debug, Error)]
#[error("connect cancelled by shutdown")]
pub struct Cancelled;

/// Establishes one authenticated connection. The seam exists so the delivery
/// loop can be exercised against a scripted transport.
pub trait Dialer {
    type Conn: Wire;
    fn dial(&self) -> impl Future<Output = Result<Self::Conn, DialError>>;
}

/// One live session: a single complete text frame per send.
pub trait Wire {
    fn send_text(&mut self, payload: String) -> impl Future<Output = Result<(), WsError>>;
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// Exponential wait between failed connection attempts: starts at the floor,
/// doubles per failure, capped at the ceiling.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    wait_secs: u64,
    max_secs: u64,
}

impl Backoff {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            wait_secs: min_secs,
            max_secs,
        }
    }

    /// Returns the wait for the attempt that just failed and advances the
    /// schedule for the next one.
    pub fn advance(&mut self) -> Duration {
        let wait = Duration::from_secs(self.wait_secs);
        self.wait_secs = self.wait_secs.saturating_mul(2).min(self.max_secs);
        wait
    }
}

/// Owns the single outbound connection. Failed connections are destroyed and
/// recreated, never repaired; reconnecting is the caller's decision.
pub struct ConnectionManager<D: Dialer> {
    dialer: D,
    min_wait_secs: u64,
    max_wait_secs: u64,
    conn: Option<D::Conn>,
}

impl<D: Dialer> ConnectionManager<D> {
    pub fn new(dialer: D, min_wait_secs: u64, max_wait_secs: u64) -> Self {
        Self {
            dialer,
            min_wait_secs,
            max_wait_secs,
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Dials until a handshake completes, waiting out a fresh backoff sequence
    /// between failures. Only a shutdown signal makes this return an error.
    pub async fn connect(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<(), Cancelled> {
        let mut backoff = Backoff::new(self.min_wait_secs, self.max_wait_secs);
        let mut attempt = 1_u64;
        loop {
            if *shutdown.borrow() {
                return Err(Cancelled);
            }
            match self.dialer.dial().await {
                Ok(conn) => {
                    info!(attempt, "connected to collector");
                    self.conn = Some(conn);
                    return Ok(());
                }
                Err(err) => {
                    let wait = backoff.advance();
                    warn!(
                        error = %err,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "connect failed, retrying"
                    );
                    attempt += 1;
                    tokio::select! {
                        () = time::sleep(wait) => {}
                        _ = shutdown.changed() => return Err(Cancelled),
                    }
                }
            }
        }
    }

    /// Writes one report as a single text message. Any transport error tears
    /// the connection down before the failure is reported.
    pub async fn send(&mut self, report: &Report) -> Result<(), SendError> {
        let conn = self.conn.as_mut().ok_or(SendError::NotConnected)?;
        let payload = serde_json::to_string(report)?;
        if let Err(err) = conn.send_text(payload).await {
            if let Some(mut dead) = self.conn.take() {
                dead.close().await;
            }
            return Err(SendError::Write(err));
        }
        Ok(())
    }

    /// Scoped release on shutdown.
    pub async fn shutdown(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
    }
}

/// Production dialer: ws:// handshake with the auth token as the
/// Authorization header.
pub struct WsDialer {
    url: String,
    auth_token: String,
}

impl WsDialer {
    pub fn new(url: String, auth_token: String) -> Self {
        Self { url, auth_token }
    }
}

impl Dialer for WsDialer {
    type Conn = WsConnection;

    async fn dial(&self) -> Result<WsConnection, DialError> {
        let mut request = self.url.as_str().into_client_request()?;
        let value =
            HeaderValue::from_str(&self.auth_token).map_err(|_| DialError::AuthHeader)?;
        request.headers_mut().insert(AUTHORIZATION, value);

        let (stream, _response) = connect_async(request).await?;
        Ok(WsConnection { stream })
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Wire for WsConnection {
    async fn send_text(&mut self, payload: String) -> Result<(), WsError> {
        self.stream.send(Message::Text(payload)).await
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
