//! The WebTransport listener: accepts bot and spectator connections and
//! hands each one off to the `StreamGateway`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use wtransport::endpoint::IncomingSession;
use wtransport::{Endpoint, Identity, ServerConfig as WtServerConfig};

use crate::net::gateway::StreamGateway;
use crate::net::tls::TlsConfig;

/// Adapts a wtransport bidirectional stream's separate send/receive halves
/// into a single `AsyncRead + AsyncWrite` type, which is what `StreamGateway`
/// is written against.
pub struct BiStream {
    send: wtransport::SendStream,
    recv: wtransport::RecvStream,
}

impl AsyncRead for BiStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.recv).poll_read(cx, buf)
    }
}

impl AsyncWrite for BiStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.send).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.send).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.send).poll_shutdown(cx)
    }
}

pub struct WebTransportListener {
    port: u16,
    identity: Identity,
    gateway: Arc<StreamGateway>,
}

impl WebTransportListener {
    pub async fn bind(port: u16, gateway: Arc<StreamGateway>) -> anyhow::Result<Self> {
        let tls = TlsConfig::load().await?;
        Ok(Self {
            port,
            identity: tls.identity,
            gateway,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let server_config = WtServerConfig::builder()
            .with_bind_default(self.port)
            .with_identity(self.identity)
            .build();
        let endpoint = Endpoint::server(server_config)?;
        tracing::info!(port = self.port, "realtime listener bound");

        loop {
            let incoming = endpoint.accept().await;
            let gateway = self.gateway.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_incoming(incoming, gateway).await {
                    tracing::warn!(error = %err, "connection error");
                }
            });
        }
    }
}

async fn handle_incoming(incoming: IncomingSession, gateway: Arc<StreamGateway>) -> anyhow::Result<()> {
    let request = incoming.await?;
    let path = request.path().to_string();
    let connection = request.accept().await?;

    if let Some(token) = spectator_token(&path) {
        let (send, _recv) = connection.accept_bi().await?;
        gateway.handle_spectator_stream(send, &token).await?;
        return Ok(());
    }

    let (send, recv) = connection.accept_bi().await?;
    let stream = BiStream { send, recv };
    gateway.handle_bot_stream(stream).await?;
    Ok(())
}

/// Parses `/ws/match/<id>?token=...` style paths into the bearer token; the
/// match id itself is implicit (one arena per listener).
fn spectator_token(path: &str) -> Option<String> {
    if !path.starts_with("/ws/match/") {
        return None;
    }
    let query = path.split('?').nth(1)?;
    query
        .split('&')
        .find_map(|kv| kv.strip_prefix("token=").map(|v| v.to_string()))
}
