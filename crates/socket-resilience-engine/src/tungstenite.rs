//! WebSocket transport backed by tokio-tungstenite.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{self, BoxFuture};
use futures::{SinkExt, StreamExt};
use socket_resilience_core::{CloseCode, CloseFrame, TransportError};
use tokio_tungstenite::tungstenite::error::{Error, ProtocolError, UrlError};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WireCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WireCloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::transport::{Connection, Connector, Frame};

/// Connects to a `ws://` or `wss://` URL.
///
/// `wss://` requires the `tungstenite-native-tls` feature.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    handshake_timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Creates a connector for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: None,
        }
    }

    /// Fails the handshake with [`TransportError::TimedOut`] after `timeout`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Returns the target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Connection, TransportError>> {
        let url = self.url.clone();
        let handshake_timeout = self.handshake_timeout;

        Box::pin(async move {
            let handshake = tokio_tungstenite::connect_async(url);
            let result = match handshake_timeout {
                Some(timeout) => tokio::time::timeout(timeout, handshake)
                    .await
                    .map_err(|_| TransportError::TimedOut)?,
                None => handshake.await,
            };
            let (stream, _response) = result.map_err(transport_error)?;
            let (write, read) = stream.split();

            let sink = write
                .sink_map_err(transport_error)
                .with(|frame: Frame| future::ready(to_message(frame)));
            let source = read.map(|message| message.map(to_frame).map_err(transport_error));

            Ok(Connection::new(sink, source))
        })
    }
}

fn to_message(frame: Frame) -> Result<Message, TransportError> {
    Ok(match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(payload) => Message::Binary(payload.to_vec()),
        Frame::Ping(payload) => Message::Ping(payload.to_vec()),
        Frame::Pong(payload) => Message::Pong(payload.to_vec()),
        Frame::Close(frame) => Message::Close(frame.map(|frame| WireCloseFrame {
            code: WireCloseCode::from(u16::from(frame.code)),
            reason: frame
                .reason
                .map(|reason| Cow::Owned(String::from_utf8_lossy(&reason).into_owned()))
                .unwrap_or_default(),
        })),
        Frame::Unsupported => {
            return Err(TransportError::Other("cannot write an unsupported frame".into()))
        }
    })
}

fn to_frame(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text),
        Message::Binary(payload) => Frame::Binary(Bytes::from(payload)),
        Message::Ping(payload) => Frame::Ping(Bytes::from(payload)),
        Message::Pong(payload) => Frame::Pong(Bytes::from(payload)),
        Message::Close(frame) => Frame::Close(frame.map(|frame| {
            let code = CloseCode::from(u16::from(frame.code));
            if frame.reason.is_empty() {
                CloseFrame::new(code)
            } else {
                CloseFrame::with_reason(code, Bytes::from(frame.reason.into_owned()))
            }
        })),
        Message::Frame(_) => Frame::Unsupported,
    }
}

fn transport_error(error: Error) -> TransportError {
    match error {
        Error::ConnectionClosed
        | Error::AlreadyClosed
        | Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            TransportError::NetworkConnectionLost
        }
        Error::Io(error) => error.into(),
        Error::Tls(_) => TransportError::SecureConnectionFailed,
        Error::Url(UrlError::NoHostName | UrlError::EmptyHostName) => TransportError::CannotFindHost,
        Error::Url(_) => TransportError::CannotConnectToHost,
        Error::Http(_) | Error::HttpFormat(_) => TransportError::BadServerResponse,
        other => TransportError::Other(other.to_string()),
    }
}
