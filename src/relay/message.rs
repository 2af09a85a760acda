//! Outbound/inbound WebSocket frame type
//!
//! A thin wrapper around Axum's WebSocket message so the rest of the relay
//! (and its tests) can work with owned `String`/`Vec<u8>` payloads.

use axum::extract::ws;

/// WebSocket message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseFrame>),
}

/// WebSocket close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl Message {
    /// Convert from Axum's WebSocket message
    pub fn from_axum(msg: ws::Message) -> Self {
        match msg {
            ws::Message::Text(text) => Message::Text(text.to_string()),
            ws::Message::Binary(data) => Message::Binary(data.to_vec()),
            ws::Message::Ping(data) => Message::Ping(data.to_vec()),
            ws::Message::Pong(data) => Message::Pong(data.to_vec()),
            ws::Message::Close(frame) => Message::Close(frame.map(|f| CloseFrame {
                code: f.code,
                reason: f.reason.to_string(),
            })),
        }
    }

    /// Convert to Axum's WebSocket message
    pub fn into_axum(self) -> ws::Message {
        match self {
            Message::Text(text) => ws::Message::Text(ws::Utf8Bytes::from(text.as_str())),
            Message::Binary(data) => ws::Message::Binary(axum::body::Bytes::from(data)),
            Message::Ping(data) => ws::Message::Ping(axum::body::Bytes::from(data)),
            Message::Pong(data) => ws::Message::Pong(axum::body::Bytes::from(data)),
            Message::Close(frame) => ws::Message::Close(frame.map(|f| ws::CloseFrame {
                code: f.code,
                reason: ws::Utf8Bytes::from(f.reason.as_str()),
            })),
        }
    }

    /// Text payload, if this is a text frame
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }
}
