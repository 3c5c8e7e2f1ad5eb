//! Client error type shared by the API, live, and identity layers.

use protocol::ProtocolError;

use crate::identity::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response. `detail` comes from the body when present.
    #[error("{detail}")]
    Server { status: u16, detail: String },
    #[error("server did not return a poll id")]
    MissingPollId,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MissingPollId => Self::MissingPollId,
            ProtocolError::Json(e) => Self::InvalidJson(e),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WsConnect(Box::new(err))
    }
}

impl ClientError {
    /// True when the request never produced an HTTP response.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(e) if e.status().is_none() && !e.is_decode())
    }
}
