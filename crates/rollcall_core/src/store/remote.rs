//! Remote document service collaborator.
//!
//! # Responsibility
//! - Transfer the whole document over one HTTP endpoint (GET/POST).
//! - Map transport and protocol failures into one error type the store can
//!   degrade on.
//!
//! # Invariants
//! - Any non-2xx response is a failure; there are no partial updates.
//! - Fetched bodies are returned raw; the store normalizes on receipt.

use crate::model::document::Document;
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failures talking to the remote endpoint.
#[derive(Debug)]
pub enum RemoteError {
    /// Connection/timeout/body-decode errors from the transport.
    Transport(reqwest::Error),
    /// The server answered with a non-success status code.
    Status(u16),
    /// The server answered 200 but the body violates the protocol.
    Protocol(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "remote transport failed: {err}"),
            Self::Status(code) => write!(f, "remote responded with status {code}"),
            Self::Protocol(message) => write!(f, "remote protocol violation: {message}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Status(_) | Self::Protocol(_) => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

/// Push acknowledgement carrying the server-assigned stamp.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAck {
    pub ok: bool,
    pub updated_at: String,
}

/// Optional remote store; every call transfers the entire document.
pub trait RemoteDocumentService: Send + Sync {
    /// Fetches the remote document as raw JSON (any schema version).
    fn fetch(&self) -> RemoteResult<Value>;
    /// Pushes the full current document.
    fn push(&self, document: &Document) -> RemoteResult<PushAck>;
}

/// HTTP implementation over a single endpoint URL, no authentication.
pub struct HttpRemote {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteDocumentService for HttpRemote {
    fn fetch(&self) -> RemoteResult<Value> {
        let response = self.client.get(&self.endpoint).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(response.json()?)
    }

    fn push(&self, document: &Document) -> RemoteResult<PushAck> {
        let response = self.client.post(&self.endpoint).json(document).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        let ack: PushAck = response.json()?;
        if !ack.ok {
            return Err(RemoteError::Protocol(
                "push was not acknowledged with ok=true".to_string(),
            ));
        }
        Ok(ack)
    }
}
