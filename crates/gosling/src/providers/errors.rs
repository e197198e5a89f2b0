use std::fmt;

use thiserror::Error;

/// Where in the connection sequence a transport failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStage {
    Resolve,
    Connect,
    Tls,
    Io,
}

impl fmt::Display for TransportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            TransportStage::Resolve => "dns resolution",
            TransportStage::Connect => "connect",
            TransportStage::Tls => "tls handshake",
            TransportStage::Io => "io",
        };
        write!(f, "{stage}")
    }
}

/// Failures of a single send-and-decode exchange with an upstream provider.
///
/// None of these are retried. Malformed individual stream frames are not errors;
/// the decoder drops them and keeps going.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("transport error during {stage}: {message}")]
    Transport {
        stage: TransportStage,
        message: String,
    },

    #[error("HTTP Error {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("JSON Parse Error: {message}\nResponse body:\n{body}")]
    TopLevelParse { message: String, body: String },

    #[error("unexpected response shape: {context}")]
    ProtocolShape { context: String },

    #[error("API Error: {message}")]
    Api { message: String },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ProviderError {
    pub fn transport<S: Into<String>>(stage: TransportStage, message: S) -> Self {
        ProviderError::Transport {
            stage,
            message: message.into(),
        }
    }

    pub fn shape<S: Into<String>>(context: S) -> Self {
        ProviderError::ProtocolShape {
            context: context.into(),
        }
    }

    /// The HTTP status code, if the upstream answered with a failure status
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
