// Error types for the Comarch SOAP client
use std::fmt;
use thiserror::Error;

// Message reported to end users when the loyalty service can't be reached
pub const UNAVAILABLE_MESSAGE: &str = "Bonus program is unavailable";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP status {status_code}: {body}")]
    HttpStatus { status_code: u16, body: String },

    #[error("XML parse error: {0}")]
    XmlParseError(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("SOAP fault: {0}")]
    Fault(Fault),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// Coarse classification so callers can tell a broken link from a rejected request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Connection failure, timeout or non-2xx status
    Transport,
    // Body is not well-formed XML or lacks the expected structure
    Parse,
    // The service answered and rejected the request
    Fault,
    // Failed locally before anything was sent
    Request,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NetworkError(_) | ApiError::Timeout(_) | ApiError::HttpStatus { .. } => {
                ErrorKind::Transport
            }
            ApiError::XmlParseError(_) | ApiError::MissingRequiredField(_) => ErrorKind::Parse,
            ApiError::Fault(_) => ErrorKind::Fault,
            ApiError::EncodingError(_) | ApiError::ConfigError(_) => ErrorKind::Request,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    pub fn is_parse(&self) -> bool {
        self.kind() == ErrorKind::Parse
    }

    pub fn is_fault(&self) -> bool {
        self.kind() == ErrorKind::Fault
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ApiError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    // HTTP status a service embedding this client should answer with.
    // Transport and parse failures both mean the loyalty backend is unusable.
    pub fn http_code(&self) -> Option<u16> {
        match self.kind() {
            ErrorKind::Transport | ErrorKind::Parse => Some(503),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<u32> {
        match self.kind() {
            ErrorKind::Transport | ErrorKind::Parse => Some(50301),
            _ => None,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            ApiError::Fault(fault) => fault.message.clone(),
            _ if self.http_code().is_some() => UNAVAILABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::ConfigError(err.to_string())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

// SOAP Fault reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
}

impl Fault {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " {{{}}}", detail)?;
        }
        Ok(())
    }
}
