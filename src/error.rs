//! Unified error types for the SimpleIOT client.
//!
//! Every subsystem has a small `Copy` error enum; all of them convert into
//! the top-level [`Error`] so the session and the binary can propagate with
//! `?`.  Propagation policy:
//!
//! - protocol / decode errors are recovered locally (log + drop),
//! - update errors abort the current attempt but leave the device runnable,
//! - configuration errors are fatal at start-up.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the client funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Publish / subscribe / connect failure in the transport adapter.
    Transport(TransportError),
    /// An inbound payload could not be parsed.
    Decode(DecodeError),
    /// Identity or tunables are invalid.
    Config(ConfigError),
    /// An outbound topic or envelope could not be built.
    Protocol(ProtocolError),
    /// The OTA update attempt failed.
    Update(UpdateError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Update(e) => write!(f, "update: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has no live connection to the broker / gateway.
    NotConnected,
    PublishFailed,
    SubscribeFailed,
    /// The underlying byte link failed.
    Io,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::Io => write!(f, "link I/O error"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not a structurally valid envelope (JSON object).
    Malformed,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed envelope"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An identity field is empty. Carries the field name.
    InvalidIdentity(&'static str),
    /// A tunable failed range validation.
    ValidationFailed(&'static str),
    /// A persisted config blob could not be decoded.
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentity(field) => write!(f, "identity field `{field}` is empty"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "config blob corrupted"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol (outbound build) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The composed topic does not fit the topic buffer.
    TopicTooLong,
    /// The serialized envelope exceeds the maximum payload size.
    PayloadTooLarge,
    /// The envelope could not be serialized.
    Serialize,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopicTooLong => write!(f, "topic exceeds buffer size"),
            Self::PayloadTooLarge => write!(f, "payload exceeds maximum size"),
            Self::Serialize => write!(f, "envelope serialization failed"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Update errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// A fetch was requested while a download or flash is in flight.
    AlreadyInProgress,
    /// The stream closed before the declared length arrived.
    LengthMismatch,
    /// The flash-write primitive rejected a chunk.
    WriteFailed,
    /// Declared image size is zero or above the firmware limit.
    InvalidSize,
    /// A chunk would push the image past its declared length.
    Overflow,
    /// The fetch source could not be opened.
    FetchFailed,
    /// The flash commit (finalize / verify) failed.
    VerifyFailed,
    /// Operation requires an active download.
    NotDownloading,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "update already in progress"),
            Self::LengthMismatch => write!(f, "stream closed before declared length"),
            Self::WriteFailed => write!(f, "flash write failed"),
            Self::InvalidSize => write!(f, "firmware size out of range (max 4 MB)"),
            Self::Overflow => write!(f, "chunk would exceed declared firmware size"),
            Self::FetchFailed => write!(f, "cannot download firmware file"),
            Self::VerifyFailed => write!(f, "flash commit failed"),
            Self::NotDownloading => write!(f, "operation requires an active download"),
        }
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
