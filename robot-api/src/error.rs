//! Error taxonomy of the runtime.
//!
//! `Errno` is the closed, code-compatible status set returned by engines and
//! transports. `Error` is what the runtime surfaces to callers: one variant per
//! failing operation, each carrying the underlying `Errno`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed status codes. Values match the codes used on the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Errno {
    Ok,
    Failed,
    NotFound,
    InvalidArg,
    TooLong,
    DuplicateValue,
    NotConnected,
    CheckFailed,
    WrongFormat,
    AlreadyExists,
    AlreadyConnected,
    NoMoreResources,
    NotImplemented,
    AlreadyDone,
    WrongState,
    Busy,
    UnableToRoute,
}

impl Errno {
    const ALL: [Errno; 17] = [
        Errno::Ok,
        Errno::Failed,
        Errno::NotFound,
        Errno::InvalidArg,
        Errno::TooLong,
        Errno::DuplicateValue,
        Errno::NotConnected,
        Errno::CheckFailed,
        Errno::WrongFormat,
        Errno::AlreadyExists,
        Errno::AlreadyConnected,
        Errno::NoMoreResources,
        Errno::NotImplemented,
        Errno::AlreadyDone,
        Errno::WrongState,
        Errno::Busy,
        Errno::UnableToRoute,
    ];

    /// Returns the numeric code (`0` for ok, negative otherwise).
    pub fn code(self) -> i32 {
        -(self as i32)
    }

    /// Maps a numeric code back to an `Errno`.
    ///
    /// Unknown codes collapse to `Failed`.
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|errno| errno.code() == code)
            .unwrap_or(Errno::Failed)
    }

    pub fn is_ok(self) -> bool {
        self == Errno::Ok
    }

    pub fn name(self) -> &'static str {
        match self {
            Errno::Ok => "ok",
            Errno::Failed => "failed",
            Errno::NotFound => "not_found",
            Errno::InvalidArg => "invalid_arg",
            Errno::TooLong => "too_long",
            Errno::DuplicateValue => "duplicate_val",
            Errno::NotConnected => "not_connected",
            Errno::CheckFailed => "check_failed",
            Errno::WrongFormat => "wrong_format",
            Errno::AlreadyExists => "already_exists",
            Errno::AlreadyConnected => "already_connected",
            Errno::NoMoreResources => "no_more_resources",
            Errno::NotImplemented => "not_impl",
            Errno::AlreadyDone => "already_done",
            Errno::WrongState => "wrong_state",
            Errno::Busy => "busy",
            Errno::UnableToRoute => "unable_to_route",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Errors surfaced by the runtime.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("node '{0}' is already running")]
    AlreadyRunning(String),

    #[error("unable to create {what}: {errno}")]
    CreationFailed { what: String, errno: Errno },

    #[error("unable to send order '{name}': {errno}")]
    SendFailed { name: String, errno: Errno },

    #[error("unable to cancel order '{name}': {errno}")]
    CancelFailed { name: String, errno: Errno },

    #[error("unable to replace order '{name}': {errno}")]
    ReplaceFailed { name: String, errno: Errno },

    #[error("unable to destroy order '{name}': {errno}")]
    DestroyFailed { name: String, errno: Errno },

    #[error("unable to subscribe '{target}': {errno}")]
    SubscribeFailed { target: String, errno: Errno },

    #[error("unable to connect market data: {0}")]
    ConnectFailed(Errno),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("{what} is in wrong state '{state}'")]
    WrongState { what: String, state: String },

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("registry error: {0}")]
    Registry(Errno),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the status code this error corresponds to.
    pub fn errno(&self) -> Errno {
        match self {
            Error::NotFound(_) => Errno::NotFound,
            Error::AlreadyExists(_) | Error::AlreadyRunning(_) => Errno::AlreadyExists,
            Error::CreationFailed { errno, .. }
            | Error::SendFailed { errno, .. }
            | Error::CancelFailed { errno, .. }
            | Error::ReplaceFailed { errno, .. }
            | Error::DestroyFailed { errno, .. }
            | Error::SubscribeFailed { errno, .. } => *errno,
            Error::ConnectFailed(errno) | Error::Registry(errno) => *errno,
            Error::ResourceUnavailable(_) => Errno::NoMoreResources,
            Error::WrongState { .. } => Errno::WrongState,
            Error::InvalidArg(_) => Errno::InvalidArg,
            Error::Config(_) => Errno::WrongFormat,
            Error::Io(_) => Errno::Failed,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
