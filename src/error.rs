// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Errors surfaced by the bridge.
//!
//! The external service has no error channel of its own: it can only hand
//! back a null pointer, an empty buffer, or text. Everything below is the
//! bridge's reading of those outcomes plus its own marshalling failures.

/// Failure of a bridged call, as seen by Rust callers and host bindings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum BridgeError {
    #[error("no processing service is loaded")]
    NotLoaded,

    #[error("failed to load service library {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("service library does not export {symbol}")]
    MissingSymbol { symbol: String },

    #[error("argument `{argument}` contains an interior NUL byte")]
    InteriorNul { argument: &'static str },

    #[error("{operation} returned a null buffer")]
    NullResult { operation: &'static str },

    #[error("{operation} returned bytes that are not valid UTF-8")]
    InvalidUtf8 { operation: &'static str },

    /// The service reported a failure in-band.
    #[error("service error: {0}")]
    Service(String),

    #[error("{operation} did not complete within {after_ms} ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("blocking call failed: {0}")]
    Join(String),

    #[error("malformed payload: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
