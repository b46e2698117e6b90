// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Argument and result conversion at the boundary.

use std::ffi::CString;

use crate::buffer::RawBuffer;
use crate::error::{BridgeError, BridgeResult};

/// Prefix `ProcessProxies` puts in front of in-band failures.
pub const SERVICE_ERROR_PREFIX: &str = "Error: ";

/// How interior NUL bytes in arguments are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NulPolicy {
    /// Reject the argument.
    Reject,
    /// Cut the argument at the first NUL, as a C `c_str()` hand-off would.
    Truncate,
}

/// Convert a host string into a C string that stays valid for the call.
pub fn to_c_arg(argument: &'static str, value: &str, policy: NulPolicy) -> BridgeResult<CString> {
    match CString::new(value) {
        Ok(arg) => Ok(arg),
        Err(err) => match policy {
            NulPolicy::Reject => Err(BridgeError::InteriorNul { argument }),
            NulPolicy::Truncate => {
                let pos = err.nul_position();
                log::warn!(
                    "argument `{}` truncated at NUL byte {} of {}",
                    argument,
                    pos,
                    value.len()
                );
                let mut bytes = err.into_vec();
                bytes.truncate(pos);
                // No NUL left after the cut.
                CString::new(bytes).map_err(|_| BridgeError::InteriorNul { argument })
            }
        },
    }
}

/// Result of a call that returned a non-null buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// The service returned a zero-length buffer.
    Empty,
}

impl Payload {
    /// Copy a service buffer into a payload, releasing the buffer.
    pub fn from_buffer(operation: &'static str, buf: RawBuffer) -> BridgeResult<Self> {
        let bytes = buf.into_bytes();
        if bytes.is_empty() {
            return Ok(Self::Empty);
        }
        String::from_utf8(bytes)
            .map(Self::Text)
            .map_err(|_| BridgeError::InvalidUtf8 { operation })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Empty => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Empty => String::new(),
        }
    }

    /// Turn the `"Error: ..."` convention into a structured failure.
    pub fn check_service_error(self) -> BridgeResult<Self> {
        if let Self::Text(text) = &self {
            if let Some(message) = text.strip_prefix(SERVICE_ERROR_PREFIX) {
                return Err(BridgeError::Service(message.to_string()));
            }
        }
        Ok(self)
    }
}

/// Lossy copy used by the legacy string interface. Null becomes `""`.
pub fn lossy_string(buf: Option<RawBuffer>) -> String {
    match buf {
        Some(buf) => String::from_utf8_lossy(buf.as_bytes()).into_owned(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::testing::counted;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn clean_arguments_pass_through() {
        let arg = to_c_arg("data", r#"{"chan":{"limit":5}}"#, NulPolicy::Reject).unwrap();
        assert_eq!(arg.as_bytes(), br#"{"chan":{"limit":5}}"#);
    }

    #[test]
    fn interior_nul_is_rejected_or_truncated() {
        let err = to_c_arg("json_input", "ab\0cd", NulPolicy::Reject).unwrap_err();
        assert_eq!(err, BridgeError::InteriorNul { argument: "json_input" });

        let arg = to_c_arg("json_input", "ab\0cd", NulPolicy::Truncate).unwrap();
        assert_eq!(arg.as_bytes(), b"ab");
    }

    #[test]
    fn empty_argument_is_valid() {
        let arg = to_c_arg("xray_core_file_path", "", NulPolicy::Reject).unwrap();
        assert!(arg.as_bytes().is_empty());
    }

    #[test]
    fn empty_and_text_payloads_are_distinct() {
        let releases = Arc::new(AtomicUsize::new(0));

        let empty = Payload::from_buffer("FetchResources", counted(b"", &releases).unwrap()).unwrap();
        assert_eq!(empty, Payload::Empty);

        let text = Payload::from_buffer("FetchResources", counted(b"[]", &releases).unwrap()).unwrap();
        assert_eq!(text.as_str(), "[]");
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalid_utf8_is_reported_and_released() {
        let releases = Arc::new(AtomicUsize::new(0));
        let buf = counted(&[0x7b, 0xff, 0x7d], &releases).unwrap();
        let err = Payload::from_buffer("FetchTGChannels", buf).unwrap_err();
        assert_eq!(err, BridgeError::InvalidUtf8 { operation: "FetchTGChannels" });
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn in_band_errors_are_lifted() {
        let payload = Payload::Text("Error: Failed to parse json: EOF".into());
        assert_eq!(
            payload.check_service_error().unwrap_err(),
            BridgeError::Service("Failed to parse json: EOF".into())
        );

        let payload = Payload::Text(r#"{"outputs":null}"#.into());
        assert!(payload.check_service_error().is_ok());
    }

    #[test]
    fn lossy_string_handles_null_and_garbage() {
        assert_eq!(lossy_string(None), "");

        let releases = Arc::new(AtomicUsize::new(0));
        let s = lossy_string(counted(&[b'o', b'k', 0xff], &releases));
        assert_eq!(s, "ok\u{fffd}");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
