// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

/// Snapshot of the process-wide bridge, as seen by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct ServiceStatus {
    pub loaded: bool,
    pub library_path: Option<String>,
    pub call_timeout_ms: Option<u64>,
    pub serialize_calls: bool,
    /// Calls given up on after a timeout
    pub abandoned_calls: u64,
}
