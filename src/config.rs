// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

/// Bridge settings, supplied by the embedding application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Shared library exporting the service entry points.
    pub library_path: Option<PathBuf>,
    /// Longest a caller waits on one external call. `None` waits forever.
    pub call_timeout: Option<Duration>,
    /// Funnel calls through one lock for services that are not reentrant.
    pub serialize_calls: bool,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn serialize_calls(mut self, serialize: bool) -> Self {
        self.serialize_calls = serialize;
        self
    }

    /// Check that the configured library path names a regular file.
    pub fn check_library(&self) -> anyhow::Result<&Path> {
        let path = self
            .library_path
            .as_deref()
            .context("no service library configured")?;
        let meta = std::fs::metadata(path)
            .with_context(|| format!("cannot stat {}", path.display()))?;
        anyhow::ensure!(meta.is_file(), "{} is not a regular file", path.display());
        Ok(path)
    }
}
