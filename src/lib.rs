// SPDX-FileCopyrightText: 2023 Foundation Devices Inc.
// SPDX-FileCopyrightText: 2024 Foundation Devices Inc.
// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Bridge between host scripting runtimes and the proxy processing service.
//!
//! The service is a cgo library exporting `ProcessProxies`, `FetchResources`
//! and `FetchTGChannels`. Each returns a `malloc`ed C string that the caller
//! owns; this crate copies it once and frees it once.

uniffi::setup_scaffolding!("resources");

// Public API module (exposed to hosts via UniFFI)
pub mod api;

// Boundary adapter
pub mod bridge;
pub mod buffer;
pub mod config;
pub mod error;
pub mod library;
pub mod manager;
pub mod marshal;
pub mod models;
pub mod service;

pub use bridge::Bridge;
pub use buffer::RawBuffer;
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use library::NativeLibrary;
pub use marshal::Payload;
pub use models::{ChannelQuery, ProxyCheckReport, ProxyCheckRequest, Resource};
pub use service::ProcessingService;
