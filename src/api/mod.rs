// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Public API module for host bindings
//!
//! Everything here is exported through UniFFI; Python, Kotlin and Swift
//! bindings are generated from the built library with `uniffi-bindgen`.
//!
//! ## Organization
//! - `types`: records handed to the host (ServiceStatus)
//! - `resources`: the bridged operations and service lifecycle

pub mod resources;
pub mod types;

pub use resources::{
    fetch_resources,
    fetch_tg_channels,
    load_service,
    process_proxies,
    service_status,
    set_call_timeout,
    try_fetch_resources,
    try_fetch_tg_channels,
    try_process_proxies,
    unload_service,
};
pub use types::ServiceStatus;
