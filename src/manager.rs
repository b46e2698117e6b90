// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Process-wide bridge used by the host bindings.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use once_cell::sync::{Lazy, OnceCell};
use tokio::runtime::Runtime;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};

// Bridge shared by every host call
static CURRENT: Lazy<Mutex<Option<Arc<Bridge>>>> = Lazy::new(|| Mutex::new(None));

// Blocking pool for timed calls
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

pub(crate) fn runtime() -> BridgeResult<&'static Runtime> {
    RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("ppp-bridge")
            .enable_all()
            .build()
            .map_err(|err| BridgeError::Join(format!("failed to start runtime: {err}")))
    })
}

fn slot() -> MutexGuard<'static, Option<Arc<Bridge>>> {
    CURRENT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the current bridge.
pub fn install(bridge: Bridge) {
    log::debug!("installing bridge: {:?}", bridge.config());
    *slot() = Some(Arc::new(bridge));
}

/// Load the service library named by `config` and make it current.
pub fn load(config: BridgeConfig) -> BridgeResult<()> {
    install(Bridge::load(config)?);
    Ok(())
}

/// Drop the current bridge. Calls already running keep their own handle.
pub fn unload() {
    if slot().take().is_some() {
        log::info!("processing service unloaded");
    }
}

/// The current bridge; `NotLoaded` until a service was loaded or installed.
pub fn current() -> BridgeResult<Arc<Bridge>> {
    slot().clone().ok_or(BridgeError::NotLoaded)
}

/// Change the call timeout of the current bridge.
pub fn set_call_timeout(timeout: Option<Duration>) -> BridgeResult<()> {
    let mut slot = slot();
    let bridge = slot.as_ref().ok_or(BridgeError::NotLoaded)?;
    let config = bridge.config().clone().call_timeout(timeout);
    let next = Arc::new(bridge.reconfigure(config));
    *slot = Some(next);
    Ok(())
}

/// The current bridge, if any.
pub fn peek() -> Option<Arc<Bridge>> {
    slot().clone()
}

#[cfg(test)]
pub(crate) fn test_lock() -> MutexGuard<'static, ()> {
    // Tests touching the global bridge run one at a time.
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
