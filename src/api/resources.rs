// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::api::types::ServiceStatus;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::manager;

fn or_empty(operation: &str, result: Result<String, BridgeError>) -> String {
    result.unwrap_or_else(|err| {
        log::error!("{operation}: {err}");
        String::new()
    })
}

/// Processes proxy configurations using the JSON input and the Xray core binary path.
#[uniffi::export]
pub fn process_proxies(json_input: String, xray_core_file_path: String) -> String {
    or_empty(
        "process_proxies",
        manager::current().map(|bridge| bridge.process_proxies(&json_input, &xray_core_file_path)),
    )
}

/// Fetches resources and returns them as a JSON string.
#[uniffi::export]
pub fn fetch_resources() -> String {
    or_empty(
        "fetch_resources",
        manager::current().map(|bridge| bridge.fetch_resources()),
    )
}

/// Fetches Telegram channels using input data.
#[uniffi::export]
pub fn fetch_tg_channels(data: String) -> String {
    or_empty(
        "fetch_tg_channels",
        manager::current().map(|bridge| bridge.fetch_tg_channels(&data)),
    )
}

/// Like `process_proxies`, but raises on null results, service errors and timeouts.
#[uniffi::export]
pub fn try_process_proxies(json_input: String, xray_core_file_path: String) -> Result<String, BridgeError> {
    manager::current()?
        .try_process_proxies(&json_input, &xray_core_file_path)
        .map(|payload| payload.into_string())
}

/// Like `fetch_resources`, but raises on null results and timeouts.
#[uniffi::export]
pub fn try_fetch_resources() -> Result<String, BridgeError> {
    manager::current()?
        .try_fetch_resources()
        .map(|payload| payload.into_string())
}

/// Like `fetch_tg_channels`, but raises on null results and timeouts.
#[uniffi::export]
pub fn try_fetch_tg_channels(data: String) -> Result<String, BridgeError> {
    manager::current()?
        .try_fetch_tg_channels(&data)
        .map(|payload| payload.into_string())
}

/// Loads the shared library that implements the three entry points.
#[uniffi::export]
pub fn load_service(library_path: String) -> Result<(), BridgeError> {
    manager::load(BridgeConfig::new().library_path(library_path))
}

/// Unloads the current service library.
#[uniffi::export]
pub fn unload_service() {
    manager::unload();
}

/// Sets how long a call may run before it is abandoned; `None` or 0 waits forever.
#[uniffi::export]
pub fn set_call_timeout(timeout_ms: Option<u64>) -> Result<(), BridgeError> {
    let timeout = timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis);
    manager::set_call_timeout(timeout)
}

/// Reports whether a service is loaded and how it is configured.
#[uniffi::export]
pub fn service_status() -> ServiceStatus {
    let Some(bridge) = manager::peek() else {
        return ServiceStatus::default();
    };
    let config = bridge.config();
    ServiceStatus {
        loaded: true,
        library_path: config
            .library_path
            .as_ref()
            .map(|path| path.display().to_string()),
        call_timeout_ms: config
            .call_timeout
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        serialize_calls: config.serialize_calls,
        abandoned_calls: bridge.abandoned_calls(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use crate::service::fake::{FakeService, Reply};
    use std::sync::Arc;

    fn install(fake: &Arc<FakeService>) {
        manager::install(Bridge::new(fake.clone(), BridgeConfig::default()));
    }

    #[test]
    fn host_functions_forward_to_the_service() {
        let _guard = manager::test_lock();
        let fake = Arc::new(FakeService::new(Reply::Echo));
        install(&fake);

        assert_eq!(process_proxies("{}".into(), "/xray".into()), "{}");
        assert_eq!(fetch_tg_channels("chan".into()), "chan");
        assert_eq!(fetch_resources(), "");
        assert_eq!(try_fetch_tg_channels("chan".into()).unwrap(), "chan");
        assert_eq!(fake.releases(), fake.calls());

        manager::unload();
    }

    #[test]
    fn not_loaded_is_empty_or_error() {
        let _guard = manager::test_lock();
        manager::unload();

        assert_eq!(fetch_resources(), "");
        assert_eq!(process_proxies(String::new(), String::new()), "");
        assert_eq!(try_fetch_resources(), Err(BridgeError::NotLoaded));
        assert_eq!(service_status(), ServiceStatus::default());
    }

    #[test]
    fn null_results_raise_only_in_try_functions() {
        let _guard = manager::test_lock();
        let fake = Arc::new(FakeService::new(Reply::Null));
        install(&fake);

        assert_eq!(fetch_resources(), "");
        assert!(matches!(
            try_fetch_resources(),
            Err(BridgeError::NullResult { .. })
        ));

        manager::unload();
    }

    #[test]
    fn status_reflects_timeout() {
        let _guard = manager::test_lock();
        let fake = Arc::new(FakeService::text("[]"));
        install(&fake);

        set_call_timeout(Some(1200)).unwrap();
        let status = service_status();
        assert!(status.loaded);
        assert_eq!(status.call_timeout_ms, Some(1200));
        assert_eq!(status.abandoned_calls, 0);

        set_call_timeout(Some(0)).unwrap();
        assert_eq!(service_status().call_timeout_ms, None);

        manager::unload();
    }

    #[test]
    fn loading_a_missing_library_fails() {
        let _guard = manager::test_lock();
        let err = load_service("/nonexistent/libresources.so".into()).unwrap_err();
        assert!(matches!(err, BridgeError::Load { .. }));
    }
}
