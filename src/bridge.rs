// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Boundary adapter between host strings and the processing service.
//!
//! Every operation has the same shape: marshal the arguments into C strings
//! owned by the call, invoke the entry point, copy the returned buffer and
//! let the [`RawBuffer`] guard release it. Three flavours are offered:
//!
//! - legacy (`process_proxies`, ...): plain strings, `""` on any failure;
//! - structured (`try_*`, `*_async`): [`Payload`] or a [`BridgeError`];
//! - typed (`check_proxies`, ...): decoded [`crate::models`] values.

use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::buffer::RawBuffer;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::library::NativeLibrary;
use crate::manager;
use crate::marshal::{lossy_string, to_c_arg, NulPolicy, Payload};
use crate::models::{ChannelQuery, ProxyCheckReport, ProxyCheckRequest, Resource};
use crate::service::{ProcessingService, FETCH_RESOURCES, FETCH_TG_CHANNELS, PROCESS_PROXIES};

/// One marshalled call, owning its arguments until the callee returns.
enum Call {
    ProcessProxies {
        json_input: CString,
        xray_core_path: CString,
    },
    FetchResources,
    FetchTgChannels {
        data: CString,
    },
}

impl Call {
    fn process_proxies(json_input: &str, xray_core_path: &str, nul: NulPolicy) -> BridgeResult<Self> {
        Ok(Self::ProcessProxies {
            json_input: to_c_arg("json_input", json_input, nul)?,
            xray_core_path: to_c_arg("xray_core_file_path", xray_core_path, nul)?,
        })
    }

    fn fetch_tg_channels(data: &str, nul: NulPolicy) -> BridgeResult<Self> {
        Ok(Self::FetchTgChannels {
            data: to_c_arg("data", data, nul)?,
        })
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::ProcessProxies { .. } => PROCESS_PROXIES,
            Self::FetchResources => FETCH_RESOURCES,
            Self::FetchTgChannels { .. } => FETCH_TG_CHANNELS,
        }
    }

    fn invoke(&self, service: &dyn ProcessingService) -> Option<RawBuffer> {
        match self {
            Self::ProcessProxies {
                json_input,
                xray_core_path,
            } => service.process_proxies(json_input, xray_core_path),
            Self::FetchResources => service.fetch_resources(),
            Self::FetchTgChannels { data } => service.fetch_tg_channels(data),
        }
    }
}

/// Structured reading of a returned buffer.
fn structured(operation: &'static str, buf: Option<RawBuffer>) -> BridgeResult<Payload> {
    match buf {
        Some(buf) => Payload::from_buffer(operation, buf),
        None => Err(BridgeError::NullResult { operation }),
    }
}

fn legacy(operation: &'static str, buf: Option<RawBuffer>) -> String {
    if buf.is_none() {
        log::warn!("{operation} returned a null buffer");
    }
    lossy_string(buf)
}

/// Adapter over one processing service.
pub struct Bridge {
    service: Arc<dyn ProcessingService>,
    config: BridgeConfig,
    gate: Option<Arc<Mutex<()>>>,
    abandoned: Arc<AtomicU64>,
}

impl Bridge {
    pub fn new(service: Arc<dyn ProcessingService>, config: BridgeConfig) -> Self {
        let gate = config.serialize_calls.then(|| Arc::new(Mutex::new(())));
        Self {
            service,
            config,
            gate,
            abandoned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Load the service library named by `config.library_path`.
    pub fn load(config: BridgeConfig) -> BridgeResult<Self> {
        if config.library_path.is_none() {
            return Err(BridgeError::NotLoaded);
        }
        let path = config.check_library().map_err(|err| BridgeError::Load {
            path: config
                .library_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            reason: format!("{err:#}"),
        })?;
        let library = NativeLibrary::load(path)?;
        Ok(Self::new(Arc::new(library), config))
    }

    /// Same service, different settings. Counters carry over.
    pub fn reconfigure(&self, config: BridgeConfig) -> Self {
        let gate = match (&self.gate, config.serialize_calls) {
            (Some(gate), true) => Some(Arc::clone(gate)),
            (None, true) => Some(Arc::new(Mutex::new(()))),
            (_, false) => None,
        };
        Self {
            service: Arc::clone(&self.service),
            config,
            gate,
            abandoned: Arc::clone(&self.abandoned),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Calls given up on after a timeout. Their buffers are still released
    /// when the service eventually returns.
    pub fn abandoned_calls(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    // Legacy interface

    /// Run `ProcessProxies`; `""` if the service returned nothing usable.
    pub fn process_proxies(&self, json_input: &str, xray_core_file_path: &str) -> String {
        Call::process_proxies(json_input, xray_core_file_path, NulPolicy::Truncate)
            .and_then(|call| self.dispatch(call, legacy))
            .unwrap_or_else(|err| {
                log::error!("process_proxies failed: {err}");
                String::new()
            })
    }

    pub fn fetch_resources(&self) -> String {
        self.dispatch(Call::FetchResources, legacy)
            .unwrap_or_else(|err| {
                log::error!("fetch_resources failed: {err}");
                String::new()
            })
    }

    pub fn fetch_tg_channels(&self, data: &str) -> String {
        Call::fetch_tg_channels(data, NulPolicy::Truncate)
            .and_then(|call| self.dispatch(call, legacy))
            .unwrap_or_else(|err| {
                log::error!("fetch_tg_channels failed: {err}");
                String::new()
            })
    }

    // Structured interface

    pub fn try_process_proxies(&self, json_input: &str, xray_core_file_path: &str) -> BridgeResult<Payload> {
        let call = Call::process_proxies(json_input, xray_core_file_path, NulPolicy::Reject)?;
        self.dispatch(call, structured)??.check_service_error()
    }

    pub fn try_fetch_resources(&self) -> BridgeResult<Payload> {
        self.dispatch(Call::FetchResources, structured)?
    }

    pub fn try_fetch_tg_channels(&self, data: &str) -> BridgeResult<Payload> {
        let call = Call::fetch_tg_channels(data, NulPolicy::Reject)?;
        self.dispatch(call, structured)?
    }

    // Async interface, cancellable by dropping the future

    pub async fn process_proxies_async(
        &self,
        json_input: &str,
        xray_core_file_path: &str,
    ) -> BridgeResult<Payload> {
        let call = Call::process_proxies(json_input, xray_core_file_path, NulPolicy::Reject)?;
        self.dispatch_async(call, structured).await??.check_service_error()
    }

    pub async fn fetch_resources_async(&self) -> BridgeResult<Payload> {
        self.dispatch_async(Call::FetchResources, structured).await?
    }

    pub async fn fetch_tg_channels_async(&self, data: &str) -> BridgeResult<Payload> {
        let call = Call::fetch_tg_channels(data, NulPolicy::Reject)?;
        self.dispatch_async(call, structured).await?
    }

    // Typed interface

    /// Check proxies through the proxy core at `xray_core_file_path`.
    pub fn check_proxies(
        &self,
        request: &ProxyCheckRequest,
        xray_core_file_path: &str,
    ) -> BridgeResult<ProxyCheckReport> {
        let input = serde_json::to_string(request)?;
        let payload = self.try_process_proxies(&input, xray_core_file_path)?;
        decode(PROCESS_PROXIES, payload)
    }

    pub fn fetch_resource_list(&self) -> BridgeResult<Vec<Resource>> {
        decode_list(FETCH_RESOURCES, self.try_fetch_resources()?)
    }

    pub fn fetch_channel_resources(&self, query: &ChannelQuery) -> BridgeResult<Vec<Resource>> {
        let data = serde_json::to_string(query)?;
        decode_list(FETCH_TG_CHANNELS, self.try_fetch_tg_channels(&data)?)
    }

    fn job<R, F>(&self, call: Call, finish: F) -> impl FnOnce() -> R + Send + 'static
    where
        R: Send + 'static,
        F: FnOnce(&'static str, Option<RawBuffer>) -> R + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let gate = self.gate.clone();
        move || {
            let _serialized = gate
                .as_ref()
                .map(|gate| gate.lock().unwrap_or_else(PoisonError::into_inner));
            let operation = call.operation();
            log::debug!("calling {operation}");
            let buf = call.invoke(service.as_ref());
            log::debug!(
                "{operation} returned {}",
                buf.as_ref()
                    .map_or_else(|| "null".to_string(), |b| format!("{} bytes", b.len()))
            );
            finish(operation, buf)
        }
    }

    fn dispatch<R, F>(&self, call: Call, finish: F) -> BridgeResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&'static str, Option<RawBuffer>) -> R + Send + 'static,
    {
        let operation = call.operation();
        let job = self.job(call, finish);
        let Some(limit) = self.config.call_timeout else {
            return Ok(job());
        };

        let (tx, rx) = mpsc::sync_channel(1);
        manager::runtime()?.spawn_blocking(move || {
            // Receiver may be gone after a timeout.
            let _ = tx.send(job());
        });
        match rx.recv_timeout(limit) {
            Ok(out) => Ok(out),
            Err(RecvTimeoutError::Timeout) => Err(self.abandon(operation, limit)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(BridgeError::Join(format!("{operation} panicked")))
            }
        }
    }

    async fn dispatch_async<R, F>(&self, call: Call, finish: F) -> BridgeResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&'static str, Option<RawBuffer>) -> R + Send + 'static,
    {
        let operation = call.operation();
        // Work and timer live on the bridge runtime so any executor can poll
        // these futures.
        let runtime = manager::runtime()?;
        let task = runtime.spawn_blocking(self.job(call, finish));
        let joined = match self.config.call_timeout {
            None => task.await,
            Some(limit) => match runtime.spawn(tokio::time::timeout(limit, task)).await {
                Ok(Ok(joined)) => joined,
                Ok(Err(_)) => return Err(self.abandon(operation, limit)),
                Err(err) => return Err(BridgeError::Join(err.to_string())),
            },
        };
        joined.map_err(|err| BridgeError::Join(err.to_string()))
    }

    fn abandon(&self, operation: &'static str, limit: Duration) -> BridgeError {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "{operation} still running after {:?}; result will be released when it returns",
            limit
        );
        BridgeError::Timeout {
            operation,
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

fn decode<T: DeserializeOwned>(operation: &'static str, payload: Payload) -> BridgeResult<T> {
    match payload {
        Payload::Empty => Err(BridgeError::Decode(format!("{operation} returned an empty buffer"))),
        Payload::Text(text) => Ok(serde_json::from_str(&text)?),
    }
}

/// Fetch entry points answer `{}` instead of a list when they fail, and
/// `null` when they found nothing.
fn decode_list(operation: &'static str, payload: Payload) -> BridgeResult<Vec<Resource>> {
    if payload.as_str().trim() == "{}" {
        return Err(BridgeError::Service(format!("{operation} returned an empty object")));
    }
    decode::<Option<Vec<Resource>>>(operation, payload).map(Option::unwrap_or_default)
}
