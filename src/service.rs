// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! The external processing service, seen from the bridge.

use std::ffi::CStr;

use crate::buffer::RawBuffer;

pub const PROCESS_PROXIES: &str = "ProcessProxies";
pub const FETCH_RESOURCES: &str = "FetchResources";
pub const FETCH_TG_CHANNELS: &str = "FetchTGChannels";

/// Opaque service behind the three C entry points.
///
/// Each method blocks until the service returns and hands back ownership of
/// the result buffer, or `None` if the service returned a null pointer.
/// Implementations must tolerate being entered from several threads at once
/// unless the bridge is configured to serialize calls.
pub trait ProcessingService: Send + Sync {
    fn process_proxies(&self, json_input: &CStr, xray_core_path: &CStr) -> Option<RawBuffer>;

    fn fetch_resources(&self) -> Option<RawBuffer>;

    fn fetch_tg_channels(&self, data: &CStr) -> Option<RawBuffer>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scriptable in-process stand-in for the cgo library.

    use super::*;
    use crate::buffer::testing::counted;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[derive(Clone)]
    pub enum Reply {
        Null,
        Bytes(Vec<u8>),
        /// Echo the (first) argument back.
        Echo,
    }

    pub struct FakeService {
        pub reply: Mutex<Reply>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub releases: Arc<AtomicUsize>,
        pub seen: Mutex<Vec<Vec<u8>>>,
    }

    impl FakeService {
        pub fn new(reply: Reply) -> Self {
            Self {
                reply: Mutex::new(reply),
                delay: None,
                calls: AtomicUsize::new(0),
                releases: Arc::new(AtomicUsize::new(0)),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn text(reply: &str) -> Self {
            Self::new(Reply::Bytes(reply.as_bytes().to_vec()))
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }

        /// Poll until `n` buffers were released or `limit` passed.
        pub fn wait_for_releases(&self, n: usize, limit: Duration) -> bool {
            let deadline = Instant::now() + limit;
            while self.releases() < n {
                if Instant::now() >= deadline {
                    return false;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            true
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self, args: &[&CStr]) -> Option<RawBuffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut seen = self.seen.lock().unwrap();
                for arg in args {
                    seen.push(arg.to_bytes().to_vec());
                }
            }
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            let reply = self.reply.lock().unwrap().clone();
            match reply {
                Reply::Null => None,
                Reply::Bytes(bytes) => counted(&bytes, &self.releases),
                Reply::Echo => {
                    let first = args.first().map(|a| a.to_bytes()).unwrap_or_default();
                    counted(first, &self.releases)
                }
            }
        }
    }

    impl ProcessingService for FakeService {
        fn process_proxies(&self, json_input: &CStr, xray_core_path: &CStr) -> Option<RawBuffer> {
            self.respond(&[json_input, xray_core_path])
        }

        fn fetch_resources(&self) -> Option<RawBuffer> {
            self.respond(&[])
        }

        fn fetch_tg_channels(&self, data: &CStr) -> Option<RawBuffer> {
            self.respond(&[data])
        }
    }
}
