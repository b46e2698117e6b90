// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Runtime-loaded cgo library exporting the three entry points.
//!
//! The library is built from Go with `-buildmode=c-shared`; every entry point
//! returns a `C.CString`, which is `malloc`ed and must be freed by us.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::buffer::RawBuffer;
use crate::error::{BridgeError, BridgeResult};
use crate::service::{ProcessingService, FETCH_RESOURCES, FETCH_TG_CHANNELS, PROCESS_PROXIES};

type ProcessProxiesFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;
type FetchResourcesFn = unsafe extern "C" fn() -> *mut c_char;
type FetchTgChannelsFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;

/// Processing service backed by a dynamically loaded shared library.
pub struct NativeLibrary {
    path: PathBuf,
    process_proxies: ProcessProxiesFn,
    fetch_resources: FetchResourcesFn,
    fetch_tg_channels: FetchTgChannelsFn,
    // Keeps the function pointers above valid. Dropped last.
    _library: Library,
}

impl NativeLibrary {
    /// Load the library and resolve all three symbols up front.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("loading processing service from {}", path.display());

        // SAFETY: running the library's initialisers is inherent to loading
        // it; the path is chosen by the embedding application.
        let library = unsafe { Library::new(&path) }.map_err(|err| BridgeError::Load {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        // SAFETY: the signatures match the cgo exports.
        let (process_proxies, fetch_resources, fetch_tg_channels) = unsafe {
            (
                symbol::<ProcessProxiesFn>(&library, PROCESS_PROXIES)?,
                symbol::<FetchResourcesFn>(&library, FETCH_RESOURCES)?,
                symbol::<FetchTgChannelsFn>(&library, FETCH_TG_CHANNELS)?,
            )
        };

        log::info!("processing service loaded from {}", path.display());
        Ok(Self {
            path,
            process_proxies,
            fetch_resources,
            fetch_tg_channels,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> BridgeResult<T> {
    let mut cname = Vec::with_capacity(name.len() + 1);
    cname.extend_from_slice(name.as_bytes());
    cname.push(0);
    library
        .get::<T>(&cname)
        .map(|sym| *sym)
        .map_err(|_| BridgeError::MissingSymbol {
            symbol: name.to_string(),
        })
}

impl ProcessingService for NativeLibrary {
    fn process_proxies(&self, json_input: &CStr, xray_core_path: &CStr) -> Option<RawBuffer> {
        // SAFETY: both arguments outlive the call; the result is a C.CString.
        unsafe {
            RawBuffer::from_malloc((self.process_proxies)(
                json_input.as_ptr(),
                xray_core_path.as_ptr(),
            ))
        }
    }

    fn fetch_resources(&self) -> Option<RawBuffer> {
        unsafe { RawBuffer::from_malloc((self.fetch_resources)()) }
    }

    fn fetch_tg_channels(&self, data: &CStr) -> Option<RawBuffer> {
        unsafe { RawBuffer::from_malloc((self.fetch_tg_channels)(data.as_ptr())) }
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_a_load_error() {
        let err = NativeLibrary::load("/nonexistent/libppp-service.so").unwrap_err();
        match err {
            BridgeError::Load { path, .. } => assert!(path.ends_with("libppp-service.so")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_library_file_is_a_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not an ELF object").unwrap();

        let err = NativeLibrary::load(file.path()).unwrap_err();
        assert!(matches!(err, BridgeError::Load { .. }));
    }
}
