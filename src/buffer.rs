// SPDX-FileCopyrightText: 2025 0xChat
//
// SPDX-License-Identifier: MIT

//! Ownership guard for result buffers handed over by the external service.
//!
//! A `RawBuffer` is the only owner of a NUL-terminated allocation that came
//! back across the boundary. It copies the bytes out at most once and
//! releases the allocation exactly once when dropped, whatever path the
//! caller takes out of the call.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::ptr::NonNull;

/// Releases an allocation previously returned by the service.
pub type ReleaseFn = Box<dyn FnOnce(NonNull<c_char>) + Send>;

/// Owned, non-null, NUL-terminated buffer from the external service.
pub struct RawBuffer {
    ptr: NonNull<c_char>,
    release: Option<ReleaseFn>,
}

// SAFETY: the buffer is exclusively owned once handed over; no other side
// keeps a reference to it after returning.
unsafe impl Send for RawBuffer {}

impl RawBuffer {
    /// Take ownership of a `malloc`-allocated buffer (cgo `C.CString`).
    ///
    /// Returns `None` for a null pointer, which is never dereferenced.
    ///
    /// # Safety
    /// `ptr` must be null or point to a NUL-terminated allocation made with
    /// the C allocator that nobody else will free.
    pub unsafe fn from_malloc(ptr: *mut c_char) -> Option<Self> {
        Self::with_release(
            ptr,
            Box::new(|p: NonNull<c_char>| {
                // SAFETY: allocated by malloc and owned by us.
                unsafe { libc::free(p.as_ptr().cast()) }
            }),
        )
    }

    /// Take ownership of a buffer released by a caller supplied function.
    ///
    /// # Safety
    /// Same as [`RawBuffer::from_malloc`], with `release` being the matching
    /// deallocator.
    pub unsafe fn with_release(ptr: *mut c_char, release: ReleaseFn) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            release: Some(release),
        })
    }

    /// Bytes up to (not including) the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: non-null and NUL-terminated per construction; borrowed for
        // no longer than `self`, which outlives the release.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }.to_bytes()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Copy the contents out and release the allocation.
    pub fn into_bytes(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.ptr);
        }
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Allocation helpers that behave like the cgo side.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Copy `bytes` into a fresh malloc'd, NUL-terminated buffer.
    pub fn malloc_cstr(bytes: &[u8]) -> *mut c_char {
        unsafe {
            let ptr = libc::malloc(bytes.len() + 1) as *mut u8;
            assert!(!ptr.is_null());
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            *ptr.add(bytes.len()) = 0;
            ptr as *mut c_char
        }
    }

    /// Buffer freed with libc that bumps `releases` when it is.
    pub fn counted(bytes: &[u8], releases: &Arc<AtomicUsize>) -> Option<RawBuffer> {
        let releases = Arc::clone(releases);
        unsafe {
            RawBuffer::with_release(
                malloc_cstr(bytes),
                Box::new(move |p| {
                    releases.fetch_add(1, Ordering::SeqCst);
                    libc::free(p.as_ptr().cast());
                }),
            )
        }
    }
}
