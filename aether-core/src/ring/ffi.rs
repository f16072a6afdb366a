//! C ABI over the ring producer.
//!
//! Exported with C linkage so consumer programs in other languages can
//! attach to the ring file. The handle returned by [`ring_create`] /
//! [`ring_open`] is opaque; every function is null-safe and boolean
//! results are `c_int` 0/1.

use super::Ring;
use std::ffi::{c_char, c_int, c_uint, CStr};
use std::ptr;
use std::slice;

/// Creates a ring file and returns an opaque handle, or null on failure.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated string. The returned handle must
/// be released with [`ring_close`].
#[no_mangle]
pub unsafe extern "C" fn ring_create(path: *const c_char, buf_size: usize) -> *mut Ring {
    let Some(path) = cstr_to_str(path) else {
        return ptr::null_mut();
    };
    match Ring::create(path, buf_size as u64) {
        Ok(ring) => Box::into_raw(Box::new(ring)),
        Err(err) => {
            tracing::error!(%err, path, "ring_create failed");
            ptr::null_mut()
        }
    }
}

/// Opens an existing ring file and returns an opaque handle, or null on
/// failure.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated string. The returned handle must
/// be released with [`ring_close`].
#[no_mangle]
pub unsafe extern "C" fn ring_open(path: *const c_char) -> *mut Ring {
    let Some(path) = cstr_to_str(path) else {
        return ptr::null_mut();
    };
    match Ring::open(path) {
        Ok(ring) => Box::into_raw(Box::new(ring)),
        Err(err) => {
            tracing::error!(%err, path, "ring_open failed");
            ptr::null_mut()
        }
    }
}

/// Unmaps and closes the ring. Accepts null.
///
/// # Safety
///
/// `handle` must have come from [`ring_create`] or [`ring_open`] and must
/// not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn ring_close(handle: *mut Ring) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Publishes a framed message. Returns 1 on success, 0 on failure.
///
/// # Safety
///
/// `handle` must be a live ring handle owned by the single producer;
/// `payload` must point to `payload_len` readable bytes (null is accepted
/// when `payload_len` is 0).
#[no_mangle]
pub unsafe extern "C" fn ring_publish(
    handle: *mut Ring,
    msg_type: c_uint,
    payload: *const u8,
    payload_len: usize,
) -> c_int {
    let Some(ring) = handle.as_mut() else {
        return 0;
    };
    let payload = if payload_len == 0 {
        &[][..]
    } else if payload.is_null() {
        return 0;
    } else {
        slice::from_raw_parts(payload, payload_len)
    };
    match ring.publish(msg_type as u8, payload) {
        Ok(()) => 1,
        Err(err) => {
            tracing::warn!(%err, msg_type, "ring_publish failed");
            0
        }
    }
}

/// Publishes a NUL-terminated JSON string as a snapshot frame. Returns 1
/// on success, 0 on failure.
///
/// # Safety
///
/// `handle` must be a live ring handle owned by the single producer;
/// `json` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ring_publish_snapshot_json(
    handle: *mut Ring,
    json: *const c_char,
) -> c_int {
    let Some(ring) = handle.as_mut() else {
        return 0;
    };
    if json.is_null() {
        return 0;
    }
    let bytes = CStr::from_ptr(json).to_bytes();
    match ring.publish_snapshot_json(bytes) {
        Ok(()) => 1,
        Err(err) => {
            tracing::warn!(%err, "ring_publish_snapshot_json failed");
            0
        }
    }
}

/// Reads the absolute write counter. Returns 0 for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live ring handle.
#[no_mangle]
pub unsafe extern "C" fn ring_get_head(handle: *mut Ring) -> u64 {
    handle.as_ref().map_or(0, Ring::head)
}

/// Reads the absolute consumer counter. Returns 0 for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live ring handle.
#[no_mangle]
pub unsafe extern "C" fn ring_get_tail(handle: *mut Ring) -> u64 {
    handle.as_ref().map_or(0, Ring::tail)
}

/// Reads the circular buffer capacity. Returns 0 for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live ring handle.
#[no_mangle]
pub unsafe extern "C" fn ring_get_buf_size(handle: *mut Ring) -> u64 {
    handle.as_ref().map_or(0, Ring::buf_size)
}

/// Returns a pointer to the start of the circular buffer region, or null
/// for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live ring handle. The pointer is valid
/// until [`ring_close`].
#[no_mangle]
pub unsafe extern "C" fn ring_get_buffer_ptr(handle: *mut Ring) -> *mut u8 {
    match handle.as_mut() {
        Some(ring) => ring.buffer_ptr(),
        None => ptr::null_mut(),
    }
}

/// Stores a new tail value; consumers call this after reading frames.
///
/// # Safety
///
/// `handle` must be null or a live ring handle.
#[no_mangle]
pub unsafe extern "C" fn ring_set_tail(handle: *mut Ring, new_tail: u64) {
    if let Some(ring) = handle.as_ref() {
        ring.set_tail(new_tail);
    }
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}
