//! Single-producer byte-framed shared-memory ring.
//!
//! A memory-mapped file laid out as:
//!
//! ```text
//! [RingHeader (48 bytes)][head: u64][tail: u64][64-byte pad][circular buffer]
//! ```
//!
//! `head` and `tail` are absolute, monotonically increasing byte
//! counters living as atomics inside the mapped region; `head - tail`
//! is the number of bytes in flight. Frames are `u32 len` (little
//! endian) followed by `len` payload bytes whose first byte is the
//! message type. A length of [`WRAP_MARKER`] means the rest of the
//! buffer is dead and the next frame starts at offset 0.
//!
//! The producer never blocks: when a frame does not fit, `tail` is
//! advanced to evict the oldest bytes (consumers lose data but, reading
//! `head` with acquire ordering, never a torn frame below it).
//!
//! The exact offsets and the 64-byte pad are a cross-language ABI; the
//! C surface in [`ffi`] exposes them to out-of-process consumers.

pub mod ffi;

use crate::error::RingError;
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::mem;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{fence, AtomicU64, Ordering};

/// Header magic: "AETH" with A in the most significant byte.
pub const RING_MAGIC: u32 = 0x4145_5448;

/// Layout version this build reads and writes.
pub const RING_VERSION: u16 = 1;

/// Length sentinel marking the remainder of the buffer as unused.
pub const WRAP_MARKER: u32 = 0xFFFF_FFFF;

/// Smallest accepted circular buffer size in bytes.
pub const MIN_BUF_SIZE: u64 = 4096;

/// Message type for raw depth-update JSON.
pub const MSG_DEPTH_UPDATE: u8 = 1;

/// Message type for snapshot JSON.
pub const MSG_SNAPSHOT: u8 = 2;

#[repr(C, packed)]
struct RingHeader {
    magic: u32,
    version: u16,
    reserved0: u16,
    buf_size: u64,
    reserved: [u64; 4],
}

const HEADER_SIZE: usize = mem::size_of::<RingHeader>();
const HEAD_OFFSET: usize = HEADER_SIZE;
const TAIL_OFFSET: usize = HEADER_SIZE + 8;
const META_PAD: usize = 64;
/// Byte offset of the circular buffer within the mapped file.
pub const BUF_OFFSET: usize = HEADER_SIZE + 16 + META_PAD;

/// Producer handle over the mapped ring file.
///
/// Publishing requires `&mut self`; the single-producer contract is
/// enforced by ownership. Accessors read the shared atomics and are safe
/// from any thread.
#[derive(Debug)]
pub struct Ring {
    mmap: MmapMut,
    buf_size: u64,
    _file: File,
}

impl Ring {
    /// Creates a new ring file at `path` with a circular buffer of
    /// `buf_size` bytes.
    ///
    /// The path is opened exclusively ([`RingError::AlreadyExists`] if it
    /// exists), sized to the page-rounded total, mapped shared and
    /// zero-filled; the header is written and `head = tail = 0`.
    pub fn create(path: impl AsRef<Path>, buf_size: u64) -> Result<Self, RingError> {
        let path = path.as_ref();
        if buf_size < MIN_BUF_SIZE {
            return Err(RingError::invalid_arg(format!(
                "buf_size {buf_size} below minimum {MIN_BUF_SIZE}"
            )));
        }

        let total = page_round_up(BUF_OFFSET as u64 + buf_size);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| {
                if err.kind() == ErrorKind::AlreadyExists {
                    RingError::AlreadyExists {
                        path: path.to_path_buf(),
                    }
                } else {
                    RingError::Io(err)
                }
            })?;
        file.set_len(total)?;

        // set_len gives a zeroed file; the mapping starts out all zero.
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        let header = RingHeader {
            magic: RING_MAGIC,
            version: RING_VERSION,
            reserved0: 0,
            buf_size,
            reserved: [0; 4],
        };
        unsafe {
            ptr::write_unaligned(mmap.as_mut_ptr().cast::<RingHeader>(), header);
        }

        tracing::info!(
            path = %path.display(),
            mapped = total,
            buf_size,
            "ring created"
        );
        Ok(Self {
            mmap,
            buf_size,
            _file: file,
        })
    }

    /// Maps an existing ring file and validates its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RingError> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        if mmap.len() < BUF_OFFSET {
            return Err(RingError::invalid_arg(format!(
                "ring file {} is too small to hold the header",
                path.display()
            )));
        }

        let header = unsafe { ptr::read_unaligned(mmap.as_ptr().cast::<RingHeader>()) };
        if header.magic != RING_MAGIC {
            return Err(RingError::BadMagic {
                found: header.magic,
            });
        }
        if header.version != RING_VERSION {
            return Err(RingError::VersionMismatch {
                found: header.version,
                expected: RING_VERSION,
            });
        }
        let buf_size = header.buf_size;
        if buf_size < MIN_BUF_SIZE || BUF_OFFSET as u64 + buf_size > mmap.len() as u64 {
            return Err(RingError::invalid_arg(format!(
                "ring file {} declares buf_size {buf_size} beyond its mapping",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), buf_size, "ring opened");
        Ok(Self {
            mmap,
            buf_size,
            _file: file,
        })
    }

    /// Publishes a framed message, evicting the oldest bytes if needed.
    ///
    /// The frame is `u32 len` (LE) + `msg_type` + `payload`, written
    /// either contiguously or, when it would straddle the buffer end,
    /// after a [`WRAP_MARKER`] at offset 0. Fails only with
    /// [`RingError::PayloadTooLarge`]; backpressure is resolved by
    /// eviction, never by blocking.
    pub fn publish(&mut self, msg_type: u8, payload: &[u8]) -> Result<(), RingError> {
        let msg_len = 1 + payload.len() as u64;
        let need = 4 + msg_len;
        if payload.len() as u64 > self.buf_size || need > self.buf_size {
            return Err(RingError::PayloadTooLarge {
                len: payload.len(),
                buf_size: self.buf_size,
            });
        }

        let head = self.head_atomic().load(Ordering::Relaxed);
        let tail = self.tail_atomic().load(Ordering::Acquire);
        let used = head - tail;
        if need > self.buf_size - used {
            // Overwrite-oldest: consumers lose the bytes between the old
            // and new tail.
            let reclaim = need - (self.buf_size - used);
            self.tail_atomic().store(tail + reclaim, Ordering::Release);
        }

        let buf_size = self.buf_size as usize;
        let pos = (head % self.buf_size) as usize;
        let base = unsafe { self.mmap.as_mut_ptr().add(BUF_OFFSET) };
        let len_field = (msg_len as u32).to_le_bytes();

        unsafe {
            if pos as u64 + need <= self.buf_size {
                ptr::copy_nonoverlapping(len_field.as_ptr(), base.add(pos), 4);
                *base.add(pos + 4) = msg_type;
                if !payload.is_empty() {
                    ptr::copy_nonoverlapping(payload.as_ptr(), base.add(pos + 5), payload.len());
                }
            } else {
                let marker = WRAP_MARKER.to_le_bytes();
                if pos + 4 <= buf_size {
                    ptr::copy_nonoverlapping(marker.as_ptr(), base.add(pos), 4);
                } else {
                    // Even the length field straddles the end: split the
                    // marker across the wrap.
                    let part = buf_size - pos;
                    ptr::copy_nonoverlapping(marker.as_ptr(), base.add(pos), part);
                    ptr::copy_nonoverlapping(marker.as_ptr().add(part), base, 4 - part);
                }
                ptr::copy_nonoverlapping(len_field.as_ptr(), base, 4);
                *base.add(4) = msg_type;
                if !payload.is_empty() {
                    ptr::copy_nonoverlapping(payload.as_ptr(), base.add(5), payload.len());
                }
            }
        }

        // All payload bytes must be visible before head moves.
        fence(Ordering::Release);
        self.head_atomic().store(head + need, Ordering::Release);
        Ok(())
    }

    /// Publishes snapshot JSON as a [`MSG_SNAPSHOT`] frame.
    pub fn publish_snapshot_json(&mut self, json: &[u8]) -> Result<(), RingError> {
        self.publish(MSG_SNAPSHOT, json)
    }

    /// Absolute write counter.
    pub fn head(&self) -> u64 {
        self.head_atomic().load(Ordering::Acquire)
    }

    /// Absolute consumer counter.
    pub fn tail(&self) -> u64 {
        self.tail_atomic().load(Ordering::Acquire)
    }

    /// Circular buffer capacity in bytes.
    pub fn buf_size(&self) -> u64 {
        self.buf_size
    }

    /// Stores a new tail value; used by consumers after reading.
    pub fn set_tail(&self, new_tail: u64) {
        self.tail_atomic().store(new_tail, Ordering::Release);
    }

    /// Raw pointer to the start of the circular buffer region.
    pub fn buffer_ptr(&mut self) -> *mut u8 {
        unsafe { self.mmap.as_mut_ptr().add(BUF_OFFSET) }
    }

    fn head_atomic(&self) -> &AtomicU64 {
        // In-range and 8-aligned: the mapping is page-aligned and
        // HEAD_OFFSET is a multiple of 8.
        unsafe { &*self.mmap.as_ptr().add(HEAD_OFFSET).cast::<AtomicU64>() }
    }

    fn tail_atomic(&self) -> &AtomicU64 {
        unsafe { &*self.mmap.as_ptr().add(TAIL_OFFSET).cast::<AtomicU64>() }
    }
}

// Dropping unmaps the region and closes the descriptor; the backing
// file is left in place for consumers.

fn page_round_up(len: u64) -> u64 {
    let page = match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        p if p > 0 => p as u64,
        _ => 4096,
    };
    len.div_ceil(page) * page
}
