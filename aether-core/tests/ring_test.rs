//! Ring creation, framing, eviction and wrap-marker behavior against a
//! temp-file backing.

use aether_core::ring::{Ring, MSG_DEPTH_UPDATE, MSG_SNAPSHOT, WRAP_MARKER};
use aether_core::RingError;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::slice;
use tempfile::TempDir;

fn ring_path(dir: &TempDir) -> PathBuf {
    dir.path().join("test.ring")
}

fn buf_bytes(ring: &mut Ring, offset: usize, len: usize) -> Vec<u8> {
    let base = ring.buffer_ptr();
    unsafe { slice::from_raw_parts(base.add(offset), len).to_vec() }
}

fn read_len(ring: &mut Ring, offset: usize) -> u32 {
    let bytes = buf_bytes(ring, offset, 4);
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Walks frames from `from` up to `head`, assuming no wrap markers and no
/// eviction in the walked range.
fn read_contiguous_frames(ring: &mut Ring, from: u64) -> Vec<(u8, Vec<u8>)> {
    let head = ring.head();
    let mut cursor = from;
    let mut frames = Vec::new();
    while cursor < head {
        let pos = (cursor % ring.buf_size()) as usize;
        let len = read_len(ring, pos) as usize;
        assert_ne!(len as u32, WRAP_MARKER, "unexpected wrap marker");
        let body = buf_bytes(ring, pos + 4, len);
        frames.push((body[0], body[1..].to_vec()));
        cursor += 4 + len as u64;
    }
    frames
}

#[test]
fn create_rejects_small_buffer() {
    let dir = TempDir::new().unwrap();
    let err = Ring::create(ring_path(&dir), 1024).unwrap_err();
    assert!(matches!(err, RingError::InvalidArg(_)));
}

#[test]
fn create_is_exclusive() {
    let dir = TempDir::new().unwrap();
    let path = ring_path(&dir);
    let _ring = Ring::create(&path, 4096).unwrap();
    let err = Ring::create(&path, 4096).unwrap_err();
    assert!(matches!(err, RingError::AlreadyExists { .. }));
}

#[test]
fn create_sizes_and_zeroes_the_file() {
    let dir = TempDir::new().unwrap();
    let path = ring_path(&dir);
    let ring = Ring::create(&path, 4096).unwrap();

    assert_eq!(ring.head(), 0);
    assert_eq!(ring.tail(), 0);
    assert_eq!(ring.buf_size(), 4096);

    let meta = std::fs::metadata(&path).unwrap();
    // header + atomics + pad + buffer, rounded up to the page size
    assert!(meta.len() >= 128 + 4096);
}

#[test]
fn open_roundtrips_header() {
    let dir = TempDir::new().unwrap();
    let path = ring_path(&dir);
    {
        let mut ring = Ring::create(&path, 8192).unwrap();
        ring.publish(MSG_DEPTH_UPDATE, b"hello").unwrap();
    }
    let ring = Ring::open(&path).unwrap();
    assert_eq!(ring.buf_size(), 8192);
    assert_eq!(ring.head(), 4 + 1 + 5);
    assert_eq!(ring.tail(), 0);
}

#[test]
fn open_rejects_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Ring::open(ring_path(&dir)).unwrap_err();
    assert!(matches!(err, RingError::Io(_)));
}

#[test]
fn open_rejects_bad_magic() {
    let dir = TempDir::new().unwrap();
    let path = ring_path(&dir);
    std::fs::write(&path, vec![0u8; 8192]).unwrap();
    let err = Ring::open(&path).unwrap_err();
    assert!(matches!(err, RingError::BadMagic { found: 0 }));
}

#[test]
fn open_rejects_version_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = ring_path(&dir);
    drop(Ring::create(&path, 4096).unwrap());

    // bump the version field at offset 4
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(4)).unwrap();
    file.write_all(&2u16.to_le_bytes()).unwrap();
    drop(file);

    let err = Ring::open(&path).unwrap_err();
    assert!(matches!(
        err,
        RingError::VersionMismatch {
            found: 2,
            expected: 1
        }
    ));
}

#[test]
fn publish_rejects_oversized_payloads() {
    let dir = TempDir::new().unwrap();
    let mut ring = Ring::create(ring_path(&dir), 4096).unwrap();

    let err = ring.publish(MSG_DEPTH_UPDATE, &vec![0u8; 5000]).unwrap_err();
    assert!(matches!(err, RingError::PayloadTooLarge { len: 5000, .. }));

    // payload fits, frame does not: need = 4 + 1 + 4093 = 4098
    let err = ring.publish(MSG_DEPTH_UPDATE, &vec![0u8; 4093]).unwrap_err();
    assert!(matches!(err, RingError::PayloadTooLarge { .. }));

    // boundary: need == buf_size is accepted
    ring.publish(MSG_DEPTH_UPDATE, &vec![0u8; 4091]).unwrap();
    assert_eq!(ring.head(), 4096);
}

#[test]
fn publish_frames_contiguously() {
    let dir = TempDir::new().unwrap();
    let mut ring = Ring::create(ring_path(&dir), 4096).unwrap();

    ring.publish(MSG_DEPTH_UPDATE, b"alpha").unwrap();
    ring.publish(MSG_SNAPSHOT, b"beta").unwrap();
    ring.publish(7, b"").unwrap();

    let frames = read_contiguous_frames(&mut ring, 0);
    assert_eq!(
        frames,
        vec![
            (MSG_DEPTH_UPDATE, b"alpha".to_vec()),
            (MSG_SNAPSHOT, b"beta".to_vec()),
            (7, Vec::new()),
        ]
    );
    assert_eq!(ring.head(), (4 + 6) + (4 + 5) + (4 + 1));
    assert_eq!(ring.tail(), 0);
}

#[test]
fn set_tail_moves_the_consumer_cursor() {
    let dir = TempDir::new().unwrap();
    let mut ring = Ring::create(ring_path(&dir), 4096).unwrap();
    ring.publish(MSG_DEPTH_UPDATE, b"alpha").unwrap();
    ring.publish(MSG_DEPTH_UPDATE, b"beta").unwrap();

    ring.set_tail(10);
    assert_eq!(ring.tail(), 10);
    let frames = read_contiguous_frames(&mut ring, 10);
    assert_eq!(frames, vec![(MSG_DEPTH_UPDATE, b"beta".to_vec())]);
}

// Six 1005-byte frames through a 4096-byte ring: the head advances by
// exactly 6 * 1005 and eviction has pushed the tail forward.
#[test]
fn eviction_advances_tail() {
    let dir = TempDir::new().unwrap();
    let mut ring = Ring::create(ring_path(&dir), 4096).unwrap();

    for i in 0..6u8 {
        ring.publish(MSG_DEPTH_UPDATE, &vec![i; 1000]).unwrap();
    }

    assert_eq!(ring.head(), 6 * 1005);
    assert!(ring.tail() > 0);
    // fifth publish reclaims 929 bytes, sixth a further 1005
    assert_eq!(ring.tail(), 929 + 1005);
    assert_eq!(ring.head() - ring.tail(), 4096);

    // the fifth publish wrapped, leaving its marker behind
    assert_eq!(read_len(&mut ring, 4020), WRAP_MARKER);

    // The most recent frames are intact at their physical offsets:
    // frame 3 at 2010, frame 4 at 3015, frame 6 (written after the wrap
    // of frame 5) at 929.
    for (offset, fill) in [(2010usize, 2u8), (3015, 3), (929, 5)] {
        assert_eq!(read_len(&mut ring, offset), 1001);
        let body = buf_bytes(&mut ring, offset + 4, 1001);
        assert_eq!(body[0], MSG_DEPTH_UPDATE);
        assert!(body[1..].iter().all(|b| *b == fill));
    }
}

// A large frame followed by one that would straddle the buffer end: a
// wrap marker is written where the second frame would have started and
// the frame lands at offset 0 (after the tail advances to make room).
#[test]
fn wrap_marker_redirects_to_offset_zero() {
    let dir = TempDir::new().unwrap();
    let mut ring = Ring::create(ring_path(&dir), 4096).unwrap();

    ring.publish(MSG_DEPTH_UPDATE, &vec![0xAA; 2800]).unwrap();
    // first frame sits at offset 0
    assert_eq!(read_len(&mut ring, 0), 2801);
    assert_eq!(ring.head(), 2805);

    ring.publish(MSG_DEPTH_UPDATE, &vec![0xBB; 2000]).unwrap();

    // second frame needed 2005 bytes; 1291 were free, so the tail
    // advanced by 714 to evict the oldest bytes
    assert_eq!(ring.tail(), 714);
    // head advances by the frame's need only, never by the dead region
    assert_eq!(ring.head(), 2805 + 2005);

    // wrap marker where the straddling frame would have started
    assert_eq!(read_len(&mut ring, 2805), WRAP_MARKER);

    // and the frame itself at offset 0
    assert_eq!(read_len(&mut ring, 0), 2001);
    let body = buf_bytes(&mut ring, 4, 2001);
    assert_eq!(body[0], MSG_DEPTH_UPDATE);
    assert!(body[1..].iter().all(|b| *b == 0xBB));
}

// When even the 4-byte length field would straddle the end, the marker
// itself is split across the wrap.
#[test]
fn wrap_marker_splits_when_length_field_straddles() {
    let dir = TempDir::new().unwrap();
    let mut ring = Ring::create(ring_path(&dir), 4096).unwrap();

    // first frame: need = 4 + 1 + 4088 = 4093, leaving pos = 4093
    ring.publish(MSG_DEPTH_UPDATE, &vec![0x11; 4088]).unwrap();
    assert_eq!(ring.head(), 4093);

    ring.publish(MSG_DEPTH_UPDATE, &vec![0x22; 100]).unwrap();

    // the marker's first three bytes sit at the end of the buffer (its
    // fourth landed at offset 0 and was then overwritten by the frame)
    assert_eq!(buf_bytes(&mut ring, 4093, 3), vec![0xFF, 0xFF, 0xFF]);
    assert_eq!(read_len(&mut ring, 0), 101);
    let body = buf_bytes(&mut ring, 4, 101);
    assert_eq!(body[0], MSG_DEPTH_UPDATE);
    assert!(body[1..].iter().all(|b| *b == 0x22));
    assert_eq!(ring.head(), 4093 + 105);
    assert_eq!(ring.tail(), 102);
}
