//! Snapshot stream behavior end to end
//!
//! Creates devices, dumps them, and drives the resulting streams through
//! seek and read the way a caller exporting a database image would.

use memdb_rs::{Device, MemDbError, SnapshotStream, Whence};
use std::io::{Read, Seek, SeekFrom};

fn ascending(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

#[test]
fn test_dump_then_read_everything() {
    let device = Device::new("d1", &ascending(10));
    let mut stream = device.dump();

    let mut buf = [0u8; 10];
    assert_eq!(stream.read_into(&mut buf).unwrap(), 10);
    assert_eq!(buf.to_vec(), ascending(10));

    // Exhausted
    assert!(matches!(
        stream.read_into(&mut buf),
        Err(MemDbError::EndOfStream)
    ));
}

#[test]
fn test_dump_of_empty_device() {
    let device = Device::new("empty", &[]);
    let mut stream = device.dump();

    assert_eq!(stream.len(), 0);
    assert_eq!(stream.seek_to(0, Whence::Start).unwrap(), 0);
    assert_eq!(stream.position(), 0);

    let mut buf = [0u8; 4];
    assert!(matches!(
        stream.read_into(&mut buf),
        Err(MemDbError::EndOfStream)
    ));
}

#[test]
fn test_seek_read_and_step_back() {
    let device = Device::new("hundred", &ascending(100));
    let mut stream = device.dump();

    assert_eq!(stream.seek_to(50, Whence::Start).unwrap(), 50);

    let mut buf = [0u8; 10];
    assert_eq!(stream.read_into(&mut buf).unwrap(), 10);
    assert_eq!(buf.to_vec(), (50u8..60).collect::<Vec<_>>());

    assert_eq!(stream.seek_to(-10, Whence::Current).unwrap(), 50);
    assert_eq!(stream.position(), 50);
}

#[test]
fn test_seek_past_end_keeps_cursor() {
    let device = Device::new("five", &ascending(5));
    let mut stream = device.dump();

    assert!(matches!(
        stream.seek_to(999, Whence::Start),
        Err(MemDbError::EndOfStream)
    ));
    assert_eq!(stream.position(), 0);

    // Also from a non-zero cursor and from the end
    stream.seek_to(3, Whence::Start).unwrap();
    assert!(stream.seek_to(1, Whence::End).is_err());
    assert!(stream.seek_to(-4, Whence::Current).is_err());
    assert_eq!(stream.position(), 3);
}

#[test]
fn test_seek_to_exact_end_is_allowed() {
    let mut stream = Device::new("edge", &ascending(8)).dump();

    assert_eq!(stream.seek_to(0, Whence::End).unwrap(), 8);
    let mut buf = [0u8; 1];
    assert!(matches!(
        stream.read_into(&mut buf),
        Err(MemDbError::EndOfStream)
    ));

    assert_eq!(stream.seek_to(-8, Whence::End).unwrap(), 0);
}

#[test]
fn test_invalid_whence_code() {
    let mut stream = Device::new("whence", &ascending(16)).dump();
    stream.seek_to(4, Whence::Start).unwrap();

    let err = stream.seek_raw(1, 7).unwrap_err();
    assert!(matches!(err, MemDbError::InvalidWhence(7)));
    assert_eq!(err.to_string(), "invalid whence: 7");
    assert_eq!(stream.position(), 4);

    assert_eq!(stream.seek_raw(2, 1).unwrap(), 6);
}

#[test]
fn test_short_reads_advance_by_count() {
    let mut stream = Device::new("chunks", &ascending(25)).dump();

    let mut collected = Vec::new();
    let mut buf = [0u8; 8];
    let mut last = 0;
    loop {
        match stream.read_into(&mut buf) {
            Ok(n) => {
                assert!(n > 0);
                collected.extend_from_slice(&buf[..n]);
                assert_eq!(stream.position(), last + n as u64);
                last = stream.position();
            }
            Err(MemDbError::EndOfStream) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(collected, ascending(25));
}

#[test]
fn test_close_is_repeatable() {
    let mut stream = Device::new("closing", b"payload").dump();

    stream.close();
    stream.close();

    assert!(stream.is_empty());
    let mut buf = [0u8; 4];
    assert!(stream.read_into(&mut buf).is_err());
}

#[test]
fn test_streams_are_independent() {
    let device = Device::new("independent", &ascending(32));

    let mut first = device.dump();
    let mut second = device.dump();
    device.write_at(&[0xEE; 32], 0).unwrap();

    first.seek_to(16, Whence::Start).unwrap();
    let mut a = [0u8; 4];
    let mut b = [0u8; 4];
    first.read_into(&mut a).unwrap();
    second.read_into(&mut b).unwrap();

    assert_eq!(a, [16, 17, 18, 19]);
    assert_eq!(b, [0, 1, 2, 3]);
    assert_eq!(device.dump().as_bytes(), &[0xEE; 32][..]);
}

#[test]
fn test_std_io_adapters() {
    let mut stream: SnapshotStream = Device::new("io", b"hello, world").dump();

    assert_eq!(stream.seek(SeekFrom::End(-5)).unwrap(), 7);
    let mut tail = String::new();
    stream.read_to_string(&mut tail).unwrap();
    assert_eq!(tail, "world");

    // Out-of-bounds maps to UnexpectedEof without moving
    let err = stream.seek(SeekFrom::Start(100)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    assert_eq!(stream.stream_position().unwrap(), 12);

    stream.rewind().unwrap();
    let mut all = Vec::new();
    std::io::copy(&mut stream, &mut all).unwrap();
    assert_eq!(all, b"hello, world");
}
