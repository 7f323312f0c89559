#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use memdb_rs::{MemDbError, SnapshotStream};

#[derive(Debug, Arbitrary)]
enum StreamOp {
    Seek { offset: i64, whence: i32 },
    Read { len: u8 },
    Close,
}

fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let content: Vec<u8> = match u.arbitrary() {
        Ok(c) => c,
        Err(_) => return,
    };
    let ops: Vec<StreamOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let mut stream = SnapshotStream::new(content);

    for op in ops.iter().take(128) {
        let before = stream.position();
        match op {
            StreamOp::Seek { offset, whence } => match stream.seek_raw(*offset, *whence) {
                Ok(pos) => assert!(pos <= stream.len() as u64),
                Err(MemDbError::EndOfStream) | Err(MemDbError::InvalidWhence(_)) => {
                    assert_eq!(stream.position(), before);
                }
                Err(e) => panic!("unexpected error: {}", e),
            },
            StreamOp::Read { len } => {
                let mut buf = vec![0u8; usize::from(*len)];
                match stream.read_into(&mut buf) {
                    Ok(n) => assert_eq!(stream.position(), before + n as u64),
                    Err(MemDbError::EndOfStream) => assert_eq!(before, stream.len() as u64),
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            StreamOp::Close => {
                stream.close();
                assert!(stream.is_empty());
            }
        }
        assert!(stream.position() <= stream.len() as u64);
    }
});
