#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use memdb_rs::Device;

#[derive(Debug, Arbitrary)]
enum DeviceOp {
    Write { offset: u16, data: Vec<u8> },
    Read { offset: u16, len: u16 },
    Truncate { size: u16 },
    Dump,
}

// Drive a device and a plain Vec<u8> side by side; they must always agree
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let page_size: u8 = match u.arbitrary() {
        Ok(p) => p,
        Err(_) => return,
    };
    let ops: Vec<DeviceOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let device = match Device::with_page_size("fuzz", &[], usize::from(page_size)) {
        Ok(d) => d,
        Err(_) => return,
    };
    let mut shadow: Vec<u8> = Vec::new();

    for op in ops.iter().take(64) {
        match op {
            DeviceOp::Write { offset, data } => {
                let offset = usize::from(*offset);
                device.write_at(data, offset as u64).unwrap();
                if !data.is_empty() {
                    if shadow.len() < offset + data.len() {
                        shadow.resize(offset + data.len(), 0);
                    }
                    shadow[offset..offset + data.len()].copy_from_slice(data);
                }
            }
            DeviceOp::Read { offset, len } => {
                let offset = usize::from(*offset);
                let mut buf = vec![0u8; usize::from(*len)];
                let n = device.read_at(&mut buf, offset as u64).unwrap();
                let expected = shadow.get(offset..).unwrap_or(&[]);
                let expected = &expected[..expected.len().min(buf.len())];
                assert_eq!(&buf[..n], expected);
            }
            DeviceOp::Truncate { size } => {
                device.truncate(u64::from(*size)).unwrap();
                shadow.resize(usize::from(*size), 0);
            }
            DeviceOp::Dump => {
                assert_eq!(device.dump().as_bytes(), &shadow[..]);
            }
        }
        assert_eq!(device.size(), shadow.len() as u64);
    }
});
