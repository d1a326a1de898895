//! Fixture builders: gzipped tarballs and minimal MaxMind DB files.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

pub(crate) fn tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// An IPv4 database with a single node whose both branches resolve to `record`,
/// so every IPv4 address maps to it.
pub(crate) fn tiny_mmdb(record: &Value) -> Vec<u8> {
    const NODE_COUNT: u32 = 1;
    // Data pointers are offset by node count plus the 16-byte separator
    let pointer = (NODE_COUNT + 16).to_be_bytes();

    let mut buf = Vec::new();
    buf.extend_from_slice(&pointer[1..]);
    buf.extend_from_slice(&pointer[1..]);
    buf.extend_from_slice(&[0u8; 16]);
    encode(record, &mut buf);

    buf.extend_from_slice(b"\xAB\xCD\xEFMaxMind.com");
    let metadata = serde_json::json!({
        "binary_format_major_version": 2,
        "binary_format_minor_version": 0,
        "build_epoch": 1533600000,
        "database_type": "GeoLite2-City",
        "description": {"en": "test"},
        "ip_version": 4,
        "languages": ["en"],
        "node_count": NODE_COUNT,
        "record_size": 24,
    });
    encode(&metadata, &mut buf);
    buf
}

fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::String(s) => {
            assert!(s.len() < 29);
            out.push(0x40 | s.len() as u8);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Number(n) => {
            let n = n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap();
            out.push(0xC4);
            out.extend_from_slice(&n.to_be_bytes());
        }
        Value::Bool(b) => {
            out.push(*b as u8);
            out.push(0x07);
        }
        Value::Object(map) => {
            assert!(map.len() < 29);
            out.push(0xE0 | map.len() as u8);
            for (key, value) in map {
                encode(&Value::String(key.clone()), out);
                encode(value, out);
            }
        }
        Value::Array(items) => {
            assert!(items.len() < 29);
            out.push(items.len() as u8);
            out.push(0x04);
            for item in items {
                encode(item, out);
            }
        }
        Value::Null => panic!("null has no MaxMind DB encoding"),
    }
}
