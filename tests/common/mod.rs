#![allow(dead_code)]
//! On-disk OME-Zarr (v2) fixture: axes `t, c, z, y, x`, four levels, float32 `arange` data.
use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    path::Path,
};

use serde_json::json;
use tempfile::TempDir;

/// Level 0 spatial shape, `z, y, x`.
pub const SHAPE: [u64; 3] = [4, 6, 8];
/// Level 0 spacing in micrometers, `z, y, x`.
pub const SCALE_UM: [f64; 3] = [2000.0, 1000.0, 500.0];
pub const LEVELS: usize = 4;

pub fn level_shape(level: usize) -> [u64; 3] {
    SHAPE.map(|n| n.div_ceil(1 << level))
}

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

fn write_level(root: &Path, level: usize) {
    let [z, y, x] = level_shape(level);
    let shape = [1, 1, z, y, x];
    write_json(
        &root.join(level.to_string()).join(".zarray"),
        &json!({
            "zarr_format": 2,
            "shape": shape,
            "chunks": shape,
            "dtype": "<f4",
            "compressor": null,
            "fill_value": 0.0,
            "order": "C",
            "filters": null,
            "dimension_separator": "/",
        }),
    );
    let n = z * y * x;
    let bytes: Vec<u8> = (0..n).flat_map(|v| (v as f32).to_le_bytes()).collect();
    let chunk = root.join(level.to_string()).join("0/0/0/0/0");
    std::fs::create_dir_all(chunk.parent().unwrap()).unwrap();
    std::fs::write(chunk, bytes).unwrap();
}

/// Write the fixture into a fresh temporary directory.
pub fn ome_zarr() -> TempDir {
    env_logger::try_init().ok();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("image.ome.zarr");
    write_json(&root.join(".zgroup"), &json!({"zarr_format": 2}));
    let datasets: Vec<_> = (0..LEVELS)
        .map(|level| {
            let factor = (1 << level) as f64;
            json!({
                "path": level.to_string(),
                "coordinateTransformations": [{
                    "type": "scale",
                    "scale": [1.0, 1.0, SCALE_UM[0] * factor, SCALE_UM[1] * factor, SCALE_UM[2] * factor],
                }],
            })
        })
        .collect();
    write_json(
        &root.join(".zattrs"),
        &json!({"multiscales": [{
            "version": "0.4",
            "name": "fixture",
            "axes": [
                {"name": "t", "type": "time", "unit": "millisecond"},
                {"name": "c", "type": "channel"},
                {"name": "z", "type": "space", "unit": "micrometer"},
                {"name": "y", "type": "space", "unit": "micrometer"},
                {"name": "x", "type": "space", "unit": "micrometer"},
            ],
            "datasets": datasets,
        }]}),
    );
    for level in 0..LEVELS {
        write_level(&root, level);
    }
    dir
}

pub fn zarr_uri(dir: &TempDir) -> String {
    dir.path()
        .join("image.ome.zarr")
        .to_str()
        .unwrap()
        .to_string()
}

/// Metadata document with the acquisition nested under `acquisition`.
pub fn nd_metadata() -> serde_json::Value {
    json!({
        "subject": {"subject_id": "000000"},
        "acquisition": {
            "axes": [
                {"dimension": 2, "name": "X", "direction": "LEFT_RIGHT", "unit": "micrometer"},
                {"dimension": 1, "name": "Y", "direction": "POSTERIOR_ANTERIOR", "unit": "micrometer"},
                {"dimension": 0, "name": "Z", "direction": "INFERIOR_SUPERIOR", "unit": "micrometer"},
            ],
        },
    })
}

pub fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} != {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

/// Serve the files below `root` over HTTP on a local port, returning the base URL.
///
/// Missing files get a 404, anything below `/private/` a 403 and `/broken` a 500.
pub fn serve_dir(root: &Path) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let root = root.to_path_buf();
    std::thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            respond(&root, stream);
        }
    });
    format!("http://{addr}")
}

fn respond(root: &Path, mut stream: TcpStream) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) if line == "\r\n" => break,
            Ok(_) => {}
        }
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();

    let (status, reason, body) = if path.starts_with("/private/") {
        (403, "Forbidden", b"AccessDenied".to_vec())
    } else if path == "/broken" {
        (500, "Internal Server Error", b"oops".to_vec())
    } else {
        match std::fs::read(root.join(path.trim_start_matches('/'))) {
            Ok(bytes) => (200, "OK", bytes),
            Err(_) => (404, "Not Found", b"NoSuchKey".to_vec()),
        }
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).ok();
    if method != "HEAD" {
        stream.write_all(&body).ok();
    }
    stream.flush().ok();
}
