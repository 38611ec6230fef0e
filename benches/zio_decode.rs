//! Benchmarks for the zio decompressed-read path.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use ebreader::zio::{OpenMode, Whence, ZioStream};

const SLICE_SIZE: usize = 2048;
const SLICE_COUNT: usize = 64;

fn deflate_slice(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).unwrap();
    encoder.finish().unwrap()
}

/// Build a synthetic EBZIP1 file: header, `SLICE_COUNT` deflate blobs, then
/// the offset index, mirroring the layout §4.2 describes.
fn build_ebzip_fixture() -> Vec<u8> {
    let file_size = (SLICE_SIZE * SLICE_COUNT) as u32;
    let slices: Vec<Vec<u8>> = (0..SLICE_COUNT)
        .map(|i| {
            let raw: Vec<u8> = (0..SLICE_SIZE).map(|b| ((b + i) % 251) as u8).collect();
            deflate_slice(&raw)
        })
        .collect();

    let mut header = vec![0u8; 22];
    header[0..5].copy_from_slice(b"EBZip");
    header[5] = 1 << 4; // codec id 1, zip level 0
    header[10..14].copy_from_slice(&file_size.to_be_bytes());

    let mut body = Vec::new();
    let mut offsets = Vec::with_capacity(SLICE_COUNT + 1);
    let mut pos = header.len() as u32;
    for slice in &slices {
        offsets.push(pos);
        body.extend_from_slice(slice);
        pos += slice.len() as u32;
    }
    offsets.push(pos); // sentinel end offset

    let mut out = header;
    out.extend_from_slice(&body);
    for off in offsets {
        out.extend_from_slice(&off.to_be_bytes());
    }
    out
}

fn bench_plain_read(c: &mut Criterion) {
    let data: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    c.bench_function("zio_plain_sequential_read", |b| {
        b.iter(|| {
            let mut stream = ZioStream::open_memory(data.clone(), OpenMode::Plain).unwrap();
            let mut buf = [0u8; 4096];
            let mut total = 0usize;
            while total < data.len() {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                total += n;
            }
        });
    });
}

fn bench_ebzip_decode(c: &mut Criterion) {
    let fixture = build_ebzip_fixture();
    c.bench_function("zio_ebzip_full_decode", |b| {
        b.iter(|| {
            let mut stream = ZioStream::open_memory(fixture.clone(), OpenMode::Ebzip).unwrap();
            let mut buf = [0u8; 2048];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
            }
        });
    });
}

fn bench_ebzip_random_seek(c: &mut Criterion) {
    let fixture = build_ebzip_fixture();
    c.bench_function("zio_ebzip_random_seek", |b| {
        b.iter(|| {
            let mut stream = ZioStream::open_memory(fixture.clone(), OpenMode::Ebzip).unwrap();
            let mut buf = [0u8; 16];
            for i in 0..SLICE_COUNT {
                let offset = (i * 4099) % (SLICE_SIZE * SLICE_COUNT - 16);
                stream.lseek(offset as i64, Whence::Start).unwrap();
                stream.read(&mut buf).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_plain_read, bench_ebzip_decode, bench_ebzip_random_seek);
criterion_main!(benches);
