use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensortap_core::formats::capture::{CaptureReader, CaptureWriter};
use tensortap_core::tensor::{contiguous_strides, TensorRecord};
use std::io::Cursor;

fn bench_strided_gather(c: &mut Criterion) {
    let ne = [256i64, 256, 1, 1];
    let dense = contiguous_strides(&ne);
    // Row-padded layout: 256 elements per row, padded to 320 floats.
    let padded = [4u64, 1280, 1280 * 256, 1280 * 256];
    let src = vec![1.0f32; 320 * 256];

    c.bench_function("gather_contiguous_256x256", |b| {
        b.iter(|| TensorRecord::from_strided("t", black_box(&src), ne, dense).unwrap())
    });

    c.bench_function("gather_padded_256x256", |b| {
        b.iter(|| TensorRecord::from_strided("t", black_box(&src), ne, padded).unwrap())
    });
}

fn bench_container_encode_decode(c: &mut Criterion) {
    let records: Vec<_> = (0..16)
        .map(|i| {
            TensorRecord::from_contiguous(
                &format!("layer.{}.weight", i),
                [64, 64, 1, 1],
                vec![0.5; 64 * 64],
            )
            .unwrap()
        })
        .collect();

    c.bench_function("encode_16x64x64", |b| {
        b.iter(|| {
            let mut buf = Vec::new();
            let mut writer = CaptureWriter::new(&mut buf);
            writer.write_store(black_box(&records)).unwrap();
            buf
        })
    });

    let mut encoded = Vec::new();
    let mut writer = CaptureWriter::new(&mut encoded);
    writer.write_store(&records).unwrap();

    c.bench_function("decode_16x64x64", |b| {
        b.iter(|| {
            let mut reader = CaptureReader::new(Cursor::new(black_box(&encoded)));
            reader.read_store().unwrap()
        })
    });
}

criterion_group!(benches, bench_strided_gather, bench_container_encode_decode);
criterion_main!(benches);
