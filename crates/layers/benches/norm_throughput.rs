use candle_core::{DType, Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use layers::norm::{LayerNorm, NormConfig};

fn bench_norms(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 8usize;
    let seq = 32usize;
    let hidden_sizes = &[64usize, 512, 2048];
    let dtypes = &[DType::F16, DType::BF16, DType::F32];

    for &dtype in dtypes {
        let mut group = c.benchmark_group(format!("layer_norm/{dtype:?}"));
        for &hidden in hidden_sizes {
            let input = Tensor::randn(0f32, 1.0, (batch, seq, hidden), &device)
                .expect("input")
                .to_dtype(dtype)
                .expect("cast input");
            let layer_norm =
                LayerNorm::new(NormConfig::new(hidden), &device, dtype).expect("layer norm");

            let elements = (batch * seq * hidden) as u64;
            group.throughput(Throughput::Elements(elements));

            group.bench_with_input(
                BenchmarkId::new("forward", hidden),
                &(layer_norm, input),
                |b, (norm, input)| {
                    b.iter(|| {
                        let out = norm.forward(black_box(input)).expect("forward");
                        black_box(out);
                    });
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_norms);
criterion_main!(benches);
