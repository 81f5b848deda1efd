use candle_core::{DType, Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use layers::linear::{Linear, LinearConfig, LinearInit};

fn bench_linear(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 4usize;
    let seq = 16usize;
    let shapes = &[(64usize, 64usize), (256, 64), (512, 512)];
    let dtypes = &[DType::F32, DType::F64];

    for &dtype in dtypes {
        let mut group = c.benchmark_group(format!("linear/{dtype:?}"));
        for &(input_dim, output_dim) in shapes {
            let linear = Linear::with_init(
                LinearConfig::new(input_dim, output_dim),
                &LinearInit::FanInUniform,
                &device,
                dtype,
            )
            .expect("linear init");
            let input = Tensor::randn(0f32, 1.0, (batch, seq, input_dim), &device)
                .expect("input")
                .to_dtype(dtype)
                .expect("cast input");
            let elements = (batch * seq * input_dim * output_dim) as u64;
            group.throughput(Throughput::Elements(elements));
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{}x{}", input_dim, output_dim)),
                &(linear, input),
                |b, (linear, input)| {
                    b.iter(|| {
                        let out = linear.forward(black_box(input)).expect("forward");
                        black_box(out);
                    });
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_linear);
criterion_main!(benches);
