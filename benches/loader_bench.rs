//! Throughput of batch collation and one training epoch.

use abandono::config::ModuleConfig;
use abandono::data::{ChurnDataset, DataLoader};
use abandono::model::Mlp;
use abandono::optim::{Adam, Optimizer};
use abandono::train::{ChurnModule, TrainingModule};
use abandono::backward;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

fn dataset(n: usize, dim: usize) -> Arc<ChurnDataset> {
    let rows: Vec<Vec<f32>> = (0..n)
        .map(|i| (0..dim).map(|j| ((i * 31 + j * 7) % 97) as f32 / 97.0).collect())
        .collect();
    let labels = (0..n).map(|i| (i % 3 == 0) as u8 as f32).collect();
    Arc::new(ChurnDataset::from_rows(&rows, labels).unwrap())
}

fn bench_loader_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("DataLoader");
    let data = dataset(10_000, 20);

    for batch_size in [32, 256, 2048] {
        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("shuffled_epoch", batch_size),
            &batch_size,
            |b, &batch_size| {
                let mut loader = DataLoader::new(Arc::clone(&data), batch_size).with_shuffle(true);
                b.iter(|| {
                    let rows: usize = loader.iter().map(|batch| batch.rows).sum();
                    black_box(rows)
                });
            },
        );
    }
    group.finish();
}

fn bench_training_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("TrainingEpoch");
    let data = dataset(4_096, 20);

    for hidden in [8, 64] {
        group.bench_with_input(BenchmarkId::new("mlp", hidden), &hidden, |b, &hidden| {
            let mut module = ChurnModule::new(
                Mlp::new(&[20, hidden, 1], 0).unwrap(),
                ModuleConfig::new().with_learning_rate(1e-3),
            );
            let mut optimizer = Adam::default_params(1e-3);
            let mut loader = DataLoader::new(Arc::clone(&data), 128);
            b.iter(|| {
                for (idx, batch) in loader.iter().enumerate() {
                    optimizer.zero_grad(module.params_mut());
                    let loss = module.training_step(&batch, idx).unwrap();
                    backward(&loss, None);
                    optimizer.step(module.params_mut());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_loader_epoch, bench_training_epoch);
criterion_main!(benches);
