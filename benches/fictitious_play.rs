use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gerryfair::config::{AuditConfig, AuditorKind};
use gerryfair::dataset::Dataset;
use gerryfair::play::FictitiousPlay;
use ndarray::{Array1, Array2, s};
use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SENSITIVE: usize = 4;

fn random_dataset(rows: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(0x5EED_F00D + rows as u64);
    let features: Array2<f64> = Array2::from_shape_fn((rows, 10), |_| rng.sample(Standard));
    let labels: Array1<f64> = (0..rows)
        .map(|i| {
            if features[[i, 0]] + features[[i, 5]] > 1.0 || i == rows - 1 {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let sensitive = features.slice(s![.., ..SENSITIVE]).to_owned();
    Dataset::new(features, sensitive, labels).unwrap()
}

fn benchmark_rounds(c: &mut Criterion) {
    let sizes = [200_usize, 1000, 5000];
    let datasets: Vec<_> = sizes
        .iter()
        .map(|&rows| (rows, random_dataset(rows)))
        .collect();

    let mut group = c.benchmark_group("fictitious_play");
    for (rows, data) in datasets.iter() {
        group.throughput(Throughput::Elements(*rows as u64));

        for auditor in [AuditorKind::Random, AuditorKind::Regression] {
            let config = AuditConfig {
                num_sensitive: SENSITIVE,
                max_iterations: 10,
                auditor,
                ..AuditConfig::default()
            };
            group.bench_with_input(
                BenchmarkId::new(auditor.to_string(), rows),
                data,
                |b, input| {
                    b.iter(|| {
                        let outcome = FictitiousPlay::new(black_box(input), config.clone())
                            .unwrap()
                            .run()
                            .unwrap();
                        black_box(outcome.final_false_positive_rate);
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(fictitious_play, benchmark_rounds);
criterion_main!(fictitious_play);
