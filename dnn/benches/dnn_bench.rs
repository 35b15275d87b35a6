use criterion::{Criterion, black_box, criterion_group, criterion_main};
use keyprint_dnn::{Architecture, Mat, Net};

fn wave(i: usize) -> f32 {
    ((i as f32) * 0.37).sin() * 0.2
}

fn bench_load_model(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typing.dnn");
    Net::from_fn(Architecture::TYPING, 3, 5, wave)
        .unwrap()
        .save(&path)
        .unwrap();

    c.bench_function("dnn_load_model", |b| {
        b.iter(|| {
            let net = Net::from_file(black_box(&path)).unwrap();
            drop(net);
        });
    });
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("dnn_classify");
    for rows in [3usize, 10, 30] {
        let net = Net::from_fn(Architecture::TYPING, rows, 5, wave).unwrap();
        let data: Vec<f64> = (0..rows * 5).map(|i| (i % 100) as f64 * 0.01).collect();
        group.bench_function(format!("{rows}x5"), |b| {
            b.iter(|| {
                let input = Mat::from_f64_2d(5, rows, black_box(&data)).unwrap();
                let _ = black_box(net.classify(&input).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_concurrent_classify(c: &mut Criterion) {
    let net = std::sync::Arc::new(Net::from_fn(Architecture::TYPING, 3, 5, wave).unwrap());
    let data: Vec<f64> = (0..15).map(|i| i as f64 * 0.1).collect();

    c.bench_function("dnn_concurrent_classify_4threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let net = net.clone();
                    let data = data.clone();
                    std::thread::spawn(move || {
                        let input = Mat::from_f64_2d(5, 3, &data).unwrap();
                        let _ = black_box(net.classify(&input).unwrap());
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_load_model, bench_classify, bench_concurrent_classify);
criterion_main!(benches);
