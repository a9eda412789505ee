use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use nosograph::model::{build_network, ranked_posteriors, ModelConfig};
use nosograph::{DiagnosisEngine, FactExtractor};

/// Synthetic knowledge base: `diseases` diseases drawing from a shared
/// symptom pool, so the network has realistic shared-parent structure.
fn synthetic_corpus(diseases: usize) -> Vec<String> {
    const POOL: &[&str] = &[
        "Fever", "Cough", "Fatigue", "Headache", "Nausea", "Rash", "Chills", "Dizziness",
        "Sore Throat", "Joint Pain",
    ];

    (0..diseases)
        .map(|d| {
            // Overlapping windows over the pool give shared parents.
            let picks: Vec<&str> = (0..3).map(|j| POOL[(d + j) % POOL.len()]).collect();
            format!("Disease{d} has symptoms {}.", picks.join(", "))
        })
        .collect()
}

fn bench_ranked_posteriors(c: &mut Criterion) {
    let mut group = c.benchmark_group("elimination/ranked_posteriors");
    for diseases in [5usize, 15, 30] {
        let corpus = synthetic_corpus(diseases);
        let report = FactExtractor::new().extract_lines(corpus.iter());
        let net = build_network(&report.facts, &ModelConfig::default()).unwrap();
        let evidence = net.evidence_of_present(["Fever", "Cough"]).unwrap();

        group.throughput(Throughput::Elements(diseases as u64));
        group.bench_function(format!("{diseases}_diseases"), |b| {
            b.iter(|| ranked_posteriors(&net, &evidence, None).unwrap());
        });
    }
    group.finish();
}

fn bench_dual_diagnosis(c: &mut Criterion) {
    let corpus = synthetic_corpus(15);
    let engine = DiagnosisEngine::new();
    engine.load_lines(corpus.iter()).unwrap();

    c.bench_function("diagnose/dual_report", |b| {
        b.iter(|| engine.diagnose(["Fever", "Cough"]).unwrap());
    });
}

fn bench_snapshot_rebuild(c: &mut Criterion) {
    let corpus = synthetic_corpus(30);
    let engine = DiagnosisEngine::new();

    c.bench_function("load/rebuild_and_swap", |b| {
        b.iter(|| engine.load_lines(corpus.iter()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_ranked_posteriors,
    bench_dual_diagnosis,
    bench_snapshot_rebuild
);
criterion_main!(benches);
