use aquapanel_alert_core::{ActiveAlertTracker, Metric, Operator, RuleSpec, Severity};
use aquapanel_schema::{CoreLoad, PerformanceSnapshot};
use chrono::{TimeDelta, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn rules(n: usize) -> Vec<RuleSpec> {
    (0..n)
        .map(|i| RuleSpec {
            id: i as i64,
            name: format!("rule-{i}"),
            metric: Metric::ALL[i % Metric::ALL.len()],
            operator: Operator::Gte,
            threshold: (i % 100) as f64,
            severity: Severity::Warning,
        })
        .collect()
}

fn snapshot() -> PerformanceSnapshot {
    let mut s = PerformanceSnapshot::empty(Utc::now());
    s.cpu.usage = 55.0;
    s.memory.usage = 70.0;
    s.cpu.cores = (0..16)
        .map(|i| CoreLoad {
            name: format!("cpu{i}"),
            load: i as f64 * 5.0,
        })
        .collect();
    s.processes.all = 400;
    s
}

fn bench_assess(c: &mut Criterion) {
    let rules = rules(200);
    let snapshot = snapshot();

    c.bench_function("assess_200_rules", |b| {
        b.iter(|| {
            let mut tracker = ActiveAlertTracker::new(TimeDelta::minutes(5), TimeDelta::hours(24));
            black_box(tracker.assess(black_box(&rules), black_box(&snapshot), Utc::now()))
        })
    });
}

criterion_group!(benches, bench_assess);
criterion_main!(benches);
