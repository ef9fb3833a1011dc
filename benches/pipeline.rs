use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_timeseries::pipeline::TrainSamplerKind;
use kolosal_timeseries::prelude::*;
use ndarray::Array2;
use rand::prelude::*;

fn create_records(n_series: usize, length: usize) -> Vec<TimeSeriesRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    (0..n_series)
        .map(|i| {
            let target: Vec<f64> = (0..length)
                .map(|t| 10.0 + (t % 7) as f64 + rng.gen::<f64>())
                .collect();
            TimeSeriesRecord::from_target(start, Frequency::daily(), target)
                .with_item_id(format!("series_{}", i))
        })
        .collect()
}

fn bench_training_instances(c: &mut Criterion) {
    let mut group = c.benchmark_group("training_instances");

    let config = PipelineConfig::new(28, 7, Frequency::daily())
        .with_train_sampler(TrainSamplerKind::ExpectedNum, 10);
    let chain = config.training_chain().unwrap();

    for n_series in [10, 100, 1000].iter() {
        let records = create_records(*n_series, 365);

        group.bench_with_input(BenchmarkId::new("instances_batch", n_series), &records, |b, records| {
            b.iter(|| chain.instances_batch(black_box(records.clone()), 7).unwrap())
        });
    }

    group.finish();
}

fn bench_quantiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_forecast");
    let mut rng = StdRng::seed_from_u64(7);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    for num_samples in [100, 1000].iter() {
        let samples = Array2::from_shape_fn((*num_samples, 24), |_| rng.gen::<f64>());
        let forecast = SampleForecast::new(samples.into_dyn(), start, Frequency::hourly()).unwrap();

        group.bench_with_input(BenchmarkId::new("quantile", num_samples), &forecast, |b, forecast| {
            b.iter(|| forecast.quantile(black_box(0.9)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training_instances, bench_quantiles);
criterion_main!(benches);
