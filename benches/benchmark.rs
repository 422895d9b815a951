use catmatch::{Angle, Catalog, CatalogMerger, ColumnData};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use itertools::Itertools;
use ndarray::Array1;
use ndarray_rand::RandomExt;
use rand::{Rng, distributions::Uniform};

/// Two catalogs sharing half of their sources, with small positional offsets.
fn catalogs() -> (Catalog, Catalog) {
    let mut rng = rand::thread_rng();

    let n = 20_000;
    let ra = Array1::random(n, Uniform::new(0., 360.));
    let dec = Array1::random(n, Uniform::new(-1., 1.)).mapv(|z: f64| z.asin().to_degrees());
    let flux = Array1::random(n, Uniform::new(0., 1.));

    let catalog1 = Catalog::from_columns([
        ("ra", ColumnData::from(ra.to_vec())),
        ("dec", ColumnData::from(dec.to_vec())),
        ("flux", ColumnData::from(flux.to_vec())),
    ])
    .unwrap();

    let (ra2, dec2): (Vec<f64>, Vec<f64>) = ra
        .iter()
        .zip(&dec)
        .map(|(&ra, &dec)| {
            if rng.gen_bool(0.5) {
                (ra, (dec + rng.gen_range(-1e-4..1e-4)).clamp(-90., 90.))
            } else {
                (rng.gen_range(0.0..360.0), rng.gen_range(-90.0..90.0))
            }
        })
        .unzip();
    let catalog2 = Catalog::from_columns([
        ("ra", ColumnData::from(ra2)),
        ("dec", ColumnData::from(dec2)),
        ("flux", ColumnData::from(flux.iter().map(|f| f * 2.).collect_vec())),
    ])
    .unwrap();

    (catalog1, catalog2)
}

fn merge_benchmark(c: &mut Criterion) {
    let mut merge = c.benchmark_group("merge");
    merge.sample_size(10);

    let (catalog1, catalog2) = catalogs();
    let merger = CatalogMerger::new().with_tolerance(Angle::from_arcseconds(1.));
    merge.bench_function("merge blocking", |b| {
        b.iter_batched(
            || (catalog1.clone(), catalog2.clone()),
            |(c1, c2)| merger.merge(&c1, &c2),
            BatchSize::SmallInput,
        )
    });

    merge.bench_function("merge parallel", |b| {
        b.iter_batched(
            || (catalog1.clone(), catalog2.clone()),
            |(c1, c2)| merger.merge_par(&c1, &c2),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, merge_benchmark);
criterion_main!(benches);
