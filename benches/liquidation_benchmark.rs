use criterion::{black_box, criterion_group, criterion_main, Criterion};
use customs_liquidation::allocation::engine::{AllocationEngine, RemainderPolicy};
use customs_liquidation::config::PipelineConfig;
use customs_liquidation::core::currency::CurrencyCode;
use customs_liquidation::core::item::Item;
use customs_liquidation::core::worksheet::WorksheetId;
use customs_liquidation::liquidation::engine::LiquidationEngine;
use customs_liquidation::persistence::memory::InMemoryGateway;
use customs_liquidation::pipeline::Pipeline;
use customs_liquidation::reference::snapshot::ReferenceData;
use customs_liquidation::simulation::worksheet_generator::{
    generate_reference_tables, generate_worksheet, SampleConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

fn sample(items: usize) -> (Arc<ReferenceData>, Vec<Item>, SampleConfig) {
    let mut rng = StdRng::seed_from_u64(42);
    let config = SampleConfig {
        item_count: items,
        tariff_count: 20,
        ..Default::default()
    };
    let tables = generate_reference_tables(&mut rng, &config);
    let reference = ReferenceData::load(CurrencyCode::new("XOF"), tables).unwrap();
    let doc = generate_worksheet(&mut rng, &config);
    let ws = WorksheetId::new();
    let items = doc.items.into_iter().map(|spec| Item::from_spec(ws, spec)).collect();
    (Arc::new(reference), items, config)
}

fn bench_liquidate_item(c: &mut Criterion) {
    let (reference, items, _) = sample(1);
    let engine = LiquidationEngine::new(&reference);
    let excluded = BTreeSet::new();

    c.bench_function("liquidate_single_item", |b| {
        b.iter(|| {
            let mut item = items[0].clone();
            engine.liquidate(black_box(&mut item), &excluded).unwrap()
        })
    });
}

fn bench_liquidate_worksheet_500_items(c: &mut Criterion) {
    let (reference, _, config) = sample(500);
    let mut rng = StdRng::seed_from_u64(7);
    let doc = generate_worksheet(&mut rng, &config);
    let gateway = InMemoryGateway::new();
    let ws = gateway.import(doc);
    let pipeline = Pipeline::new(gateway, reference, PipelineConfig::default());
    let excluded = BTreeSet::new();

    c.bench_function("liquidate_worksheet_500_items", |b| {
        b.iter(|| pipeline.liquidate_worksheet(black_box(ws), &excluded).unwrap())
    });
}

fn bench_allocation_1000_items(c: &mut Criterion) {
    let (_, items, _) = sample(1000);
    let weights: Vec<Decimal> = items.iter().map(|i| i.fob.amount).collect();
    let plain = AllocationEngine::new(2, RemainderPolicy::None);
    let corrected = AllocationEngine::new(2, RemainderPolicy::LargestRemainder);
    let freight = Decimal::new(1_234_567, 2);

    c.bench_function("allocate_1000_items", |b| {
        b.iter(|| plain.distribute(black_box(&weights), freight).unwrap())
    });
    c.bench_function("allocate_1000_items_largest_remainder", |b| {
        b.iter(|| corrected.distribute(black_box(&weights), freight).unwrap())
    });
}

criterion_group!(
    benches,
    bench_liquidate_item,
    bench_liquidate_worksheet_500_items,
    bench_allocation_1000_items
);
criterion_main!(benches);
