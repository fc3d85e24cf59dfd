//! Basic valuation, allocation and liquidation example.
//!
//! Walks a two-item worksheet through freight allocation and a full duty
//! and tax liquidation, then shows the effect of waiving a duty.

use customs_liquidation::prelude::*;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use std::sync::Arc;

fn main() {
    println!("╔══════════════════════════════════════════════════╗");
    println!("║  customs-liquidation: Basic Liquidation Example  ║");
    println!("╚══════════════════════════════════════════════════╝\n");

    let eur = CurrencyCode::new("EUR");
    let tables = ReferenceTables {
        currencies: vec![CurrencyRate::new(eur.clone(), "€", dec!(655.957))],
        taxes: vec![
            TaxDefinition::new("DD", "Droit de douane", 1, BaseType::Value),
            TaxDefinition::new("RS", "Redevance statistique", 1, BaseType::Value),
            TaxDefinition::new("TVA", "Taxe sur la valeur ajoutée", 2, BaseType::Value),
        ],
        tariff_entries: vec![
            TariffEntry::new("8703.23.10", "DD", "DD20"),
            TariffEntry::new("8703.23.10", "RS", "RS1"),
            TariffEntry::new("8703.23.10", "TVA", "TVA18"),
            TariffEntry::new("0901.11", "RS", "RS1"),
            TariffEntry::new("0901.11", "TVA", "TVA18"),
        ],
        rates: vec![
            RateEntry::new("DD20", dec!(20)),
            RateEntry::new("RS1", dec!(1)),
            RateEntry::new("TVA18", dec!(18)),
        ],
        dependencies: vec![TaxDependency::new("TVA", "DD"), TaxDependency::new("TVA", "RS")],
    };
    let reference = Arc::new(ReferenceData::load(CurrencyCode::new("XOF"), tables).unwrap());

    let item = |tariff: &str, fob, weight| ItemSpec {
        tariff_code: tariff.to_string(),
        origin_country: "FR".to_string(),
        provenance_code: "FR".to_string(),
        fob: Money::new(fob, eur.clone()),
        freight: None,
        insurance: None,
        supplier_commission: dec!(0),
        gross_weight: weight,
        net_weight: weight,
        complementary_quantity: dec!(0),
        mercurial_quantity: dec!(0),
    };

    let gateway = InMemoryGateway::new();
    let worksheet = gateway.import(WorksheetDocument {
        case_file: "DOS-2024-0153".to_string(),
        state: WorksheetState::Draft,
        items: vec![item("8703.23.10", dec!(12500), dec!(1450)), item("0901.11", dec!(2500), dec!(600))],
    });
    let pipeline = Pipeline::new(gateway, reference, PipelineConfig::default());

    // --- Step 1: Allocate worksheet freight ---
    println!("━━━ Step 1: Freight Allocation ━━━\n");

    let aggregates = GlobalAggregates {
        freight: Some(Money::new(dec!(1800), eur.clone())),
        insurance: Some(Money::new(dec!(90), eur)),
        gross_weight: None,
    };
    let summary = pipeline.allocate(worksheet, &aggregates).unwrap();
    for a in &summary.allocations {
        println!(
            "  FOB {:>10}  freight {:>8}  insurance {:>6}",
            a.fob,
            a.freight.unwrap_or_default(),
            a.insurance.unwrap_or_default()
        );
    }
    println!();

    // --- Step 2: Liquidate ---
    println!("━━━ Step 2: Liquidation ━━━\n");

    let liquidation = pipeline.liquidate_worksheet(worksheet, &BTreeSet::new()).unwrap();
    println!("{}", liquidation);

    // --- Step 3: Waive the customs duty on the vehicle ---
    println!("━━━ Step 3: Duty Exemption ━━━\n");

    let vehicle = pipeline.gateway().worksheet_items(worksheet).unwrap()[0].id;
    let waived: BTreeSet<TaxCode> = [TaxCode::new("DD")].into_iter().collect();
    let exempt = pipeline.liquidate_item(vehicle, &waived).unwrap();
    println!("{}", exempt);
    println!(
        "Saved by exemption: {} XOF",
        liquidation.items[0].total - exempt.total
    );
}
