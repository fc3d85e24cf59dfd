//! Random worksheets and matching reference tables.
//!
//! Used by the benchmarks and by the `generate` CLI command to produce
//! sample inputs of arbitrary size.

use crate::core::currency::{CurrencyCode, CurrencyRate, Money};
use crate::core::item::ItemSpec;
use crate::core::tax::{BaseType, RateEntry, TariffEntry, TaxDefinition, TaxDependency};
use crate::core::worksheet::{WorksheetDocument, WorksheetState};
use crate::reference::snapshot::ReferenceTables;
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Shape of the generated sample.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Number of items on the worksheet.
    pub item_count: usize,
    /// Number of distinct tariff codes items are drawn from.
    pub tariff_count: usize,
    /// Declaration currencies and their rate to local currency.
    pub currencies: Vec<(CurrencyCode, Decimal)>,
    pub min_fob: Decimal,
    pub max_fob: Decimal,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            item_count: 10,
            tariff_count: 4,
            currencies: vec![
                (CurrencyCode::new("USD"), Decimal::new(60_512, 2)),
                (CurrencyCode::new("EUR"), Decimal::new(655_957, 3)),
            ],
            min_fob: Decimal::from(100),
            max_fob: Decimal::from(250_000),
        }
    }
}

/// Tax schedule used for generated tariffs: code, label, level, base, rate codes.
const TAX_SCHEDULE: &[(&str, &str, i32, BaseType, &[(&str, i64)])] = &[
    ("DD", "Droit de douane", 1, BaseType::Value, &[("DD0", 0), ("DD5", 5), ("DD10", 10), ("DD20", 20)]),
    ("RS", "Redevance statistique", 1, BaseType::Value, &[("RS1", 1)]),
    ("PCS", "Prélèvement communautaire de solidarité", 1, BaseType::Value, &[("PCS08", 8)]),
    ("TSP", "Taxe spécifique au poids", 1, BaseType::Weight, &[("TSP2", 2)]),
    ("TVA", "Taxe sur la valeur ajoutée", 2, BaseType::Value, &[("TVA18", 18)]),
];

fn random_amount<R: Rng + ?Sized>(rng: &mut R, min: Decimal, max: Decimal) -> Decimal {
    let min_cents = (min * Decimal::ONE_HUNDRED).to_i64().unwrap_or(0);
    let max_cents = (max * Decimal::ONE_HUNDRED).to_i64().unwrap_or(min_cents);
    if max_cents <= min_cents {
        return Decimal::new(min_cents, 2);
    }
    Decimal::new(rng.gen_range(min_cents..max_cents), 2)
}

fn tariff_code(index: usize) -> String {
    format!("{:04}.{:02}.{:02}", 8401 + index * 7, index % 90 + 10, index % 10 * 10)
}

/// Build reference tables covering `config.tariff_count` tariff codes.
///
/// Every tariff carries DD, RS and TVA; PCS and the weight tax are added at
/// random. TVA is assessed on the CAF plus DD and RS.
pub fn generate_reference_tables<R: Rng + ?Sized>(rng: &mut R, config: &SampleConfig) -> ReferenceTables {
    let mut tables = ReferenceTables {
        currencies: config
            .currencies
            .iter()
            .map(|(code, rate)| CurrencyRate::new(code.clone(), code.as_str(), *rate))
            .collect(),
        dependencies: vec![TaxDependency::new("TVA", "DD"), TaxDependency::new("TVA", "RS")],
        ..Default::default()
    };

    for (code, label, level, base, rates) in TAX_SCHEDULE {
        tables.taxes.push(TaxDefinition::new(*code, *label, *level, *base));
        for (rate_code, percentage) in rates.iter() {
            tables.rates.push(RateEntry::new(*rate_code, Decimal::from(*percentage)));
        }
    }

    for index in 0..config.tariff_count {
        let tariff = tariff_code(index);
        for (code, _, _, _, rates) in TAX_SCHEDULE {
            let optional = matches!(*code, "PCS" | "TSP");
            if optional && !rng.gen_bool(0.5) {
                continue;
            }
            if let Some((rate_code, _)) = rates.choose(rng) {
                tables.tariff_entries.push(TariffEntry::new(tariff.as_str(), *code, *rate_code));
            }
        }
    }

    tables
}

/// Generate a draft worksheet whose items use the tariffs and currencies of
/// [`generate_reference_tables`] for the same config.
pub fn generate_worksheet<R: Rng + ?Sized>(rng: &mut R, config: &SampleConfig) -> WorksheetDocument {
    let tariff_count = config.tariff_count.max(1);
    let items = (0..config.item_count)
        .map(|_| {
            let currency = config
                .currencies
                .choose(rng)
                .map(|(code, _)| code.clone())
                .unwrap_or_else(|| CurrencyCode::new("USD"));
            let fob = random_amount(rng, config.min_fob, config.max_fob);
            let net_weight = random_amount(rng, Decimal::ONE, Decimal::from(5_000));
            let freight = rng
                .gen_bool(0.3)
                .then(|| Money::new((fob * Decimal::new(8, 2)).round_dp(2), currency.clone()));

            ItemSpec {
                tariff_code: tariff_code(rng.gen_range(0..tariff_count)),
                origin_country: ["CN", "FR", "US", "JP", "BR"]
                    .choose(rng)
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                provenance_code: String::new(),
                fob: Money::new(fob, currency),
                freight,
                insurance: None,
                supplier_commission: Decimal::ZERO,
                gross_weight: (net_weight * Decimal::new(105, 2)).round_dp(2),
                net_weight,
                complementary_quantity: Decimal::from(rng.gen_range(1..50)),
                mercurial_quantity: Decimal::ZERO,
            }
        })
        .collect();

    WorksheetDocument {
        case_file: format!("DOS-SIM-{:06}", rng.gen_range(0..1_000_000)),
        state: WorksheetState::Draft,
        items,
    }
}
