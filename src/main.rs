//! customs-liquidation CLI
//!
//! Value and liquidate customs worksheets from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Validate reference tables and show the tax evaluation order
//! customs-liquidation check-reference --reference reference.json
//!
//! # Liquidate every item of a worksheet, waiving one tax
//! customs-liquidation liquidate --reference reference.json --worksheet ws.json --exclude PCS
//!
//! # Spread worksheet freight over items, output as JSON
//! customs-liquidation allocate --reference reference.json --worksheet ws.json \
//!     --freight 1200 --freight-currency EUR --format json
//!
//! # Generate a random sample for testing
//! customs-liquidation generate --items 50 --output-dir sample/
//! ```

use customs_liquidation::allocation::engine::{AllocationSummary, GlobalAggregates};
use customs_liquidation::config::PipelineConfig;
use customs_liquidation::core::currency::{CurrencyCode, Money};
use customs_liquidation::core::tax::TaxCode;
use customs_liquidation::core::worksheet::{WorksheetDocument, WorksheetId};
use customs_liquidation::error::PipelineError;
use customs_liquidation::persistence::memory::InMemoryGateway;
use customs_liquidation::pipeline::{ConversionReport, Pipeline};
use customs_liquidation::reference::snapshot::{ReferenceData, ReferenceTables};
use customs_liquidation::simulation::worksheet_generator::{
    generate_reference_tables, generate_worksheet, SampleConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

fn print_usage() {
    eprintln!(
        r#"customs-liquidation — customs valuation and duty/tax liquidation

USAGE:
    customs-liquidation <COMMAND> [OPTIONS]

COMMANDS:
    check-reference   Validate reference tables and print the tax evaluation order
    convert           Convert item amounts to local currency and compute CAF
    allocate          Spread worksheet freight/insurance/weight over items by FOB
    liquidate         Compute the duty and tax breakdown of every item
    generate          Generate random reference tables and a worksheet (for testing)
    help              Show this message

COMMON OPTIONS:
    --reference <FILE>   Reference tables JSON
    --worksheet <FILE>   Worksheet JSON
    --config <FILE>      Pipeline config JSON (default: $CUSTOMS_LIQUIDATION_CONFIG)
    --format <FORMAT>    Output format: text (default) or json

OPTIONS (allocate):
    --freight <AMOUNT>             Worksheet freight total
    --freight-currency <CODE>      Currency of the freight total (default: local)
    --insurance <AMOUNT>           Worksheet insurance total
    --insurance-currency <CODE>    Currency of the insurance total (default: local)
    --weight <KG>                  Worksheet gross weight

OPTIONS (liquidate):
    --exclude <LIST>     Comma-separated tax codes to waive

OPTIONS (generate):
    --items <N>          Number of items (default: 10)
    --tariffs <N>        Number of tariff codes (default: 4)
    --seed <N>           RNG seed for a reproducible sample
    --output-dir <DIR>   Write reference.json and worksheet.json instead of stdout

EXAMPLES:
    customs-liquidation check-reference --reference reference.json
    customs-liquidation convert --reference reference.json --worksheet ws.json
    customs-liquidation allocate --reference reference.json --worksheet ws.json --freight 100
    customs-liquidation liquidate --reference reference.json --worksheet ws.json --format json
    customs-liquidation generate --items 200 --seed 42 --output-dir sample"#
    );
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn fail_pipeline(err: PipelineError) -> ! {
    eprintln!("Error [{}]: {}", err.kind(), err);
    process::exit(1);
}

#[derive(Default)]
struct Options {
    reference: Option<String>,
    worksheet: Option<String>,
    config: Option<String>,
    json: bool,
    exclude: BTreeSet<TaxCode>,
    freight: Option<Decimal>,
    freight_currency: Option<String>,
    insurance: Option<Decimal>,
    insurance_currency: Option<String>,
    weight: Option<Decimal>,
    items: Option<usize>,
    tariffs: Option<usize>,
    seed: Option<u64>,
    output_dir: Option<String>,
}

fn value_of(args: &[String], i: usize, flag: &str, what: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| fail(format!("{} requires {}", flag, what)))
}

fn parsed<T: std::str::FromStr>(args: &[String], i: usize, flag: &str, what: &str) -> T {
    let raw = value_of(args, i, flag, what);
    raw.parse()
        .unwrap_or_else(|_| fail(format!("{} requires {}, got '{}'", flag, what, raw)))
}

fn parse_options(args: &[String]) -> Options {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        match flag {
            "--reference" => opts.reference = Some(value_of(args, i, flag, "a file path")),
            "--worksheet" => opts.worksheet = Some(value_of(args, i, flag, "a file path")),
            "--config" => opts.config = Some(value_of(args, i, flag, "a file path")),
            "--format" => {
                opts.json = match value_of(args, i, flag, "'text' or 'json'").as_str() {
                    "json" => true,
                    "text" => false,
                    other => fail(format!("unknown format '{}'", other)),
                }
            }
            "--exclude" => {
                opts.exclude = value_of(args, i, flag, "a comma-separated list")
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(TaxCode::new)
                    .collect();
            }
            "--freight" => opts.freight = Some(parsed(args, i, flag, "an amount")),
            "--freight-currency" => opts.freight_currency = Some(value_of(args, i, flag, "a currency code")),
            "--insurance" => opts.insurance = Some(parsed(args, i, flag, "an amount")),
            "--insurance-currency" => opts.insurance_currency = Some(value_of(args, i, flag, "a currency code")),
            "--weight" => opts.weight = Some(parsed(args, i, flag, "a weight")),
            "--items" => opts.items = Some(parsed(args, i, flag, "a number")),
            "--tariffs" => opts.tariffs = Some(parsed(args, i, flag, "a number")),
            "--seed" => opts.seed = Some(parsed(args, i, flag, "a number")),
            "--output-dir" => opts.output_dir = Some(value_of(args, i, flag, "a directory")),
            _ => fail(format!("unknown option: {}", flag)),
        }
        i += 1;
    }
    opts
}

fn load_config(opts: &Options) -> PipelineConfig {
    let loaded = match &opts.config {
        Some(path) => PipelineConfig::from_file(path),
        None => PipelineConfig::from_env_or_default(),
    };
    loaded.unwrap_or_else(|e| fail(e))
}

fn init_logging(config: &PipelineConfig) {
    let default_filter = config.log_filter.as_deref().unwrap_or("warn");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(format!("cannot read '{}': {}", path, e)))
}

fn load_reference(opts: &Options, config: &PipelineConfig) -> Arc<ReferenceData> {
    let path = opts
        .reference
        .as_deref()
        .unwrap_or_else(|| fail("--reference <FILE> is required"));
    let reference = ReferenceData::from_json(config.local_currency.clone(), &read_file(path))
        .unwrap_or_else(|e| fail_pipeline(e.into()));
    Arc::new(reference)
}

fn load_worksheet(opts: &Options) -> WorksheetDocument {
    let path = opts
        .worksheet
        .as_deref()
        .unwrap_or_else(|| fail("--worksheet <FILE> is required"));
    serde_json::from_str(&read_file(path)).unwrap_or_else(|e| {
        eprintln!("Error parsing worksheet JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "case_file": "DOS-2024-0153",
  "items": [
    {{ "tariff_code": "8703.23.10", "fob": {{ "amount": "12500", "currency": "EUR" }}, "gross_weight": "1450" }}
  ]
}}"#
        );
        process::exit(1);
    })
}

/// Load inputs into an in-memory store and build a pipeline over it.
fn setup(opts: &Options) -> (Pipeline<InMemoryGateway>, WorksheetId) {
    let config = load_config(opts);
    init_logging(&config);
    let reference = load_reference(opts, &config);
    let gateway = InMemoryGateway::new();
    let worksheet = gateway.import(load_worksheet(opts));
    (Pipeline::new(gateway, reference, config), worksheet)
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e));
    println!("{}", json);
}

#[derive(serde::Serialize)]
struct TaxOrderOutput {
    code: String,
    label: String,
    level: i32,
    base_type: String,
    complements: Vec<String>,
}

#[derive(serde::Serialize)]
struct ReferenceOutput {
    local_currency: String,
    currencies: usize,
    tariff_entries: usize,
    dependencies: usize,
    evaluation_order: Vec<TaxOrderOutput>,
}

fn cmd_check_reference(args: &[String]) {
    let opts = parse_options(args);
    let config = load_config(&opts);
    init_logging(&config);
    let reference = load_reference(&opts, &config);

    let output = ReferenceOutput {
        local_currency: reference.local_currency().to_string(),
        currencies: reference.currencies().len(),
        tariff_entries: reference.tariff_entry_count(),
        dependencies: reference.dependency_count(),
        evaluation_order: reference
            .taxes()
            .iter()
            .map(|t| TaxOrderOutput {
                code: t.code.to_string(),
                label: t.label.clone(),
                level: t.ordering_level,
                base_type: t.base_type.to_string(),
                complements: reference.complements_of(&t.code).iter().map(|c| c.to_string()).collect(),
            })
            .collect(),
    };

    if opts.json {
        print_json(&output);
        return;
    }
    println!("Reference data OK ({})", output.local_currency);
    println!("  Currencies:      {}", output.currencies);
    println!("  Tariff entries:  {}", output.tariff_entries);
    println!("  Dependencies:    {}", output.dependencies);
    println!("Evaluation order:");
    for (i, tax) in output.evaluation_order.iter().enumerate() {
        let complements = if tax.complements.is_empty() {
            String::new()
        } else {
            format!(" + [{}]", tax.complements.join(", "))
        };
        println!(
            "  {:>2}. {:<8} level {:<3} {:<18}{}  {}",
            i + 1,
            tax.code,
            tax.level,
            tax.base_type,
            complements,
            tax.label
        );
    }
}

fn print_conversion(report: &ConversionReport) {
    println!("=== Conversion {} ===", report.worksheet_id);
    println!("  {:<36} {:>14} {:>12} {:>12} {:>14}", "Item", "FOB", "Freight", "Insurance", "CAF");
    for item in &report.items {
        let v = &item.valuation;
        println!(
            "  {:<36} {:>14} {:>12} {:>12} {:>14}",
            item.item_id.to_string(), v.fob_local, v.freight_local, v.insurance_local, v.caf
        );
    }
    println!("CAF Total:      {}", report.caf_total);
}

fn cmd_convert(args: &[String]) {
    let opts = parse_options(args);
    let (pipeline, worksheet) = setup(&opts);
    let report = pipeline
        .convert_worksheet(worksheet)
        .unwrap_or_else(|e| fail_pipeline(e));
    if opts.json {
        print_json(&report);
    } else {
        print_conversion(&report);
    }
}

fn print_allocation(summary: &AllocationSummary) {
    println!("=== Allocation ===");
    println!("Total FOB:      {}", summary.total_fob);
    let show = |v: Option<Decimal>| v.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
    for a in &summary.allocations {
        println!(
            "  {:<36} fob {:>14} freight {:>12} insurance {:>12} weight {:>10}",
            a.item_id.to_string(),
            a.fob,
            show(a.freight),
            show(a.insurance),
            show(a.gross_weight)
        );
    }
    println!("Freight:        {}", summary.freight_total());
    println!("Insurance:      {}", summary.insurance_total());
    println!("Gross weight:   {}", summary.gross_weight_total());
}

fn cmd_allocate(args: &[String]) {
    let opts = parse_options(args);
    let (pipeline, worksheet) = setup(&opts);
    let local = pipeline.config().local_currency.clone();
    let money = |amount: Option<Decimal>, currency: &Option<String>| {
        amount.map(|a| {
            let code = currency.as_deref().map(CurrencyCode::new).unwrap_or_else(|| local.clone());
            Money::new(a, code)
        })
    };

    let aggregates = GlobalAggregates {
        freight: money(opts.freight, &opts.freight_currency),
        insurance: money(opts.insurance, &opts.insurance_currency),
        gross_weight: opts.weight,
    };
    if aggregates.is_empty() {
        fail("allocate needs at least one of --freight, --insurance, --weight");
    }

    let summary = pipeline
        .allocate(worksheet, &aggregates)
        .unwrap_or_else(|e| fail_pipeline(e));
    if opts.json {
        print_json(&summary);
    } else {
        print_allocation(&summary);
    }
}

fn cmd_liquidate(args: &[String]) {
    let opts = parse_options(args);
    let (pipeline, worksheet) = setup(&opts);
    let result = pipeline
        .liquidate_worksheet(worksheet, &opts.exclude)
        .unwrap_or_else(|e| fail_pipeline(e));
    if opts.json {
        print_json(&result);
    } else {
        println!("{}", result);
    }
}

fn cmd_generate(args: &[String]) {
    let opts = parse_options(args);
    let config = load_config(&opts);
    init_logging(&config);

    let sample = SampleConfig {
        item_count: opts.items.unwrap_or(10),
        tariff_count: opts.tariffs.unwrap_or(4).max(1),
        ..Default::default()
    };
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let tables = generate_reference_tables(&mut rng, &sample);
    let worksheet = generate_worksheet(&mut rng, &sample);

    #[derive(serde::Serialize)]
    struct Sample<'a> {
        reference: &'a ReferenceTables,
        worksheet: &'a WorksheetDocument,
    }

    match opts.output_dir {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            fs::create_dir_all(&dir).unwrap_or_else(|e| fail(format!("cannot create '{}': {}", dir.display(), e)));
            let write = |name: &str, json: serde_json::Result<String>| {
                let path = dir.join(name);
                let json = json.unwrap_or_else(|e| fail(e));
                fs::write(&path, json)
                    .unwrap_or_else(|e| fail(format!("cannot write '{}': {}", path.display(), e)));
            };
            write("reference.json", serde_json::to_string_pretty(&tables));
            write("worksheet.json", serde_json::to_string_pretty(&worksheet));
            eprintln!(
                "Generated {} items over {} tariffs → {}",
                worksheet.items.len(),
                sample.tariff_count,
                dir.display()
            );
        }
        None => print_json(&Sample {
            reference: &tables,
            worksheet: &worksheet,
        }),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "check-reference" => cmd_check_reference(rest),
        "convert" => cmd_convert(rest),
        "allocate" => cmd_allocate(rest),
        "liquidate" => cmd_liquidate(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
