//! Add-on pricing for small variants that lose money on their own.
//!
//! # Usage
//!
//! ```bash
//! # Preview without writing
//! pz-cli addon-pricing --dry-run
//!
//! # Write add-on fields at a 45% target margin
//! pz-cli addon-pricing --target-margin 0.45 --max-cny 50
//! ```
//!
//! # Environment Variables
//!
//! - `KNACK_APPLICATION_ID`, `KNACK_REST_API_KEY` - Record store credentials
//! - `KNACK_OBJECT_KEY_VARIANTS`, `KNACK_FIELD_VARIANTS_*` - Variant layout
//! - `ADDON_THRESHOLD` - Cart value written with each add-on price

use protocol_zero_core::money::format_cad;
use protocol_zero_core::pricing::{AddonQuote, PricingConfig, VariantCost};
use protocol_zero_storefront::config::{ConfigError, StorefrontConfig, VariantFields};
use protocol_zero_storefront::knack::{KnackClient, KnackError, Record, RecordQuery, fields};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while pricing add-ons.
#[derive(Debug, Error)]
pub enum AddonPricingError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Record store credentials are missing.
    #[error("Knack credentials missing (set KNACK_APPLICATION_ID and KNACK_REST_API_KEY)")]
    NotConfigured,

    /// Record store request failed.
    #[error("Knack error: {0}")]
    Knack(#[from] KnackError),

    /// Target margin plus salesperson cut must stay below 100%.
    #[error("Invalid target margin: {0}")]
    InvalidMargin(Decimal),
}

/// Command line options.
#[derive(Debug, Clone)]
pub struct Options {
    pub dry_run: bool,
    pub target_margin: Decimal,
    pub max_cny: Decimal,
}

/// Totals if every priced add-on sold once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Impact {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

fn pricing_config(options: &Options, min_cart: Decimal) -> Result<PricingConfig, AddonPricingError> {
    let defaults = PricingConfig::default();
    if options.target_margin < Decimal::ZERO
        || options.target_margin + defaults.salesperson_cut >= Decimal::ONE
    {
        return Err(AddonPricingError::InvalidMargin(options.target_margin));
    }
    Ok(PricingConfig {
        target_addon_margin: options.target_margin,
        max_cny_for_addon: options.max_cny,
        min_cart_for_addon: min_cart,
        ..defaults
    })
}

/// Cost data of a variant record. Records without a supplier price are skipped.
#[must_use]
pub fn variant_cost(record: &Record, f: &VariantFields) -> Option<VariantCost> {
    let get = |key: &str, name: &str| fields::field(record, key, name);

    let cny_price = fields::decimal(get(&f.price_cny, "Price CNY")).filter(|p| *p > Decimal::ZERO)?;
    Some(VariantCost {
        record_id: fields::record_id(record)?,
        name: fields::text(get(&f.name, "Variant Name")).unwrap_or_else(|| "Unknown".to_string()),
        cny_price,
        status: fields::text(get(&f.status, "Status")),
        selling_price_cad: fields::decimal(get(&f.price_cad, "Selling Price")),
        margin_standard: fields::decimal(get(&f.margin_standard, "Margin Standard")),
    })
}

fn number(amount: Decimal) -> Value {
    amount.to_f64().map_or(Value::Null, Value::from)
}

/// Record store fields written for a priced add-on.
///
/// The variant also goes back to `Active`, now sellable as an add-on.
#[must_use]
pub fn update_fields(quote: &AddonQuote, f: &VariantFields, min_cart: Decimal) -> Value {
    let mut data = Map::new();
    data.insert(f.is_addon.clone(), Value::Bool(true));
    data.insert(f.addon_price_cad.clone(), number(quote.addon_price_cad));
    data.insert(f.addon_cost_cad.clone(), number(quote.addon_cost_cad));
    data.insert(f.addon_margin.clone(), number(quote.addon_margin_percent));
    data.insert(f.min_cart_for_addon.clone(), number(min_cart));
    data.insert(f.status.clone(), Value::String("Active".to_string()));
    Value::Object(data)
}

/// Revenue, cost and profit after the salesperson cut.
#[must_use]
pub fn impact(quotes: &[AddonQuote], config: &PricingConfig) -> Impact {
    let revenue: Decimal = quotes.iter().map(|q| q.addon_price_cad).sum();
    let cost: Decimal = quotes.iter().map(|q| q.addon_cost_cad).sum();
    Impact {
        revenue,
        cost,
        profit: revenue * (Decimal::ONE - config.salesperson_cut) - cost,
    }
}

#[allow(clippy::print_stdout)]
fn print_table(quotes: &[AddonQuote]) {
    println!(
        "{:<45}{:>8}{:>10}{:>10}{:>10}",
        "Item", "CNY", "Cost", "Add-on$", "Margin"
    );
    println!("{}", "-".repeat(83));
    for quote in quotes {
        let name: String = quote.name.chars().take(43).collect();
        println!(
            "{:<45}{:>8}{:>10}{:>10}{:>10}",
            name,
            format!("¥{}", quote.cny_price.normalize()),
            format!("${}", format_cad(quote.addon_cost_cad)),
            format!("${}", format_cad(quote.addon_price_cad)),
            format!("{}%", quote.addon_margin_percent),
        );
    }
    println!("{}", "-".repeat(83));
}

/// Price every eligible variant and, unless `dry_run`, store the result.
///
/// # Errors
///
/// Returns `AddonPricingError` if configuration is invalid or a record
/// store request fails. Updates already written stay written.
pub async fn run(options: &Options) -> Result<(), AddonPricingError> {
    let config = StorefrontConfig::from_env()?;
    let pricing = pricing_config(options, config.store.addon_threshold)?;

    let client = KnackClient::new(&config.knack);
    if !client.is_configured() {
        return Err(AddonPricingError::NotConfigured);
    }
    let variant_fields = &config.knack.fields.variants;

    let mode = if options.dry_run { "dry run" } else { "live update" };
    tracing::info!(
        mode,
        target_margin = %pricing.target_addon_margin,
        max_cny = %pricing.max_cny_for_addon,
        "Fetching variants..."
    );
    let records = client
        .get_records(&config.knack.objects.variants, &RecordQuery::new())
        .await?;
    tracing::info!("Found {} variants", records.len());

    let quotes: Vec<AddonQuote> = records
        .iter()
        .filter_map(|record| variant_cost(record, variant_fields))
        .filter_map(|variant| pricing.quote_addon(&variant))
        .collect();

    print_table(&quotes);
    tracing::info!("Total eligible items: {}", quotes.len());

    if options.dry_run {
        tracing::info!("DRY RUN - no changes made. Remove --dry-run to apply.");
    } else {
        for quote in &quotes {
            let data = update_fields(quote, variant_fields, pricing.min_cart_for_addon);
            client
                .update_record(&config.knack.objects.variants, &quote.record_id, &data)
                .await?;
            tracing::info!("  Updated {}", quote.name);
        }
        tracing::info!("Add-on pricing saved");
    }

    let totals = impact(&quotes, &pricing);
    tracing::info!(
        revenue = %format_cad(totals.revenue),
        cost = %format_cad(totals.cost),
        profit = %format_cad(totals.profit),
        "If each add-on item sells once"
    );

    Ok(())
}
