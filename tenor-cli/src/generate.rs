//! Synthetic input generation for the six benchmark CUSIPs.
//!
//! Mirrors the shape of real feeds: mids walk a 0..511 tick band above 99,
//! book spreads cycle 2,4,6,8,6,4 ticks so a third of the books sit inside
//! the execution gate, trades rotate the TRSY books, and every inquiry
//! arrives RECEIVED.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tenor_core::tick32::{format_price32, price_from_ticks};
use tenor_markets::BondCatalog;
use tracing::info;

/// Row counts per product for each generated file.
#[derive(Clone, Copy, Debug)]
pub struct GeneratorSpec {
    pub prices: usize,
    pub trades: usize,
    pub books: usize,
    pub inquiries: usize,
}

impl Default for GeneratorSpec {
    fn default() -> Self {
        Self {
            prices: 1_000,
            trades: 10,
            books: 1_000,
            inquiries: 10,
        }
    }
}

/// Ticks above zero where the generated price band starts.
const BASE_TICKS: i64 = 99 * 256;
/// Width of the generated price band, in 1/256 ticks.
const BAND_TICKS: i64 = 512;

/// Top-of-book spread cycle, in ticks. Values at or under 4 pass the
/// execution gate.
const SPREAD_CYCLE: [i64; 6] = [2, 4, 6, 8, 6, 4];

const TRADE_BOOKS: [&str; 3] = ["TRSY1", "TRSY2", "TRSY3"];
const SIDES: [&str; 2] = ["BUY", "SELL"];

/// Write all four input files under `input_dir`.
pub fn generate_inputs(
    input_dir: &Path,
    catalog: &BondCatalog,
    spec: GeneratorSpec,
    seed: u64,
) -> Result<()> {
    std::fs::create_dir_all(input_dir)
        .with_context(|| format!("failed to create input directory {}", input_dir.display()))?;
    let mut rng = SmallRng::seed_from_u64(seed);
    generate_prices(input_dir, catalog, spec.prices, &mut rng)?;
    generate_trades(input_dir, catalog, spec.trades, &mut rng)?;
    generate_market_data(input_dir, catalog, spec.books, &mut rng)?;
    generate_inquiries(input_dir, catalog, spec.inquiries, &mut rng)?;
    info!(dir = %input_dir.display(), ?spec, "generated input files");
    Ok(())
}

fn price_text(band_ticks: i64) -> String {
    // generated prices always sit on the grid, so formatting cannot fail
    format_price32(price_from_ticks(BASE_TICKS + band_ticks)).unwrap_or_default()
}

fn open(input_dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = input_dir.join(name);
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn generate_prices(
    input_dir: &Path,
    catalog: &BondCatalog,
    count: usize,
    rng: &mut SmallRng,
) -> Result<()> {
    let mut out = open(input_dir, "prices.txt")?;
    writeln!(out, "CUSIP, Mid, Spread")?;
    for _ in 0..count {
        for bond in catalog.bonds() {
            let mid = price_text(rng.gen_range(0..BAND_TICKS - 2));
            let spread = format_price32(price_from_ticks(rng.gen_range(2..=4)))
                .unwrap_or_default();
            writeln!(out, "{},{mid},{spread}", bond.id)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn generate_trades(
    input_dir: &Path,
    catalog: &BondCatalog,
    count: usize,
    rng: &mut SmallRng,
) -> Result<()> {
    let mut out = open(input_dir, "trades.txt")?;
    writeln!(out, "CUSIP, Trade ID, Price, Quantity, Book, Side")?;
    let mut trade_id = 0usize;
    for _ in 0..count {
        for bond in catalog.bonds() {
            trade_id += 1;
            let price = price_text(rng.gen_range(0..BAND_TICKS));
            let quantity = (1 + rng.gen_range(0..5)) * 1_000_000;
            let book = TRADE_BOOKS[rng.gen_range(0..TRADE_BOOKS.len())];
            let side = SIDES[rng.gen_range(0..SIDES.len())];
            writeln!(out, "{},{trade_id},{price},{quantity},{book},{side}", bond.id)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn generate_market_data(
    input_dir: &Path,
    catalog: &BondCatalog,
    count: usize,
    rng: &mut SmallRng,
) -> Result<()> {
    let mut out = open(input_dir, "marketdata.txt")?;
    writeln!(
        out,
        "CUSIP, Bid1, QB1, Ask1, QA1, Bid2, QB2, Ask2, QA2, Bid3, QB3, Ask3, QA3, \
         Bid4, QB4, Ask4, QA4, Bid5, QB5, Ask5, QA5"
    )?;
    for round in 0..count {
        // every book in a round shares the cycle's spread
        let spread = SPREAD_CYCLE[round % SPREAD_CYCLE.len()];
        let max_span = spread + 8;
        for bond in catalog.bonds() {
            let top_bid = 4 + rng.gen_range(0..BAND_TICKS - max_span);
            let top_offer = top_bid + spread;
            write!(out, "{}", bond.id)?;
            for level in 0..5i64 {
                let quantity = (level + 1) * 1_000_000;
                write!(
                    out,
                    ",{},{quantity},{},{quantity}",
                    price_text(top_bid - level),
                    price_text(top_offer + level)
                )?;
            }
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn generate_inquiries(
    input_dir: &Path,
    catalog: &BondCatalog,
    count: usize,
    rng: &mut SmallRng,
) -> Result<()> {
    let mut out = open(input_dir, "inquiries.txt")?;
    writeln!(out, "InquiryID, CUSIP, Quantity, Side, Price, InquiryState")?;
    let mut inquiry_id = 0usize;
    for _ in 0..count {
        for bond in catalog.bonds() {
            inquiry_id += 1;
            let quantity = (1 + rng.gen_range(0..6)) * 1_000_000;
            let side = SIDES[rng.gen_range(0..SIDES.len())];
            let price = price_text(rng.gen_range(0..BAND_TICKS));
            writeln!(
                out,
                "{inquiry_id},{},{quantity},{side},{price},RECEIVED",
                bond.id
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_all_four_files_with_expected_row_counts() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = BondCatalog::builtin();
        let spec = GeneratorSpec {
            prices: 3,
            trades: 2,
            books: 4,
            inquiries: 1,
        };
        generate_inputs(dir.path(), &catalog, spec, 42).unwrap();

        for (file, rows) in [
            ("prices.txt", 3 * 6),
            ("trades.txt", 2 * 6),
            ("marketdata.txt", 4 * 6),
            ("inquiries.txt", 6),
        ] {
            let contents = std::fs::read_to_string(dir.path().join(file)).unwrap();
            assert_eq!(contents.lines().count(), rows + 1, "{file}");
        }
    }

    #[test]
    fn market_data_books_are_ordered_and_cycle_spreads() {
        use tenor_core::tick32::parse_price32;

        let dir = tempfile::tempdir().unwrap();
        let catalog = BondCatalog::builtin();
        let spec = GeneratorSpec {
            prices: 0,
            trades: 0,
            books: 6,
            inquiries: 0,
        };
        generate_inputs(dir.path(), &catalog, spec, 7).unwrap();
        let contents = std::fs::read_to_string(dir.path().join("marketdata.txt")).unwrap();
        for (row, line) in contents.lines().skip(1).enumerate() {
            let fields: Vec<&str> = line.split(',').collect();
            let bid = parse_price32(fields[1]).unwrap();
            let offer = parse_price32(fields[3]).unwrap();
            let round = row / 6;
            let expected = price_from_ticks(SPREAD_CYCLE[round % 6]);
            assert_eq!(offer - bid, expected, "row {row}");
            assert!(bid < offer);
        }
    }
}
