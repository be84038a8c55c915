//! Authoritative bond metadata: CUSIP catalog and maturity sector buckets.
//!
//! The six on-the-run benchmark treasuries ship as built-in defaults so the
//! pipeline runs with no external files; a TOML catalog can extend or
//! override them. Sector membership is configuration, not code: each entry
//! names the bucket its risk rolls into.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tenor_core::{Bond, BucketedSector, ProductId};
use thiserror::Error;

/// Bucket names used by the default catalog, in reporting order.
pub const SECTOR_ORDER: [&str; 3] = ["FrontEnd", "Belly", "LongEnd"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog file is invalid: {0}")]
    InvalidFormat(#[from] toml::de::Error),
    #[error("catalog entry '{cusip}' has invalid {field}: '{value}'")]
    InvalidEntry {
        cusip: String,
        field: &'static str,
        value: String,
    },
}

/// CUSIP-keyed bond metadata plus sector membership.
#[derive(Clone, Debug, Default)]
pub struct BondCatalog {
    bonds: HashMap<ProductId, Bond>,
    sector_of: HashMap<ProductId, String>,
}

impl BondCatalog {
    /// Catalog holding only the built-in benchmark issues.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (cusip, coupon, maturity, sector) in [
            ("9128285Q9", "2.750", "2020-11-30", "FrontEnd"),
            ("9128285R7", "2.625", "2021-12-15", "FrontEnd"),
            ("9128285P1", "2.875", "2023-11-30", "Belly"),
            ("9128285N6", "2.875", "2025-11-30", "Belly"),
            ("9128285M8", "3.125", "2028-12-15", "LongEnd"),
            ("912810SE9", "3.375", "2048-11-15", "LongEnd"),
        ] {
            let coupon = Decimal::from_str(coupon).unwrap_or_default();
            let maturity = NaiveDate::from_str(maturity).unwrap_or_default();
            catalog.insert(Bond::cusip(cusip, "T", coupon, maturity), sector);
        }
        catalog
    }

    /// Built-in catalog extended/overridden by a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CatalogFile = toml::from_str(&contents)?;
        let mut catalog = Self::builtin();
        for raw in file.bonds {
            let (bond, sector) = raw.into_typed()?;
            catalog.insert(bond, &sector);
        }
        Ok(catalog)
    }

    fn insert(&mut self, bond: Bond, sector: &str) {
        self.sector_of.insert(bond.id.clone(), sector.to_string());
        self.bonds.insert(bond.id.clone(), bond);
    }

    /// Metadata for a CUSIP, if catalogued.
    #[must_use]
    pub fn get(&self, cusip: &str) -> Option<&Bond> {
        self.bonds.get(cusip)
    }

    /// All catalogued bonds in ascending maturity order.
    #[must_use]
    pub fn bonds(&self) -> Vec<Bond> {
        let mut bonds: Vec<Bond> = self.bonds.values().cloned().collect();
        bonds.sort_by(|a, b| a.maturity.cmp(&b.maturity).then(a.id.cmp(&b.id)));
        bonds
    }

    /// Number of catalogued issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Sector buckets in reporting order (default buckets first, then any
    /// file-introduced buckets alphabetically).
    #[must_use]
    pub fn sectors(&self) -> Vec<BucketedSector> {
        let mut names: Vec<String> = SECTOR_ORDER.iter().map(|s| s.to_string()).collect();
        let mut extra: Vec<String> = self
            .sector_of
            .values()
            .filter(|name| !names.contains(name))
            .cloned()
            .collect();
        extra.sort();
        extra.dedup();
        names.extend(extra);

        names
            .into_iter()
            .map(|name| {
                let products = self
                    .bonds()
                    .into_iter()
                    .filter(|bond| self.sector_of.get(&bond.id) == Some(&name))
                    .collect();
                BucketedSector::new(name, products)
            })
            .filter(|sector| !sector.products.is_empty())
            .collect()
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    bonds: Vec<RawCatalogEntry>,
}

#[derive(Deserialize)]
struct RawCatalogEntry {
    cusip: String,
    #[serde(default = "default_ticker")]
    ticker: String,
    #[serde(default)]
    coupon: String,
    maturity: String,
    #[serde(default = "default_sector")]
    sector: String,
}

fn default_ticker() -> String {
    "T".into()
}

fn default_sector() -> String {
    "Belly".into()
}

impl RawCatalogEntry {
    fn into_typed(self) -> Result<(Bond, String), CatalogError> {
        let coupon = if self.coupon.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from_str(&self.coupon).map_err(|_| CatalogError::InvalidEntry {
                cusip: self.cusip.clone(),
                field: "coupon",
                value: self.coupon.clone(),
            })?
        };
        let maturity =
            NaiveDate::from_str(&self.maturity).map_err(|_| CatalogError::InvalidEntry {
                cusip: self.cusip.clone(),
                field: "maturity",
                value: self.maturity.clone(),
            })?;
        Ok((
            Bond::cusip(self.cusip, self.ticker, coupon, maturity),
            self.sector,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_the_benchmark_curve() {
        let catalog = BondCatalog::builtin();
        assert_eq!(catalog.len(), 6);
        assert!(catalog.get("9128285Q9").is_some());
        assert!(catalog.get("000000000").is_none());
        let bonds = catalog.bonds();
        assert!(bonds.windows(2).all(|w| w[0].maturity <= w[1].maturity));
    }

    #[test]
    fn sectors_partition_the_builtin_catalog() {
        let catalog = BondCatalog::builtin();
        let sectors = catalog.sectors();
        let names: Vec<&str> = sectors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["FrontEnd", "Belly", "LongEnd"]);
        assert!(sectors.iter().all(|s| s.products.len() == 2));
    }

    #[test]
    fn file_entries_extend_and_override() {
        let toml = r#"
            [[bonds]]
            cusip = "9128285Q9"
            ticker = "UST2Y"
            coupon = "2.750"
            maturity = "2020-11-30"
            sector = "FrontEnd"

            [[bonds]]
            cusip = "912828XX1"
            maturity = "2033-06-30"
            sector = "LongEnd"
        "#;
        let file: CatalogFile = toml::from_str(toml).unwrap();
        let mut catalog = BondCatalog::builtin();
        for raw in file.bonds {
            let (bond, sector) = raw.into_typed().unwrap();
            catalog.insert(bond, &sector);
        }
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.get("9128285Q9").unwrap().ticker, "UST2Y");
        let long_end = catalog
            .sectors()
            .into_iter()
            .find(|s| s.name == "LongEnd")
            .unwrap();
        assert_eq!(long_end.products.len(), 3);
    }
}
