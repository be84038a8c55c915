//! Source-side connectors: stream the four CSV input files into their
//! services.
//!
//! Subscribe policy follows the batch posture: a file that cannot be opened
//! aborts the run with one diagnostic; a row that cannot be parsed (bad
//! price text, short record, unknown CUSIP) is warned about and skipped.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use tenor_core::tick32::parse_price32;
use tenor_core::{
    Bond, Inquiry, InquiryState, MidPrice, OrderBook, OrderBookLevel, PricingSide, ProductId,
    Quantity, Side, Trade,
};
use tenor_markets::BondCatalog;
use tenor_service::{Connector, Service};
use tracing::{info, warn};

/// Depth levels carried per side of every market data row.
const BOOK_DEPTH: usize = 5;

fn column<'a>(record: &'a StringRecord, index: usize, name: &str) -> Result<&'a str> {
    record
        .get(index)
        .ok_or_else(|| anyhow!("missing {name} column"))
}

fn quantity_column(record: &StringRecord, index: usize, name: &str) -> Result<Quantity> {
    let text = column(record, index, name)?;
    Quantity::from_str(text).with_context(|| format!("invalid {name} value '{text}'"))
}

fn price_column(record: &StringRecord, index: usize, name: &str) -> Result<tenor_core::Price> {
    let text = column(record, index, name)?;
    parse_price32(text).with_context(|| format!("invalid {name} value '{text}'"))
}

fn bond_column(record: &StringRecord, index: usize, catalog: &BondCatalog) -> Result<Bond> {
    let cusip = column(record, index, "CUSIP")?;
    catalog
        .get(cusip)
        .cloned()
        .ok_or_else(|| anyhow!("unknown CUSIP '{cusip}'"))
}

/// Stream `path`'s data rows through `parse`, feeding accepted entities to
/// `accept`. Returns the number of accepted rows.
fn stream_rows<T>(
    path: &Path,
    mut parse: impl FnMut(&StringRecord) -> Result<T>,
    mut accept: impl FnMut(T),
) -> Result<usize> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open input {}", path.display()))?;
    let mut accepted = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(row, error = %err, file = %path.display(), "skipping unreadable row");
                continue;
            }
        };
        match parse(&record) {
            Ok(entity) => {
                accept(entity);
                accepted += 1;
            }
            Err(err) => {
                warn!(row, error = %err, file = %path.display(), "skipping row");
            }
        }
    }
    info!(file = %path.display(), accepted, "input stream drained");
    Ok(accepted)
}

/// Connector for `prices.txt`: CUSIP, Mid, Spread.
pub struct PriceFeedConnector<S> {
    path: PathBuf,
    catalog: Rc<BondCatalog>,
    service: Rc<RefCell<S>>,
}

impl<S: Service<ProductId, MidPrice>> PriceFeedConnector<S> {
    pub fn new(path: impl Into<PathBuf>, catalog: Rc<BondCatalog>, service: Rc<RefCell<S>>) -> Self {
        Self {
            path: path.into(),
            catalog,
            service,
        }
    }
}

impl<S: Service<ProductId, MidPrice>> Connector<MidPrice> for PriceFeedConnector<S> {
    fn subscribe(&mut self) -> Result<()> {
        let catalog = Rc::clone(&self.catalog);
        let service = Rc::clone(&self.service);
        stream_rows(
            &self.path,
            |record| {
                let product = bond_column(record, 0, &catalog)?;
                let mid = price_column(record, 1, "Mid")?;
                let spread = price_column(record, 2, "Spread")?;
                Ok(MidPrice::new(product, mid, spread))
            },
            |price| service.borrow_mut().on_message(price),
        )?;
        Ok(())
    }
}

/// Connector for `trades.txt`: CUSIP, TradeID, Price, Quantity, Book, Side.
pub struct TradeFeedConnector<S> {
    path: PathBuf,
    catalog: Rc<BondCatalog>,
    service: Rc<RefCell<S>>,
}

impl<S: Service<String, Trade>> TradeFeedConnector<S> {
    pub fn new(path: impl Into<PathBuf>, catalog: Rc<BondCatalog>, service: Rc<RefCell<S>>) -> Self {
        Self {
            path: path.into(),
            catalog,
            service,
        }
    }
}

impl<S: Service<String, Trade>> Connector<Trade> for TradeFeedConnector<S> {
    fn subscribe(&mut self) -> Result<()> {
        let catalog = Rc::clone(&self.catalog);
        let service = Rc::clone(&self.service);
        stream_rows(
            &self.path,
            |record| {
                let product = bond_column(record, 0, &catalog)?;
                let trade_id = column(record, 1, "TradeID")?.to_string();
                let price = price_column(record, 2, "Price")?;
                let quantity = quantity_column(record, 3, "Quantity")?;
                let book = column(record, 4, "Book")?.to_string();
                let side = Side::from_str(column(record, 5, "Side")?).map_err(|err| anyhow!(err))?;
                Ok(Trade {
                    product,
                    trade_id,
                    price,
                    book,
                    quantity,
                    side,
                })
            },
            |trade| service.borrow_mut().on_message(trade),
        )?;
        Ok(())
    }
}

/// Connector for `marketdata.txt`: CUSIP then five (Bid, QB, Ask, QA)
/// level groups, best first.
pub struct MarketDataFeedConnector<S> {
    path: PathBuf,
    catalog: Rc<BondCatalog>,
    service: Rc<RefCell<S>>,
}

impl<S: Service<ProductId, OrderBook>> MarketDataFeedConnector<S> {
    pub fn new(path: impl Into<PathBuf>, catalog: Rc<BondCatalog>, service: Rc<RefCell<S>>) -> Self {
        Self {
            path: path.into(),
            catalog,
            service,
        }
    }
}

impl<S: Service<ProductId, OrderBook>> Connector<OrderBook> for MarketDataFeedConnector<S> {
    fn subscribe(&mut self) -> Result<()> {
        let catalog = Rc::clone(&self.catalog);
        let service = Rc::clone(&self.service);
        stream_rows(
            &self.path,
            |record| {
                let product = bond_column(record, 0, &catalog)?;
                let mut bids = Vec::with_capacity(BOOK_DEPTH);
                let mut offers = Vec::with_capacity(BOOK_DEPTH);
                for level in 0..BOOK_DEPTH {
                    let base = 1 + level * 4;
                    let bid = price_column(record, base, "Bid")?;
                    let bid_quantity = quantity_column(record, base + 1, "QB")?;
                    let offer = price_column(record, base + 2, "Ask")?;
                    let offer_quantity = quantity_column(record, base + 3, "QA")?;
                    bids.push(OrderBookLevel::new(PricingSide::Bid, bid, bid_quantity));
                    offers.push(OrderBookLevel::new(PricingSide::Offer, offer, offer_quantity));
                }
                Ok(OrderBook::new(product, bids, offers))
            },
            |book| service.borrow_mut().on_message(book),
        )?;
        Ok(())
    }
}

/// Connector for `inquiries.txt`: InquiryID, CUSIP, Quantity, Side, Price,
/// InquiryState.
pub struct InquiryFeedConnector<S> {
    path: PathBuf,
    catalog: Rc<BondCatalog>,
    service: Rc<RefCell<S>>,
}

impl<S: Service<String, Inquiry>> InquiryFeedConnector<S> {
    pub fn new(path: impl Into<PathBuf>, catalog: Rc<BondCatalog>, service: Rc<RefCell<S>>) -> Self {
        Self {
            path: path.into(),
            catalog,
            service,
        }
    }
}

impl<S: Service<String, Inquiry>> Connector<Inquiry> for InquiryFeedConnector<S> {
    fn subscribe(&mut self) -> Result<()> {
        let catalog = Rc::clone(&self.catalog);
        let service = Rc::clone(&self.service);
        stream_rows(
            &self.path,
            |record| {
                let inquiry_id = column(record, 0, "InquiryID")?.to_string();
                let product = bond_column(record, 1, &catalog)?;
                let quantity = quantity_column(record, 2, "Quantity")?;
                let side = Side::from_str(column(record, 3, "Side")?).map_err(|err| anyhow!(err))?;
                let price = price_column(record, 4, "Price")?;
                let state = InquiryState::from_str(column(record, 5, "InquiryState")?)
                    .map_err(|err| anyhow!(err))?;
                Ok(Inquiry {
                    inquiry_id,
                    product,
                    side,
                    quantity,
                    price,
                    state,
                })
            },
            |inquiry| service.borrow_mut().on_message(inquiry),
        )?;
        Ok(())
    }
}
