//! Fundamental data types shared across the entire workspace.

pub mod tick32;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Alias for price precision. Treasury prices land on 1/256 increments, so
/// every value the pipeline produces is exactly representable.
pub type Price = Decimal;
/// Quantities are whole units.
pub type Quantity = i64;
/// Product identifier (a CUSIP for every instrument traded here).
pub type ProductId = String;
/// Name of a trading book positions are partitioned across.
pub type BookName = String;

/// Identifier scheme carried by a bond.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BondIdType {
    #[default]
    Cusip,
    Isin,
}

/// Immutable metadata describing a treasury bond.
///
/// Identity is the product id alone; two `Bond` values with the same id
/// compare equal even if descriptive fields differ.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Bond {
    pub id: ProductId,
    pub id_type: BondIdType,
    pub ticker: String,
    pub coupon: Decimal,
    pub maturity: NaiveDate,
}

impl Bond {
    /// Convenience constructor for a CUSIP-identified bond.
    pub fn cusip(
        id: impl Into<ProductId>,
        ticker: impl Into<String>,
        coupon: Decimal,
        maturity: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            id_type: BondIdType::Cusip,
            ticker: ticker.into(),
            coupon,
            maturity,
        }
    }
}

impl PartialEq for Bond {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Bond {}

/// Side of a resting or streamed order.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PricingSide {
    Bid,
    #[default]
    Offer,
}

impl fmt::Display for PricingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "Bid"),
            Self::Offer => write!(f, "Ask"),
        }
    }
}

/// Direction of a trade or inquiry.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    /// Signed multiplier applied to quantities (+1 buy, -1 sell).
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(format!("unsupported side '{other}'")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Internal mid/spread tick for one product.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MidPrice {
    pub product: Bond,
    pub mid: Price,
    pub bid_offer_spread: Price,
}

impl MidPrice {
    pub fn new(product: Bond, mid: Price, bid_offer_spread: Price) -> Self {
        Self {
            product,
            mid,
            bid_offer_spread,
        }
    }
}

/// A single level in a depth-of-book snapshot.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OrderBookLevel {
    pub side: PricingSide,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderBookLevel {
    pub fn new(side: PricingSide, price: Price, quantity: Quantity) -> Self {
        Self {
            side,
            price,
            quantity,
        }
    }
}

/// The best resting order on each side of a book.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BidOffer {
    pub bid: OrderBookLevel,
    pub offer: OrderBookLevel,
}

/// Depth snapshot: bid levels descending, offer levels ascending.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OrderBook {
    pub product: Bond,
    pub bids: Vec<OrderBookLevel>,
    pub offers: Vec<OrderBookLevel>,
}

impl OrderBook {
    pub fn new(product: Bond, bids: Vec<OrderBookLevel>, offers: Vec<OrderBookLevel>) -> Self {
        Self {
            product,
            bids,
            offers,
        }
    }

    /// Returns the best bid if the stack is non-empty.
    #[must_use]
    pub fn best_bid(&self) -> Option<&OrderBookLevel> {
        self.bids.first()
    }

    /// Returns the best offer if the stack is non-empty.
    #[must_use]
    pub fn best_offer(&self) -> Option<&OrderBookLevel> {
        self.offers.first()
    }
}

/// One side of a streamed two-way market.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PriceStreamOrder {
    pub side: PricingSide,
    pub price: Price,
    pub visible_quantity: Quantity,
    pub hidden_quantity: Quantity,
}

impl PriceStreamOrder {
    pub fn new(
        side: PricingSide,
        price: Price,
        visible_quantity: Quantity,
        hidden_quantity: Quantity,
    ) -> Self {
        Self {
            side,
            price,
            visible_quantity,
            hidden_quantity,
        }
    }
}

/// Streamed two-way market for one product.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PriceStream {
    pub product: Bond,
    pub bid_order: PriceStreamOrder,
    pub offer_order: PriceStreamOrder,
}

/// Output of the streaming sizing policy: the latest two-way market derived
/// from a mid tick.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AlgoStream {
    pub price_stream: PriceStream,
}

impl AlgoStream {
    pub fn new(price_stream: PriceStream) -> Self {
        Self { price_stream }
    }
}

/// An executed trade booked against a particular book.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Trade {
    pub product: Bond,
    pub trade_id: String,
    pub price: Price,
    pub book: BookName,
    pub quantity: Quantity,
    pub side: Side,
}

/// Order execution style.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum OrderType {
    #[default]
    Fok,
    Ioc,
    Market,
    Limit,
    Stop,
}

/// Price assignment convention for market-aggressing orders.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggressPricing {
    /// Price against the touch the order crosses to: a buying aggressor
    /// pays the best offer, a selling aggressor hits the best bid.
    #[default]
    Natural,
    /// Price against the order's own side of the book instead (a bid at
    /// the best bid, an offer at the best offer).
    SameSide,
}

/// Venue an execution is routed to. Recorded in the published event only.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Venue {
    BrokerTec,
    Espeed,
    Cme,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokerTec => write!(f, "BROKERTEC"),
            Self::Espeed => write!(f, "ESPEED"),
            Self::Cme => write!(f, "CME"),
        }
    }
}

/// An order placeable on an exchange.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ExecutionOrder {
    pub product: Bond,
    pub side: PricingSide,
    pub order_id: String,
    pub order_type: OrderType,
    pub price: Price,
    pub visible_quantity: Quantity,
    pub hidden_quantity: Quantity,
    pub parent_order_id: String,
    pub is_child_order: bool,
}

impl Default for ExecutionOrder {
    fn default() -> Self {
        Self {
            product: Bond::default(),
            side: PricingSide::Offer,
            order_id: "0".into(),
            order_type: OrderType::Fok,
            price: Decimal::ZERO,
            visible_quantity: 0,
            hidden_quantity: 0,
            parent_order_id: "0".into(),
            is_child_order: false,
        }
    }
}

/// Output of the execution algo: the order it decided to fire.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AlgoExecution {
    pub execution_order: ExecutionOrder,
}

impl AlgoExecution {
    pub fn new(execution_order: ExecutionOrder) -> Self {
        Self { execution_order }
    }
}

/// Per-book signed position ledger for one product.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Position {
    pub product: Bond,
    books: BTreeMap<BookName, Quantity>,
}

impl Position {
    pub fn new(product: Bond) -> Self {
        Self {
            product,
            books: BTreeMap::new(),
        }
    }

    /// Signed quantity held in one book (zero when the book has no entry).
    #[must_use]
    pub fn book_position(&self, book: &str) -> Quantity {
        self.books.get(book).copied().unwrap_or(0)
    }

    /// Sum of all per-book signed positions.
    #[must_use]
    pub fn aggregate_position(&self) -> Quantity {
        self.books.values().sum()
    }

    /// Books with at least one booked trade, in name order.
    pub fn books(&self) -> impl Iterator<Item = (&BookName, &Quantity)> {
        self.books.iter()
    }

    /// Apply a trade to the ledger. Trades for a different product are
    /// ignored.
    pub fn apply(&mut self, trade: &Trade) {
        if trade.product.id != self.product.id {
            return;
        }
        let signed = trade.side.sign() * trade.quantity;
        *self.books.entry(trade.book.clone()).or_insert(0) += signed;
    }
}

/// PV01 risk for one product, accumulated across position updates.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Pv01 {
    pub product: Bond,
    pub pv01: Decimal,
    pub quantity: Quantity,
}

impl Pv01 {
    pub fn new(product: Bond) -> Self {
        Self {
            product,
            pv01: Decimal::ZERO,
            quantity: 0,
        }
    }

    pub fn add_pv01(&mut self, delta: Decimal) {
        self.pv01 += delta;
    }

    pub fn add_quantity(&mut self, delta: Quantity) {
        self.quantity += delta;
    }
}

/// A named group of products whose risk is summed for portfolio views.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BucketedSector {
    pub name: String,
    pub products: Vec<Bond>,
}

impl BucketedSector {
    pub fn new(name: impl Into<String>, products: Vec<Bond>) -> Self {
        Self {
            name: name.into(),
            products,
        }
    }
}

/// On-demand risk aggregate over one sector.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BucketedRisk {
    pub sector: BucketedSector,
    pub pv01: Decimal,
    pub quantity: Quantity,
}

/// Lifecycle of a customer inquiry.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum InquiryState {
    #[default]
    Received,
    Quoted,
    Done,
    Rejected,
    CustomerRejected,
}

impl FromStr for InquiryState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "RECEIVED" => Ok(Self::Received),
            "QUOTED" => Ok(Self::Quoted),
            "DONE" => Ok(Self::Done),
            "REJECTED" => Ok(Self::Rejected),
            "CUSTOMER_REJECTED" => Ok(Self::CustomerRejected),
            other => Err(format!("unsupported inquiry state '{other}'")),
        }
    }
}

impl fmt::Display for InquiryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Received => "RECEIVED",
            Self::Quoted => "QUOTED",
            Self::Done => "DONE",
            Self::Rejected => "REJECTED",
            Self::CustomerRejected => "CUSTOMER_REJECTED",
        };
        write!(f, "{label}")
    }
}

/// A customer inquiry working through the quoting lifecycle.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Inquiry {
    pub inquiry_id: String,
    pub product: Bond,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub state: InquiryState,
}
