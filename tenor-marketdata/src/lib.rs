//! Market-data stage: latest 5-level depth book per product.

use tenor_core::{BidOffer, OrderBook, OrderBookLevel, ProductId};
use tenor_service::{Service, ServiceCore, ServiceListener};

/// Keyed store of the latest order book per product.
#[derive(Default)]
pub struct MarketDataService {
    core: ServiceCore<ProductId, OrderBook>,
}

impl MarketDataService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Top of each stack for a product, when a book with both sides exists.
    #[must_use]
    pub fn best_bid_offer(&self, product_id: &str) -> Option<BidOffer> {
        let book = self.core.get(&product_id.to_string())?;
        Some(BidOffer {
            bid: book.best_bid()?.clone(),
            offer: book.best_offer()?.clone(),
        })
    }

    /// Collapse consecutive same-price levels within each side, summing
    /// quantities. Side ordering is preserved; each run keeps the price of
    /// its first level.
    #[must_use]
    pub fn aggregate_depth(&self, product_id: &str) -> Option<OrderBook> {
        let book = self.core.get(&product_id.to_string())?;
        Some(OrderBook::new(
            book.product.clone(),
            aggregate_stack(&book.bids),
            aggregate_stack(&book.offers),
        ))
    }
}

fn aggregate_stack(stack: &[OrderBookLevel]) -> Vec<OrderBookLevel> {
    let mut aggregated: Vec<OrderBookLevel> = Vec::with_capacity(stack.len());
    for level in stack {
        match aggregated.last_mut() {
            Some(run) if run.price == level.price => run.quantity += level.quantity,
            _ => aggregated.push(level.clone()),
        }
    }
    aggregated
}

impl Service<ProductId, OrderBook> for MarketDataService {
    fn get_data(&self, key: &ProductId) -> OrderBook {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: OrderBook) {
        self.core.upsert_and_publish(event.product.id.clone(), event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<OrderBook>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<OrderBook>>] {
        self.core.listeners()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use tenor_core::{Bond, PricingSide};

    use super::*;

    fn level(side: PricingSide, price: Decimal, quantity: i64) -> OrderBookLevel {
        OrderBookLevel::new(side, price, quantity)
    }

    fn sample_book() -> OrderBook {
        let bond = Bond::cusip("9128285M8", "T", Decimal::ZERO, Default::default());
        OrderBook::new(
            bond,
            vec![
                level(PricingSide::Bid, Decimal::from(100), 1_000_000),
                level(PricingSide::Bid, Decimal::from(100), 2_000_000),
                level(PricingSide::Bid, Decimal::from(99), 3_000_000),
            ],
            vec![
                level(PricingSide::Offer, Decimal::from(101), 1_000_000),
                level(PricingSide::Offer, Decimal::from(102), 2_000_000),
                level(PricingSide::Offer, Decimal::from(102), 2_000_000),
            ],
        )
    }

    #[test]
    fn best_bid_offer_reads_the_top_of_each_stack() {
        let mut service = MarketDataService::new();
        service.on_message(sample_book());
        let best = service.best_bid_offer("9128285M8").unwrap();
        assert_eq!(best.bid.price, Decimal::from(100));
        assert_eq!(best.offer.price, Decimal::from(101));
        assert!(service.best_bid_offer("912810SE9").is_none());
    }

    #[test]
    fn aggregate_depth_merges_runs_including_the_trailing_one() {
        let mut service = MarketDataService::new();
        service.on_message(sample_book());
        let aggregated = service.aggregate_depth("9128285M8").unwrap();

        assert_eq!(aggregated.bids.len(), 2);
        assert_eq!(aggregated.bids[0].price, Decimal::from(100));
        assert_eq!(aggregated.bids[0].quantity, 3_000_000);
        assert_eq!(aggregated.bids[1].quantity, 3_000_000);

        // trailing offer run at 102 must be flushed
        assert_eq!(aggregated.offers.len(), 2);
        assert_eq!(aggregated.offers[1].price, Decimal::from(102));
        assert_eq!(aggregated.offers[1].quantity, 4_000_000);
    }

    #[test]
    fn latest_book_replaces_the_previous_one() {
        let mut service = MarketDataService::new();
        service.on_message(sample_book());
        let mut updated = sample_book();
        updated.bids[0].price = Decimal::from(98);
        updated.bids.truncate(1);
        service.on_message(updated);
        let stored = service.get_data(&"9128285M8".to_string());
        assert_eq!(stored.bids.len(), 1);
        assert_eq!(stored.best_bid().unwrap().price, Decimal::from(98));
    }
}
