//! Portfolio stage: trade booking with the execution feedback loop, and the
//! per-book position ledger.

pub mod risk;

use std::cell::RefCell;
use std::rc::Rc;

use tenor_core::{ExecutionOrder, Position, PricingSide, ProductId, Side, Trade};
use tenor_service::{Service, ServiceCore, ServiceListener};
use tracing::debug;

/// Books trades against trading books. Keyed on trade id.
///
/// Two producers feed the same instance: the historical trade file and the
/// execution listener, which synthesizes a trade from every executed order.
#[derive(Default)]
pub struct TradeBookingService {
    core: ServiceCore<String, Trade>,
    booked_count: u64,
}

impl TradeBookingService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesize and book a trade for an executed order.
    ///
    /// Side follows the order's aggress side (BID buys), quantity is the
    /// full visible+hidden size, and the book rotates across TSY1..TSY3.
    pub fn book_trade(&mut self, order: &ExecutionOrder) {
        self.booked_count += 1;
        let side = match order.side {
            PricingSide::Bid => Side::Buy,
            PricingSide::Offer => Side::Sell,
        };
        let trade = Trade {
            product: order.product.clone(),
            trade_id: format!("ETrade{}", self.booked_count),
            price: order.price,
            book: format!("TSY{}", self.booked_count % 3 + 1),
            quantity: order.visible_quantity + order.hidden_quantity,
            side,
        };
        debug!(trade_id = %trade.trade_id, book = %trade.book, "booking executed trade");
        self.on_message(trade);
    }

    /// Trades synthesized from executions so far.
    #[must_use]
    pub fn booked_count(&self) -> u64 {
        self.booked_count
    }
}

impl Service<String, Trade> for TradeBookingService {
    fn get_data(&self, key: &String) -> Trade {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: Trade) {
        self.core.upsert_and_publish(event.trade_id.clone(), event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<Trade>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<Trade>>] {
        self.core.listeners()
    }
}

/// Feedback edge: every executed order becomes a booked trade.
pub struct TradeBookingListener {
    service: Rc<RefCell<TradeBookingService>>,
}

impl TradeBookingListener {
    pub fn new(service: Rc<RefCell<TradeBookingService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<ExecutionOrder> for TradeBookingListener {
    fn process_add(&mut self, event: &ExecutionOrder) {
        self.service.borrow_mut().book_trade(event);
    }
}

/// Positions across books and securities. Keyed on product id.
#[derive(Default)]
pub struct PositionService {
    core: ServiceCore<ProductId, Position>,
}

impl PositionService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a trade to its product's ledger and publish the updated
    /// position, so risk sees every ledger change.
    pub fn add_trade(&mut self, trade: &Trade) {
        let key = trade.product.id.clone();
        let mut position = match self.core.get(&key) {
            Some(existing) => existing.clone(),
            None => Position::new(trade.product.clone()),
        };
        position.apply(trade);
        self.core.upsert_and_publish(key, position);
    }
}

impl Service<ProductId, Position> for PositionService {
    fn get_data(&self, key: &ProductId) -> Position {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: Position) {
        self.core.upsert_and_publish(event.product.id.clone(), event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<Position>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<Position>>] {
        self.core.listeners()
    }
}

/// Applies every booked trade to the position ledger.
pub struct PositionListener {
    service: Rc<RefCell<PositionService>>,
}

impl PositionListener {
    pub fn new(service: Rc<RefCell<PositionService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<Trade> for PositionListener {
    fn process_add(&mut self, event: &Trade) {
        self.service.borrow_mut().add_trade(event);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use tenor_core::{Bond, OrderType};

    use super::*;

    fn bond() -> Bond {
        Bond::cusip("9128285M8", "T", Decimal::ZERO, Default::default())
    }

    fn trade(id: &str, book: &str, quantity: i64, side: Side) -> Trade {
        Trade {
            product: bond(),
            trade_id: id.into(),
            price: Decimal::from(100),
            book: book.into(),
            quantity,
            side,
        }
    }

    #[test]
    fn position_service_aggregates_the_trade_sequence() {
        let mut service = PositionService::new();
        service.add_trade(&trade("T1", "TRSY1", 1_000_000, Side::Buy));
        service.add_trade(&trade("T2", "TRSY2", 2_000_000, Side::Sell));
        service.add_trade(&trade("T3", "TRSY1", 500_000, Side::Buy));

        let position = service.get_data(&"9128285M8".to_string());
        assert_eq!(position.book_position("TRSY1"), 1_500_000);
        assert_eq!(position.book_position("TRSY2"), -2_000_000);
        assert_eq!(position.aggregate_position(), -500_000);
    }

    #[test]
    fn booked_trades_rotate_books_and_carry_full_size() {
        let booking = Rc::new(RefCell::new(TradeBookingService::new()));
        let order = ExecutionOrder {
            product: bond(),
            side: PricingSide::Bid,
            order_id: "1-42".into(),
            order_type: OrderType::Market,
            price: Decimal::from(99),
            visible_quantity: 1_000_000,
            hidden_quantity: 1_000_000,
            parent_order_id: "1-4".into(),
            is_child_order: false,
        };
        let mut listener = TradeBookingListener::new(Rc::clone(&booking));
        listener.process_add(&order);
        let mut sell_order = order.clone();
        sell_order.side = PricingSide::Offer;
        listener.process_add(&sell_order);

        let first = booking.borrow().get_data(&"ETrade1".to_string());
        assert_eq!(first.book, "TSY2");
        assert_eq!(first.quantity, 2_000_000);
        assert_eq!(first.side, Side::Buy);
        let second = booking.borrow().get_data(&"ETrade2".to_string());
        assert_eq!(second.book, "TSY3");
        assert_eq!(second.side, Side::Sell);
    }

    #[test]
    fn file_and_execution_trades_merge_into_one_ledger() {
        let positions = Rc::new(RefCell::new(PositionService::new()));
        let booking = Rc::new(RefCell::new(TradeBookingService::new()));
        booking
            .borrow_mut()
            .add_listener(Box::new(PositionListener::new(Rc::clone(&positions))));

        // file-sourced entry point
        booking
            .borrow_mut()
            .on_message(trade("T1", "TRSY1", 1_000_000, Side::Buy));
        // execution-sourced entry point
        booking.borrow_mut().book_trade(&ExecutionOrder {
            product: bond(),
            side: PricingSide::Bid,
            order_id: "1-42".into(),
            order_type: OrderType::Market,
            price: Decimal::from(99),
            visible_quantity: 1_000_000,
            hidden_quantity: 1_000_000,
            parent_order_id: "1-4".into(),
            is_child_order: false,
        });

        let position = positions.borrow().get_data(&"9128285M8".to_string());
        assert_eq!(position.aggregate_position(), 3_000_000);
    }
}
