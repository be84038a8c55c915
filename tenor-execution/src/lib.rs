//! Execution stage: spread-gated order generation off the top of the book,
//! and the service that works the resulting orders on a venue.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tenor_core::{
    AggressPricing, AlgoExecution, ExecutionOrder, OrderBook, OrderType, PricingSide, ProductId,
    Quantity, Venue,
};
use tenor_service::{Service, ServiceCore, ServiceListener};
use tracing::{debug, info};

/// Both quantities on every generated order.
const ORDER_QUANTITY: Quantity = 1_000_000;

/// Widest top-of-book spread the algo will cross: 2/128 of a point.
fn max_crossable_spread() -> Decimal {
    Decimal::new(15625, 6)
}

/// Generates a market-aggressing order whenever the inside spread is tight
/// enough, alternating the side it aggresses.
pub struct AlgoExecutionService {
    core: ServiceCore<String, AlgoExecution>,
    order_count: u64,
    rng: SmallRng,
    pricing: AggressPricing,
}

impl AlgoExecutionService {
    #[must_use]
    pub fn new(pricing: AggressPricing) -> Self {
        Self::with_seed(pricing, 0)
    }

    /// Deterministic construction for reproducible runs and tests.
    #[must_use]
    pub fn with_seed(pricing: AggressPricing, seed: u64) -> Self {
        Self {
            core: ServiceCore::new(),
            order_count: 0,
            rng: SmallRng::seed_from_u64(seed),
            pricing,
        }
    }

    /// Orders generated so far.
    #[must_use]
    pub fn order_count(&self) -> u64 {
        self.order_count
    }

    /// Inspect the book and, if the inside spread is within the crossable
    /// threshold, emit one market order against the resting best price.
    pub fn execute_algo(&mut self, book: &OrderBook) {
        let (Some(best_bid), Some(best_offer)) = (book.best_bid(), book.best_offer()) else {
            return;
        };
        let spread = best_offer.price - best_bid.price;
        if spread > max_crossable_spread() {
            debug!(product = %book.product.id, %spread, "spread too wide, standing down");
            return;
        }

        self.order_count += 1;
        let side = if self.order_count % 2 == 1 {
            PricingSide::Bid
        } else {
            PricingSide::Offer
        };
        let price = match (self.pricing, side) {
            (AggressPricing::Natural, PricingSide::Bid) => best_offer.price,
            (AggressPricing::Natural, PricingSide::Offer) => best_bid.price,
            (AggressPricing::SameSide, PricingSide::Bid) => best_bid.price,
            (AggressPricing::SameSide, PricingSide::Offer) => best_offer.price,
        };
        let parent_order_id = format!("{}-{}", self.order_count, self.rng.gen_range(0..10));
        let order_id = format!("{parent_order_id}{}", self.rng.gen_range(0..1_000_000));
        let order = ExecutionOrder {
            product: book.product.clone(),
            side,
            order_id: order_id.clone(),
            order_type: OrderType::Market,
            price,
            visible_quantity: ORDER_QUANTITY,
            hidden_quantity: ORDER_QUANTITY,
            parent_order_id,
            is_child_order: false,
        };
        self.core
            .upsert_and_publish(order_id, AlgoExecution::new(order));
    }
}

impl Service<String, AlgoExecution> for AlgoExecutionService {
    fn get_data(&self, key: &String) -> AlgoExecution {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: AlgoExecution) {
        let key = event.execution_order.order_id.clone();
        self.core.upsert_and_publish(key, event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<AlgoExecution>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<AlgoExecution>>] {
        self.core.listeners()
    }
}

/// Feeds each accepted book into the execution algo.
pub struct AlgoExecutionListener {
    service: Rc<RefCell<AlgoExecutionService>>,
}

impl AlgoExecutionListener {
    pub fn new(service: Rc<RefCell<AlgoExecutionService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<OrderBook> for AlgoExecutionListener {
    fn process_add(&mut self, event: &OrderBook) {
        self.service.borrow_mut().execute_algo(event);
    }
}

/// Works generated orders on a venue.
///
/// Keyed on product id: one live order per product, later orders replace
/// earlier ones. Re-key on order id if concurrent per-product orders ever
/// need to be retained.
#[derive(Default)]
pub struct ExecutionService {
    core: ServiceCore<ProductId, ExecutionOrder>,
}

impl ExecutionService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the order as the product's live execution and publish it. The
    /// venue shows up only in the published event.
    pub fn execute_order(&mut self, order: &ExecutionOrder, venue: Venue) {
        info!(
            order_id = %order.order_id,
            product = %order.product.id,
            side = %order.side,
            price = %order.price,
            %venue,
            "executing order"
        );
        self.core
            .upsert_and_publish(order.product.id.clone(), order.clone());
    }
}

impl Service<ProductId, ExecutionOrder> for ExecutionService {
    fn get_data(&self, key: &ProductId) -> ExecutionOrder {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: ExecutionOrder) {
        self.execute_order(&event, Venue::BrokerTec);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<ExecutionOrder>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<ExecutionOrder>>] {
        self.core.listeners()
    }
}

/// Routes every algo execution to the venue-facing service.
pub struct ExecutionListener {
    service: Rc<RefCell<ExecutionService>>,
}

impl ExecutionListener {
    pub fn new(service: Rc<RefCell<ExecutionService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<AlgoExecution> for ExecutionListener {
    fn process_add(&mut self, event: &AlgoExecution) {
        self.service
            .borrow_mut()
            .execute_order(&event.execution_order, Venue::BrokerTec);
    }
}

#[cfg(test)]
mod tests {
    use tenor_core::{Bond, OrderBookLevel};
    use tenor_core::tick32::parse_price32;

    use super::*;

    fn book(bid: &str, offer: &str) -> OrderBook {
        let bond = Bond::cusip("9128285M8", "T", Decimal::ZERO, Default::default());
        OrderBook::new(
            bond,
            vec![OrderBookLevel::new(
                PricingSide::Bid,
                parse_price32(bid).unwrap(),
                1_000_000,
            )],
            vec![OrderBookLevel::new(
                PricingSide::Offer,
                parse_price32(offer).unwrap(),
                1_000_000,
            )],
        )
    }

    /// Counts emissions without caring about payloads.
    struct Tally(Rc<RefCell<usize>>);

    impl ServiceListener<AlgoExecution> for Tally {
        fn process_add(&mut self, _event: &AlgoExecution) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn fires_at_exactly_the_threshold_spread() {
        let fired = Rc::new(RefCell::new(0));
        let mut service = AlgoExecutionService::with_seed(AggressPricing::Natural, 7);
        service.add_listener(Box::new(Tally(Rc::clone(&fired))));

        // 4/256 == 2/128: fires
        service.execute_algo(&book("99-000", "99-00+"));
        assert_eq!(*fired.borrow(), 1);

        // 10/256 > 2/128: stands down
        service.execute_algo(&book("99-000", "99-012"));
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(service.order_count(), 1);
    }

    #[test]
    fn sides_alternate_and_ids_chain_off_the_counter() {
        let mut service = AlgoExecutionService::with_seed(AggressPricing::Natural, 7);
        let captured = Rc::new(RefCell::new(Vec::new()));

        struct Capture(Rc<RefCell<Vec<ExecutionOrder>>>);
        impl ServiceListener<AlgoExecution> for Capture {
            fn process_add(&mut self, event: &AlgoExecution) {
                self.0.borrow_mut().push(event.execution_order.clone());
            }
        }
        service.add_listener(Box::new(Capture(Rc::clone(&captured))));

        service.execute_algo(&book("99-000", "99-001"));
        service.execute_algo(&book("99-000", "99-001"));
        let orders = captured.borrow();
        assert_eq!(orders[0].side, PricingSide::Bid);
        assert_eq!(orders[1].side, PricingSide::Offer);
        assert!(orders[0].parent_order_id.starts_with("1-"));
        assert!(orders[1].parent_order_id.starts_with("2-"));
        assert!(orders[0].order_id.starts_with(&orders[0].parent_order_id));
        assert_eq!(orders[0].order_type, OrderType::Market);
        assert_eq!(orders[0].visible_quantity, 1_000_000);
        assert_eq!(orders[0].hidden_quantity, 1_000_000);
        assert!(!orders[0].is_child_order);
    }

    #[test]
    fn pricing_convention_selects_the_touch() {
        for (mode, bid_side_price, offer_side_price) in [
            (AggressPricing::Natural, "99-001", "99-000"),
            (AggressPricing::SameSide, "99-000", "99-001"),
        ] {
            let captured = Rc::new(RefCell::new(Vec::new()));
            struct Capture(Rc<RefCell<Vec<ExecutionOrder>>>);
            impl ServiceListener<AlgoExecution> for Capture {
                fn process_add(&mut self, event: &AlgoExecution) {
                    self.0.borrow_mut().push(event.execution_order.clone());
                }
            }
            let mut service = AlgoExecutionService::with_seed(mode, 7);
            service.add_listener(Box::new(Capture(Rc::clone(&captured))));
            service.execute_algo(&book("99-000", "99-001"));
            service.execute_algo(&book("99-000", "99-001"));

            let orders = captured.borrow();
            assert_eq!(orders[0].price, parse_price32(bid_side_price).unwrap());
            assert_eq!(orders[1].price, parse_price32(offer_side_price).unwrap());
        }
    }

    #[test]
    fn execution_service_keeps_one_live_order_per_product() {
        let mut algo = AlgoExecutionService::with_seed(AggressPricing::Natural, 7);

        struct Forward(Rc<RefCell<ExecutionService>>);
        impl ServiceListener<AlgoExecution> for Forward {
            fn process_add(&mut self, event: &AlgoExecution) {
                self.0
                    .borrow_mut()
                    .execute_order(&event.execution_order, Venue::Cme);
            }
        }
        let shared = Rc::new(RefCell::new(ExecutionService::new()));
        algo.add_listener(Box::new(Forward(Rc::clone(&shared))));

        algo.execute_algo(&book("99-000", "99-001"));
        algo.execute_algo(&book("99-000", "99-001"));

        let live = shared.borrow().get_data(&"9128285M8".to_string());
        assert!(live.parent_order_id.starts_with("2-"));
    }
}
