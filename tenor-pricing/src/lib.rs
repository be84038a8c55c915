//! Pricing stage: mid/spread ingestion fanned out to the streaming
//! derivation and the throttled GUI tap.

pub mod gui;

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;
use tenor_core::{
    AlgoStream, MidPrice, PriceStream, PriceStreamOrder, PricingSide, ProductId, Quantity,
};
use tenor_service::{Service, ServiceCore, ServiceListener};
use tracing::debug;

/// Base visible size streamed on each side; alternates with its double.
const BASE_VISIBLE: Quantity = 1_000_000;

/// Keyed store of the latest internal mid/spread tick per product.
#[derive(Default)]
pub struct PricingService {
    core: ServiceCore<ProductId, MidPrice>,
}

impl PricingService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ProductId, MidPrice> for PricingService {
    fn get_data(&self, key: &ProductId) -> MidPrice {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: MidPrice) {
        self.core.upsert_and_publish(event.product.id.clone(), event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<MidPrice>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<MidPrice>>] {
        self.core.listeners()
    }
}

/// Sizing policy: turns each mid tick into a sized two-way market.
///
/// The quoted prices sit half the spread either side of the mid; visible
/// size alternates between 1M and 2M per accepted tick and the hidden size
/// is always twice the visible.
#[derive(Default)]
pub struct AlgoStreamingService {
    core: ServiceCore<ProductId, AlgoStream>,
    double_next: bool,
}

impl AlgoStreamingService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive (or refresh) the two-way stream for the tick's product and
    /// publish it.
    pub fn add_price(&mut self, price: &MidPrice) {
        let half_spread = price.bid_offer_spread / Decimal::from(2);
        let visible = if self.double_next {
            2 * BASE_VISIBLE
        } else {
            BASE_VISIBLE
        };
        self.double_next = !self.double_next;
        let hidden = 2 * visible;
        let stream = PriceStream {
            product: price.product.clone(),
            bid_order: PriceStreamOrder::new(
                PricingSide::Bid,
                price.mid - half_spread,
                visible,
                hidden,
            ),
            offer_order: PriceStreamOrder::new(
                PricingSide::Offer,
                price.mid + half_spread,
                visible,
                hidden,
            ),
        };
        debug!(product = %price.product.id, bid = %stream.bid_order.price, ask = %stream.offer_order.price, "derived stream");
        self.core
            .upsert_and_publish(price.product.id.clone(), AlgoStream::new(stream));
    }
}

impl Service<ProductId, AlgoStream> for AlgoStreamingService {
    fn get_data(&self, key: &ProductId) -> AlgoStream {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: AlgoStream) {
        let key = event.price_stream.product.id.clone();
        self.core.upsert_and_publish(key, event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<AlgoStream>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<AlgoStream>>] {
        self.core.listeners()
    }
}

/// Feeds pricing events into the sizing policy.
pub struct AlgoStreamingListener {
    service: Rc<RefCell<AlgoStreamingService>>,
}

impl AlgoStreamingListener {
    pub fn new(service: Rc<RefCell<AlgoStreamingService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<MidPrice> for AlgoStreamingListener {
    fn process_add(&mut self, event: &MidPrice) {
        self.service.borrow_mut().add_price(event);
    }
}

/// Publication channel for derived two-way markets.
#[derive(Default)]
pub struct StreamingService {
    core: ServiceCore<ProductId, PriceStream>,
}

impl StreamingService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the stream for its product and publish it downstream.
    pub fn publish_price(&mut self, stream: PriceStream) {
        self.core.upsert_and_publish(stream.product.id.clone(), stream);
    }
}

impl Service<ProductId, PriceStream> for StreamingService {
    fn get_data(&self, key: &ProductId) -> PriceStream {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: PriceStream) {
        self.publish_price(event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<PriceStream>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<PriceStream>>] {
        self.core.listeners()
    }
}

/// Forwards sized streams from the policy into the publication channel.
pub struct StreamingListener {
    service: Rc<RefCell<StreamingService>>,
}

impl StreamingListener {
    pub fn new(service: Rc<RefCell<StreamingService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<AlgoStream> for StreamingListener {
    fn process_add(&mut self, event: &AlgoStream) {
        self.service
            .borrow_mut()
            .publish_price(event.price_stream.clone());
    }
}
