//! Inquiry stage: the RECEIVED → QUOTED → DONE quoting lifecycle.
//!
//! A RECEIVED inquiry is stored and published, then quoted back to the
//! client. The quote turnaround arrives as a second `on_message` hop with
//! state QUOTED, which is published as-is and immediately confirmed DONE.
//! A completed inquiry therefore publishes three times, in lifecycle order.

use rust_decimal::Decimal;
use tenor_core::{Inquiry, InquiryState, Price};
use tenor_service::{Service, ServiceCore, ServiceListener};
use tracing::debug;

/// Price every inquiry is quoted at.
fn standard_quote() -> Price {
    Decimal::from(100)
}

/// Owns customer inquiries through their lifecycle. Keyed on inquiry id
/// (not product id: every inquiry is unique).
#[derive(Default)]
pub struct InquiryService {
    core: ServiceCore<String, Inquiry>,
}

impl InquiryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote a stored inquiry back to the client. Only inquiries still
    /// awaiting a response are quoted; the client confirmation re-enters
    /// `on_message` with state QUOTED.
    pub fn send_quote(&mut self, inquiry_id: &str, price: Price) {
        let Some(stored) = self.core.get(&inquiry_id.to_string()) else {
            return;
        };
        if stored.state != InquiryState::Received {
            return;
        }
        let mut quoted = stored.clone();
        quoted.price = price;
        quoted.state = InquiryState::Quoted;
        debug!(inquiry_id, %price, "quoting inquiry");
        self.on_message(quoted);
    }

    /// Reserved: rejection is not part of this pipeline's flow. REJECTED
    /// and CUSTOMER_REJECTED only appear when the input already carries
    /// them.
    pub fn reject_inquiry(&mut self, _inquiry_id: &str) {}
}

impl Service<String, Inquiry> for InquiryService {
    fn get_data(&self, key: &String) -> Inquiry {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, mut event: Inquiry) {
        let inquiry_id = event.inquiry_id.clone();
        match event.state {
            InquiryState::Received => {
                self.core.upsert_and_publish(inquiry_id.clone(), event);
                self.send_quote(&inquiry_id, standard_quote());
            }
            InquiryState::Quoted => {
                self.core
                    .upsert_and_publish(inquiry_id.clone(), event.clone());
                event.state = InquiryState::Done;
                self.core.upsert_and_publish(inquiry_id, event);
            }
            // Terminal states: last writer wins.
            _ => self.core.upsert_and_publish(inquiry_id, event),
        }
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<Inquiry>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<Inquiry>>] {
        self.core.listeners()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tenor_core::{Bond, Side};

    use super::*;

    fn inquiry(id: &str, state: InquiryState) -> Inquiry {
        Inquiry {
            inquiry_id: id.into(),
            product: Bond::cusip("9128285M8", "T", Decimal::ZERO, Default::default()),
            side: Side::Buy,
            quantity: 1_000_000,
            price: Decimal::new(995, 1),
            state,
        }
    }

    /// Captures each published (state, price) pair.
    struct StateTrace(Rc<RefCell<Vec<(InquiryState, Price)>>>);

    impl ServiceListener<Inquiry> for StateTrace {
        fn process_add(&mut self, event: &Inquiry) {
            self.0.borrow_mut().push((event.state, event.price));
        }
    }

    #[test]
    fn received_inquiry_walks_the_full_lifecycle() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let mut service = InquiryService::new();
        service.add_listener(Box::new(StateTrace(Rc::clone(&trace))));

        service.on_message(inquiry("INQ1", InquiryState::Received));

        let quote = Decimal::from(100);
        assert_eq!(
            *trace.borrow(),
            vec![
                (InquiryState::Received, Decimal::new(995, 1)),
                (InquiryState::Quoted, quote),
                (InquiryState::Done, quote),
            ]
        );
        let stored = service.get_data(&"INQ1".to_string());
        assert_eq!(stored.state, InquiryState::Done);
        assert_eq!(stored.price, quote);
    }

    #[test]
    fn terminal_states_are_stored_without_further_transitions() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let mut service = InquiryService::new();
        service.add_listener(Box::new(StateTrace(Rc::clone(&trace))));

        service.on_message(inquiry("INQ2", InquiryState::Rejected));
        assert_eq!(trace.borrow().len(), 1);
        assert_eq!(
            service.get_data(&"INQ2".to_string()).state,
            InquiryState::Rejected
        );
    }

    #[test]
    fn quoting_a_missing_or_advanced_inquiry_is_a_no_op() {
        let mut service = InquiryService::new();
        service.send_quote("ABSENT", Decimal::from(100));
        assert_eq!(
            service.get_data(&"ABSENT".to_string()).state,
            InquiryState::Received // default-constructed entity
        );

        service.on_message(inquiry("INQ3", InquiryState::Done));
        service.send_quote("INQ3", Decimal::from(100));
        let stored = service.get_data(&"INQ3".to_string());
        assert_eq!(stored.state, InquiryState::Done);
        assert_eq!(stored.price, Decimal::new(995, 1));
    }
}
