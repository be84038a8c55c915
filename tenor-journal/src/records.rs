//! Per-entity journal formats.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rust_decimal::Decimal;
use tenor_core::{
    BucketedSector, ExecutionOrder, Inquiry, Position, PriceStream, ProductId, Pv01, Quantity,
};
use tenor_service::ServiceListener;
use tracing::warn;

use crate::HistoryService;

/// A derived entity that knows how to appear in its history log.
pub trait JournalRecord {
    /// File the record stream is appended to, relative to the output dir.
    const FILE_NAME: &'static str;

    /// Upsert key within the history store.
    fn journal_key(&self) -> String;

    /// Record body; the writer prefixes the timestamp.
    fn journal_body(&self) -> String;
}

impl JournalRecord for PriceStream {
    const FILE_NAME: &'static str = "streaming.txt";

    fn journal_key(&self) -> String {
        self.product.id.clone()
    }

    fn journal_body(&self) -> String {
        let bid = &self.bid_order;
        let ask = &self.offer_order;
        format!(
            "CUSIP: {} , Bid: {} , BidVisibleQuantity: {} , BidHiddenQuantity: {} , \
             Ask: {} , AskVisibleQuantity: {} , AskHiddenQuantity: {}",
            self.product.id,
            bid.price,
            bid.visible_quantity,
            bid.hidden_quantity,
            ask.price,
            ask.visible_quantity,
            ask.hidden_quantity,
        )
    }
}

impl JournalRecord for Position {
    const FILE_NAME: &'static str = "positions.txt";

    fn journal_key(&self) -> String {
        self.product.id.clone()
    }

    fn journal_body(&self) -> String {
        let mut body = format!(
            "CUSIP: {} , AggregatePosition: {}",
            self.product.id,
            self.aggregate_position()
        );
        for book in ["TRSY0", "TRSY1", "TRSY2"] {
            body.push_str(&format!(" , {book}: {}", self.book_position(book)));
        }
        body
    }
}

impl JournalRecord for Pv01 {
    const FILE_NAME: &'static str = "risk.txt";

    fn journal_key(&self) -> String {
        self.product.id.clone()
    }

    fn journal_body(&self) -> String {
        format!(
            "CUSIP: {} , PV01: {} , Quantity: {}",
            self.product.id, self.pv01, self.quantity
        )
    }
}

impl JournalRecord for ExecutionOrder {
    const FILE_NAME: &'static str = "executions.txt";

    fn journal_key(&self) -> String {
        self.product.id.clone()
    }

    fn journal_body(&self) -> String {
        format!(
            "OrderId: {} , CUSIP: {} , Side: {} , Price: {} , VisibleQuantity: {} , \
             HiddenQuantity: {} , ParentOrderId: {} , IsChildOrder: {}",
            self.order_id,
            self.product.id,
            self.side,
            self.price,
            self.visible_quantity,
            self.hidden_quantity,
            self.parent_order_id,
            if self.is_child_order { "Yes" } else { "No" },
        )
    }
}

impl JournalRecord for Inquiry {
    const FILE_NAME: &'static str = "allinquiries.txt";

    fn journal_key(&self) -> String {
        self.inquiry_id.clone()
    }

    fn journal_body(&self) -> String {
        format!(
            "InquiryID: {} , CUSIP: {} , InquiryState: {} , Side: {} , Price: {} , Quantity: {}",
            self.inquiry_id, self.product.id, self.state, self.side, self.price, self.quantity
        )
    }
}

/// Risk sink listener.
///
/// Writes the per-security PV01 record followed by a synthetic sector
/// summary line. The listener tracks the latest PV01 per product itself so
/// the bucketed sums never require querying back into the risk service from
/// inside its own dispatch.
pub struct RiskHistoryListener {
    service: Rc<RefCell<HistoryService<Pv01>>>,
    sectors: Vec<BucketedSector>,
    latest: HashMap<ProductId, (Decimal, Quantity)>,
}

impl RiskHistoryListener {
    pub fn new(service: Rc<RefCell<HistoryService<Pv01>>>, sectors: Vec<BucketedSector>) -> Self {
        Self {
            service,
            sectors,
            latest: HashMap::new(),
        }
    }

    fn summary_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.sectors.len());
        for sector in &self.sectors {
            let pv01: Decimal = sector
                .products
                .iter()
                .filter_map(|bond| self.latest.get(&bond.id))
                .map(|(pv01, _)| *pv01)
                .sum();
            parts.push(format!("{} PV01: {}", sector.name, pv01));
        }
        parts.join(" , ")
    }
}

impl ServiceListener<Pv01> for RiskHistoryListener {
    fn process_add(&mut self, event: &Pv01) {
        self.latest
            .insert(event.product.id.clone(), (event.pv01, event.quantity));
        let mut service = self.service.borrow_mut();
        let persisted = service
            .persist(event)
            .and_then(|()| service.append_summary(&self.summary_line()));
        if let Err(err) = persisted {
            warn!(error = %err, "failed to persist risk record");
        }
    }
}

#[cfg(test)]
mod tests {
    use tenor_core::Bond;

    use super::*;

    fn pv01(cusip: &str, pv01: Decimal, quantity: Quantity) -> Pv01 {
        Pv01 {
            product: Bond::cusip(cusip, "T", Decimal::ZERO, Default::default()),
            pv01,
            quantity,
        }
    }

    #[test]
    fn risk_sink_emits_record_and_sector_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Rc::new(RefCell::new(HistoryService::open(dir.path()).unwrap()));
        let sectors = vec![
            BucketedSector::new(
                "FrontEnd",
                vec![Bond::cusip("AAA", "T", Decimal::ZERO, Default::default())],
            ),
            BucketedSector::new(
                "LongEnd",
                vec![Bond::cusip("ZZZ", "T", Decimal::ZERO, Default::default())],
            ),
        ];
        let mut listener = RiskHistoryListener::new(Rc::clone(&sink), sectors);

        listener.process_add(&pv01("AAA", Decimal::new(15, 1), 1_000_000));
        listener.process_add(&pv01("ZZZ", Decimal::new(5, 1), 500_000));

        let contents = std::fs::read_to_string(dir.path().join("risk.txt")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("CUSIP: AAA"));
        assert!(lines[1].contains("FrontEnd PV01: 1.5"));
        assert!(lines[1].contains("LongEnd PV01: 0"));
        assert!(lines[3].contains("LongEnd PV01: 0.5"));
    }

    #[test]
    fn position_body_reports_fixed_book_columns() {
        let mut position = Position::new(Bond::cusip(
            "9128285M8",
            "T",
            Decimal::ZERO,
            Default::default(),
        ));
        position.apply(&tenor_core::Trade {
            product: Bond::cusip("9128285M8", "T", Decimal::ZERO, Default::default()),
            trade_id: "T1".into(),
            price: Decimal::from(100),
            book: "TRSY1".into(),
            quantity: 2_000_000,
            side: tenor_core::Side::Buy,
        });
        let body = position.journal_body();
        assert!(body.contains("AggregatePosition: 2000000"));
        assert!(body.contains("TRSY0: 0"));
        assert!(body.contains("TRSY1: 2000000"));
        assert!(body.contains("TRSY2: 0"));
    }
}
