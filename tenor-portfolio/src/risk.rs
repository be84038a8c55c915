//! PV01 risk accumulated from the position stream, with on-demand sector
//! bucketing.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;
use tenor_core::{BucketedRisk, BucketedSector, Position, ProductId, Pv01};
use tenor_service::{Service, ServiceCore, ServiceListener};

/// Dollar PV01 accrued per unit of aggregate position.
fn pv01_per_unit() -> Decimal {
    Decimal::new(1, 6)
}

/// Vends PV01 per security and aggregates it across bucketed sectors.
/// Keyed on product id.
#[derive(Default)]
pub struct RiskService {
    core: ServiceCore<ProductId, Pv01>,
}

impl RiskService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one position update into the product's risk and publish it.
    pub fn add_position(&mut self, position: &Position) {
        let key = position.product.id.clone();
        let mut risk = match self.core.get(&key) {
            Some(existing) => existing.clone(),
            None => Pv01::new(position.product.clone()),
        };
        let aggregate = position.aggregate_position();
        risk.add_pv01(pv01_per_unit() * Decimal::from(aggregate));
        risk.add_quantity(aggregate);
        self.core.upsert_and_publish(key, risk);
    }

    /// Sum risk across every sector member present in the store. Absent
    /// products are skipped; the aggregate is computed on demand and not
    /// persisted.
    #[must_use]
    pub fn bucketed_risk(&self, sector: &BucketedSector) -> BucketedRisk {
        let mut bucketed = BucketedRisk {
            sector: sector.clone(),
            pv01: Decimal::ZERO,
            quantity: 0,
        };
        for product in &sector.products {
            if let Some(risk) = self.core.get(&product.id) {
                bucketed.pv01 += risk.pv01;
                bucketed.quantity += risk.quantity;
            }
        }
        bucketed
    }
}

impl Service<ProductId, Pv01> for RiskService {
    fn get_data(&self, key: &ProductId) -> Pv01 {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: Pv01) {
        self.core.upsert_and_publish(event.product.id.clone(), event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<Pv01>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<Pv01>>] {
        self.core.listeners()
    }
}

/// Folds every published position into the risk store.
pub struct RiskListener {
    service: Rc<RefCell<RiskService>>,
}

impl RiskListener {
    pub fn new(service: Rc<RefCell<RiskService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<Position> for RiskListener {
    fn process_add(&mut self, event: &Position) {
        self.service.borrow_mut().add_position(event);
    }
}

#[cfg(test)]
mod tests {
    use tenor_core::{Bond, Side, Trade};

    use super::*;

    fn bond(id: &str) -> Bond {
        Bond::cusip(id, "T", Decimal::ZERO, Default::default())
    }

    fn position_after(trades: &[(&str, i64, Side)]) -> Vec<Position> {
        // replays the trade sequence, returning the position after each one
        let mut position = Position::new(bond("9128285M8"));
        let mut snapshots = Vec::new();
        for (idx, (book, qty, side)) in trades.iter().enumerate() {
            position.apply(&Trade {
                product: bond("9128285M8"),
                trade_id: format!("T{idx}"),
                price: Decimal::from(100),
                book: (*book).into(),
                quantity: *qty,
                side: *side,
            });
            snapshots.push(position.clone());
        }
        snapshots
    }

    #[test]
    fn pv01_accumulates_the_published_aggregates() {
        let mut service = RiskService::new();
        for snapshot in position_after(&[
            ("TRSY1", 1_000_000, Side::Buy),
            ("TRSY2", 2_000_000, Side::Sell),
            ("TRSY1", 500_000, Side::Buy),
        ]) {
            service.add_position(&snapshot);
        }
        let risk = service.get_data(&"9128285M8".to_string());
        // 1e-6 * 1,000,000 + 1e-6 * -1,000,000 + 1e-6 * -500,000
        assert_eq!(risk.pv01, Decimal::new(-5, 1));
        assert_eq!(risk.quantity, -500_000);
    }

    #[test]
    fn first_touch_allocates_zeroed_risk() {
        let mut service = RiskService::new();
        let empty = Position::new(bond("9128285M8"));
        service.add_position(&empty);
        let risk = service.get_data(&"9128285M8".to_string());
        assert_eq!(risk.pv01, Decimal::ZERO);
        assert_eq!(risk.quantity, 0);
    }

    #[test]
    fn bucketed_risk_skips_absent_products() {
        let mut service = RiskService::new();
        for snapshot in position_after(&[("TRSY1", 2_000_000, Side::Buy)]) {
            service.add_position(&snapshot);
        }
        let sector = BucketedSector::new("LongEnd", vec![bond("9128285M8"), bond("912810SE9")]);
        let bucketed = service.bucketed_risk(&sector);
        assert_eq!(bucketed.quantity, 2_000_000);
        assert_eq!(bucketed.pv01, Decimal::from(2));
        assert_eq!(bucketed.sector.name, "LongEnd");
    }
}
