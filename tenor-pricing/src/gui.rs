//! Throttled GUI tap on the pricing stream.
//!
//! The tap persists at most `max_records` ticks per run and keeps
//! consecutive records at least `min_interval` apart by sleeping on the
//! monotonic clock. Ticks beyond the cap are stored but silently dropped
//! from the log.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use tenor_core::{MidPrice, ProductId};
use tenor_service::{Connector, Service, ServiceCore, ServiceListener};
use tracing::warn;

/// Sink-side connector writing the capped, paced `gui.txt` feed.
pub struct GuiConnector {
    writer: BufWriter<File>,
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl GuiConnector {
    /// Create `gui.txt` fresh (header included) under `output_dir`.
    pub fn create(output_dir: &Path, min_interval: Duration) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create directory {}", output_dir.display()))?;
        let path = output_dir.join("gui.txt");
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "Time, CUSIP, Mid, Spread")
            .with_context(|| format!("failed to write header to {}", path.display()))?;
        Ok(Self {
            writer,
            min_interval,
            last_emit: None,
        })
    }
}

impl Connector<MidPrice> for GuiConnector {
    fn publish(&mut self, event: &MidPrice) -> Result<()> {
        if let Some(last) = self.last_emit {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        let stamp = Local::now().format("%F %T");
        writeln!(
            self.writer,
            "{stamp} , {} , {} , {}",
            event.product.id, event.mid, event.bid_offer_spread
        )?;
        self.writer.flush()?;
        self.last_emit = Some(Instant::now());
        Ok(())
    }
}

/// Record-capped store in front of the GUI connector.
pub struct GuiService {
    core: ServiceCore<ProductId, MidPrice>,
    connector: GuiConnector,
    emitted: usize,
    max_records: usize,
}

impl GuiService {
    pub fn new(connector: GuiConnector, max_records: usize) -> Self {
        Self {
            core: ServiceCore::new(),
            connector,
            emitted: 0,
            max_records,
        }
    }

    /// Store the tick; forward it to the log while under the record cap.
    pub fn print_price(&mut self, price: &MidPrice) {
        self.core
            .upsert_and_publish(price.product.id.clone(), price.clone());
        if self.emitted >= self.max_records {
            return;
        }
        match self.connector.publish(price) {
            Ok(()) => self.emitted += 1,
            Err(err) => warn!(error = %err, "failed to write gui record"),
        }
    }

    /// Records persisted so far this run.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Service<ProductId, MidPrice> for GuiService {
    fn get_data(&self, key: &ProductId) -> MidPrice {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: MidPrice) {
        self.print_price(&event);
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<MidPrice>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<MidPrice>>] {
        self.core.listeners()
    }
}

/// Second listener on the pricing service; taps ticks into the GUI feed.
pub struct GuiListener {
    service: Rc<RefCell<GuiService>>,
}

impl GuiListener {
    pub fn new(service: Rc<RefCell<GuiService>>) -> Self {
        Self { service }
    }
}

impl ServiceListener<MidPrice> for GuiListener {
    fn process_add(&mut self, event: &MidPrice) {
        self.service.borrow_mut().print_price(event);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tenor_core::Bond;

    use super::*;

    fn tick(mid: i64) -> MidPrice {
        MidPrice::new(
            Bond::cusip(
                "9128285M8",
                "T",
                Decimal::ZERO,
                NaiveDate::from_ymd_opt(2028, 12, 15).unwrap(),
            ),
            Decimal::from(mid),
            Decimal::ZERO,
        )
    }

    #[test]
    fn cap_limits_persisted_records_but_not_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let connector = GuiConnector::create(dir.path(), Duration::ZERO).unwrap();
        let mut service = GuiService::new(connector, 3);
        for i in 0..10 {
            service.print_price(&tick(100 + i));
        }
        assert_eq!(service.emitted(), 3);
        assert_eq!(
            service.get_data(&"9128285M8".to_string()).mid,
            Decimal::from(109)
        );
        let contents = std::fs::read_to_string(dir.path().join("gui.txt")).unwrap();
        // header plus exactly three records
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn records_are_spaced_by_the_throttle_interval() {
        let dir = tempfile::tempdir().unwrap();
        let interval = Duration::from_millis(20);
        let connector = GuiConnector::create(dir.path(), interval).unwrap();
        let mut service = GuiService::new(connector, 5);
        let started = Instant::now();
        for i in 0..5 {
            service.print_price(&tick(100 + i));
        }
        // four gaps of at least 20ms between five records
        assert!(started.elapsed() >= interval * 4);
        assert_eq!(service.emitted(), 5);
    }
}
