//! Static graph construction and the batch run loop.
//!
//! Construction order is dependency order: sinks first, then stage
//! services wired listener-by-listener, then the four source connectors
//! subscribed in sequence (prices, trades, market data, inquiries). Every
//! listener is registered before any connector is driven.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use tenor_config::AppConfig;
use tenor_core::{BucketedRisk, ExecutionOrder, Inquiry, Position, PriceStream, Pv01};
use tenor_data::{
    InquiryFeedConnector, MarketDataFeedConnector, PriceFeedConnector, TradeFeedConnector,
};
use tenor_execution::{
    AlgoExecutionListener, AlgoExecutionService, ExecutionListener, ExecutionService,
};
use tenor_inquiry::InquiryService;
use tenor_journal::{HistoryListener, HistoryService, RiskHistoryListener};
use tenor_markets::BondCatalog;
use tenor_marketdata::MarketDataService;
use tenor_portfolio::risk::{RiskListener, RiskService};
use tenor_portfolio::{PositionListener, PositionService, TradeBookingListener, TradeBookingService};
use tenor_pricing::gui::{GuiConnector, GuiListener, GuiService};
use tenor_pricing::{
    AlgoStreamingListener, AlgoStreamingService, PricingService, StreamingListener,
    StreamingService,
};
use tenor_service::{Connector, Service};
use tracing::info;

/// End-of-run counters surfaced to the operator and the tests.
#[derive(Debug)]
pub struct RunReport {
    /// Orders generated by the execution algo.
    pub orders_generated: u64,
    /// Trades synthesized from executions (file trades not included).
    pub trades_booked: u64,
    /// GUI records actually persisted (post cap and throttle).
    pub gui_records: usize,
    /// Distinct inquiries persisted.
    pub inquiries_seen: usize,
    /// Risk aggregated per configured sector, in reporting order.
    pub sector_risk: Vec<BucketedRisk>,
}

/// Build the service graph, drain all four inputs through it, and report.
pub fn run_pipeline(config: &AppConfig) -> Result<RunReport> {
    let catalog = Rc::new(match &config.catalog_file {
        Some(path) => BondCatalog::load_from_file(path)
            .with_context(|| format!("failed to load bond catalog {}", path.display()))?,
        None => BondCatalog::builtin(),
    });
    info!(
        bonds = catalog.len(),
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        "starting pipeline"
    );

    let output_dir = config.output_dir.as_path();
    let streaming_history: Rc<RefCell<HistoryService<PriceStream>>> =
        Rc::new(RefCell::new(HistoryService::open(output_dir)?));
    let position_history: Rc<RefCell<HistoryService<Position>>> =
        Rc::new(RefCell::new(HistoryService::open(output_dir)?));
    let risk_history: Rc<RefCell<HistoryService<Pv01>>> =
        Rc::new(RefCell::new(HistoryService::open(output_dir)?));
    let execution_history: Rc<RefCell<HistoryService<ExecutionOrder>>> =
        Rc::new(RefCell::new(HistoryService::open(output_dir)?));
    let inquiry_history: Rc<RefCell<HistoryService<Inquiry>>> =
        Rc::new(RefCell::new(HistoryService::open(output_dir)?));

    // Pricing fan-out: the sizing policy first, then the GUI tap.
    let pricing = Rc::new(RefCell::new(PricingService::new()));
    let algo_streaming = Rc::new(RefCell::new(AlgoStreamingService::new()));
    let streaming = Rc::new(RefCell::new(StreamingService::new()));
    streaming
        .borrow_mut()
        .add_listener(Box::new(HistoryListener::new(Rc::clone(&streaming_history))));
    algo_streaming
        .borrow_mut()
        .add_listener(Box::new(StreamingListener::new(Rc::clone(&streaming))));
    pricing
        .borrow_mut()
        .add_listener(Box::new(AlgoStreamingListener::new(Rc::clone(&algo_streaming))));
    let gui_connector = GuiConnector::create(
        output_dir,
        Duration::from_millis(config.gui.throttle_ms),
    )?;
    let gui = Rc::new(RefCell::new(GuiService::new(
        gui_connector,
        config.gui.max_records,
    )));
    pricing
        .borrow_mut()
        .add_listener(Box::new(GuiListener::new(Rc::clone(&gui))));

    // Booking chain, shared between the trade file and execution feedback.
    let trade_booking = Rc::new(RefCell::new(TradeBookingService::new()));
    let positions = Rc::new(RefCell::new(PositionService::new()));
    let risk = Rc::new(RefCell::new(RiskService::new()));
    trade_booking
        .borrow_mut()
        .add_listener(Box::new(PositionListener::new(Rc::clone(&positions))));
    positions
        .borrow_mut()
        .add_listener(Box::new(HistoryListener::new(Rc::clone(&position_history))));
    positions
        .borrow_mut()
        .add_listener(Box::new(RiskListener::new(Rc::clone(&risk))));
    risk.borrow_mut().add_listener(Box::new(RiskHistoryListener::new(
        Rc::clone(&risk_history),
        catalog.sectors(),
    )));

    // Market data into the execution algo, executions back into booking.
    let market_data = Rc::new(RefCell::new(MarketDataService::new()));
    let algo_execution = Rc::new(RefCell::new(AlgoExecutionService::new(
        config.execution.aggress_pricing,
    )));
    let execution = Rc::new(RefCell::new(ExecutionService::new()));
    market_data
        .borrow_mut()
        .add_listener(Box::new(AlgoExecutionListener::new(Rc::clone(&algo_execution))));
    algo_execution
        .borrow_mut()
        .add_listener(Box::new(ExecutionListener::new(Rc::clone(&execution))));
    execution
        .borrow_mut()
        .add_listener(Box::new(HistoryListener::new(Rc::clone(&execution_history))));
    execution
        .borrow_mut()
        .add_listener(Box::new(TradeBookingListener::new(Rc::clone(&trade_booking))));

    // Inquiry lifecycle straight into its sink.
    let inquiries = Rc::new(RefCell::new(InquiryService::new()));
    inquiries
        .borrow_mut()
        .add_listener(Box::new(HistoryListener::new(Rc::clone(&inquiry_history))));

    // Registration is complete; drain the inputs in order.
    let input_dir = config.input_dir.as_path();
    PriceFeedConnector::new(
        input_dir.join("prices.txt"),
        Rc::clone(&catalog),
        Rc::clone(&pricing),
    )
    .subscribe()
    .context("price feed failed")?;
    TradeFeedConnector::new(
        input_dir.join("trades.txt"),
        Rc::clone(&catalog),
        Rc::clone(&trade_booking),
    )
    .subscribe()
    .context("trade feed failed")?;
    MarketDataFeedConnector::new(
        input_dir.join("marketdata.txt"),
        Rc::clone(&catalog),
        Rc::clone(&market_data),
    )
    .subscribe()
    .context("market data feed failed")?;
    InquiryFeedConnector::new(
        input_dir.join("inquiries.txt"),
        Rc::clone(&catalog),
        Rc::clone(&inquiries),
    )
    .subscribe()
    .context("inquiry feed failed")?;

    let sector_risk: Vec<BucketedRisk> = catalog
        .sectors()
        .iter()
        .map(|sector| risk.borrow().bucketed_risk(sector))
        .collect();
    for bucket in &sector_risk {
        info!(
            sector = %bucket.sector.name,
            pv01 = %bucket.pv01,
            quantity = bucket.quantity,
            "sector risk"
        );
    }

    let report = RunReport {
        orders_generated: algo_execution.borrow().order_count(),
        trades_booked: trade_booking.borrow().booked_count(),
        gui_records: gui.borrow().emitted(),
        inquiries_seen: inquiry_history.borrow().len(),
        sector_risk,
    };
    info!(
        orders = report.orders_generated,
        booked = report.trades_booked,
        gui = report.gui_records,
        inquiries = report.inquiries_seen,
        "pipeline drained"
    );
    Ok(report)
}
