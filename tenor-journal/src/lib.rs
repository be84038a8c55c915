//! Append-only historical sinks.
//!
//! Each derived entity gets a `{HistoryService, HistoryListener,
//! JournalConnector}` triple: the listener hangs off the producing service,
//! the history service keeps the latest record per key, and the connector
//! appends one timestamped line per event to the entity's log file. Sinks
//! are terminal; none feeds another stage.

mod records;

pub use records::{JournalRecord, RiskHistoryListener};

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::Local;
use tenor_service::{Connector, Service, ServiceCore, ServiceListener};
use tracing::warn;

/// Append-only text log with `%F %T` local timestamps.
pub struct JournalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JournalWriter {
    /// Open (creating directories and the file as needed) for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open journal {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Append one raw line (no timestamp prefix).
    pub fn append_raw(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }

    /// Append one timestamped record line.
    pub fn append(&mut self, body: &str) -> Result<()> {
        let stamp = Local::now().format("%F %T");
        self.append_raw(&format!("{stamp} , {body}"))
    }

    /// Path this journal appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sink-side connector: formats a record and appends it to the journal.
pub struct JournalConnector<R> {
    writer: JournalWriter,
    _marker: PhantomData<R>,
}

impl<R: JournalRecord> JournalConnector<R> {
    /// Open the connector for `R`'s log file under `output_dir`.
    pub fn open(output_dir: &Path) -> Result<Self> {
        Ok(Self {
            writer: JournalWriter::open(output_dir.join(R::FILE_NAME))?,
            _marker: PhantomData,
        })
    }
}

impl<R: JournalRecord> Connector<R> for JournalConnector<R> {
    fn publish(&mut self, event: &R) -> Result<()> {
        self.writer.append(&event.journal_body())
    }
}

/// Terminal keyed store that persists every event it is shown.
pub struct HistoryService<R> {
    core: ServiceCore<String, R>,
    connector: JournalConnector<R>,
}

impl<R: JournalRecord + Clone + Default> HistoryService<R> {
    /// Build the sink for `R` writing under `output_dir`.
    pub fn open(output_dir: &Path) -> Result<Self> {
        Ok(Self {
            core: ServiceCore::new(),
            connector: JournalConnector::open(output_dir)?,
        })
    }

    /// Upsert by the record's key and append its journal line.
    pub fn persist(&mut self, record: &R) -> Result<()> {
        self.core
            .upsert_and_publish(record.journal_key(), record.clone());
        self.connector.publish(record)
    }

    /// Append an extra timestamped line alongside the record stream.
    pub fn append_summary(&mut self, body: &str) -> Result<()> {
        self.connector.writer.append(body)
    }

    /// Number of distinct keys persisted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }
}

impl<R: JournalRecord + Clone + Default> Service<String, R> for HistoryService<R> {
    fn get_data(&self, key: &String) -> R {
        self.core.get_or_default(key)
    }

    fn on_message(&mut self, event: R) {
        if let Err(err) = self.persist(&event) {
            warn!(error = %err, file = R::FILE_NAME, "failed to persist history record");
        }
    }

    fn add_listener(&mut self, listener: Box<dyn ServiceListener<R>>) {
        self.core.add_listener(listener);
    }

    fn listeners(&self) -> &[Box<dyn ServiceListener<R>>] {
        self.core.listeners()
    }
}

/// Listener feeding a producing service's events into its history sink.
pub struct HistoryListener<R> {
    service: Rc<RefCell<HistoryService<R>>>,
}

impl<R: JournalRecord + Clone + Default> HistoryListener<R> {
    pub fn new(service: Rc<RefCell<HistoryService<R>>>) -> Self {
        Self { service }
    }
}

impl<R: JournalRecord + Clone + Default> ServiceListener<R> for HistoryListener<R> {
    fn process_add(&mut self, event: &R) {
        if let Err(err) = self.service.borrow_mut().persist(event) {
            warn!(error = %err, file = R::FILE_NAME, "failed to persist history record");
        }
    }
}
