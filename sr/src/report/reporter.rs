//! CSV reporter - wires a session recorder and line sink onto an event bus

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::ReportResult;
use crate::events::{EventBus, SubscriptionId, Topic};
use crate::sink::LineSink;

use super::session::{CheckTally, ReportSettings, SessionRecorder};

/// Subscribes a [`SessionRecorder`] to every sequence topic
///
/// `install` starts the writer thread and subscribes; `uninstall`
/// unsubscribes and then drains the writer. Both are idempotent.
pub struct CsvReporter {
    bus: Arc<EventBus>,
    recorder: Arc<SessionRecorder>,
    sink: Arc<LineSink>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl CsvReporter {
    pub fn new(bus: Arc<EventBus>, settings: ReportSettings) -> Self {
        debug!("CsvReporter::new: called");
        let sink = Arc::new(LineSink::new(settings.sink.clone()));
        let recorder = Arc::new(SessionRecorder::new(settings, sink.clone()));
        Self::from_parts(bus, recorder, sink)
    }

    /// Like [`CsvReporter::new`], reading end-row check counts from `tally`
    pub fn with_tally(bus: Arc<EventBus>, settings: ReportSettings, tally: Arc<dyn CheckTally>) -> Self {
        debug!("CsvReporter::with_tally: called");
        let sink = Arc::new(LineSink::new(settings.sink.clone()));
        let recorder = Arc::new(SessionRecorder::new(settings, sink.clone()).with_tally(tally));
        Self::from_parts(bus, recorder, sink)
    }

    fn from_parts(bus: Arc<EventBus>, recorder: Arc<SessionRecorder>, sink: Arc<LineSink>) -> Self {
        Self {
            bus,
            recorder,
            sink,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Start the writer thread and subscribe to all six topics
    pub fn install(&self) -> ReportResult {
        debug!("CsvReporter::install: called");
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        if !subscriptions.is_empty() {
            debug!("CsvReporter::install: already installed");
            return Ok(());
        }

        self.sink.install()?;
        for topic in Topic::ALL {
            let recorder = self.recorder.clone();
            let id = self.bus.subscribe(topic, move |event| recorder.handle(event));
            subscriptions.push(id);
        }
        info!(topics = subscriptions.len(), "CsvReporter installed");
        Ok(())
    }

    /// Unsubscribe, then wait for every queued row to reach disk
    pub fn uninstall(&self) -> ReportResult {
        debug!("CsvReporter::uninstall: called");
        let subscriptions: Vec<SubscriptionId> = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        if subscriptions.is_empty() {
            debug!("CsvReporter::uninstall: not installed");
            return Ok(());
        }

        for id in subscriptions {
            self.bus.unsubscribe(id);
        }
        self.sink.uninstall()?;
        info!(lines_written = self.sink.lines_written(), "CsvReporter uninstalled");
        Ok(())
    }

    pub fn is_installed(&self) -> bool {
        !self.subscriptions.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    pub fn recorder(&self) -> &Arc<SessionRecorder> {
        &self.recorder
    }

    pub fn sink(&self) -> &Arc<LineSink> {
        &self.sink
    }
}

impl Drop for CsvReporter {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            warn!(error = %e, "CsvReporter: uninstall on drop failed");
        }
    }
}
