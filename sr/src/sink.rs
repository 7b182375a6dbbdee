//! Durable line sink - single writer thread for report rows
//!
//! Publishers push rows from any thread without blocking; one dedicated
//! consumer thread owns every file write. Rows reach their files in the
//! order they entered the channel.
//!
//! Each row is written with its own open/append/flush/close cycle (plus
//! `sync_data` when enabled), so a row that was written before a crash is
//! complete on disk and earlier rows are never rewritten. Throughput is
//! traded for that guarantee; there is no batching.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{SinkError, SinkFault};
use crate::report::Line;

/// Default bound on a stalled drain at shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const THREAD_NAME: &str = "seqreport-sink";

/// Sink tuning
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkSettings {
    /// How long `uninstall` waits for the consumer to write another row
    pub shutdown_timeout: Duration,
    /// Call `sync_data` after every row
    pub fsync: bool,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            fsync: true,
        }
    }
}

struct SinkRecord {
    path: Arc<PathBuf>,
    line: Line,
}

#[derive(Default)]
struct SinkShared {
    fault: Mutex<Option<SinkFault>>,
    lines_written: AtomicU64,
}

struct Worker {
    tx: mpsc::UnboundedSender<SinkRecord>,
    done_rx: std_mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

/// Queue plus writer thread for report rows
pub struct LineSink {
    settings: SinkSettings,
    worker: Mutex<Option<Worker>>,
    shared: Arc<SinkShared>,
}

impl LineSink {
    /// Create a sink; no thread runs until [`LineSink::install`]
    pub fn new(settings: SinkSettings) -> Self {
        debug!(?settings, "LineSink::new: called");
        Self {
            settings,
            worker: Mutex::new(None),
            shared: Arc::new(SinkShared::default()),
        }
    }

    /// Start the consumer thread
    pub fn install(&self) -> Result<(), SinkError> {
        debug!("LineSink::install: called");
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.is_some() {
            return Err(SinkError::AlreadyInstalled);
        }

        *self.shared.fault.lock().unwrap_or_else(|e| e.into_inner()) = None;

        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = std_mpsc::channel();
        let shared = self.shared.clone();
        let fsync = self.settings.fsync;
        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || consume(rx, shared, fsync, done_tx))
            .map_err(SinkError::Spawn)?;

        *worker = Some(Worker { tx, done_rx, handle });
        info!("LineSink installed");
        Ok(())
    }

    pub fn is_installed(&self) -> bool {
        self.worker.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Queue a row for `path`; never blocks on IO
    pub fn push(&self, path: &Arc<PathBuf>, line: Line) -> Result<(), SinkError> {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        let worker = worker.as_ref().ok_or(SinkError::NotInstalled)?;
        worker
            .tx
            .send(SinkRecord {
                path: path.clone(),
                line,
            })
            .map_err(|_| SinkError::Closed)
    }

    /// Close the queue and wait for every queued row to be written
    ///
    /// A no-op when not installed. Waits as long as the consumer keeps
    /// writing; fails with [`SinkError::ShutdownTimeout`] once a full timeout
    /// passes without a row being written (the thread is left to finish on
    /// its own), and with [`SinkError::Faulted`] if the consumer stopped on a
    /// write failure.
    pub fn uninstall(&self) -> Result<(), SinkError> {
        debug!("LineSink::uninstall: called");
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(Worker { tx, done_rx, handle }) = worker else {
            debug!("LineSink::uninstall: not installed");
            return Ok(());
        };

        // Dropping the only sender is the shutdown signal
        drop(tx);

        // The timeout bounds a stall, not the whole drain
        let mut written = self.lines_written();
        loop {
            match done_rx.recv_timeout(self.settings.shutdown_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if handle.join().is_err() {
                        error!("LineSink: consumer thread panicked");
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = self.lines_written();
                    if now > written {
                        debug!(written = now, "LineSink::uninstall: still draining");
                        written = now;
                        continue;
                    }
                    warn!(timeout = ?self.settings.shutdown_timeout, "LineSink: drain stalled, detaching consumer");
                    return Err(SinkError::ShutdownTimeout(self.settings.shutdown_timeout));
                }
            }
        }

        if let Some(fault) = self.fault() {
            return Err(SinkError::Faulted(fault));
        }

        info!(lines_written = self.lines_written(), "LineSink uninstalled");
        Ok(())
    }

    /// The write failure that stopped the consumer, if any
    pub fn fault(&self) -> Option<SinkFault> {
        self.shared.fault.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Rows written since the sink was created
    pub fn lines_written(&self) -> u64 {
        self.shared.lines_written.load(Ordering::SeqCst)
    }
}

impl Default for LineSink {
    fn default() -> Self {
        Self::new(SinkSettings::default())
    }
}

impl Drop for LineSink {
    fn drop(&mut self) {
        let worker = self.worker.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if worker.is_some() {
            // Sender drops with the worker; the thread drains and exits detached
            debug!("LineSink dropped while installed, detaching consumer");
        }
    }
}

fn consume(
    mut rx: mpsc::UnboundedReceiver<SinkRecord>,
    shared: Arc<SinkShared>,
    fsync: bool,
    done_tx: std_mpsc::Sender<()>,
) {
    debug!("consume: called");
    while let Some(record) = rx.blocking_recv() {
        if let Err(e) = append_line(&record.path, &record.line, fsync) {
            error!(path = %record.path.display(), error = %e, "LineSink: write failed, stopping consumer");
            rx.close();
            *shared.fault.lock().unwrap_or_else(|e| e.into_inner()) = Some(SinkFault {
                path: record.path.to_path_buf(),
                message: e.to_string(),
            });
            break;
        }
        shared.lines_written.fetch_add(1, Ordering::SeqCst);
    }
    debug!("consume: exiting");
    let _ = done_tx.send(());
}

fn append_line(path: &Path, line: &Line, fsync: bool) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        // Tolerates the directory already existing, including creation races
        fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.to_row().as_bytes())?;
    file.flush()?;
    if fsync {
        file.sync_data()?;
    }
    Ok(())
}
