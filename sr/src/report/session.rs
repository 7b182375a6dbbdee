//! Session state - the per-run state machine behind the CSV report
//!
//! Turns sequence events into rows: tracks the open session, the monotonic
//! start reference for elapsed times, the per-test check counter and the
//! per-test pass/fail tally. All handler work happens under one lock, so
//! concurrent publishers cannot interleave a counter update with another
//! event's row.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::{ReportError, ReportResult};
use crate::events::{CheckDescriptor, SequenceEvent, TestInfo, TestStatus};
use crate::sink::{LineSink, SinkSettings};

use super::naming::{self, ScriptIdentity};
use super::record::{self, SequenceTotals};

/// Status word of a `Sequence_Update` that opens a session
pub const RUNNING_STATUS: &str = "Running";

/// Source of the check counts written on test end rows
///
/// The sequencer usually owns these counters; when no tally is supplied the
/// recorder counts the checks it sees for the current test.
pub trait CheckTally: Send + Sync {
    fn checks_passed(&self) -> u64;
    fn checks_failed(&self) -> u64;
}

/// Lifecycle of the recorder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session has run yet
    Idle,
    /// A session is open and rows are being written
    Running,
    Completed,
    Aborted,
    Failed,
}

impl SessionPhase {
    /// Terminal phase named by a sequence status word
    pub fn from_status_word(word: &str) -> Self {
        let word = word.to_uppercase();
        if word.contains("ABORT") {
            SessionPhase::Aborted
        } else if word.contains("FAIL") {
            SessionPhase::Failed
        } else {
            SessionPhase::Completed
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Aborted | SessionPhase::Failed)
    }
}

/// Everything the recorder needs besides the events themselves
#[derive(Clone, Debug)]
pub struct ReportSettings {
    /// Directory reports are written to
    pub output_dir: PathBuf,
    /// Value of the header's `fixate-version=` field
    pub framework_version: String,
    /// Script the sequence runs
    pub script: ScriptIdentity,
    /// Writer thread tuning
    pub sink: SinkSettings,
}

impl ReportSettings {
    pub fn new(output_dir: impl Into<PathBuf>, script: ScriptIdentity) -> Self {
        Self {
            output_dir: output_dir.into(),
            framework_version: env!("CARGO_PKG_VERSION").to_string(),
            script,
            sink: SinkSettings::default(),
        }
    }
}

/// Snapshot of the open session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// Run timestamp, shared by the file name and the header
    pub started: String,
    pub path: PathBuf,
    pub script: ScriptIdentity,
    pub report_format: u32,
}

struct Session {
    started: String,
    start: Instant,
    path: Arc<PathBuf>,
}

impl Session {
    fn elapsed(&self) -> String {
        record::format_elapsed(self.start.elapsed())
    }
}

struct RecorderState {
    session: Option<Session>,
    phase: SessionPhase,
    reports: Vec<PathBuf>,
    current_test: Option<u32>,
    check_count: u32,
    checks_passed: u64,
    checks_failed: u64,
}

impl RecorderState {
    fn reset_test_counters(&mut self) {
        self.check_count = 0;
        self.checks_passed = 0;
        self.checks_failed = 0;
    }
}

/// Per-run state machine feeding a [`LineSink`]
pub struct SessionRecorder {
    settings: ReportSettings,
    sink: Arc<LineSink>,
    tally: Option<Arc<dyn CheckTally>>,
    state: Mutex<RecorderState>,
}

impl SessionRecorder {
    pub fn new(settings: ReportSettings, sink: Arc<LineSink>) -> Self {
        debug!(output_dir = %settings.output_dir.display(), script = %settings.script.name, "SessionRecorder::new: called");
        Self {
            settings,
            sink,
            tally: None,
            state: Mutex::new(RecorderState {
                session: None,
                phase: SessionPhase::Idle,
                reports: Vec::new(),
                current_test: None,
                check_count: 0,
                checks_passed: 0,
                checks_failed: 0,
            }),
        }
    }

    /// Read end-row check counts from an external tally
    pub fn with_tally(mut self, tally: Arc<dyn CheckTally>) -> Self {
        self.tally = Some(tally);
        self
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route an event to its handler
    pub fn handle(&self, event: &SequenceEvent) -> ReportResult {
        match event {
            SequenceEvent::SequenceUpdate { status } => self.sequence_update(status),
            SequenceEvent::SequenceComplete {
                status,
                passed,
                failed,
                error,
                skipped,
                sequence_status,
            } => self.sequence_complete(
                status,
                SequenceTotals {
                    passed: *passed,
                    failed: *failed,
                    error: *error,
                    skipped: *skipped,
                },
                sequence_status,
            ),
            SequenceEvent::TestStart { test, test_index } => self.test_start(test, *test_index),
            SequenceEvent::TestException { exception, test_index } => self.test_exception(exception, *test_index),
            SequenceEvent::Check {
                passed,
                check,
                test_index,
                check_count,
            } => self.check(*passed, check, *test_index, *check_count),
            SequenceEvent::TestComplete {
                test,
                test_index,
                status,
            } => self.test_complete(test, *test_index, *status),
        }
    }

    /// Open a session when the sequencer reports it is running
    pub fn sequence_update(&self, status: &str) -> ReportResult {
        debug!(%status, "sequence_update: called");
        if !status.eq_ignore_ascii_case(RUNNING_STATUS) {
            debug!(%status, "sequence_update: not a run start, ignoring");
            return Ok(());
        }

        let mut state = self.lock();
        if state.session.is_some() {
            debug!("sequence_update: session already running, ignoring");
            return Ok(());
        }

        let started = naming::run_timestamp(Local::now());
        let path = Arc::new(naming::report_path(
            &self.settings.output_dir,
            &self.settings.script.name,
            &started,
        ));
        let session = Session {
            started,
            start: Instant::now(),
            path,
        };
        let header = record::session_header(&session.started, &self.settings.framework_version, &self.settings.script);
        info!(path = %session.path.display(), started = %session.started, "Sequence session started");

        self.sink.push(&session.path, header)?;
        state.reset_test_counters();
        state.current_test = None;
        state.phase = SessionPhase::Running;
        state.reports.push(session.path.to_path_buf());
        state.session = Some(session);
        Ok(())
    }

    /// Write the footer and close the session
    pub fn sequence_complete(&self, status: &str, totals: SequenceTotals, sequence_status: &str) -> ReportResult {
        debug!(%status, %sequence_status, ?totals, "sequence_complete: called");
        let mut state = self.lock();
        let session = state.session.take().ok_or(ReportError::NoActiveSession)?;

        let ended = naming::run_timestamp(Local::now());
        let footer = record::session_footer(&session.elapsed(), &ended, status, totals, sequence_status);

        state.phase = SessionPhase::from_status_word(sequence_status);
        state.current_test = None;
        state.reset_test_counters();
        info!(phase = ?state.phase, path = %session.path.display(), "Sequence session ended");
        self.sink.push(&session.path, footer)?;
        Ok(())
    }

    pub fn test_start(&self, test: &TestInfo, test_index: u32) -> ReportResult {
        debug!(test_index, description = %test.description, "test_start: called");
        let mut state = self.lock();
        let session = state.session.as_ref().ok_or(ReportError::NoActiveSession)?;

        let elapsed = session.elapsed();
        let start = record::test_start(&elapsed, test_index, test);
        let params = record::test_parameters(&session.elapsed(), test_index, test);
        let path = session.path.clone();

        state.current_test = Some(test_index);
        state.checks_passed = 0;
        state.checks_failed = 0;
        self.sink.push(&path, start)?;
        if let Some(params) = params {
            self.sink.push(&path, params)?;
        }
        Ok(())
    }

    /// Write a check row, numbering checks from 1 within the test
    pub fn check(
        &self,
        passed: bool,
        check: &CheckDescriptor,
        test_index: u32,
        published_count: Option<u32>,
    ) -> ReportResult {
        debug!(test_index, passed, kind = %check.kind, "check: called");
        let mut state = self.lock();
        let session = state.session.as_ref().ok_or(ReportError::NoActiveSession)?;

        let number = state.check_count + 1;
        if let Some(count) = published_count.filter(|c| *c != number) {
            debug!(count, number, "check: publisher count differs, using own numbering");
        }
        let line = record::check(&session.elapsed(), test_index, number, passed, check)?;
        let path = session.path.clone();

        state.check_count = number;
        if passed {
            state.checks_passed += 1;
        } else {
            state.checks_failed += 1;
        }
        self.sink.push(&path, line)?;
        Ok(())
    }

    pub fn test_exception(&self, exception: &str, test_index: u32) -> ReportResult {
        debug!(test_index, %exception, "test_exception: called");
        let state = self.lock();
        let session = state.session.as_ref().ok_or(ReportError::NoActiveSession)?;
        let line = record::test_exception(&session.elapsed(), test_index, exception);
        self.sink.push(&session.path, line)?;
        Ok(())
    }

    /// Write the end row and reset the check counter
    pub fn test_complete(&self, test: &TestInfo, test_index: u32, status: TestStatus) -> ReportResult {
        debug!(test_index, %status, description = %test.description, "test_complete: called");
        let mut state = self.lock();
        let session = state.session.as_ref().ok_or(ReportError::NoActiveSession)?;

        let (passed, failed) = match &self.tally {
            Some(tally) => (tally.checks_passed(), tally.checks_failed()),
            None => (state.checks_passed, state.checks_failed),
        };
        if state.current_test.is_some_and(|current| current != test_index) {
            warn!(test_index, current = ?state.current_test, "test_complete: index differs from started test");
        }
        let line = record::test_end(&session.elapsed(), test_index, status, passed, failed);
        let path = session.path.clone();

        state.reset_test_counters();
        state.current_test = None;
        self.sink.push(&path, line)?;
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    /// The open session, if any
    pub fn session(&self) -> Option<SessionInfo> {
        let state = self.lock();
        state.session.as_ref().map(|s| SessionInfo {
            started: s.started.clone(),
            path: s.path.to_path_buf(),
            script: self.settings.script.clone(),
            report_format: record::REPORT_FORMAT_VERSION,
        })
    }

    /// Report file of the current or most recent session
    pub fn report_path(&self) -> Option<PathBuf> {
        self.lock().reports.last().cloned()
    }

    /// Report files of every session this recorder has opened, oldest first
    pub fn report_paths(&self) -> Vec<PathBuf> {
        self.lock().reports.clone()
    }

    /// Checks recorded so far for the current test
    pub fn check_count(&self) -> u32 {
        self.lock().check_count
    }

    pub fn current_test(&self) -> Option<u32> {
        self.lock().current_test
    }
}
