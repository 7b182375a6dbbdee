//! seqreport - durable CSV reports from test sequence events
//!
//! A sequencer publishes lifecycle events (sequence running/complete, test
//! start/exception/complete, checks) on an [`EventBus`]. A [`CsvReporter`]
//! subscribes to them, turns each into one or two report rows and hands the
//! rows to a [`LineSink`], whose single writer thread appends them to the
//! run's report file in arrival order.
//!
//! # Core Concepts
//!
//! - **Synchronous dispatch**: handlers run on the publisher's thread
//! - **One writer**: a dedicated thread owns all file IO; pushes never block
//! - **Durable rows**: every row is its own append, flushed before the next
//! - **Bounded shutdown**: uninstall drains the queue within a timeout
//!
//! # Example
//!
//! ```ignore
//! use seqreport::{CsvReporter, ReportSettings, ScriptIdentity, create_event_bus};
//!
//! let bus = create_event_bus();
//! let settings = ReportSettings::new("reports", ScriptIdentity::from_path("psu_check.py", "3"));
//! let reporter = CsvReporter::new(bus.clone(), settings);
//! reporter.install()?;
//!
//! let publisher = bus.publisher();
//! publisher.sequence_update("Running");
//! // ... tests and checks ...
//! publisher.sequence_complete("Finished", 4, 0, 0, 0, "PASSED");
//!
//! reporter.uninstall()?;
//! ```
//!
//! # Modules
//!
//! - [`events`] - event types and the bus
//! - [`report`] - session state, row formatting, naming, report reading
//! - [`sink`] - the durable writer thread
//! - [`replay`] - event scripts (JSON Lines)
//! - [`config`] - configuration loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod replay;
pub mod report;
pub mod sink;

pub use config::Config;
pub use error::{ReportError, ReportResult, SinkError, SinkFault};
pub use events::{
    CheckDescriptor, CheckKind, EventBus, ReportValue, SequenceEvent, SequencePublisher, TestInfo, TestStatus, Topic,
    create_event_bus,
};
pub use report::{
    CheckTally, CsvReporter, Line, REPORT_FORMAT_VERSION, ReportSettings, ReportSummary, ScriptIdentity, SessionPhase,
    SessionRecorder, read_report,
};
pub use sink::{LineSink, SinkSettings};
