//! CSV report generation
//!
//! ```text
//! EventBus ──► CsvReporter ──► SessionRecorder ──► record::* ──► Line
//!                                     │
//!                                     ▼
//!                            LineSink (writer thread) ──► <script>-<ts>.csv
//! ```
//!
//! Row layouts (report format 1):
//!
//! ```text
//! 0.00,Sequence,started=<ts>,fixate-version=<v>,test-script-name=<name>,test_script-version=<v>,report-format=1
//! <t>,Test <i>,start,<description>,<long description>
//! <t>,Test <i>,test-parameters,<name>=<value>,...
//! <t>,Test <i>,check<n>,<kind>,<description>,<PASS|FAIL>,<observed>[,nominal][,min][,max][,tolerance]
//! <t>,Test <i>,exception,<exception>
//! <t>,Test <i>,end,<PASS|FAIL|ERROR>,checks-passed=<n>,checks-failed=<n>
//! <t>,Sequence,ended=<ts>,<status word>,tests-passed=<n>,tests-failed=<n>,tests-error=<n>,tests-skipped=<n>,sequence=<STATUS>
//! ```

mod line;
pub mod naming;
pub mod reader;
pub mod record;
mod reporter;
mod session;

pub use line::{FIELD_SEPARATOR, Line, ROW_TERMINATOR};
pub use naming::ScriptIdentity;
pub use reader::{ReportSummary, parse_rows, read_report};
pub use record::{REPORT_FORMAT_VERSION, SequenceTotals};
pub use reporter::CsvReporter;
pub use session::{CheckTally, RUNNING_STATUS, ReportSettings, SessionInfo, SessionPhase, SessionRecorder};
