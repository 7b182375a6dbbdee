//! Record formatter - event payloads to report rows
//!
//! Every function here is pure: it takes already-derived values (elapsed
//! time, counters, timestamps) and returns the row in its fixed field order.
//! Downstream parsers depend on these layouts, so field order never changes
//! within a report format version.

use std::time::Duration;

use crate::error::{ReportError, ReportResult};
use crate::events::{CheckDescriptor, CheckField, TestInfo, TestStatus};

use super::line::Line;
use super::naming::ScriptIdentity;

/// Version of the row layout, written into every session header
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// Second field of session header and footer rows
pub const SEQUENCE_TAG: &str = "Sequence";

/// Elapsed value of the session header row
pub const HEADER_ELAPSED: &str = "0.00";

/// Optional check values, in the order they are written
const CHECK_FIELD_ORDER: [CheckField; 4] = [CheckField::Nominal, CheckField::Min, CheckField::Max, CheckField::Tolerance];

/// Test totals carried by a sequence-complete event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceTotals {
    pub passed: u32,
    pub failed: u32,
    pub error: u32,
    pub skipped: u32,
}

/// Seconds with two decimals
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64())
}

/// `Test <index>`
pub fn test_tag(test_index: u32) -> String {
    format!("Test {}", test_index)
}

/// First row of a report
pub fn session_header(started: &str, framework_version: &str, script: &ScriptIdentity) -> Line {
    Line::new()
        .with(HEADER_ELAPSED)
        .with(SEQUENCE_TAG)
        .with(format!("started={}", started))
        .with(format!("fixate-version={}", framework_version))
        .with(format!("test-script-name={}", script.name))
        .with(format!("test_script-version={}", script.version))
        .with(format!("report-format={}", REPORT_FORMAT_VERSION))
}

/// Last row of a report
pub fn session_footer(elapsed: &str, ended: &str, status: &str, totals: SequenceTotals, sequence_status: &str) -> Line {
    Line::new()
        .with(elapsed)
        .with(SEQUENCE_TAG)
        .with(format!("ended={}", ended))
        .with(sequence_status)
        .with(format!("tests-passed={}", totals.passed))
        .with(format!("tests-failed={}", totals.failed))
        .with(format!("tests-error={}", totals.error))
        .with(format!("tests-skipped={}", totals.skipped))
        .with(format!("sequence={}", status.to_uppercase()))
}

pub fn test_start(elapsed: &str, test_index: u32, test: &TestInfo) -> Line {
    Line::new()
        .with(elapsed)
        .with(test_tag(test_index))
        .with("start")
        .with(test.description.as_str())
        .with(test.long_description.as_str())
}

/// Parameters row, or `None` when the test declares no parameters
pub fn test_parameters(elapsed: &str, test_index: u32, test: &TestInfo) -> Option<Line> {
    if test.parameters.is_empty() {
        return None;
    }
    let mut line = Line::new().with(elapsed).with(test_tag(test_index)).with("test-parameters");
    for (name, value) in &test.parameters {
        line.push(format!("{}={}", name, value));
    }
    Some(line)
}

/// Check row
///
/// Fails with [`ReportError::MalformedCheck`] when the descriptor lacks a
/// value its kind requires.
pub fn check(
    elapsed: &str,
    test_index: u32,
    check_number: u32,
    passed: bool,
    check: &CheckDescriptor,
) -> ReportResult<Line> {
    if let Some(field) = check.missing_field() {
        return Err(ReportError::MalformedCheck {
            kind: check.kind,
            field: field.as_str(),
        });
    }

    let mut line = Line::new()
        .with(elapsed)
        .with(test_tag(test_index))
        .with(format!("check{}", check_number))
        .with(check.kind.label())
        .with(check.description.as_str())
        .with(if passed { "PASS" } else { "FAIL" })
        .with(check.observed.as_ref().map(ToString::to_string).unwrap_or_default());
    for value in CHECK_FIELD_ORDER.iter().filter_map(|f| check.field(*f)) {
        line.push(value.to_string());
    }
    Ok(line)
}

pub fn test_exception(elapsed: &str, test_index: u32, exception: &str) -> Line {
    Line::new()
        .with(elapsed)
        .with(test_tag(test_index))
        .with("exception")
        .with(exception)
}

pub fn test_end(elapsed: &str, test_index: u32, status: TestStatus, checks_passed: u64, checks_failed: u64) -> Line {
    Line::new()
        .with(elapsed)
        .with(test_tag(test_index))
        .with("end")
        .with(status.as_str())
        .with(format!("checks-passed={}", checks_passed))
        .with(format!("checks-failed={}", checks_failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CheckKind;

    fn fields(line: &Line) -> Vec<&str> {
        line.fields().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0.00");
        assert_eq!(format_elapsed(Duration::from_millis(1234)), "1.23");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "75.00");
    }

    #[test]
    fn test_session_header_layout() {
        let script = ScriptIdentity::new("psu_check", "4");
        let line = session_header("20240307-090502", "10", &script);
        assert_eq!(
            fields(&line),
            vec![
                "0.00",
                "Sequence",
                "started=20240307-090502",
                "fixate-version=10",
                "test-script-name=psu_check",
                "test_script-version=4",
                "report-format=1",
            ]
        );
    }

    #[test]
    fn test_session_footer_layout() {
        let totals = SequenceTotals {
            passed: 3,
            failed: 1,
            error: 0,
            skipped: 2,
        };
        let line = session_footer("12.50", "20240307-091000", "Aborted", totals, "ABORTED");
        assert_eq!(
            fields(&line),
            vec![
                "12.50",
                "Sequence",
                "ended=20240307-091000",
                "ABORTED",
                "tests-passed=3",
                "tests-failed=1",
                "tests-error=0",
                "tests-skipped=2",
                "sequence=ABORTED",
            ]
        );
    }

    #[test]
    fn test_start_and_parameters() {
        let test = TestInfo::new("Rails")
            .with_long_description("Check all rails")
            .with_parameter("b", 2)
            .with_parameter("a", 1);
        assert_eq!(
            fields(&test_start("0.10", 1, &test)),
            vec!["0.10", "Test 1", "start", "Rails", "Check all rails"]
        );
        let params = test_parameters("0.10", 1, &test).unwrap();
        assert_eq!(fields(&params), vec!["0.10", "Test 1", "test-parameters", "a=1", "b=2"]);
    }

    #[test]
    fn test_no_parameters_no_row() {
        assert!(test_parameters("0.10", 1, &TestInfo::new("plain")).is_none());
    }

    #[test]
    fn test_check_in_range_fail() {
        let descriptor = CheckDescriptor::new(CheckKind::InRange, "Rail voltage")
            .observed(5)
            .range(0, 3);
        let line = check("0.20", 1, 1, false, &descriptor).unwrap();
        assert_eq!(
            fields(&line),
            vec!["0.20", "Test 1", "check1", "in range", "Rail voltage", "FAIL", "5", "0", "3"]
        );
    }

    #[test]
    fn test_check_range_equality_kinds() {
        let descriptor = CheckDescriptor::new(CheckKind::OutsideRangeEqualMin, "Leakage")
            .observed(0.5)
            .range(0.5, 2);
        let line = check("0.30", 4, 2, true, &descriptor).unwrap();
        assert_eq!(
            fields(&line),
            vec!["0.30", "Test 4", "check2", "outside range equal min", "Leakage", "PASS", "0.5", "0.5", "2"]
        );

        let missing_min = CheckDescriptor {
            min: None,
            ..CheckDescriptor::new(CheckKind::InRangeEqual, "bad").observed(1).range(0, 3)
        };
        assert!(matches!(
            check("0.30", 4, 3, true, &missing_min),
            Err(ReportError::MalformedCheck { field: "min", .. })
        ));
    }

    #[test]
    fn test_check_extra_fields_order() {
        let descriptor = CheckDescriptor::new(CheckKind::InTolerance, "Ref")
            .observed(2.48)
            .tolerance(0.05)
            .nominal(2.5);
        let line = check("1.00", 2, 3, true, &descriptor).unwrap();
        assert_eq!(
            fields(&line),
            vec!["1.00", "Test 2", "check3", "in tolerance", "Ref", "PASS", "2.48", "2.5", "0.05"]
        );
    }

    #[test]
    fn test_check_without_extra_fields() {
        let descriptor = CheckDescriptor::new(CheckKind::Passes, "Operator confirmed");
        let line = check("1.00", 2, 1, true, &descriptor).unwrap();
        assert_eq!(
            fields(&line),
            vec!["1.00", "Test 2", "check1", "passes", "Operator confirmed", "PASS", ""]
        );
    }

    #[test]
    fn test_malformed_check_is_rejected() {
        let descriptor = CheckDescriptor::new(CheckKind::OutsideRange, "Leakage").observed(1).nominal(0);
        let err = check("1.00", 1, 1, false, &descriptor).unwrap_err();
        match err {
            ReportError::MalformedCheck { kind, field } => {
                assert_eq!(kind, CheckKind::OutsideRange);
                assert_eq!(field, "min");
            }
            other => panic!("Expected MalformedCheck, got {:?}", other),
        }
    }

    #[test]
    fn test_exception_and_end_rows() {
        assert_eq!(
            fields(&test_exception("3.00", 4, "TimeoutError('no reply')")),
            vec!["3.00", "Test 4", "exception", "TimeoutError('no reply')"]
        );
        assert_eq!(
            fields(&test_end("3.10", 4, TestStatus::Error, 2, 0)),
            vec!["3.10", "Test 4", "end", "ERROR", "checks-passed=2", "checks-failed=0"]
        );
    }
}
