//! Event types for test sequence reporting
//!
//! These events describe everything a sequencer reports about a run:
//! - Sequence lifecycle (running, complete)
//! - Test lifecycle (start, exception, complete)
//! - Checks performed inside a test

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named channel on the event bus
///
/// The topic names are the wire contract shared with event scripts and
/// external publishers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "Sequence_Update")]
    SequenceUpdate,
    #[serde(rename = "Sequence_Complete")]
    SequenceComplete,
    #[serde(rename = "Test_Start")]
    TestStart,
    #[serde(rename = "Test_Exception")]
    TestException,
    #[serde(rename = "Check")]
    Check,
    #[serde(rename = "Test_Complete")]
    TestComplete,
}

impl Topic {
    /// Every topic, in subscription order
    pub const ALL: [Topic; 6] = [
        Topic::SequenceUpdate,
        Topic::SequenceComplete,
        Topic::TestStart,
        Topic::TestException,
        Topic::Check,
        Topic::TestComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::SequenceUpdate => "Sequence_Update",
            Topic::SequenceComplete => "Sequence_Complete",
            Topic::TestStart => "Test_Start",
            Topic::TestException => "Test_Exception",
            Topic::Check => "Check",
            Topic::TestComplete => "Test_Complete",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown topic '{}'", s))
    }
}

/// Scalar value carried by parameters and checks
///
/// Rendering follows the established report conventions: integers plain,
/// whole floats keep one decimal (`5.0`), magnitudes below 1e-4 or from 1e16
/// up in exponent form (`1e-05`, `1e+16`), booleans as `True`/`False`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportValue::Bool(true) => f.write_str("True"),
            ReportValue::Bool(false) => f.write_str("False"),
            ReportValue::Integer(v) => write!(f, "{}", v),
            ReportValue::Float(v) if v.is_nan() => f.write_str("nan"),
            ReportValue::Float(v) if v.is_infinite() => f.write_str(if *v > 0.0 { "inf" } else { "-inf" }),
            ReportValue::Float(v) => f.write_str(&format_float(*v)),
            ReportValue::Text(v) => f.write_str(v),
        }
    }
}

/// Shortest round-trip digits; exponent form below 1e-4 and from 1e16 up
fn format_float(v: f64) -> String {
    let scientific = format!("{:e}", v);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };
    if (-4..16).contains(&exponent) {
        let plain = v.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

impl From<bool> for ReportValue {
    fn from(v: bool) -> Self {
        ReportValue::Bool(v)
    }
}

impl From<i64> for ReportValue {
    fn from(v: i64) -> Self {
        ReportValue::Integer(v)
    }
}

impl From<i32> for ReportValue {
    fn from(v: i32) -> Self {
        ReportValue::Integer(v.into())
    }
}

impl From<u32> for ReportValue {
    fn from(v: u32) -> Self {
        ReportValue::Integer(v.into())
    }
}

impl From<f64> for ReportValue {
    fn from(v: f64) -> Self {
        ReportValue::Float(v)
    }
}

impl From<&str> for ReportValue {
    fn from(v: &str) -> Self {
        ReportValue::Text(v.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(v: String) -> Self {
        ReportValue::Text(v)
    }
}

/// A test as announced by the sequencer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestInfo {
    /// Short description
    pub description: String,
    /// Long description
    #[serde(default)]
    pub long_description: String,
    /// Declared reportable parameters, iterated in name order
    #[serde(default)]
    pub parameters: BTreeMap<String, ReportValue>,
}

impl TestInfo {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_long_description(mut self, long_description: impl Into<String>) -> Self {
        self.long_description = long_description.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<ReportValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Final status word of a test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(TestStatus::Pass),
            "FAIL" => Ok(TestStatus::Fail),
            "ERROR" => Ok(TestStatus::Error),
            other => Err(format!("unknown test status '{}'", other)),
        }
    }
}

/// Optional comparison values a check may carry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckField {
    Nominal,
    Min,
    Max,
    Tolerance,
}

impl CheckField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckField::Nominal => "nominal",
            CheckField::Min => "min",
            CheckField::Max => "max",
            CheckField::Tolerance => "tolerance",
        }
    }
}

/// Kind of comparison a check performed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    InRange,
    InRangeEqual,
    InRangeEqualMin,
    InRangeEqualMax,
    OutsideRange,
    OutsideRangeEqual,
    OutsideRangeEqualMin,
    OutsideRangeEqualMax,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Smaller,
    SmallerOrEqual,
    LogValue,
    InTolerance,
    Passes,
    Fails,
    Exception,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::InRange => "in_range",
            CheckKind::InRangeEqual => "in_range_equal",
            CheckKind::InRangeEqualMin => "in_range_equal_min",
            CheckKind::InRangeEqualMax => "in_range_equal_max",
            CheckKind::OutsideRange => "outside_range",
            CheckKind::OutsideRangeEqual => "outside_range_equal",
            CheckKind::OutsideRangeEqualMin => "outside_range_equal_min",
            CheckKind::OutsideRangeEqualMax => "outside_range_equal_max",
            CheckKind::Equal => "equal",
            CheckKind::NotEqual => "not_equal",
            CheckKind::Greater => "greater",
            CheckKind::GreaterOrEqual => "greater_or_equal",
            CheckKind::Smaller => "smaller",
            CheckKind::SmallerOrEqual => "smaller_or_equal",
            CheckKind::LogValue => "log_value",
            CheckKind::InTolerance => "in_tolerance",
            CheckKind::Passes => "passes",
            CheckKind::Fails => "fails",
            CheckKind::Exception => "exception",
        }
    }

    /// Label written to the report (`in_range` becomes `in range`)
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Values a check of this kind must carry
    pub fn required_fields(&self) -> &'static [CheckField] {
        match self {
            CheckKind::InRange
            | CheckKind::InRangeEqual
            | CheckKind::InRangeEqualMin
            | CheckKind::InRangeEqualMax
            | CheckKind::OutsideRange
            | CheckKind::OutsideRangeEqual
            | CheckKind::OutsideRangeEqualMin
            | CheckKind::OutsideRangeEqualMax => &[CheckField::Min, CheckField::Max],
            CheckKind::Equal
            | CheckKind::NotEqual
            | CheckKind::Greater
            | CheckKind::GreaterOrEqual
            | CheckKind::Smaller
            | CheckKind::SmallerOrEqual => &[CheckField::Nominal],
            CheckKind::InTolerance => &[CheckField::Nominal, CheckField::Tolerance],
            CheckKind::LogValue | CheckKind::Passes | CheckKind::Fails | CheckKind::Exception => &[],
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a check reports about itself
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckDescriptor {
    pub kind: CheckKind,
    #[serde(default)]
    pub description: String,
    /// Measured or observed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<ReportValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal: Option<ReportValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ReportValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ReportValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ReportValue>,
}

impl CheckDescriptor {
    pub fn new(kind: CheckKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            observed: None,
            nominal: None,
            min: None,
            max: None,
            tolerance: None,
        }
    }

    pub fn observed(mut self, value: impl Into<ReportValue>) -> Self {
        self.observed = Some(value.into());
        self
    }

    pub fn nominal(mut self, value: impl Into<ReportValue>) -> Self {
        self.nominal = Some(value.into());
        self
    }

    pub fn range(mut self, min: impl Into<ReportValue>, max: impl Into<ReportValue>) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    pub fn tolerance(mut self, value: impl Into<ReportValue>) -> Self {
        self.tolerance = Some(value.into());
        self
    }

    pub fn field(&self, field: CheckField) -> Option<&ReportValue> {
        match field {
            CheckField::Nominal => self.nominal.as_ref(),
            CheckField::Min => self.min.as_ref(),
            CheckField::Max => self.max.as_ref(),
            CheckField::Tolerance => self.tolerance.as_ref(),
        }
    }

    /// First value the kind requires but the descriptor lacks
    pub fn missing_field(&self) -> Option<CheckField> {
        self.kind
            .required_fields()
            .iter()
            .copied()
            .find(|f| self.field(*f).is_none())
    }
}

/// Core event enum - the vocabulary of sequence reporting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic")]
pub enum SequenceEvent {
    /// The sequencer changed status ("Running" starts a session)
    #[serde(rename = "Sequence_Update")]
    SequenceUpdate { status: String },

    /// The sequence finished, was aborted or failed
    #[serde(rename = "Sequence_Complete")]
    SequenceComplete {
        status: String,
        passed: u32,
        failed: u32,
        error: u32,
        skipped: u32,
        sequence_status: String,
    },

    /// A test is about to run
    #[serde(rename = "Test_Start")]
    TestStart { test: TestInfo, test_index: u32 },

    /// A test raised instead of completing its checks
    #[serde(rename = "Test_Exception")]
    TestException { exception: String, test_index: u32 },

    /// A check inside a test was evaluated
    #[serde(rename = "Check")]
    Check {
        passed: bool,
        check: CheckDescriptor,
        test_index: u32,
        /// Publisher's own running count, informational only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        check_count: Option<u32>,
    },

    /// A test finished
    #[serde(rename = "Test_Complete")]
    TestComplete {
        test: TestInfo,
        test_index: u32,
        status: TestStatus,
    },
}

impl SequenceEvent {
    /// Topic this event is published on
    pub fn topic(&self) -> Topic {
        match self {
            SequenceEvent::SequenceUpdate { .. } => Topic::SequenceUpdate,
            SequenceEvent::SequenceComplete { .. } => Topic::SequenceComplete,
            SequenceEvent::TestStart { .. } => Topic::TestStart,
            SequenceEvent::TestException { .. } => Topic::TestException,
            SequenceEvent::Check { .. } => Topic::Check,
            SequenceEvent::TestComplete { .. } => Topic::TestComplete,
        }
    }

    /// Test index, for events scoped to a test
    pub fn test_index(&self) -> Option<u32> {
        match self {
            SequenceEvent::TestStart { test_index, .. }
            | SequenceEvent::TestException { test_index, .. }
            | SequenceEvent::Check { test_index, .. }
            | SequenceEvent::TestComplete { test_index, .. } => Some(*test_index),
            SequenceEvent::SequenceUpdate { .. } | SequenceEvent::SequenceComplete { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_round_trips_through_name() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert!("Bogus".parse::<Topic>().is_err());
    }

    #[test]
    fn test_event_topic_matches_serde_tag() {
        let event = SequenceEvent::TestException {
            exception: "boom".to_string(),
            test_index: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["topic"], event.topic().as_str());
    }

    #[test]
    fn test_check_event_from_json() {
        let json = r#"{"topic":"Check","passed":false,"test_index":1,
            "check":{"kind":"in_range","description":"Rail voltage","observed":5,"min":0,"max":3}}"#;
        let event: SequenceEvent = serde_json::from_str(json).unwrap();
        match event {
            SequenceEvent::Check {
                passed,
                check,
                test_index,
                check_count,
            } => {
                assert!(!passed);
                assert_eq!(test_index, 1);
                assert_eq!(check_count, None);
                assert_eq!(check.kind, CheckKind::InRange);
                assert_eq!(check.observed, Some(ReportValue::Integer(5)));
                assert_eq!(check.nominal, None);
            }
            other => panic!("Expected Check event, got {:?}", other),
        }
    }

    #[test]
    fn test_report_value_rendering() {
        assert_eq!(ReportValue::from(5).to_string(), "5");
        assert_eq!(ReportValue::from(5.0).to_string(), "5.0");
        assert_eq!(ReportValue::from(0.25).to_string(), "0.25");
        assert_eq!(ReportValue::from(-3.0).to_string(), "-3.0");
        assert_eq!(ReportValue::from(true).to_string(), "True");
        assert_eq!(ReportValue::from("12V").to_string(), "12V");
        assert_eq!(ReportValue::Float(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn test_report_value_float_exponent_form() {
        let rendered = |v: f64| ReportValue::from(v).to_string();
        assert_eq!(rendered(1e-5), "1e-05");
        assert_eq!(rendered(1.5e-7), "1.5e-07");
        assert_eq!(rendered(0.0001), "0.0001");
        assert_eq!(rendered(1e15), "1000000000000000.0");
        assert_eq!(rendered(1e16), "1e+16");
        assert_eq!(rendered(-2.5e20), "-2.5e+20");
        assert_eq!(rendered(1.25e300), "1.25e+300");
        assert_eq!(rendered(0.0), "0.0");
        assert_eq!(rendered(-0.0), "-0.0");
    }

    #[test]
    fn test_report_value_untagged_json() {
        let values: Vec<ReportValue> = serde_json::from_str(r#"[1, 1.5, 2.0, true, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ReportValue::Integer(1),
                ReportValue::Float(1.5),
                ReportValue::Float(2.0),
                ReportValue::Bool(true),
                ReportValue::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_check_kind_label() {
        assert_eq!(CheckKind::InRange.label(), "in range");
        assert_eq!(CheckKind::SmallerOrEqual.label(), "smaller or equal");
        assert_eq!(CheckKind::Passes.label(), "passes");
        assert_eq!(CheckKind::OutsideRangeEqualMax.label(), "outside range equal max");
    }

    #[test]
    fn test_range_equality_check_from_json() {
        let json = r#"{"topic":"Check","passed":true,"test_index":2,
            "check":{"kind":"in_range_equal","description":"Rail","observed":3,"min":0,"max":3}}"#;
        let events = crate::replay::parse_events(json.replace('\n', " ").as_str());
        assert_eq!(events.len(), 1);
        match &events[0] {
            SequenceEvent::Check { check, .. } => {
                assert_eq!(check.kind, CheckKind::InRangeEqual);
                assert_eq!(check.kind.label(), "in range equal");
                assert_eq!(check.missing_field(), None);
            }
            other => panic!("Expected Check event, got {:?}", other),
        }

        let check = CheckDescriptor::new(CheckKind::OutsideRangeEqualMin, "no max").observed(1).range(0, 3);
        assert_eq!(check.missing_field(), None);
        let check = CheckDescriptor {
            max: None,
            ..check
        };
        assert_eq!(check.missing_field(), Some(CheckField::Max));
    }

    #[test]
    fn test_missing_field() {
        let check = CheckDescriptor::new(CheckKind::InTolerance, "tol").observed(1.0).nominal(1.0);
        assert_eq!(check.missing_field(), Some(CheckField::Tolerance));

        let check = check.tolerance(0.1);
        assert_eq!(check.missing_field(), None);

        let check = CheckDescriptor::new(CheckKind::Passes, "always");
        assert_eq!(check.missing_field(), None);
    }

    #[test]
    fn test_parameters_are_name_ordered() {
        let test = TestInfo::new("t").with_parameter("b", 2).with_parameter("a", 1);
        let names: Vec<&str> = test.parameters.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
