//! Report reader - parses written reports back into rows and summaries

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{ReportError, ReportResult};

use super::line::FIELD_SEPARATOR;
use super::record::SEQUENCE_TAG;

/// Totals recovered from a report file
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub script_name: String,
    pub script_version: String,
    pub framework_version: String,
    pub report_format: String,
    /// Start of the first session in the file
    pub started: String,
    /// Header rows seen; sessions of one script started in the same second
    /// share a file
    pub sessions: u32,
    /// End of the last session; absent when it never completed
    pub ended: Option<String>,
    /// Terminal status word from the footer
    pub sequence_status: Option<String>,
    pub tests_started: u32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub tests_errored: u32,
    pub checks_passed: u32,
    pub checks_failed: u32,
    pub exceptions: u32,
    /// Elapsed seconds of the last row
    pub elapsed: f64,
    pub rows: usize,
}

impl ReportSummary {
    pub fn is_complete(&self) -> bool {
        self.ended.is_some()
    }
}

/// Parse report text into rows of fields
///
/// Accepts `\r\n` and `\n` row endings, quoted fields with doubled quotes
/// and line breaks inside quoted fields. Blank lines are skipped.
pub fn parse_rows(text: &str) -> ReportResult<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut closed_quote = false;
    let mut row_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                    closed_quote = true;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            FIELD_SEPARATOR => {
                row.push(std::mem::take(&mut field));
                closed_quote = false;
                row_started = true;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if row_started || !field.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                closed_quote = false;
                row_started = false;
            }
            _ if closed_quote => {
                return Err(ReportError::Parse {
                    row: rows.len() + 1,
                    message: format!("unexpected '{}' after closing quote", c),
                });
            }
            '"' if field.is_empty() => {
                in_quotes = true;
                row_started = true;
            }
            _ => {
                field.push(c);
                row_started = true;
            }
        }
    }

    if in_quotes {
        return Err(ReportError::Parse {
            row: rows.len() + 1,
            message: "unterminated quoted field".to_string(),
        });
    }
    if row_started || !field.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

/// Read and summarize a report file
pub fn read_report(path: impl AsRef<Path>) -> ReportResult<ReportSummary> {
    let path = path.as_ref();
    debug!(path = %path.display(), "read_report: called");
    let content = fs::read_to_string(path)?;
    let rows = parse_rows(&content)?;
    summarize(&rows)
}

/// Summarize parsed rows; the first row must be a session header
pub fn summarize(rows: &[Vec<String>]) -> ReportResult<ReportSummary> {
    let mut summary = ReportSummary {
        rows: rows.len(),
        ..Default::default()
    };

    for (i, row) in rows.iter().enumerate() {
        let number = i + 1;
        let parse_error = |message: String| ReportError::Parse { row: number, message };

        if row.len() < 3 {
            return Err(parse_error(format!("expected at least 3 fields, found {}", row.len())));
        }
        summary.elapsed = row[0]
            .parse()
            .map_err(|_| parse_error(format!("invalid elapsed time '{}'", row[0])))?;

        if i == 0 && !(row[1] == SEQUENCE_TAG && row[2].starts_with("started=")) {
            return Err(parse_error("report does not start with a session header".to_string()));
        }

        if row[1] == SEQUENCE_TAG {
            if let Some(started) = value_of(&row[2], "started") {
                summary.sessions += 1;
                if summary.sessions > 1 {
                    debug!(row = number, "summarize: another session in the same file");
                    summary.ended = None;
                    summary.sequence_status = None;
                    continue;
                }
                summary.started = started.to_string();
                for field in &row[3..] {
                    if let Some(v) = value_of(field, "fixate-version") {
                        summary.framework_version = v.to_string();
                    } else if let Some(v) = value_of(field, "test-script-name") {
                        summary.script_name = v.to_string();
                    } else if let Some(v) = value_of(field, "test_script-version") {
                        summary.script_version = v.to_string();
                    } else if let Some(v) = value_of(field, "report-format") {
                        summary.report_format = v.to_string();
                    }
                }
            } else if let Some(ended) = value_of(&row[2], "ended") {
                summary.ended = Some(ended.to_string());
                summary.sequence_status = row.get(3).cloned();
            } else {
                return Err(parse_error(format!("unknown sequence row '{}'", row[2])));
            }
            continue;
        }

        if !row[1].starts_with("Test ") {
            return Err(parse_error(format!("unknown row tag '{}'", row[1])));
        }

        match row[2].as_str() {
            "start" => summary.tests_started += 1,
            "test-parameters" => {}
            "exception" => summary.exceptions += 1,
            "end" => match row.get(3).map(String::as_str) {
                Some("PASS") => summary.tests_passed += 1,
                Some("FAIL") => summary.tests_failed += 1,
                Some("ERROR") => summary.tests_errored += 1,
                other => return Err(parse_error(format!("unknown test status {:?}", other))),
            },
            kind if kind.starts_with("check") => match row.get(5).map(String::as_str) {
                Some("PASS") => summary.checks_passed += 1,
                Some("FAIL") => summary.checks_failed += 1,
                other => return Err(parse_error(format!("unknown check result {:?}", other))),
            },
            other => return Err(parse_error(format!("unknown test row '{}'", other))),
        }
    }

    Ok(summary)
}

fn value_of<'a>(field: &'a str, key: &str) -> Option<&'a str> {
    field.strip_prefix(key)?.strip_prefix('=')
}
