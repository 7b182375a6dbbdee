//! Report file naming
//!
//! Reports are named `<script>-<YYYYMMDD-HHMMSS>.csv`. The timestamp is the
//! same string the session header carries in its `started=` field.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// strftime layout of run timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Extension of report files
pub const REPORT_EXTENSION: &str = "csv";

const TIMESTAMP_LEN: usize = "YYYYMMDD-HHMMSS".len();

/// Identity of the test script a sequence runs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptIdentity {
    /// Script basename without directory or extension
    pub name: String,
    /// Version string the script declares
    pub version: String,
}

impl ScriptIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Derive the name from a script path (`tests/psu_check.py` → `psu_check`)
    pub fn from_path(path: impl AsRef<Path>, version: impl Into<String>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self::new(name, version)
    }
}

/// Render a run timestamp
pub fn run_timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Build the report path for a run
pub fn report_path(output_dir: &Path, script_name: &str, timestamp: &str) -> PathBuf {
    output_dir.join(format!("{}-{}.{}", script_name, timestamp, REPORT_EXTENSION))
}

/// Recover the run timestamp embedded in a report file name
pub fn timestamp_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(REPORT_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.len() < TIMESTAMP_LEN + 1 || !stem.is_char_boundary(stem.len() - TIMESTAMP_LEN) {
        return None;
    }
    let (head, timestamp) = stem.split_at(stem.len() - TIMESTAMP_LEN);
    if !head.ends_with('-') {
        return None;
    }
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    Some(timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_script_identity_from_path() {
        let script = ScriptIdentity::from_path("scripts/jig/psu_check.py", "3");
        assert_eq!(script.name, "psu_check");
        assert_eq!(script.version, "3");

        let script = ScriptIdentity::from_path("bare", "1");
        assert_eq!(script.name, "bare");
    }

    #[test]
    fn test_run_timestamp_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(run_timestamp(now), "20240307-090502");
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("/tmp/reports"), "psu_check", "20240307-090502");
        assert_eq!(path, PathBuf::from("/tmp/reports/psu_check-20240307-090502.csv"));
    }

    #[test]
    fn test_timestamp_from_path() {
        let path = report_path(Path::new("out"), "my-script", "20240307-090502");
        assert_eq!(timestamp_from_path(&path).as_deref(), Some("20240307-090502"));

        assert_eq!(timestamp_from_path(Path::new("out/psu.csv")), None);
        assert_eq!(timestamp_from_path(Path::new("out/psu-20240307-090502.txt")), None);
        assert_eq!(timestamp_from_path(Path::new("out/psu-20241399-090502.csv")), None);
    }
}
