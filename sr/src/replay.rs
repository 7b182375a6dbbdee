//! Event scripts - sequence events stored as JSON Lines
//!
//! Each line holds one [`SequenceEvent`] tagged by topic name:
//!
//! ```text
//! {"topic":"Sequence_Update","status":"Running"}
//! {"topic":"Test_Start","test":{"description":"Rails"},"test_index":1}
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ReportResult;
use crate::events::{EventBus, SequenceEvent};

/// Parse event script text; blank and unparsable lines are skipped
pub fn parse_events(content: &str) -> Vec<SequenceEvent> {
    let mut events = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SequenceEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(line = number + 1, error = %e, "parse_events: failed to parse line");
            }
        }
    }
    events
}

/// Read an event script
pub fn load_events(path: impl AsRef<Path>) -> ReportResult<Vec<SequenceEvent>> {
    let path = path.as_ref();
    debug!(path = %path.display(), "load_events: called");
    let content = fs::read_to_string(path)?;
    let events = parse_events(&content);
    debug!(count = events.len(), "load_events: loaded events");
    Ok(events)
}

/// Write events as an event script, replacing any existing file
pub fn write_events(path: impl AsRef<Path>, events: &[SequenceEvent]) -> ReportResult {
    let path = path.as_ref();
    debug!(path = %path.display(), count = events.len(), "write_events: called");
    let mut file = fs::File::create(path)?;
    for event in events {
        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)?;
    }
    file.flush()?;
    Ok(())
}

/// Publish events in order; returns the total number of handler runs
pub fn publish_all(bus: &EventBus, events: &[SequenceEvent]) -> usize {
    debug!(count = events.len(), "publish_all: called");
    events.iter().map(|event| bus.publish(event)).sum()
}
