use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Opt-in JSONL event sink. One line per event; counters are flushed as a summary line.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    /// Writes one event as a single JSON line.
    pub fn log_event(&self, event: &Value) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Records one placement outcome and bumps the matching `placement.<outcome>` counter.
    pub fn log_placement(
        &self,
        index: usize,
        design_id: &str,
        kind: Option<&str>,
        outcome: &str,
        code: Option<&str>,
    ) {
        self.log_event(&json!({
            "type": "placement",
            "index": index,
            "design_id": design_id,
            "kind": kind,
            "outcome": outcome,
            "code": code,
        }));
        self.increment(&format!("placement.{outcome}"), 1);
    }

    pub fn emit_summary(&self, context: &str) {
        let counters = match self.inner.lock() {
            Ok(mut state) => std::mem::take(&mut state.counters),
            Err(_) => return,
        };
        self.log_event(&json!({
            "type": "sheet.summary",
            "context": context,
            "counts": counters,
        }));
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log_path(tag: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("cutsheet_{tag}_{}_{}.jsonl", std::process::id(), nanos))
    }

    #[test]
    fn placement_events_and_summary_are_valid_json_lines() {
        let path = temp_log_path("debug");
        let logger = DebugLogger::new(&path).expect("create log");
        logger.log_placement(1, "a\"b", Some("raster_image"), "fallback", Some("ASSET_IO"));
        logger.log_placement(2, "c", None, "miss", None);
        logger.emit_summary("test");
        logger.flush();

        let text = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["design_id"], "a\"b");
        assert_eq!(lines[1]["kind"], serde_json::Value::Null);
        assert_eq!(lines[2]["counts"]["placement.fallback"], 1);
        assert_eq!(lines[2]["counts"]["placement.miss"], 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn control_characters_in_ids_stay_valid_json() {
        let path = temp_log_path("debug_ctrl");
        let logger = DebugLogger::new(&path).expect("create log");
        logger.log_placement(1, "a\u{1}b\u{1f}", None, "miss", None);
        logger.emit_summary("ctl\u{0}");
        logger.flush();

        let text = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["design_id"], "a\u{1}b\u{1f}");
        assert_eq!(lines[1]["context"], "ctl\u{0}");
    }
}
