// ============================================================
// Layer 6 — Training Event Log
// ============================================================
// Appends one JSON object per line to train_<fold>.log:
//
//   {"dt":"2018-08-01T12:00:00.123456","loss":0.41,"step":120}
//   {"dice_loss":0.71,"dt":"2018-08-01T12:03:10.000001","step":160,"valid_loss":0.35}
//
// Keys are sorted, every line is flushed as soon as it is written
// so the log survives an interrupted run. Non-finite numbers are
// written as null.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::{Map, Value};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::PathBuf,
};

const DT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub struct EventLog {
    file: File,
    path: PathBuf,
}

impl EventLog {
    /// Open `path` for appending, creating it (and its directory) if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Cannot open event log '{}'", path.display()))?;
        Ok(Self { file, path })
    }

    /// Write `{step, dt, ..fields}` as one line.
    pub fn write(&mut self, step: usize, fields: &[(&str, f64)]) -> Result<()> {
        let mut event = Map::new();
        event.insert("step".to_string(), Value::from(step));
        event.insert(
            "dt".to_string(),
            Value::from(Local::now().format(DT_FORMAT).to_string()),
        );
        for (key, value) in fields {
            event.insert((*key).to_string(), Value::from(*value));
        }

        writeln!(self.file, "{}", Value::Object(event))
            .and_then(|_| self.file.flush())
            .with_context(|| format!("Cannot write to event log '{}'", self.path.display()))?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_keys_sorted_and_lines_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m/train_0.log");

        let mut log = EventLog::open(&path).unwrap();
        log.write(10, &[("loss", 0.5)]).unwrap();
        log.write(20, &[("valid_loss", 0.25), ("dice_loss", 0.75)]).unwrap();
        drop(log);

        // reopening appends
        EventLog::open(&path).unwrap().write(30, &[("loss", 0.125)]).unwrap();

        let lines = lines(&path);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("{\"dt\":\""));
        assert!(lines[0].ends_with(",\"loss\":0.5,\"step\":10}"));
        assert!(lines[1].starts_with("{\"dice_loss\":0.75,\"dt\":"));
        assert!(lines[1].ends_with(",\"step\":20,\"valid_loss\":0.25}"));
    }

    #[test]
    fn test_timestamp_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        EventLog::open(&path).unwrap().write(1, &[]).unwrap();

        let event: Map<String, Value> = serde_json::from_str(&lines(&path)[0]).unwrap();
        let dt = event["dt"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(dt, DT_FORMAT).is_ok());
        assert_eq!(dt.len(), "2018-08-01T12:00:00.123456".len());
    }

    #[test]
    fn test_nan_is_written_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        EventLog::open(&path).unwrap().write(1, &[("dice_loss", f64::NAN)]).unwrap();
        assert!(lines(&path)[0].contains("\"dice_loss\":null"));
    }
}
