use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::workflow::SlotLabel;

/// Everything a session reports about slots and generation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        out_dir: String,
    },
    SlotSelected {
        slot: SlotLabel,
        file: Option<String>,
    },
    SlotRejected {
        slot: SlotLabel,
        file: Option<String>,
        mime_type: String,
    },
    SlotCleared {
        slot: SlotLabel,
    },
    GenerationStarted {
        ticket: u64,
        first: String,
        second: String,
    },
    GenerationRefused {
        reason: String,
    },
    GenerationSucceeded {
        ticket: u64,
        payload_len: usize,
    },
    GenerationFailed {
        ticket: u64,
        error: String,
    },
    GenerationDiscarded {
        ticket: u64,
    },
    GenerationAbandoned,
    ImageDownloaded {
        path: String,
    },
}

impl SessionEvent {
    /// The `type` value written to the log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SlotSelected { .. } => "slot_selected",
            Self::SlotRejected { .. } => "slot_rejected",
            Self::SlotCleared { .. } => "slot_cleared",
            Self::GenerationStarted { .. } => "generation_started",
            Self::GenerationRefused { .. } => "generation_refused",
            Self::GenerationSucceeded { .. } => "generation_succeeded",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::GenerationDiscarded { .. } => "generation_discarded",
            Self::GenerationAbandoned => "generation_abandoned",
            Self::ImageDownloaded { .. } => "image_downloaded",
        }
    }
}

#[derive(Serialize)]
struct LogLine<'a> {
    #[serde(flatten)]
    event: &'a SessionEvent,
    session_id: &'a str,
    ts: String,
}

/// Append-only JSONL log of one session. Clones share the file lock, so a
/// worker thread can report into the same file as the session loop.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<LogTarget>,
}

#[derive(Debug)]
struct LogTarget {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LogTarget {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn with_new_session(path: impl Into<PathBuf>) -> Self {
        Self::new(path, format!("session-{}", Uuid::new_v4()))
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event: &SessionEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(&LogLine {
            event,
            session_id: &self.inner.session_id,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        })?;

        let path = &self.inner.path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Logging is never fatal: a failed append only produces a warning.
    pub fn record(&self, event: SessionEvent) {
        if let Err(err) = self.emit(&event) {
            tracing::warn!(
                event = event.kind(),
                error = %format!("{err:#}"),
                "failed to append session event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::{EventWriter, SessionEvent};
    use crate::workflow::SlotLabel;

    fn read_lines(writer: &EventWriter) -> anyhow::Result<Vec<Value>> {
        fs::read_to_string(writer.path())?
            .lines()
            .map(|line| -> anyhow::Result<Value> { Ok(serde_json::from_str(line)?) })
            .collect()
    }

    #[test]
    fn event_fields_sit_beside_type_session_and_timestamp() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "session-123");

        writer.emit(&SessionEvent::SlotRejected {
            slot: SlotLabel::Person1,
            file: Some("notes.txt".to_string()),
            mime_type: "text/plain".to_string(),
        })?;

        let lines = read_lines(&writer)?;
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["type"], json!("slot_rejected"));
        assert_eq!(line["session_id"], json!("session-123"));
        assert_eq!(line["slot"], json!("Person 1"));
        assert_eq!(line["file"], json!("notes.txt"));
        assert_eq!(line["mime_type"], json!("text/plain"));
        DateTime::parse_from_rfc3339(line["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn clones_append_to_one_log() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::with_new_session(temp.path().join("nested").join("events.jsonl"));
        let worker = writer.clone();

        writer.emit(&SessionEvent::GenerationStarted {
            ticket: 1,
            first: "a.png".to_string(),
            second: "b.png".to_string(),
        })?;
        worker.emit(&SessionEvent::GenerationAbandoned)?;

        let lines = read_lines(&writer)?;
        let kinds: Vec<&str> = lines
            .iter()
            .map(|line| line["type"].as_str().unwrap_or(""))
            .collect();
        assert_eq!(kinds, vec!["generation_started", "generation_abandoned"]);
        assert_eq!(lines[0]["session_id"], lines[1]["session_id"]);
        assert!(writer.session_id().starts_with("session-"));
        Ok(())
    }

    #[test]
    fn kind_matches_serialized_type() -> anyhow::Result<()> {
        let events = [
            SessionEvent::SlotCleared {
                slot: SlotLabel::Person2,
            },
            SessionEvent::GenerationDiscarded { ticket: 4 },
            SessionEvent::GenerationAbandoned,
        ];
        for event in events {
            let value = serde_json::to_value(&event)?;
            assert_eq!(value["type"], json!(event.kind()));
        }
        Ok(())
    }

    #[test]
    fn record_swallows_write_failures() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        // A directory where the log file should be makes every append fail.
        let path = temp.path().join("events.jsonl");
        fs::create_dir_all(&path)?;
        let writer = EventWriter::new(&path, "session-x");
        assert!(writer.emit(&SessionEvent::GenerationAbandoned).is_err());
        writer.record(SessionEvent::GenerationAbandoned);
        Ok(())
    }
}
