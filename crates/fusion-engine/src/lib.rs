pub mod config;
pub mod encoder;
pub mod gemini;
pub mod upload;
pub mod workflow;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fusion_contracts::events::{EventWriter, SessionEvent};
use fusion_contracts::{FusionResult, GenerationResult, ImageFile, SlotLabel, WorkflowState};
use reqwest::blocking::Response as HttpResponse;
use serde_json::Value;

pub use config::FusionConfig;
pub use gemini::{GeminiClient, GenerationClient};
pub use upload::{ChooserRequest, SlotChange, UploadSurface};
pub use workflow::{GenerationTicket, WorkflowController};

/// Two upload surfaces, the workflow controller and the client, wired together
/// and reporting into one session event log.
pub struct FusionEngine {
    out_dir: PathBuf,
    events: EventWriter,
    surfaces: [UploadSurface; 2],
    workflow: WorkflowController,
    client: Arc<dyn GenerationClient>,
}

impl FusionEngine {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        events_path: impl Into<PathBuf>,
        client: Arc<dyn GenerationClient>,
    ) -> Result<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        let events = EventWriter::with_new_session(events_path);
        events.record(SessionEvent::SessionStarted {
            out_dir: out_dir.to_string_lossy().to_string(),
        });

        Ok(Self {
            out_dir,
            events,
            surfaces: SlotLabel::ALL.map(UploadSurface::new),
            workflow: WorkflowController::new(),
            client,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    pub fn client(&self) -> Arc<dyn GenerationClient> {
        Arc::clone(&self.client)
    }

    pub fn surface(&self, label: SlotLabel) -> &UploadSurface {
        &self.surfaces[slot_index(label)]
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn result_data_uri(&self) -> Option<String> {
        self.workflow.result_data_uri()
    }

    pub fn select(&mut self, label: SlotLabel, file: Option<ImageFile>) -> SlotChange {
        let name = file.as_ref().map(|file| file.name().to_string());
        let change = self.surfaces[slot_index(label)].select(file);
        self.record_slot_change(label, name, &change);
        change
    }

    /// Full drag gesture onto one slot: enter, hover, drop.
    pub fn drop_file(&mut self, label: SlotLabel, file: Option<ImageFile>) -> SlotChange {
        let name = file.as_ref().map(|file| file.name().to_string());
        let surface = &mut self.surfaces[slot_index(label)];
        surface.drag_enter();
        surface.drag_over();
        let change = surface.drop_file(file);
        self.record_slot_change(label, name, &change);
        change
    }

    pub fn clear(&mut self, label: SlotLabel) -> SlotChange {
        let change = self.surfaces[slot_index(label)].clear();
        self.record_slot_change(label, None, &change);
        change
    }

    pub fn can_generate(&self) -> bool {
        let [first, second] = &self.surfaces;
        self.workflow.can_trigger(first.file(), second.file())
    }

    pub fn begin_generation(&mut self) -> FusionResult<GenerationTicket> {
        let [first, second] = &self.surfaces;
        match self.workflow.begin(first.file(), second.file()) {
            Ok(ticket) => {
                self.events.record(SessionEvent::GenerationStarted {
                    ticket: ticket.id(),
                    first: ticket.request().first.name().to_string(),
                    second: ticket.request().second.name().to_string(),
                });
                Ok(ticket)
            }
            Err(err) => {
                self.events.record(SessionEvent::GenerationRefused {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn finish_generation(&mut self, ticket_id: u64, outcome: GenerationResult) -> bool {
        let event = match &outcome {
            Ok(payload) => SessionEvent::GenerationSucceeded {
                ticket: ticket_id,
                payload_len: payload.len(),
            },
            Err(err) => SessionEvent::GenerationFailed {
                ticket: ticket_id,
                error: err.to_string(),
            },
        };
        if !self.workflow.complete(ticket_id, outcome) {
            self.events
                .record(SessionEvent::GenerationDiscarded { ticket: ticket_id });
            return false;
        }
        self.events.record(event);
        true
    }

    /// Runs one generation to completion on the calling thread.
    pub fn generate(&mut self) -> &WorkflowState {
        if let Ok(ticket) = self.begin_generation() {
            let outcome = ticket.execute(self.client.as_ref());
            self.finish_generation(ticket.id(), outcome);
        }
        self.workflow.state()
    }

    pub fn abandon(&mut self) -> bool {
        let abandoned = self.workflow.abandon();
        if abandoned {
            self.events.record(SessionEvent::GenerationAbandoned);
        }
        abandoned
    }

    /// Saves the result into `dir`, or the session output directory.
    pub fn download(&self, dir: Option<&Path>) -> FusionResult<PathBuf> {
        let path = self.workflow.download(dir.unwrap_or(&self.out_dir))?;
        self.events.record(SessionEvent::ImageDownloaded {
            path: path.to_string_lossy().to_string(),
        });
        Ok(path)
    }

    fn record_slot_change(&self, slot: SlotLabel, file: Option<String>, change: &SlotChange) {
        let event = match change {
            SlotChange::Selected => SessionEvent::SlotSelected { slot, file },
            SlotChange::Rejected { mime_type } => SessionEvent::SlotRejected {
                slot,
                file,
                mime_type: mime_type.clone(),
            },
            SlotChange::Cleared => SessionEvent::SlotCleared { slot },
        };
        self.events.record(event);
    }
}

fn slot_index(label: SlotLabel) -> usize {
    match label {
        SlotLabel::Person1 => 0,
        SlotLabel::Person2 => 1,
    }
}

pub(crate) fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
