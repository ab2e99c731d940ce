use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use fusion_contracts::errors::MISSING_IMAGES_MESSAGE;
use fusion_contracts::workflow::{DOWNLOAD_FILE_NAME, PNG_DATA_URI_PREFIX};
use fusion_contracts::{
    FusionError, FusionResult, GenerationRequest, GenerationResult, ImageFile, WorkflowState,
};
use image::ImageFormat;

use crate::gemini::GenerationClient;

/// One accepted generation run. Outcomes are matched back by `id`.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    id: u64,
    request: GenerationRequest,
}

impl GenerationTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Performs the single outbound call for this run.
    pub fn execute(&self, client: &dyn GenerationClient) -> GenerationResult {
        client.combine(&self.request.first, &self.request.second)
    }
}

/// Idle → Loading → Success | Failed, and back to Loading on the next trigger.
#[derive(Debug, Default)]
pub struct WorkflowController {
    state: WorkflowState,
    issued: u64,
    in_flight: Option<u64>,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Whether the generate action should be enabled.
    pub fn can_trigger(&self, first: Option<&ImageFile>, second: Option<&ImageFile>) -> bool {
        first.is_some() && second.is_some() && !self.state.is_loading()
    }

    pub fn begin(
        &mut self,
        first: Option<&ImageFile>,
        second: Option<&ImageFile>,
    ) -> FusionResult<GenerationTicket> {
        if self.state.is_loading() {
            return Err(FusionError::AlreadyLoading);
        }
        let (Some(first), Some(second)) = (first, second) else {
            self.state = WorkflowState::Failed(MISSING_IMAGES_MESSAGE.to_string());
            return Err(FusionError::MissingImages);
        };

        self.issued += 1;
        self.in_flight = Some(self.issued);
        self.state = WorkflowState::Loading;
        Ok(GenerationTicket {
            id: self.issued,
            request: GenerationRequest::new(first.clone(), second.clone()),
        })
    }

    /// Applies an outcome. Returns `false` when the ticket is no longer the
    /// one in flight, in which case the outcome is dropped.
    pub fn complete(&mut self, ticket_id: u64, outcome: GenerationResult) -> bool {
        if self.in_flight != Some(ticket_id) {
            tracing::debug!(ticket_id, "discarding outcome of abandoned generation");
            return false;
        }
        self.in_flight = None;
        self.state = match outcome {
            Ok(payload) => WorkflowState::Success(payload),
            Err(err) => {
                tracing::error!(error = %err, "generation failed");
                WorkflowState::Failed(err.user_message())
            }
        };
        true
    }

    /// Stops waiting for the in-flight run. Its outcome is ignored when it arrives.
    pub fn abandon(&mut self) -> bool {
        if self.in_flight.take().is_none() {
            return false;
        }
        self.state = WorkflowState::Idle;
        true
    }

    pub fn run(
        &mut self,
        client: &dyn GenerationClient,
        first: Option<&ImageFile>,
        second: Option<&ImageFile>,
    ) -> &WorkflowState {
        if let Ok(ticket) = self.begin(first, second) {
            let outcome = ticket.execute(client);
            self.complete(ticket.id(), outcome);
        }
        &self.state
    }

    pub fn result_data_uri(&self) -> Option<String> {
        self.state
            .payload()
            .map(|payload| format!("{PNG_DATA_URI_PREFIX}{payload}"))
    }

    /// Writes the result to `dir/couple-fusion.png`, transcoding to PNG when
    /// the service sent another format.
    pub fn download(&self, dir: &Path) -> FusionResult<PathBuf> {
        let payload = self.state.payload().ok_or(FusionError::NoResult)?;
        let bytes = BASE64
            .decode(payload.as_bytes())
            .context("generated image base64 decode failed")?;
        let png = ensure_png(bytes)?;

        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(DOWNLOAD_FILE_NAME);
        std::fs::write(&path, png).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved generated image");
        Ok(path)
    }
}

fn ensure_png(bytes: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    if matches!(image::guess_format(&bytes), Ok(ImageFormat::Png)) {
        return Ok(bytes);
    }
    let decoded =
        image::load_from_memory(&bytes).context("generated image could not be decoded")?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .context("generated image could not be converted to PNG")?;
    Ok(out.into_inner())
}
