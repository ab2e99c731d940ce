use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::FusionResult;
use crate::files::ImageFile;

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";
pub const DOWNLOAD_FILE_NAME: &str = "couple-fusion.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotLabel {
    #[serde(rename = "Person 1")]
    Person1,
    #[serde(rename = "Person 2")]
    Person2,
}

impl SlotLabel {
    pub const ALL: [SlotLabel; 2] = [SlotLabel::Person1, SlotLabel::Person2];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person1 => "Person 1",
            Self::Person2 => "Person 2",
        }
    }

    /// Accepts `1`/`2` as well as the display labels.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '_', '-'], "");
        match normalized.as_str() {
            "1" | "person1" | "p1" => Some(Self::Person1),
            "2" | "person2" | "p2" => Some(Self::Person2),
            _ => None,
        }
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one instruction sent with every pair of portraits.
pub const FUSION_PROMPT: &str = "Using the two people from the provided images, create a new, single photorealistic image showing them together as a couple in a cute, romantic pose. Maintain their facial features and characteristics accurately. The background should be soft and slightly blurred.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub first: ImageFile,
    pub second: ImageFile,
    pub prompt: &'static str,
}

impl GenerationRequest {
    pub fn new(first: ImageFile, second: ImageFile) -> Self {
        Self {
            first,
            second,
            prompt: FUSION_PROMPT,
        }
    }
}

/// Base64 payload of the composite image, or why there is none.
pub type GenerationResult = FusionResult<String>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Loading,
    Success(String),
    Failed(String),
}

impl WorkflowState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Success(payload) => Some(payload.as_str()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Failed(_) => "failed",
        }
    }
}
