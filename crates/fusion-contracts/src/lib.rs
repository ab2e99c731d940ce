pub mod errors;
pub mod events;
pub mod files;
pub mod session;
pub mod themes;
pub mod workflow;

pub use errors::{FusionError, FusionResult};
pub use files::ImageFile;
pub use workflow::{GenerationRequest, GenerationResult, SlotLabel, WorkflowState};
