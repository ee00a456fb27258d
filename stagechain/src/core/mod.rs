//! Core types shared across the engine.

mod identifier;
mod payload;
mod status;

pub use identifier::{StageIdentifier, StageKind};
pub use payload::PipelinePayload;
pub use status::StageStatus;
