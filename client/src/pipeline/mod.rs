//! Pipeline orchestration module
//!
//! This module provides:
//! - `Orchestrator` which runs Resolve → Upload → Parse → Render once per call
//! - `PipelineState` and `Stage` for observing progress
//! - `StageError`, the single error type a run can fail with
//! - `UiHandle`/`UiEvent`, the channel to the UI collaborator

mod error;
mod orchestrator;
mod state;
mod ui;

pub use error::{ErrorCause, StageError, StageFailure};
pub use orchestrator::{Orchestrator, PipelineResult};
pub use state::{PipelineState, Stage};
pub use ui::{UiEvent, UiHandle};
