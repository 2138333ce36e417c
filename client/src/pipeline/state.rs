use std::fmt;

/// One of the four sequential pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Resolve,
    Upload,
    Parse,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "Resolve",
            Stage::Upload => "Upload",
            Stage::Parse => "Parse",
            Stage::Render => "Render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline state as observed by the UI
///
/// `Idle → Resolving → Uploading → Parsing → Rendering → Displaying`, or
/// `Failed` tagged with the stage that was running. Terminal states fall
/// back to `Idle` once the UI has been handed the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Resolving,
    Uploading,
    Parsing,
    Rendering,
    Displaying,
    Failed(Stage),
}

impl PipelineState {
    /// State entered while the given stage runs
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Resolve => PipelineState::Resolving,
            Stage::Upload => PipelineState::Uploading,
            Stage::Parse => PipelineState::Parsing,
            Stage::Render => PipelineState::Rendering,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Displaying | PipelineState::Failed(_))
    }
}
