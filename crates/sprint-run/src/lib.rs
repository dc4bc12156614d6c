mod run_state;
mod tabs;

pub use run_state::{Applied, ApplyError, RunState, StepDeclaration, StepRecord, StepState};
pub use tabs::{Pane, PaneContent, TabError, TabKey, TabStrip};
