mod client;
mod render;
mod runner;

pub use client::{ClientConfig, SprintClient, TransportError};
pub use render::{render_run, RenderOptions};
pub use runner::{
    run_deep_sprint, DeepSprintRun, FixedSteps, ProgressHandler, RunOutcome, RunStats, StepSource,
};
