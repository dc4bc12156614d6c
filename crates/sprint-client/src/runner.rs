use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, warn};

use sprint_run::{Applied, RunState, StepDeclaration, TabStrip};
use sprint_wire::{parse_line, LineDecoder, StreamMessage};

use crate::client::SprintClient;

/// Collaborator boundary: whatever owns the step list exposes the current
/// ordered titles synchronously; they are snapshotted once per run.
pub trait StepSource {
    fn research_steps(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct FixedSteps {
    titles: Vec<String>,
}

impl FixedSteps {
    pub fn new(titles: Vec<String>) -> Self {
        Self { titles }
    }
}

impl StepSource for FixedSteps {
    fn research_steps(&self) -> Vec<String> {
        self.titles.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    TransportFailed(String),
    Cancelled,
}

/// Counters for the recoverable anomalies; none of these abort a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub parse_failures: u64,
    pub out_of_range: u64,
    pub duplicate_steps: u64,
}

#[derive(Debug)]
pub struct DeepSprintRun {
    pub state: RunState,
    pub tabs: TabStrip,
    pub stats: RunStats,
    pub outcome: RunOutcome,
}

pub type ProgressHandler<'a> = &'a mut dyn FnMut(&RunState, &TabStrip);

/// Drives one run end to end: snapshot declarations, initialize the run
/// state and pending tabs, issue the request, then apply each decoded
/// message to the state machine and the presentation manager strictly in
/// wire order. All mutation happens on this single task.
pub async fn run_deep_sprint(
    client: &SprintClient,
    source: &dyn StepSource,
    mut cancel_rx: watch::Receiver<bool>,
    mut on_progress: Option<ProgressHandler<'_>>,
) -> DeepSprintRun {
    let titles = source.research_steps();
    let declarations = StepDeclaration::declare(&titles);
    let mut state = RunState::new(declarations.clone());
    let mut tabs = TabStrip::new();
    for declaration in &declarations {
        tabs.ensure_processing_tab(declaration);
    }
    let mut stats = RunStats::default();

    let response = match client.execute_deep_sprint(&titles).await {
        Ok(response) => response,
        Err(error) => {
            warn!("deep sprint request failed: {error}");
            tabs.set_run_error("Error processing research steps");
            return DeepSprintRun {
                state,
                tabs,
                stats,
                outcome: RunOutcome::TransportFailed(error.to_string()),
            };
        }
    };

    // Second handle on the abort flag: one chunk can close many frames, and
    // an abort raised while they are being applied must stop before the next
    // frame mutates anything.
    let cancel_flag = cancel_rx.clone();
    let cancelled = async move {
        loop {
            if *cancel_rx.borrow() {
                return;
            }
            if cancel_rx.changed().await.is_err() {
                // Sender dropped without signalling: no abort can arrive.
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::pin!(cancelled);

    let mut stream = response.bytes_stream();
    let mut decoder = LineDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = &mut cancelled => {
                debug!("deep sprint run aborted; discarding stream");
                return DeepSprintRun {
                    state,
                    tabs,
                    stats,
                    outcome: RunOutcome::Cancelled,
                };
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            None => break,
            Some(Ok(bytes)) => {
                for line in decoder.push(&bytes) {
                    if *cancel_flag.borrow() {
                        debug!("deep sprint run aborted; discarding stream");
                        return DeepSprintRun {
                            state,
                            tabs,
                            stats,
                            outcome: RunOutcome::Cancelled,
                        };
                    }
                    stats.frames += 1;
                    handle_line(&line, &mut state, &mut tabs, &mut stats);
                    if let Some(handler) = on_progress.as_mut() {
                        handler(&state, &tabs);
                    }
                }
            }
            Some(Err(error)) => {
                warn!("deep sprint stream failed mid-run: {error}");
                tabs.set_run_error("Error processing research steps");
                return DeepSprintRun {
                    state,
                    tabs,
                    stats,
                    outcome: RunOutcome::TransportFailed(error.to_string()),
                };
            }
        }
    }

    // Best effort on a trailing unterminated frame; drop it if malformed.
    if let Some(trailing) = decoder.finish() {
        match parse_line(&trailing) {
            Ok(message) => {
                stats.frames += 1;
                apply_message(&message, &mut state, &mut tabs, &mut stats);
                if let Some(handler) = on_progress.as_mut() {
                    handler(&state, &tabs);
                }
            }
            Err(failure) => {
                stats.frames += 1;
                stats.parse_failures += 1;
                warn!("dropping unterminated trailing frame: {failure}");
            }
        }
    }

    DeepSprintRun {
        state,
        tabs,
        stats,
        outcome: RunOutcome::Completed,
    }
}

fn handle_line(line: &str, state: &mut RunState, tabs: &mut TabStrip, stats: &mut RunStats) {
    match parse_line(line) {
        Ok(message) => apply_message(&message, state, tabs, stats),
        Err(failure) => {
            stats.parse_failures += 1;
            warn!("discarding undecodable frame: {failure}");
        }
    }
}

fn apply_message(
    message: &StreamMessage,
    state: &mut RunState,
    tabs: &mut TabStrip,
    stats: &mut RunStats,
) {
    match state.apply(message) {
        Ok(Applied::Step { index, duplicate }) => {
            if duplicate {
                stats.duplicate_steps += 1;
                warn!("step {index} resolved more than once; overwriting in place");
            }
            if let Some(record) = state.step(index) {
                tabs.resolve_step(record);
            }
        }
        Ok(Applied::FinalReport { repeat }) => {
            if repeat {
                warn!("final report delivered more than once; overwriting in place");
            }
            tabs.store_final_report(state.final_report_text().unwrap_or_default());
        }
        Err(error) => {
            stats.out_of_range += 1;
            warn!("ignoring step message: {error}");
        }
    }
}
