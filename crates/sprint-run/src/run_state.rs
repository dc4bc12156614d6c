use sprint_wire::{StepOutcome, StreamMessage};
use thiserror::Error;

/// One entry of the step list captured at run start. The list is immutable
/// for the lifetime of a run; indices are 1-based to match the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDeclaration {
    pub index: u32,
    pub title: String,
}

impl StepDeclaration {
    /// Builds the declaration list from the ordered titles snapshot.
    pub fn declare(titles: &[String]) -> Vec<StepDeclaration> {
        titles
            .iter()
            .enumerate()
            .map(|(position, title)| StepDeclaration {
                index: position as u32 + 1,
                title: title.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Completed {
        result: String,
        execution_time: Option<String>,
    },
    Failed {
        error: String,
        execution_time: Option<String>,
    },
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepState::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub index: u32,
    pub title: String,
    pub state: StepState,
}

/// What a successfully applied message changed, so the presentation layer
/// can react without re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Step { index: u32, duplicate: bool },
    FinalReport { repeat: bool },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("step {step} is outside the declared range 1..={declared}")]
    OutOfRangeStep { step: u32, declared: u32 },
}

/// Per-run state. A new run constructs a fresh value; runs are never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    steps: Vec<StepRecord>,
    final_report: Option<String>,
}

impl RunState {
    pub fn new(declarations: Vec<StepDeclaration>) -> Self {
        let steps = declarations
            .into_iter()
            .map(|declaration| StepRecord {
                index: declaration.index,
                title: declaration.title,
                state: StepState::Pending,
            })
            .collect();
        Self {
            steps,
            final_report: None,
        }
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn step(&self, index: u32) -> Option<&StepRecord> {
        if index == 0 {
            return None;
        }
        self.steps.get(index as usize - 1)
    }

    pub fn step_count(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn resolved_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|record| record.state.is_terminal())
            .count()
    }

    pub fn final_report_text(&self) -> Option<&str> {
        self.final_report.as_deref()
    }

    /// The already-rendered text for one step, for the per-step download
    /// trigger. Failed steps expose their error text; pending steps expose
    /// nothing.
    pub fn step_report_text(&self, index: u32) -> Option<&str> {
        match &self.step(index)?.state {
            StepState::Pending => None,
            StepState::Completed { result, .. } => Some(result),
            StepState::Failed { error, .. } => Some(error),
        }
    }

    /// Every resolved step followed by the final report, the payload behind
    /// the "download everything as text" trigger.
    pub fn combined_report_text(&self) -> String {
        let mut sections = Vec::new();
        for record in &self.steps {
            if let Some(text) = self.step_report_text(record.index) {
                sections.push(format!("Step {}: {}\n{}", record.index, record.title, text));
            }
        }
        if let Some(body) = self.final_report_text() {
            sections.push(format!("Final Research Report\n{body}"));
        }
        sections.join("\n\n")
    }

    /// Applies one wire message. Step records transition Pending to a
    /// terminal state; a repeated message for the same step overwrites the
    /// record in place (last write wins) and is flagged as a duplicate. The
    /// resulting state is identical under any permutation of the same step
    /// messages.
    pub fn apply(&mut self, message: &StreamMessage) -> Result<Applied, ApplyError> {
        match message {
            StreamMessage::Step(step_message) => {
                let declared = self.step_count();
                if step_message.step == 0 || step_message.step > declared {
                    return Err(ApplyError::OutOfRangeStep {
                        step: step_message.step,
                        declared,
                    });
                }

                let record = &mut self.steps[step_message.step as usize - 1];
                let duplicate = record.state.is_terminal();
                record.state = match &step_message.outcome {
                    StepOutcome::Result(result) => StepState::Completed {
                        result: result.clone(),
                        execution_time: step_message.execution_time.clone(),
                    },
                    StepOutcome::Error(error) => StepState::Failed {
                        error: error.clone(),
                        execution_time: step_message.execution_time.clone(),
                    },
                };

                Ok(Applied::Step {
                    index: step_message.step,
                    duplicate,
                })
            }
            StreamMessage::FinalReport(body) => {
                let repeat = self.final_report.is_some();
                self.final_report = Some(body.clone());
                Ok(Applied::FinalReport { repeat })
            }
        }
    }
}
