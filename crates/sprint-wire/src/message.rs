use serde::Deserialize;
use thiserror::Error;

/// One application-level message decoded off the wire. Each frame is a
/// standalone JSON object classified by its discriminating field:
/// `final_report` marks the synthesized report, `step` marks a per-step
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Step(StepResultMessage),
    FinalReport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResultMessage {
    pub step: u32,
    pub outcome: StepOutcome,
    pub execution_time: Option<String>,
}

/// Exactly one of `result`/`error` is set on a step frame. A backend-reported
/// error is a valid terminal outcome, not a protocol failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Result(String),
    Error(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("frame is not valid JSON: {0}")]
    NotJson(String),
    #[error("frame matches no known message shape")]
    UnknownShape,
    #[error("step {step} frame carries both result and error")]
    ConflictingPayload { step: u32 },
    #[error("step {step} frame carries neither result nor error")]
    MissingPayload { step: u32 },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    step: Option<u32>,
    result: Option<String>,
    error: Option<String>,
    execution_time: Option<String>,
    final_report: Option<String>,
}

/// Parses one decoded frame. Failures are recoverable: the caller logs them
/// and keeps consuming subsequent frames.
pub fn parse_line(line: &str) -> Result<StreamMessage, ParseFailure> {
    let raw: RawFrame =
        serde_json::from_str(line).map_err(|error| ParseFailure::NotJson(error.to_string()))?;

    if let Some(body) = raw.final_report {
        return Ok(StreamMessage::FinalReport(body));
    }

    let Some(step) = raw.step else {
        return Err(ParseFailure::UnknownShape);
    };

    let outcome = match (raw.result, raw.error) {
        (Some(_), Some(_)) => return Err(ParseFailure::ConflictingPayload { step }),
        (Some(result), None) => StepOutcome::Result(result),
        (None, Some(error)) => StepOutcome::Error(error),
        (None, None) => return Err(ParseFailure::MissingPayload { step }),
    };

    Ok(StreamMessage::Step(StepResultMessage {
        step,
        outcome,
        execution_time: raw.execution_time,
    }))
}
