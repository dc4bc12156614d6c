mod decoder;
mod message;

pub use decoder::LineDecoder;
pub use message::{parse_line, ParseFailure, StepOutcome, StepResultMessage, StreamMessage};
