use crate::errors::{FrameError, InvokeError};
use crate::event::SkillEvent;
use crate::frame::data_payload;

/// How a stream that reached the streaming state ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    /// The byte source reached end of data.
    Completed,
    /// A read failed mid-stream.
    Failed,
    /// The cancellation token fired.
    Cancelled,
}

impl StreamOutcome {
    /// The error flag passed with the completion callback.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Receives the typed events of one invocation, synchronously and in the
/// order the server emitted them.
///
/// Handlers must not panic; a panicking handler leaves the invocation in an
/// unspecified state.
pub trait SkillEventHandler {
    /// First `start` event of a skill run.
    fn on_start(&mut self, event: SkillEvent);

    fn on_log(&mut self, event: SkillEvent);

    fn on_stream_chunk(&mut self, event: SkillEvent);

    fn on_structured_data(&mut self, event: SkillEvent);

    /// A skill run ended. A later `start` in the same stream begins a new run.
    fn on_end(&mut self, event: SkillEvent);

    /// Transport, read, or cancellation failure.
    fn on_error(&mut self, error: &InvokeError) {
        let _ = error;
    }

    /// Fires once after streaming started and then terminated.
    ///
    /// Not called when the stream never opened (non-success status, send
    /// failure, or cancellation while connecting); `on_error` alone reports
    /// those.
    fn on_completed(&mut self, outcome: StreamOutcome) {
        let _ = outcome;
    }
}

/// Parses one complete frame into a skill event.
pub(crate) fn parse_frame(frame: &str) -> Result<SkillEvent, FrameError> {
    let payload = data_payload(frame).ok_or(FrameError::MissingPrefix)?;
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every callback as a flat, comparable log.
    #[derive(Debug, Default)]
    pub struct RecordingHandler {
        pub calls: Vec<Call>,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Start(SkillEvent),
        Log(SkillEvent),
        Chunk(String),
        Structured(SkillEvent),
        End(SkillEvent),
        Error(InvokeError),
        Completed(StreamOutcome),
    }

    impl RecordingHandler {
        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }

        pub fn events(&self) -> Vec<Call> {
            self.calls
                .iter()
                .filter(|c| !matches!(c, Call::Error(_) | Call::Completed(_)))
                .cloned()
                .collect()
        }
    }

    impl SkillEventHandler for RecordingHandler {
        fn on_start(&mut self, event: SkillEvent) {
            self.calls.push(Call::Start(event));
        }

        fn on_log(&mut self, event: SkillEvent) {
            self.calls.push(Call::Log(event));
        }

        fn on_stream_chunk(&mut self, event: SkillEvent) {
            self.calls
                .push(Call::Chunk(event.text().unwrap_or_default().to_string()));
        }

        fn on_structured_data(&mut self, event: SkillEvent) {
            self.calls.push(Call::Structured(event));
        }

        fn on_end(&mut self, event: SkillEvent) {
            self.calls.push(Call::End(event));
        }

        fn on_error(&mut self, error: &InvokeError) {
            self.calls.push(Call::Error(error.clone()));
        }

        fn on_completed(&mut self, outcome: StreamOutcome) {
            self.calls.push(Call::Completed(outcome));
        }
    }
}
