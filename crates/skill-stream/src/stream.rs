use tokio::sync::{mpsc, oneshot};

use crate::cancel::CancellationToken;
use crate::dispatch::{SkillEventHandler, StreamOutcome};
use crate::errors::{ClientError, InvokeError};
use crate::event::{SkillEvent, SkillPayload};

/// Events yielded by [`InvocationStream::next_event`].
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Started(SkillEvent),
    Log(SkillEvent),
    Chunk(SkillEvent),
    StructuredData(SkillEvent),
    Ended(SkillEvent),
    /// Transport, read, or cancellation failure.
    Error(InvokeError),
    /// Terminal event once streaming started.
    Finished(StreamOutcome),
}

/// Aggregated result of a finished invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvocationSummary {
    pub result_id: String,
    /// All stream chunks concatenated in arrival order.
    pub text: String,
    /// Number of skill runs that reached their `end` event.
    pub runs: usize,
    pub structured_data: Vec<serde_json::Value>,
}

/// Forwards callbacks into the pull channel while building the summary.
pub(crate) struct ChannelHandler {
    tx: mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
    summary: InvocationSummary,
    last_error: Option<InvokeError>,
}

impl ChannelHandler {
    pub(crate) fn new(
        result_id: String,
        tx: mpsc::UnboundedSender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tx,
            cancel,
            summary: InvocationSummary {
                result_id,
                ..InvocationSummary::default()
            },
            last_error: None,
        }
    }

    fn forward(&self, event: StreamEvent) {
        // Nobody is listening any more, so stop reading the stream.
        if self.tx.send(event).is_err() {
            self.cancel.cancel();
        }
    }

    /// Terminal result for `InvocationStream::finish`.
    pub(crate) fn into_result(
        self,
        outcome: Result<StreamOutcome, InvokeError>,
    ) -> Result<InvocationSummary, InvokeError> {
        match outcome {
            Ok(StreamOutcome::Completed) => Ok(self.summary),
            Ok(StreamOutcome::Cancelled) => Err(InvokeError::Cancelled),
            Ok(StreamOutcome::Failed) => Err(self
                .last_error
                .unwrap_or_else(|| InvokeError::read("skill stream failed"))),
            Err(err) => Err(err),
        }
    }
}

impl SkillEventHandler for ChannelHandler {
    fn on_start(&mut self, event: SkillEvent) {
        self.forward(StreamEvent::Started(event));
    }

    fn on_log(&mut self, event: SkillEvent) {
        self.forward(StreamEvent::Log(event));
    }

    fn on_stream_chunk(&mut self, event: SkillEvent) {
        if let Some(text) = event.text() {
            self.summary.text.push_str(text);
        }
        self.forward(StreamEvent::Chunk(event));
    }

    fn on_structured_data(&mut self, event: SkillEvent) {
        if let SkillPayload::StructuredData(value) = &event.payload {
            self.summary.structured_data.push(value.clone());
        }
        self.forward(StreamEvent::StructuredData(event));
    }

    fn on_end(&mut self, event: SkillEvent) {
        self.summary.runs += 1;
        self.forward(StreamEvent::Ended(event));
    }

    fn on_error(&mut self, error: &InvokeError) {
        self.last_error = Some(error.clone());
        self.forward(StreamEvent::Error(error.clone()));
    }

    fn on_completed(&mut self, outcome: StreamOutcome) {
        self.forward(StreamEvent::Finished(outcome));
    }
}

/// Pull-style handle returned by `SkillClient::start_stream`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to
/// obtain the summary after the stream terminated.
/// Dropping the handle cancels the invocation and releases its body.
pub struct InvocationStream {
    result_id: String,
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    final_rx: oneshot::Receiver<Result<InvocationSummary, InvokeError>>,
    cancel: CancellationToken,
}

impl InvocationStream {
    pub(crate) fn new(
        result_id: String,
        rx: mpsc::UnboundedReceiver<StreamEvent>,
        final_rx: oneshot::Receiver<Result<InvocationSummary, InvokeError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            result_id,
            rx,
            final_rx,
            cancel,
        }
    }

    pub fn result_id(&self) -> &str {
        &self.result_id
    }

    /// Returns a token that cancels this invocation.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the next event. Returns `None` once the invocation ended.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drains remaining events and returns the terminal result.
    pub async fn finish(mut self) -> Result<InvocationSummary, ClientError> {
        while self.rx.recv().await.is_some() {}
        match (&mut self.final_rx).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::protocol_msg(format!(
                "invocation task ended without a final result (result_id={})",
                self.result_id
            ))),
        }
    }
}

impl Drop for InvocationStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
