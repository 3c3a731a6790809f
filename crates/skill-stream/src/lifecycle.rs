use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::dispatch::{SkillEventHandler, StreamOutcome};
use crate::errors::InvokeError;
use crate::request::InvocationRequest;
use crate::session::StreamSession;
use crate::transport::{ByteSource, SkillTransport, open_stream, release_source};

/// States of one invocation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LifecycleState {
    Idle,
    Opening,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl LifecycleState {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn can_advance_to(self, next: Self) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Opening)
                | (Opening, Streaming | Failed | Cancelled)
                | (Streaming, Completed | Failed | Cancelled)
        )
    }
}

impl From<StreamOutcome> for LifecycleState {
    fn from(outcome: StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::Completed => Self::Completed,
            StreamOutcome::Failed => Self::Failed,
            StreamOutcome::Cancelled => Self::Cancelled,
        }
    }
}

struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: LifecycleState::Idle,
        }
    }

    fn advance(&mut self, next: LifecycleState) {
        debug_assert!(!self.state.is_terminal(), "invocation already finished");
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid lifecycle transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "invocation state change");
        self.state = next;
    }
}

enum ReadStep {
    Chunk(Bytes),
    End,
    Failed(InvokeError),
    Cancelled,
}

/// Drives one invocation from request to terminal state.
///
/// Returns once the stream has fully terminated and the byte source has been
/// released. `Err` means the stream never opened; the handler has already
/// received the error through `on_error` and `on_completed` is not called.
pub(crate) async fn run_invocation<H>(
    transport: &dyn SkillTransport,
    request: &InvocationRequest,
    credential: &str,
    cancel: &CancellationToken,
    handler: &mut H,
) -> Result<StreamOutcome, InvokeError>
where
    H: SkillEventHandler + ?Sized,
{
    let mut lifecycle = Lifecycle::new();
    lifecycle.advance(LifecycleState::Opening);

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InvokeError::Cancelled),
        opened = open_stream(transport, request, credential) => opened,
    };
    let mut source = match opened {
        Ok(source) => source,
        Err(err) => {
            lifecycle.advance(if err.is_cancelled() {
                LifecycleState::Cancelled
            } else {
                LifecycleState::Failed
            });
            warn!(error = %err, "skill stream did not open");
            handler.on_error(&err);
            return Err(err);
        }
    };

    lifecycle.advance(LifecycleState::Streaming);
    let mut session = StreamSession::new(cancel.clone());
    let outcome = stream_events(source.as_mut(), &mut session, handler).await;
    lifecycle.advance(outcome.into());
    release_source(source.as_mut()).await;

    info!(
        ?outcome,
        runs = session.runs_started(),
        dropped_frames = session.frames_dropped(),
        "skill stream finished"
    );
    Ok(outcome)
}

async fn stream_events<H>(
    source: &mut dyn ByteSource,
    session: &mut StreamSession,
    handler: &mut H,
) -> StreamOutcome
where
    H: SkillEventHandler + ?Sized,
{
    loop {
        match read_step(source, session).await {
            ReadStep::Chunk(bytes) => session.ingest(&bytes, handler),
            ReadStep::End => {
                session.finish();
                handler.on_completed(StreamOutcome::Completed);
                return StreamOutcome::Completed;
            }
            ReadStep::Failed(err) => {
                warn!(error = %err, "skill stream read failed");
                handler.on_error(&err);
                handler.on_completed(StreamOutcome::Failed);
                return StreamOutcome::Failed;
            }
            ReadStep::Cancelled => {
                debug!("skill stream cancelled");
                handler.on_error(&InvokeError::Cancelled);
                handler.on_completed(StreamOutcome::Cancelled);
                return StreamOutcome::Cancelled;
            }
        }
    }
}

async fn read_step(source: &mut dyn ByteSource, session: &StreamSession) -> ReadStep {
    if session.is_cancelled() {
        return ReadStep::Cancelled;
    }
    tokio::select! {
        biased;
        _ = session.cancel_token().cancelled() => ReadStep::Cancelled,
        next = source.next_chunk() => match next {
            Some(Ok(bytes)) => ReadStep::Chunk(bytes),
            Some(Err(InvokeError::Cancelled)) => ReadStep::Cancelled,
            Some(Err(err)) => ReadStep::Failed(err),
            None => ReadStep::End,
        },
    }
}
