use tracing::debug;

use crate::cancel::CancellationToken;
use crate::decode::ChunkDecoder;
use crate::dispatch::{SkillEventHandler, parse_frame};
use crate::errors::FrameError;
use crate::event::{SkillEvent, SkillPayload};
use crate::frame::FrameReassembler;

/// Transient state of one invocation's byte stream.
///
/// Owned by the read loop of a single invocation attempt and never reused.
#[derive(Debug)]
pub(crate) struct StreamSession {
    decoder: ChunkDecoder,
    frames: FrameReassembler,
    /// True until the first `start` of the current run has been delivered.
    first_message: bool,
    cancel: CancellationToken,
    runs_started: u64,
    frames_dropped: u64,
}

impl StreamSession {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            decoder: ChunkDecoder::default(),
            frames: FrameReassembler::default(),
            first_message: true,
            cancel,
            runs_started: 0,
            frames_dropped: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Decodes one chunk and dispatches every frame it completes.
    pub fn ingest<H: SkillEventHandler + ?Sized>(&mut self, chunk: &[u8], handler: &mut H) {
        let text = self.decoder.decode(chunk);
        for frame in self.frames.push(&text) {
            match parse_frame(&frame) {
                Ok(event) => self.dispatch(event, handler),
                Err(FrameError::MissingPrefix) => {}
                Err(err) => {
                    self.frames_dropped += 1;
                    debug!(error = %err, frame = %frame, "dropping skill event frame");
                }
            }
        }
    }

    /// Ends the session at end of data.
    ///
    /// An unterminated trailing line is discarded, never parsed.
    pub fn finish(&mut self) {
        let tail = self.decoder.finish();
        self.frames.push(&tail);
        let dangling = self.frames.take_pending();
        if !dangling.is_empty() {
            debug!(bytes = dangling.len(), "discarding unterminated trailing frame");
        }
    }

    fn dispatch<H: SkillEventHandler + ?Sized>(&mut self, event: SkillEvent, handler: &mut H) {
        match &event.payload {
            SkillPayload::Started { .. } => {
                if self.first_message {
                    self.first_message = false;
                    self.runs_started += 1;
                    debug!(result_id = ?event.result_id, "skill run started");
                    handler.on_start(event);
                } else {
                    debug!(result_id = ?event.result_id, "ignoring repeated start event");
                }
            }
            SkillPayload::Log(_) => handler.on_log(event),
            SkillPayload::StreamChunk(_) => handler.on_stream_chunk(event),
            SkillPayload::StructuredData(_) => handler.on_structured_data(event),
            SkillPayload::Ended { .. } => {
                debug!(result_id = ?event.result_id, "skill run ended");
                handler.on_end(event);
                self.first_message = true;
            }
        }
    }
}
