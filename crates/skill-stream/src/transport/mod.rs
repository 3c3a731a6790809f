//! Transport seam: opening the invocation stream and reading its body.

mod http;

pub use http::HttpTransport;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::decode::ChunkDecoder;
use crate::errors::{InvokeError, ReleaseError};
use crate::request::InvocationRequest;

/// Incoming response body for one invocation.
///
/// Owned by exactly one stream session and released exactly once.
#[async_trait::async_trait]
pub trait ByteSource: Send {
    /// Reads the next chunk. `None` signals end of data.
    async fn next_chunk(&mut self) -> Option<Result<Bytes, InvokeError>>;

    /// Cancels any pending read and gives up the underlying body.
    async fn release(&mut self) -> Result<(), ReleaseError>;
}

/// A response whose body has not been read yet.
pub struct OpenedStream {
    pub status: u16,
    pub source: Box<dyn ByteSource>,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Issues the streaming invocation request.
///
/// Implementations only send the request; status validation happens in
/// [`open_stream`].
#[async_trait::async_trait]
pub trait SkillTransport: Send + Sync {
    async fn open(
        &self,
        request: &InvocationRequest,
        credential: &str,
    ) -> Result<OpenedStream, InvokeError>;
}

/// Opens the stream and rejects non-success responses.
///
/// For a non-2xx status the whole body is read as text and returned as a
/// transport error; the source is released before returning.
pub(crate) async fn open_stream(
    transport: &dyn SkillTransport,
    request: &InvocationRequest,
    credential: &str,
) -> Result<Box<dyn ByteSource>, InvokeError> {
    let OpenedStream { status, mut source } = transport.open(request, credential).await?;
    if (200..300).contains(&status) {
        debug!(status, "skill stream opened");
        return Ok(source);
    }

    let body = read_error_body(source.as_mut()).await;
    release_source(source.as_mut()).await;
    warn!(status, body = %body, "skill invocation rejected");
    let message = if body.is_empty() {
        format!("HTTP error! status: {status}")
    } else {
        body
    };
    Err(InvokeError::transport(Some(status), message))
}

async fn read_error_body(source: &mut dyn ByteSource) -> String {
    let mut decoder = ChunkDecoder::default();
    let mut body = String::new();
    while let Some(chunk) = source.next_chunk().await {
        match chunk {
            Ok(bytes) => body.push_str(&decoder.decode(&bytes)),
            Err(err) => {
                debug!(error = %err, "failed to read error body");
                return String::new();
            }
        }
    }
    body.push_str(&decoder.finish());
    body
}

/// Releases the source, logging instead of propagating a failure.
pub(crate) async fn release_source(source: &mut dyn ByteSource) {
    if let Err(err) = source.release().await {
        warn!(error = %err, "byte source cleanup failed");
    }
}
