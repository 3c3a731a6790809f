//! Streaming skill-invocation client.
//!
//! Posts an invocation request, then turns the long-lived response body into
//! an ordered sequence of typed skill events delivered to a handler.
//!
//! # Handler usage
//!
//! ```no_run
//! use skill_stream::prelude::*;
//!
//! struct Printer;
//!
//! impl SkillEventHandler for Printer {
//!     fn on_start(&mut self, _event: SkillEvent) {}
//!     fn on_log(&mut self, _event: SkillEvent) {}
//!     fn on_stream_chunk(&mut self, event: SkillEvent) {
//!         print!("{}", event.text().unwrap_or_default());
//!     }
//!     fn on_structured_data(&mut self, _event: SkillEvent) {}
//!     fn on_end(&mut self, _event: SkillEvent) {
//!         println!();
//!     }
//!     fn on_error(&mut self, error: &InvokeError) {
//!         eprintln!("skill error: {error}");
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = SkillClient::builder(ClientConfig::new("http://localhost:5800"))
//!     .credentials(std::sync::Arc::new(StaticCredential::new("token")))
//!     .build()?;
//! let request = InvocationRequest::builder("Summarize the attached document")
//!     .skill("summary")
//!     .document("d-123")
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! let _ = client.invoke(&request, &cancel, &mut Printer).await;
//! # Ok(())
//! # }
//! ```

/// Cooperative cancellation token.
pub mod cancel;
/// Client entry point and builder.
pub mod client;
/// Endpoint and HTTP client configuration.
pub mod config;
/// Bearer credential sources.
pub mod credentials;
mod decode;
/// Event handler contract and stream outcome.
pub mod dispatch;
/// Public error types.
pub mod errors;
/// Skill event model and wire format.
pub mod event;
mod frame;
mod lifecycle;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Invocation request model and builder.
pub mod request;
mod session;
/// Pull-style event stream.
pub mod stream;
/// Transport and byte source contracts plus the reqwest implementation.
pub mod transport;

pub use cancel::CancellationToken;
pub use client::{SkillClient, SkillClientBuilder};
pub use config::ClientConfig;
pub use credentials::{CredentialProvider, EnvCredential, StaticCredential};
pub use dispatch::{SkillEventHandler, StreamOutcome};
pub use errors::{ClientError, InvokeError, ReleaseError};
pub use event::{SkillEvent, SkillEventKind, SkillPayload};
pub use request::{
    DocumentRef, InvocationContext, InvocationRequest, InvocationRequestBuilder, ResourceRef,
    ResultRef, SkillInput,
};
pub use stream::{InvocationStream, InvocationSummary, StreamEvent};
pub use transport::{ByteSource, HttpTransport, OpenedStream, SkillTransport};
