//! Common imports for typical client usage.
pub use crate::{
    CancellationToken, ClientConfig, ClientError, InvocationRequest, InvocationStream,
    InvokeError, SkillClient, SkillEvent, SkillEventHandler, SkillEventKind, SkillPayload,
    StaticCredential, StreamEvent, StreamOutcome,
};
