use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument as _, warn};

use crate::cancel::CancellationToken;
use crate::config::ClientConfig;
use crate::credentials::{CredentialProvider, EnvCredential};
use crate::dispatch::{SkillEventHandler, StreamOutcome};
use crate::errors::{ClientError, InvokeError};
use crate::lifecycle::run_invocation;
use crate::request::InvocationRequest;
use crate::stream::{ChannelHandler, InvocationStream};
use crate::transport::{HttpTransport, SkillTransport};

struct ClientInner {
    transport: Arc<dyn SkillTransport>,
    credentials: Arc<dyn CredentialProvider>,
}

/// Entry point for invoking skills over the streaming endpoint.
///
/// Cheap to clone; clones share the transport and credential provider.
#[derive(Clone)]
pub struct SkillClient {
    inner: Arc<ClientInner>,
}

impl SkillClient {
    /// Starts a builder for the given configuration.
    pub fn builder(config: ClientConfig) -> SkillClientBuilder {
        SkillClientBuilder {
            config,
            transport: None,
            credentials: None,
        }
    }

    /// Builds a client from `SKILL_STREAM_*` environment variables, reading
    /// the credential from `SKILL_STREAM_TOKEN`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::builder(ClientConfig::from_env()?).build()
    }

    /// Invokes a skill and delivers its events to `handler` in arrival order.
    ///
    /// Resolves only after the stream fully terminated and its body was
    /// released. `Ok` carries how a started stream ended (`on_completed`
    /// has fired). `Err` means the stream never opened: a non-success
    /// status, a send failure, or cancellation before the stream opened
    /// (including during the credential lookup). In that
    /// case `on_error` fired and `on_completed` did not.
    pub async fn invoke<H>(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
        handler: &mut H,
    ) -> Result<StreamOutcome, InvokeError>
    where
        H: SkillEventHandler + ?Sized,
    {
        let span = tracing::info_span!(
            "skill_invoke",
            result_id = %request.result_id(),
            skill = request.skill_name().unwrap_or("default"),
        );
        async {
            let credential = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                credential = self.inner.credentials.credential() => Some(credential),
            };
            let Some(credential) = credential else {
                warn!("skill invocation cancelled before credential lookup finished");
                handler.on_error(&InvokeError::Cancelled);
                return Err(InvokeError::Cancelled);
            };
            run_invocation(
                self.inner.transport.as_ref(),
                request,
                &credential,
                cancel,
                handler,
            )
            .await
        }
        .instrument(span)
        .await
    }

    /// Spawns the invocation and returns a pull-style event stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_stream(&self, request: InvocationRequest) -> InvocationStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let (final_tx, final_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let result_id = request.result_id().to_string();

        let client = self.clone();
        let task_cancel = cancel.clone();
        let mut handler = ChannelHandler::new(result_id.clone(), tx, cancel.clone());
        tokio::spawn(async move {
            let outcome = client.invoke(&request, &task_cancel, &mut handler).await;
            let _ = final_tx.send(handler.into_result(outcome));
        });

        InvocationStream::new(result_id, rx, final_rx, cancel)
    }

    /// Runs to completion and returns all streamed text concatenated.
    pub async fn collect_text(&self, request: InvocationRequest) -> Result<String, ClientError> {
        Ok(self.start_stream(request).finish().await?.text)
    }
}

/// Builder used to plug in the transport and credential source.
pub struct SkillClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn SkillTransport>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl SkillClientBuilder {
    /// Replaces the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn SkillTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the default `SKILL_STREAM_TOKEN` credential source.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> Result<SkillClient, ClientError> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(EnvCredential::default()));
        Ok(SkillClient {
            inner: Arc::new(ClientInner {
                transport,
                credentials,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredential;
    use crate::dispatch::testing::{Call, RecordingHandler};
    use crate::stream::StreamEvent;
    use crate::transport::testing::{FakeTransport, Step};
    use std::time::Duration;

    fn client(transport: Arc<FakeTransport>) -> SkillClient {
        SkillClient::builder(ClientConfig::new("http://skills.test"))
            .transport(transport)
            .credentials(Arc::new(StaticCredential::new("tok-1")))
            .build()
            .expect("client")
    }

    fn request() -> InvocationRequest {
        InvocationRequest::builder("hello")
            .skill("common_qna")
            .build()
            .expect("request")
    }

    const TWO_RUNS: &str = concat!(
        "data: {\"event\":\"start\"}\n",
        "data: {\"event\":\"stream\",\"payload\":\"a\"}\n",
        "data: {\"event\":\"structured_data\",\"payload\":{\"n\":1}}\n",
        "data: {\"event\":\"end\"}\n",
        "data: {\"event\":\"start\"}\n",
        "data: {\"event\":\"stream\",\"payload\":\"b\"}\n",
        "data: {\"event\":\"end\"}\n",
    );

    #[test]
    fn build_rejects_invalid_config() {
        let result = SkillClient::builder(ClientConfig::new("")).build();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn invoke_uses_credential_provider() {
        let transport = Arc::new(FakeTransport::chunks([TWO_RUNS]));
        let mut handler = RecordingHandler::default();
        let outcome = client(transport.clone())
            .invoke(&request(), &CancellationToken::new(), &mut handler)
            .await;
        assert_eq!(outcome, Ok(StreamOutcome::Completed));
        assert_eq!(
            *transport.credentials.lock().expect("lock"),
            vec!["tok-1".to_string()]
        );
        assert_eq!(handler.count(|c| matches!(c, Call::Start(_))), 2);
    }

    #[tokio::test]
    async fn start_stream_yields_events_then_summary() {
        let transport = Arc::new(FakeTransport::chunks([TWO_RUNS]));
        let mut stream = client(transport).start_stream(request());

        let mut kinds = Vec::new();
        while let Some(event) = stream.next_event().await {
            kinds.push(std::mem::discriminant(&event));
            if matches!(event, StreamEvent::Finished(_)) {
                break;
            }
        }
        assert_eq!(kinds.len(), 8);

        let summary = stream.finish().await.expect("summary");
        assert_eq!(summary.text, "ab");
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.structured_data, vec![serde_json::json!({"n":1})]);
    }

    #[tokio::test]
    async fn collect_text_surfaces_transport_error() {
        let transport = Arc::new(FakeTransport::streaming(
            500,
            vec![Step::Chunk(b"internal error".to_vec())],
        ));
        let err = client(transport)
            .collect_text(request())
            .await
            .expect_err("500 must fail");
        assert_eq!(
            err,
            ClientError::Invoke(InvokeError::transport(Some(500), "internal error"))
        );
    }

    #[tokio::test]
    async fn abort_handle_cancels_running_stream() {
        let transport = Arc::new(FakeTransport::streaming(
            200,
            vec![
                Step::Chunk(b"data: {\"event\":\"start\"}\n".to_vec()),
                Step::Hang,
            ],
        ));
        let mut stream = client(transport.clone()).start_stream(request());
        let first = stream.next_event().await.expect("first event");
        assert!(matches!(first, StreamEvent::Started(_)));

        stream.abort_handle().cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), stream.finish())
            .await
            .expect("finish after abort");
        assert_eq!(result, Err(ClientError::Invoke(InvokeError::Cancelled)));
        assert_eq!(transport.probe.count(), 1);
    }

    #[tokio::test]
    async fn dropping_stream_releases_stalled_invocation() {
        let transport = Arc::new(FakeTransport::streaming(
            200,
            vec![
                Step::Chunk(b"data: {\"event\":\"start\"}\n".to_vec()),
                Step::Hang,
            ],
        ));
        let mut stream = client(transport.clone()).start_stream(request());
        let first = stream.next_event().await.expect("first event");
        assert!(matches!(first, StreamEvent::Started(_)));

        drop(stream);
        tokio::time::timeout(Duration::from_secs(5), async {
            while transport.probe.count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("release after drop");
        assert_eq!(transport.probe.count(), 1);
    }

    #[tokio::test]
    async fn cancel_during_slow_credential_lookup() {
        let transport = Arc::new(FakeTransport::chunks([TWO_RUNS]));
        let client = SkillClient::builder(ClientConfig::new("http://skills.test"))
            .transport(transport.clone())
            .credentials(Arc::new(StalledCredential))
            .build()
            .expect("client");
        let cancel = CancellationToken::new();
        let mut handler = RecordingHandler::default();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            client.invoke(&request(), &cancel, &mut handler),
        )
        .await
        .expect("cancel interrupts credential lookup");

        assert_eq!(outcome, Err(InvokeError::Cancelled));
        assert_eq!(handler.count(|c| matches!(c, Call::Error(_))), 1);
        assert_eq!(handler.count(|c| matches!(c, Call::Completed(_))), 0);
        assert!(transport.credentials.lock().expect("lock").is_empty());
    }

    struct StalledCredential;

    #[async_trait::async_trait]
    impl CredentialProvider for StalledCredential {
        async fn credential(&self) -> String {
            futures::future::pending().await
        }
    }
}
