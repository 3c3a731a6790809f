use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, InvokeError, ReleaseError};
use crate::request::InvocationRequest;

use super::{ByteSource, OpenedStream, SkillTransport};

type BodyStream =
    Pin<Box<dyn futures::Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static>>;

/// reqwest-backed transport that POSTs the request to the invocation endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.invoke_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl SkillTransport for HttpTransport {
    async fn open(
        &self,
        request: &InvocationRequest,
        credential: &str,
    ) -> Result<OpenedStream, InvokeError> {
        debug!(url = %self.url, result_id = %request.result_id(), "posting skill invocation");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(credential)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                InvokeError::transport(None, format!("skill invocation request failed: {e}"))
            })?;

        let status = response.status().as_u16();
        Ok(OpenedStream {
            status,
            source: Box::new(HttpByteSource {
                body: Some(Box::pin(response.bytes_stream())),
            }),
        })
    }
}

/// Response body of an invocation. Dropping the body stream aborts any
/// pending read and returns the connection.
struct HttpByteSource {
    body: Option<BodyStream>,
}

#[async_trait::async_trait]
impl ByteSource for HttpByteSource {
    async fn next_chunk(&mut self) -> Option<Result<Bytes, InvokeError>> {
        let body = self.body.as_mut()?;
        let chunk = body.next().await?;
        Some(chunk.map_err(|e| InvokeError::read(format!("skill stream read failed: {e}"))))
    }

    async fn release(&mut self) -> Result<(), ReleaseError> {
        self.body.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_comes_from_config() {
        let transport = HttpTransport::new(
            &ClientConfig::new("http://127.0.0.1:5800/").invoke_path("/v1/skill/streamInvoke"),
        )
        .expect("transport");
        assert_eq!(transport.url(), "http://127.0.0.1:5800/v1/skill/streamInvoke");
    }

    #[tokio::test]
    async fn released_source_reports_end_of_data() {
        let mut source = HttpByteSource {
            body: Some(Box::pin(futures::stream::iter(vec![Ok::<_, reqwest::Error>(
                Bytes::from_static(b"data: {}\n"),
            )]))),
        };
        source.release().await.expect("release");
        source.release().await.expect("second release is a no-op");
        assert!(source.next_chunk().await.is_none());
    }
}
