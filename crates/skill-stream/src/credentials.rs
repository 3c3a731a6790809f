/// Source of the bearer credential attached to each invocation.
///
/// An empty credential is passed through as-is; the server answers it with
/// a non-success status.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> String;
}

/// A fixed credential.
#[derive(Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticCredential(<redacted>)")
    }
}

#[async_trait::async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> String {
        self.0.clone()
    }
}

/// Reads the credential from an environment variable on every invocation.
#[derive(Clone, Debug)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new("SKILL_STREAM_TOKEN")
    }
}

#[async_trait::async_trait]
impl CredentialProvider for EnvCredential {
    async fn credential(&self) -> String {
        std::env::var(&self.var).unwrap_or_default()
    }
}
