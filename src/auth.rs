use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of OAuth access tokens used to call Google APIs.
#[async_trait]
pub trait CredentialsProvider: Send + Sync + 'static {
    async fn access_token(&self, scopes: &[&str]) -> Result<String>;
}

/// Credentials discovered by `gcp_auth` (service account key, metadata server,
/// gcloud user credentials).
#[derive(Clone)]
pub struct GcpAuthCredentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl GcpAuthCredentials {
    pub fn new(provider: Arc<dyn gcp_auth::TokenProvider>) -> Self {
        GcpAuthCredentials { provider }
    }

    /// Runs Application Default Credentials discovery. This may touch the
    /// network, so call it during startup.
    pub async fn from_environment() -> Result<Self> {
        let provider = gcp_auth::provider().await?;
        Ok(Self::new(provider))
    }
}

#[async_trait]
impl CredentialsProvider for GcpAuthCredentials {
    async fn access_token(&self, scopes: &[&str]) -> Result<String> {
        let token = self.provider.token(scopes).await?;
        Ok(token.as_str().to_owned())
    }
}

impl std::fmt::Debug for GcpAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("GcpAuthCredentials").finish_non_exhaustive()
    }
}

/// A fixed token, for emulators and tests.
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        StaticCredentials {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn access_token(&self, _scopes: &[&str]) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::Credentials("static token is empty".into()));
        }
        Ok(self.token.clone())
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credentials() {
        let credentials = StaticCredentials::new("ya29.token");
        assert_eq!(
            credentials.access_token(&["scope"]).await.unwrap(),
            "ya29.token"
        );
        assert!(matches!(
            StaticCredentials::new("").access_token(&[]).await,
            Err(Error::Credentials(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", StaticCredentials::new("secret"));
        assert!(!debug.contains("secret"));
    }
}
