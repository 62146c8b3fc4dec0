use crate::auth::CredentialsProvider;
use crate::config::IamCredentialsConfig;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::transport::Transport;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Channel;

/// A handle for calling the IAM Service Account Credentials API from one
/// execution context.
///
/// Cloning is cheap. [`hopped`](Self::hopped) moves the handle to another
/// context without rebuilding the transport.
#[derive(Clone)]
pub struct IamCredentialsClient {
    credentials: Arc<dyn CredentialsProvider>,
    config: Arc<IamCredentialsConfig>,
    transport: Arc<Transport>,
    context: ExecutionContext,
}

impl IamCredentialsClient {
    pub fn new(
        credentials: Arc<dyn CredentialsProvider>,
        config: Arc<IamCredentialsConfig>,
        transport: Arc<Transport>,
        context: ExecutionContext,
    ) -> Result<Self> {
        config.validate()?;
        Ok(IamCredentialsClient {
            credentials,
            config,
            transport,
            context,
        })
    }

    pub fn hopped(&self, context: &ExecutionContext) -> Self {
        if !self.context.is_same_lane(context) {
            tracing::debug!(from = %self.context.id(), to = %context.id(), "rebinding client");
        }
        IamCredentialsClient {
            context: context.clone(),
            ..self.clone()
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn configuration(&self) -> &Arc<IamCredentialsConfig> {
        &self.config
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialsProvider> {
        &self.credentials
    }

    pub fn channel(&self) -> Result<Channel> {
        self.transport.channel()
    }

    /// `projects/-/serviceAccounts/{email}` for the configured account.
    pub fn service_account_name(&self) -> String {
        Self::service_account_name_for(&self.config.service_account)
    }

    pub fn service_account_name_for(email: &str) -> String {
        format!("projects/-/serviceAccounts/{}", email)
    }

    pub async fn authorization(&self) -> Result<MetadataValue<Ascii>> {
        let scopes = self.config.scope_refs();
        let token = self.credentials.access_token(&scopes).await?;
        let bearer = format!("Bearer {}", token);
        Ok(bearer.parse()?)
    }

    pub async fn authorize<T>(&self, message: T) -> Result<tonic::Request<T>> {
        let header_value = self.authorization().await?;
        let mut request = tonic::Request::new(message);
        request
            .metadata_mut()
            .insert("authorization", header_value);
        Ok(request)
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.context.spawn(future)
    }
}

impl std::fmt::Debug for IamCredentialsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("IamCredentialsClient")
            .field("config", &self.config)
            .field("transport", &self.transport.uri())
            .field("context", &self.context.id())
            .finish_non_exhaustive()
    }
}
