pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Service Account Credentials configuration has not been set. Use app.google_cloud().iam_service_account_credentials().set_configuration(...)")]
    Unconfigured,
    #[error("attempting to override credentials configuration after being set is not allowed")]
    AlreadyConfigured,
    #[error("Google Cloud credentials have not been set. Use app.google_cloud().set_credentials(...)")]
    CredentialsUnset,
    #[error("attempting to override Google Cloud credentials after being set is not allowed")]
    CredentialsAlreadySet,
    #[error("invalid IAM Service Account Credentials configuration: {0}")]
    InvalidConfig(String),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("the application has been shut down")]
    ShutDown,
    #[error("failed to obtain an access token: {0}")]
    Credentials(#[source] BoxError),
    #[error("access token is not a valid metadata value: {0}")]
    InvalidMetadata(#[from] tonic::metadata::errors::InvalidMetadataValue),
    #[error("the API belongs to a different application")]
    ForeignApplication,
    #[error("an execution context group needs at least one context")]
    EmptyContextGroup,
    #[error("no tokio runtime is available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("request is not bound to an application: missing {0}")]
    UnboundRequest(&'static str),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

impl From<gcp_auth::Error> for Error {
    fn from(err: gcp_auth::Error) -> Self {
        Error::Credentials(Box::new(err))
    }
}
