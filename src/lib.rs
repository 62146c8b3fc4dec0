//! Application- and request-scoped access to the Google Cloud IAM Service
//! Account Credentials API.
//!
//! ```no_run
//! # async fn run() -> Result<(), gcp_iam_credentials::Error> {
//! use gcp_iam_credentials::{Application, GcpAuthCredentials, IamCredentialsConfig};
//! use std::sync::Arc;
//!
//! let app = Application::current()?;
//! app.google_cloud()
//!     .set_credentials(Arc::new(GcpAuthCredentials::from_environment().await?))?;
//! app.google_cloud()
//!     .iam_service_account_credentials()
//!     .set_configuration(IamCredentialsConfig::new("signer@my-project.iam.gserviceaccount.com"))?;
//!
//! let client = app.google_cloud().iam_service_account_credentials().client()?;
//! let request = client.authorize(()).await?;
//! # drop(request);
//! app.shutdown();
//! # Ok(())
//! # }
//! ```

mod application;
mod auth;
mod config;
mod context;
mod error;
mod request;
mod service;
mod storage;
mod transport;
mod util;

pub use application::{Application, GoogleCloudPlatform};
pub use auth::{CredentialsProvider, GcpAuthCredentials, StaticCredentials};
pub use config::{
    IamCredentialsConfig, TransportOptions, CLOUD_PLATFORM_SCOPE, DEFAULT_ENDPOINT, IAM_SCOPE,
};
pub use context::{ContextGroup, ContextId, ExecutionContext};
pub use error::{BoxError, Error, Result};
pub use request::RequestExt;
pub use service::{IamCredentialsClient, ServiceAccountCredentialsApi};
pub use storage::{Locks, Storage, StorageKey};
pub use transport::Transport;
