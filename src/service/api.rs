use super::client::IamCredentialsClient;
use crate::application::Application;
use crate::config::IamCredentialsConfig;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::storage::StorageKey;
use crate::transport::Transport;
use crate::util::init_once::init_once;
use std::sync::Arc;

struct ConfigurationKey;
impl StorageKey for ConfigurationKey {
    type Value = Arc<IamCredentialsConfig>;
}

struct HttpClientKey;
impl StorageKey for HttpClientKey {
    type Value = Arc<Transport>;
}

/// Application-level access to the IAM Service Account Credentials API,
/// bound to one execution context.
#[derive(Clone, Debug)]
pub struct ServiceAccountCredentialsApi {
    application: Application,
    context: ExecutionContext,
}

impl ServiceAccountCredentialsApi {
    pub fn new(application: Application, context: ExecutionContext) -> Self {
        ServiceAccountCredentialsApi {
            application,
            context,
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// A client for the `GoogleCloudIAMServiceAccountCredentials` API.
    pub fn client(&self) -> Result<IamCredentialsClient> {
        let credentials = self.application.google_cloud().credentials()?;
        IamCredentialsClient::new(
            credentials,
            self.try_configuration()?,
            self.http()?,
            self.context.clone(),
        )
    }

    pub fn try_configuration(&self) -> Result<Arc<IamCredentialsConfig>> {
        let storage = self.application.storage();
        storage.get::<ConfigurationKey>().ok_or_else(|| {
            if storage.is_closed() {
                Error::ShutDown
            } else {
                Error::Unconfigured
            }
        })
    }

    /// The configuration set at startup.
    ///
    /// # Panics
    ///
    /// Panics if no configuration has been set. Use
    /// [`try_configuration`](Self::try_configuration) to handle that case.
    pub fn configuration(&self) -> Arc<IamCredentialsConfig> {
        match self.try_configuration() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    /// Sets the configuration. It can be set once per application.
    pub fn set_configuration(&self, config: IamCredentialsConfig) -> Result<()> {
        let storage = self.application.storage();
        let service_account = config.service_account.clone();
        if storage.contains::<ConfigurationKey>() {
            tracing::warn!(%service_account, "rejected second IAM Service Account Credentials configuration");
            return Err(Error::AlreadyConfigured);
        }
        config.validate()?;
        if storage.insert_if_absent::<ConfigurationKey>(Arc::new(config))? {
            tracing::info!(%service_account, "set IAM Service Account Credentials configuration");
            Ok(())
        } else {
            tracing::warn!(%service_account, "rejected second IAM Service Account Credentials configuration");
            Err(Error::AlreadyConfigured)
        }
    }

    /// The shared transport, created on first use.
    pub fn http(&self) -> Result<Arc<Transport>> {
        let application = &self.application;
        init_once::<HttpClientKey, _, Error>(
            application.storage(),
            application.locks(),
            || {
                let config = self.try_configuration()?;
                Ok(Arc::new(Transport::connect(&config, &self.context)?))
            },
            |transport| transport.shutdown(),
        )
    }
}
