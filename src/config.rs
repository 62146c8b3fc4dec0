use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const IAM_SCOPE: &str = "https://www.googleapis.com/auth/iam";
pub const DEFAULT_ENDPOINT: &str = "https://iamcredentials.googleapis.com";

/// How to reach the IAM Service Account Credentials API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IamCredentialsConfig {
    pub scopes: Vec<String>,
    /// Email of the service account to act on, or `default`.
    pub service_account: String,
    pub project: Option<String>,
    pub endpoint: String,
    pub transport: TransportOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub tcp_keepalive: Option<Duration>,
    pub http2_keep_alive_interval: Option<Duration>,
}

impl Default for IamCredentialsConfig {
    fn default() -> Self {
        IamCredentialsConfig {
            scopes: vec![CLOUD_PLATFORM_SCOPE.into()],
            service_account: "default".into(),
            project: None,
            endpoint: DEFAULT_ENDPOINT.into(),
            transport: TransportOptions::default(),
        }
    }
}

impl IamCredentialsConfig {
    pub fn new(service_account: impl Into<String>) -> Self {
        IamCredentialsConfig {
            service_account: service_account.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: IamCredentialsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    pub fn endpoint_uri(&self) -> Result<http::Uri> {
        let uri: http::Uri = self
            .endpoint
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("endpoint {:?}: {}", self.endpoint, e)))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "endpoint {:?} must use http or https",
                    self.endpoint
                )))
            }
        }
        if uri.host().map_or(true, str::is_empty) {
            return Err(Error::InvalidConfig(format!(
                "endpoint {:?} has no host",
                self.endpoint
            )));
        }
        Ok(uri)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(Error::InvalidConfig("at least one scope is required".into()));
        }
        if self.scopes.iter().any(|scope| scope.trim().is_empty()) {
            return Err(Error::InvalidConfig("scopes must not be blank".into()));
        }
        if self.service_account.trim().is_empty() {
            return Err(Error::InvalidConfig("service account must not be empty".into()));
        }
        self.endpoint_uri()?;
        Ok(())
    }

    pub(crate) fn scope_refs(&self) -> Vec<&str> {
        self.scopes.iter().map(String::as_str).collect()
    }
}
