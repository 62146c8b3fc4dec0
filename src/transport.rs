use crate::config::IamCredentialsConfig;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

/// The HTTP/2 connection shared by every client of one application.
///
/// The channel connects lazily on the first request, so building a
/// `Transport` never touches the network. A peer that drops the TLS session
/// without `close_notify` only ends that connection; the channel reconnects
/// on the next request.
#[derive(Debug)]
pub struct Transport {
    channel: RwLock<Option<Channel>>,
    uri: http::Uri,
}

impl Transport {
    pub fn connect(config: &IamCredentialsConfig, context: &ExecutionContext) -> Result<Self> {
        let uri = config.endpoint_uri()?;
        let mut endpoint = Endpoint::from(uri.clone());
        if uri.scheme_str() == Some("https") {
            let mut tls = ClientTlsConfig::new().with_native_roots();
            if let Some(host) = uri.host() {
                tls = tls.domain_name(host);
            }
            endpoint = endpoint.tls_config(tls)?;
        }

        let options = &config.transport;
        if let Some(timeout) = options.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = options.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }
        if options.tcp_keepalive.is_some() {
            endpoint = endpoint.tcp_keepalive(options.tcp_keepalive);
        }
        if let Some(interval) = options.http2_keep_alive_interval {
            endpoint = endpoint
                .http2_keep_alive_interval(interval)
                .keep_alive_while_idle(true);
        }

        // The channel's worker task is spawned on the current runtime.
        let _guard = context.handle().enter();
        let channel = endpoint.connect_lazy();
        tracing::debug!(%uri, context = %context.id(), "created shared transport");

        Ok(Transport {
            channel: RwLock::new(Some(channel)),
            uri,
        })
    }

    pub fn uri(&self) -> &http::Uri {
        &self.uri
    }

    pub fn channel(&self) -> Result<Channel> {
        self.read().clone().ok_or(Error::ShutDown)
    }

    pub fn is_shut_down(&self) -> bool {
        self.read().is_none()
    }

    /// Drops the transport's own channel. Once no caller holds a clone from
    /// [`channel`](Self::channel), the worker task ends and open connections
    /// are closed.
    pub fn shutdown(&self) {
        let channel = self.write().take();
        if channel.is_some() {
            tracing::debug!(uri = %self.uri, "shut down shared transport");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Channel>> {
        self.channel.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Channel>> {
        self.channel.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let context = ExecutionContext::current().unwrap();
        let config = IamCredentialsConfig::default().with_endpoint("http://127.0.0.1:9");
        let transport = Transport::connect(&config, &context).unwrap();
        assert_eq!(transport.uri().port_u16(), Some(9));
        assert!(transport.channel().is_ok());
    }

    #[tokio::test]
    async fn test_applies_options() {
        let context = ExecutionContext::current().unwrap();
        let config = IamCredentialsConfig::default()
            .with_endpoint("http://localhost:8085")
            .with_transport(crate::config::TransportOptions {
                connect_timeout: Some(Duration::from_secs(2)),
                request_timeout: Some(Duration::from_secs(10)),
                tcp_keepalive: Some(Duration::from_secs(30)),
                http2_keep_alive_interval: Some(Duration::from_secs(15)),
            });
        assert!(Transport::connect(&config, &context).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_channel() {
        let context = ExecutionContext::current().unwrap();
        let config = IamCredentialsConfig::default().with_endpoint("http://127.0.0.1:9");
        let transport = Transport::connect(&config, &context).unwrap();
        transport.shutdown();
        transport.shutdown();
        assert!(transport.is_shut_down());
        assert!(matches!(transport.channel(), Err(Error::ShutDown)));
    }
}
