use crate::application::Application;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::service::{IamCredentialsClient, ServiceAccountCredentialsApi};

#[derive(Clone)]
struct CachedClient(IamCredentialsClient);

/// Per-request access to Google Cloud clients.
///
/// The request must have been passed through
/// [`Application::bind_request`] first.
pub trait RequestExt {
    /// A client for the `GoogleCloudIAMServiceAccountCredentials` API bound to
    /// this request's execution context. The first call builds the client and
    /// caches it on the request.
    fn iam_service_account_credentials(&mut self) -> Result<IamCredentialsClient>;
}

impl<B> RequestExt for http::Request<B> {
    fn iam_service_account_credentials(&mut self) -> Result<IamCredentialsClient> {
        let extensions = self.extensions_mut();
        let context = extensions
            .get::<ExecutionContext>()
            .cloned()
            .ok_or(Error::UnboundRequest("execution context"))?;
        let application = extensions
            .get::<Application>()
            .cloned()
            .ok_or(Error::UnboundRequest("application"))?;
        if application.is_shut_down() {
            return Err(Error::ShutDown);
        }
        if let Some(CachedClient(existing)) = extensions.get::<CachedClient>() {
            return Ok(existing.hopped(&context));
        }

        let client = ServiceAccountCredentialsApi::new(application, context).client()?;
        extensions.insert(CachedClient(client.clone()));
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;
    use crate::config::IamCredentialsConfig;
    use crate::context::ContextGroup;
    use std::sync::Arc;

    fn application() -> Application {
        let application = Application::new(ContextGroup::current().unwrap());
        let google_cloud = application.google_cloud();
        google_cloud
            .set_credentials(Arc::new(StaticCredentials::new("t")))
            .unwrap();
        google_cloud
            .iam_service_account_credentials()
            .set_configuration(
                IamCredentialsConfig::default().with_endpoint("http://127.0.0.1:9"),
            )
            .unwrap();
        application
    }

    #[tokio::test]
    async fn test_unbound_request() {
        let mut request = http::Request::new(());
        assert!(matches!(
            request.iam_service_account_credentials(),
            Err(Error::UnboundRequest("execution context"))
        ));
        request
            .extensions_mut()
            .insert(ExecutionContext::current().unwrap());
        assert!(matches!(
            request.iam_service_account_credentials(),
            Err(Error::UnboundRequest("application"))
        ));
    }

    #[tokio::test]
    async fn test_same_request_same_context() {
        let application = application();
        let context = ExecutionContext::current().unwrap();
        let mut request = http::Request::new(());
        application.bind_request(&mut request, context.clone());

        let first = request.iam_service_account_credentials().unwrap();
        let second = request.iam_service_account_credentials().unwrap();
        assert_eq!(first.context(), &context);
        assert_eq!(second.context(), &context);
        assert!(Arc::ptr_eq(first.transport(), second.transport()));
    }

    #[tokio::test]
    async fn test_requests_keep_their_own_context() {
        let application = application();
        let a = ExecutionContext::current().unwrap();
        let b = ExecutionContext::current().unwrap();
        let mut first = http::Request::new(());
        let mut second = http::Request::new(());
        application.bind_request(&mut first, a.clone());
        application.bind_request(&mut second, b.clone());

        let client_a = first.iam_service_account_credentials().unwrap();
        let client_b = second.iam_service_account_credentials().unwrap();
        assert_eq!(client_a.context(), &a);
        assert_eq!(client_b.context(), &b);
        assert!(Arc::ptr_eq(client_a.transport(), client_b.transport()));
    }

    #[tokio::test]
    async fn test_cached_client_refused_after_shutdown() {
        let application = application();
        let mut cached = http::Request::new(());
        let mut fresh = http::Request::new(());
        application.bind_request(&mut cached, ExecutionContext::current().unwrap());
        application.bind_request(&mut fresh, ExecutionContext::current().unwrap());
        cached.iam_service_account_credentials().unwrap();

        application.shutdown();

        assert!(matches!(
            cached.iam_service_account_credentials(),
            Err(Error::ShutDown)
        ));
        assert!(matches!(
            fresh.iam_service_account_credentials(),
            Err(Error::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_application() {
        let application = Application::current().unwrap();
        let mut request = http::Request::new(());
        application.bind_request(&mut request, ExecutionContext::current().unwrap());
        assert!(matches!(
            request.iam_service_account_credentials(),
            Err(Error::CredentialsUnset)
        ));
    }
}
