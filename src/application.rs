use crate::auth::CredentialsProvider;
use crate::context::{ContextGroup, ExecutionContext};
use crate::error::{Error, Result};
use crate::service::ServiceAccountCredentialsApi;
use crate::storage::{Locks, Storage, StorageKey};
use std::sync::Arc;

/// The resources shared by everything running inside one application.
///
/// `Application` is a cheap handle; clones refer to the same storage. The
/// storage is shut down by [`shutdown`](Self::shutdown) or, failing that, when
/// the last handle is dropped.
#[derive(Clone, Debug)]
pub struct Application {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    storage: Storage,
    locks: Locks,
    contexts: ContextGroup,
}

impl Application {
    pub fn new(contexts: ContextGroup) -> Self {
        Application {
            inner: Arc::new(Inner {
                storage: Storage::new(),
                locks: Locks::new(),
                contexts,
            }),
        }
    }

    /// An application running on the current tokio runtime.
    pub fn current() -> Result<Self> {
        Ok(Self::new(ContextGroup::current()?))
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    pub fn locks(&self) -> &Locks {
        &self.inner.locks
    }

    pub fn contexts(&self) -> &ContextGroup {
        &self.inner.contexts
    }

    pub fn google_cloud(&self) -> GoogleCloudPlatform<'_> {
        GoogleCloudPlatform { application: self }
    }

    pub fn same_as(&self, other: &Application) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.storage.is_closed()
    }

    pub fn shutdown(&self) {
        self.inner.storage.shutdown();
    }

    /// Makes this application and `context` available to
    /// [`RequestExt`](crate::RequestExt) accessors on `request`.
    pub fn bind_request<B>(&self, request: &mut http::Request<B>, context: ExecutionContext) {
        let extensions = request.extensions_mut();
        extensions.insert(self.clone());
        extensions.insert(context);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.storage.is_closed() {
            tracing::debug!("application dropped without explicit shutdown");
            self.storage.shutdown();
        }
    }
}

struct CredentialsKey;
impl StorageKey for CredentialsKey {
    type Value = Arc<dyn CredentialsProvider>;
}

// Holds the pinned context rather than the API itself, which would keep its
// own application alive.
struct ApiKey;
impl StorageKey for ApiKey {
    type Value = ExecutionContext;
}

/// Google Cloud services available on an [`Application`].
#[derive(Clone, Copy, Debug)]
pub struct GoogleCloudPlatform<'a> {
    application: &'a Application,
}

impl<'a> GoogleCloudPlatform<'a> {
    pub fn credentials(&self) -> Result<Arc<dyn CredentialsProvider>> {
        let storage = self.application.storage();
        storage.get::<CredentialsKey>().ok_or_else(|| {
            if storage.is_closed() {
                Error::ShutDown
            } else {
                Error::CredentialsUnset
            }
        })
    }

    pub fn set_credentials(&self, credentials: Arc<dyn CredentialsProvider>) -> Result<()> {
        if self
            .application
            .storage()
            .insert_if_absent::<CredentialsKey>(credentials)?
        {
            tracing::info!("set Google Cloud credentials");
            Ok(())
        } else {
            tracing::warn!("rejected second Google Cloud credentials");
            Err(Error::CredentialsAlreadySet)
        }
    }

    /// The API pinned with
    /// [`set_iam_service_account_credentials`](Self::set_iam_service_account_credentials),
    /// or one bound to the next context of the application's group.
    pub fn iam_service_account_credentials(&self) -> ServiceAccountCredentialsApi {
        let context = match self.application.storage().get::<ApiKey>() {
            Some(pinned) => pinned,
            None => self.application.contexts().next(),
        };
        ServiceAccountCredentialsApi::new(self.application.clone(), context)
    }

    /// Pins the API returned by
    /// [`iam_service_account_credentials`](Self::iam_service_account_credentials).
    /// A later call replaces the pin.
    pub fn set_iam_service_account_credentials(&self, api: ServiceAccountCredentialsApi) -> Result<()> {
        if !api.application().same_as(self.application) {
            return Err(Error::ForeignApplication);
        }
        tracing::debug!(context = %api.context().id(), "pinned IAM Service Account Credentials API");
        self.application.storage().set::<ApiKey>(api.context().clone())
    }
}
