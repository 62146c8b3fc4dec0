//! Execution contexts: the runtime lanes work is scheduled on.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// A handle to one runtime lane.
///
/// Two contexts are the same lane exactly when their [`ContextId`]s match.
/// Cloning keeps the id; wrapping the same runtime handle twice does not.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    id: ContextId,
    handle: Handle,
}

impl ExecutionContext {
    pub fn new(handle: Handle) -> Self {
        ExecutionContext {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            handle,
        }
    }

    pub fn current() -> Result<Self> {
        Ok(Self::new(Handle::try_current()?))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_same_lane(&self, other: &ExecutionContext) -> bool {
        self.id == other.id
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_lane(other)
    }
}

impl Eq for ExecutionContext {}

/// A fixed set of execution contexts handed out round-robin.
#[derive(Clone, Debug)]
pub struct ContextGroup {
    contexts: Arc<[ExecutionContext]>,
    cursor: Arc<AtomicUsize>,
}

impl ContextGroup {
    pub fn new(contexts: Vec<ExecutionContext>) -> Result<Self> {
        if contexts.is_empty() {
            return Err(Error::EmptyContextGroup);
        }
        Ok(ContextGroup {
            contexts: contexts.into(),
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn single(context: ExecutionContext) -> Self {
        ContextGroup {
            contexts: vec![context].into(),
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn current() -> Result<Self> {
        Ok(Self::single(ExecutionContext::current()?))
    }

    pub fn next(&self) -> ExecutionContext {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.contexts.len();
        self.contexts[index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clone_keeps_lane() {
        let context = ExecutionContext::current().unwrap();
        let other = ExecutionContext::current().unwrap();
        assert_eq!(context, context.clone());
        assert_ne!(context, other);
    }

    #[tokio::test]
    async fn test_group_round_robin() {
        let a = ExecutionContext::current().unwrap();
        let b = ExecutionContext::current().unwrap();
        let group = ContextGroup::new(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(group.next(), a);
        assert_eq!(group.next(), b);
        assert_eq!(group.next(), a);
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(
            ContextGroup::new(Vec::new()),
            Err(Error::EmptyContextGroup)
        ));
    }

    #[test]
    fn test_current_outside_runtime() {
        assert!(matches!(ExecutionContext::current(), Err(Error::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_spawn_runs_on_context() {
        let context = ExecutionContext::current().unwrap();
        assert_eq!(context.spawn(async { 21 * 2 }).await.unwrap(), 42);
    }
}
