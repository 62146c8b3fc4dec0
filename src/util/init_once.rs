use crate::storage::{Locks, Storage, StorageKey};

/// Returns the value stored under `K`, creating it with `create` on first use.
///
/// The fast path reads storage without taking the per-key lock. On a miss the
/// lock for `K` is taken and storage is checked again before `create` runs, so
/// concurrent first callers construct at most one value.
pub(crate) fn init_once<K, F, E>(
    storage: &Storage,
    locks: &Locks,
    create: F,
    on_shutdown: fn(K::Value),
) -> Result<K::Value, E>
where
    K: StorageKey,
    F: FnOnce() -> Result<K::Value, E>,
    E: From<crate::Error>,
{
    if let Some(value) = storage.get::<K>() {
        return Ok(value);
    }
    let lock = locks.lock_for::<K>();
    let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(value) = storage.get::<K>() {
        return Ok(value);
    }
    if storage.is_closed() {
        return Err(crate::Error::ShutDown.into());
    }
    let value = create()?;
    storage.set_with_shutdown::<K, _>(value.clone(), on_shutdown)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    struct Counter;
    impl StorageKey for Counter {
        type Value = Arc<usize>;
    }

    fn ignore(_: Arc<usize>) {}

    #[test]
    fn test_creates_once_under_contention() {
        let storage = Storage::new();
        let locks = Locks::new();
        let created = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let (storage, locks, created, barrier) = (&storage, &locks, &created, &barrier);
        let values: Vec<Arc<usize>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(move |_| {
                    scope.spawn(move || {
                        barrier.wait();
                        init_once::<Counter, _, crate::Error>(
                            storage,
                            locks,
                            || Ok(Arc::new(created.fetch_add(1, Ordering::SeqCst))),
                            ignore,
                        )
                        .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn test_failed_create_leaves_slot_empty() {
        let storage = Storage::new();
        let locks = Locks::new();
        let result = init_once::<Counter, _, crate::Error>(
            &storage,
            &locks,
            || Err(crate::Error::ShutDown),
            ignore,
        );
        assert!(result.is_err());
        assert!(!storage.contains::<Counter>());
    }

    #[test]
    fn test_refuses_after_shutdown() {
        let storage = Storage::new();
        let locks = Locks::new();
        storage.shutdown();
        let result = init_once::<Counter, _, crate::Error>(
            &storage,
            &locks,
            || Ok(Arc::new(0)),
            ignore,
        );
        assert!(matches!(result, Err(crate::Error::ShutDown)));
    }
}
