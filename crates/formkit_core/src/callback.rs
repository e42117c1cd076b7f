//! Stable-identity callbacks
//!
//! A [`Callback`] is a shared closure tagged with a process-unique id at
//! creation. Clones share the id, so handler lists can be compared by
//! identity instead of by behavior.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a callback, shared by all of its clones
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Raw id, usable as a memoization dependency
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// A cloneable handler with a stable identity
pub struct Callback<A = ()> {
    id: CallbackId,
    f: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            f: self.f.clone(),
        }
    }
}

impl<A> Callback<A> {
    /// Wrap a closure, assigning it a fresh identity
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            id: CallbackId(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed)),
            f: Arc::new(f),
        }
    }

    /// Invoke the handler
    pub fn call(&self, arg: A) {
        (self.f)(arg)
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// True if both handles refer to the same callback
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<A, F> From<F> for Callback<A>
where
    F: Fn(A) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Callback::new(f)
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.id.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_clone_shares_identity() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        let cb = Callback::new(move |v: i32| calls_clone.lock().unwrap().push(v));
        let copy = cb.clone();

        cb.call(1);
        copy.call(2);

        assert!(cb.ptr_eq(&copy));
        assert_eq!(cb.id(), copy.id());
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_identical_closures_are_distinct() {
        let a: Callback = Callback::new(|()| {});
        let b: Callback = Callback::new(|()| {});

        assert!(!a.ptr_eq(&b));
        assert_ne!(a.id().to_raw(), b.id().to_raw());
    }

    #[test]
    fn test_from_closure() {
        let hits = Arc::new(Mutex::new(0));
        let hits_clone = hits.clone();
        let cb: Callback = (move |()| *hits_clone.lock().unwrap() += 1).into();

        cb.call(());
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
