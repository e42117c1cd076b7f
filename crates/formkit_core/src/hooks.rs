//! Keyed hook scope
//!
//! A [`HookScope`] stands in for a view instance: it owns a reactive graph,
//! the table of keyed hooks created by that view, and the view's rebuild
//! flag. Hooks are identified by a string key rather than call order, so a
//! view that re-evaluates with the same keys gets the same signals and the
//! same callback identities back.
//!
//! ```ignore
//! let scope = HookScope::new();
//!
//! // First evaluation creates the signal, later ones reuse it
//! let value = scope.use_state_keyed("email::value", String::new);
//!
//! // Recreated only when the dependency list changes
//! let on_submit = scope.use_callback_keyed("submit", &[], |()| submit());
//! ```

use crate::callback::Callback;
use crate::reactive::{
    lock_graph, DirtyFlag, ReactiveGraph, SharedReactiveGraph, Signal, SignalId, State,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A hook slot: the caller's key plus the type stored under it
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SlotKey {
    key: String,
    type_id: TypeId,
}

impl SlotKey {
    fn of<T: 'static>(key: &str) -> Self {
        Self {
            key: key.to_string(),
            type_id: TypeId::of::<T>(),
        }
    }
}

struct MemoSlot {
    deps: SmallVec<[u64; 4]>,
    value: Box<dyn Any + Send>,
}

#[derive(Default)]
struct HookTable {
    signals: FxHashMap<SlotKey, SignalId>,
    memos: FxHashMap<SlotKey, MemoSlot>,
}

impl HookTable {
    fn memo<T: Clone + 'static>(&self, key: &SlotKey, deps: &[u64]) -> Option<T> {
        self.memos
            .get(key)
            .filter(|slot| slot.deps.as_slice() == deps)
            .and_then(|slot| slot.value.downcast_ref::<T>().cloned())
    }
}

/// Instance-scoped state and callback memoization
///
/// Cloning a scope yields another handle to the same graph and hook table.
#[derive(Clone)]
pub struct HookScope {
    reactive: SharedReactiveGraph,
    hooks: Arc<Mutex<HookTable>>,
    dirty_flag: DirtyFlag,
}

impl Default for HookScope {
    fn default() -> Self {
        Self::new()
    }
}

impl HookScope {
    /// Create a scope with its own reactive graph
    pub fn new() -> Self {
        Self {
            reactive: Arc::new(Mutex::new(ReactiveGraph::new())),
            hooks: Arc::default(),
            dirty_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    fn hooks(&self) -> MutexGuard<'_, HookTable> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get or create a keyed state cell
    ///
    /// `init` only runs the first time `key` is seen for type `T`.
    pub fn use_state_keyed<T, F>(&self, key: &str, init: F) -> State<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        let slot = SlotKey::of::<T>(key);
        let mut hooks = self.hooks();

        let signal = match hooks.signals.get(&slot) {
            Some(&id) => Signal::from_id(id),
            None => {
                let signal = lock_graph(&self.reactive).create_signal(init());
                hooks.signals.insert(slot, signal.id());
                tracing::trace!(key, "created keyed state");
                signal
            }
        };

        State::new(signal, self.reactive.clone(), self.dirty_flag.clone())
    }

    /// Get a memoized value, recomputing it when `deps` changed
    pub fn use_memo_keyed<T, F>(&self, key: &str, deps: &[u64], compute: F) -> T
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        let slot = SlotKey::of::<T>(key);
        if let Some(value) = self.hooks().memo::<T>(&slot, deps) {
            return value;
        }

        // Computed outside the lock so `compute` may use the scope itself.
        let value = compute();
        tracing::trace!(key, deps = deps.len(), "recomputed memo");
        self.hooks().memos.insert(
            slot,
            MemoSlot {
                deps: SmallVec::from_slice(deps),
                value: Box::new(value.clone()),
            },
        );
        value
    }

    /// Get a memoized callback whose identity is stable while `deps` are
    pub fn use_callback_keyed<A, F>(&self, key: &str, deps: &[u64], f: F) -> Callback<A>
    where
        A: 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        self.use_memo_keyed(key, deps, move || Callback::new(f))
    }

    /// Read and clear the rebuild flag
    pub fn take_dirty(&self) -> bool {
        self.dirty_flag.swap(false, Ordering::SeqCst)
    }

    pub fn graph(&self) -> SharedReactiveGraph {
        self.reactive.clone()
    }

    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty_flag.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_state_survives_reevaluation() {
        let scope = HookScope::new();

        let first = scope.use_state_keyed("count", || 1i32);
        first.set(7);

        let second = scope.use_state_keyed("count", || 100i32);
        assert_eq!(second.signal().id(), first.signal().id());
        assert_eq!(second.get(), 7);
    }

    #[test]
    fn test_same_key_different_type_is_separate() {
        let scope = HookScope::new();

        let flag = scope.use_state_keyed("slot", || true);
        let text = scope.use_state_keyed("slot", || String::from("x"));

        assert_ne!(flag.signal().id(), text.signal().id());
        assert!(flag.get());
        assert_eq!(text.get(), "x");
    }

    #[test]
    fn test_memo_recomputes_on_dep_change() {
        let scope = HookScope::new();
        let mut computed = 0;

        let a = scope.use_memo_keyed("m", &[1, 2], || {
            computed += 1;
            "first".to_string()
        });
        let b = scope.use_memo_keyed("m", &[1, 2], || {
            computed += 1;
            "second".to_string()
        });
        assert_eq!(a, "first");
        assert_eq!(b, "first");

        let c = scope.use_memo_keyed("m", &[1, 3], || {
            computed += 1;
            "third".to_string()
        });
        assert_eq!(c, "third");
        assert_eq!(computed, 2);
    }

    #[test]
    fn test_callback_identity_is_stable() {
        let scope = HookScope::new();

        let a: Callback = scope.use_callback_keyed("cb", &[], |()| {});
        let b: Callback = scope.use_callback_keyed("cb", &[], |()| {});
        assert!(a.ptr_eq(&b));

        let c: Callback = scope.use_callback_keyed("cb", &[9], |()| {});
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_dirty_flag() {
        let scope = HookScope::new();
        let value = scope.use_state_keyed("v", String::new);

        value.set("a".into());
        assert!(!scope.take_dirty());

        value.set_rebuild("b".into());
        assert!(scope.take_dirty());
        assert!(!scope.take_dirty());
    }

    #[test]
    fn test_states_share_the_scope_graph() {
        let scope = HookScope::new();
        let a = scope.use_state_keyed("a", || 0u8);
        let b = scope.clone().use_state_keyed("b", || 0u8);

        lock_graph(&scope.graph()).batch(|g| {
            g.set(a.signal(), 1);
            g.set(b.signal(), 2);
        });

        assert_eq!((a.get(), b.get()), (1, 2));
        assert_eq!(lock_graph(&scope.graph()).signal_count(), 2);
    }
}
