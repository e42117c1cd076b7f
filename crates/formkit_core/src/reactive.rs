//! Signals and effects
//!
//! A [`ReactiveGraph`] stores type-erased values in a slot map. Effects read
//! signals while they run, and those reads become the effect's dependencies.
//! Writing a signal queues every dependent effect and flushes the queue
//! synchronously, or at the end of the outermost batch.
//!
//! # State
//!
//! [`State<T>`] pairs a signal with the shared graph it lives in and the
//! owning scope's dirty flag. Field controllers hold their value and touched
//! flag this way.
//!
//! ```ignore
//! use formkit_core::HookScope;
//!
//! let scope = HookScope::new();
//! let touched = scope.use_state_keyed("email::touched", || false);
//!
//! // Effects see the write, the scope stays clean
//! touched.set(true);
//!
//! // Effects see the write and the scope is asked to rebuild
//! touched.set_rebuild(false);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

new_key_type! {
    /// Slot of a signal in its graph
    pub struct SignalId;
    /// Slot of an effect in its graph
    pub struct EffectId;
}

/// Typed handle to a signal slot
#[derive(Debug)]
pub struct Signal<T> {
    id: SignalId,
    _value: PhantomData<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> Signal<T> {
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Rebuild a typed handle from a slot id
    ///
    /// Reading through a handle of the wrong type yields `None`.
    pub fn from_id(id: SignalId) -> Self {
        Signal {
            id,
            _value: PhantomData,
        }
    }
}

/// Handle to a registered effect, used to dispose it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    id: EffectId,
}

type EffectFn = Box<dyn FnMut(&ReactiveGraph) + Send>;

struct SignalSlot {
    value: Box<dyn Any + Send>,
    dependents: SmallVec<[EffectId; 4]>,
}

struct EffectSlot {
    run: EffectFn,
    reads: SmallVec<[SignalId; 4]>,
    queued: bool,
}

/// Signal storage plus the effects that depend on it
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalSlot>,
    effects: SlotMap<EffectId, EffectSlot>,
    queue: VecDeque<EffectId>,
    batch_depth: Cell<u32>,
    /// Reads recorded for the effect that is currently running
    recording: RefCell<Option<Vec<SignalId>>>,
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveGraph {
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            queue: VecDeque::new(),
            batch_depth: Cell::new(0),
            recording: RefCell::new(None),
        }
    }

    pub fn create_signal<T: Send + 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalSlot {
            value: Box::new(initial),
            dependents: SmallVec::new(),
        });
        Signal::from_id(id)
    }

    /// Read a signal, subscribing the running effect (if any) to it
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        if let Some(reads) = self.recording.borrow_mut().as_mut() {
            if !reads.contains(&signal.id) {
                reads.push(signal.id);
            }
        }
        self.get_untracked(signal)
    }

    /// Read a signal without subscribing anything to it
    pub fn get_untracked<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        let slot = self.signals.get(signal.id)?;
        slot.value.downcast_ref::<T>().cloned()
    }

    /// Write a signal and run (or queue, inside a batch) its dependents
    pub fn set<T: Send + 'static>(&mut self, signal: Signal<T>, value: T) {
        let Some(slot) = self.signals.get_mut(signal.id) else {
            tracing::trace!(?signal.id, "write to a removed signal ignored");
            return;
        };
        slot.value = Box::new(value);

        let dependents = slot.dependents.clone();
        for effect in dependents {
            self.enqueue(effect);
        }
        if self.batch_depth.get() == 0 {
            self.flush();
        }
    }

    /// Register an effect; it runs once immediately
    pub fn create_effect<F>(&mut self, run: F) -> Effect
    where
        F: FnMut(&ReactiveGraph) + Send + 'static,
    {
        let id = self.effects.insert(EffectSlot {
            run: Box::new(run),
            reads: SmallVec::new(),
            queued: true,
        });
        self.queue.push_back(id);
        if self.batch_depth.get() == 0 {
            self.flush();
        }
        Effect { id }
    }

    pub fn dispose_effect(&mut self, effect: Effect) {
        let Some(slot) = self.effects.remove(effect.id) else {
            return;
        };
        self.unsubscribe(effect.id, &slot.reads);
    }

    /// Run `f` with effects deferred; they flush once the outermost batch ends
    pub fn batch<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let result = f(self);
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        if depth == 0 {
            self.flush();
        }
        result
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    fn enqueue(&mut self, id: EffectId) {
        if let Some(slot) = self.effects.get_mut(id) {
            if !slot.queued {
                slot.queued = true;
                self.queue.push_back(id);
            }
        }
    }

    fn unsubscribe(&mut self, effect: EffectId, reads: &[SignalId]) {
        for &signal in reads {
            if let Some(slot) = self.signals.get_mut(signal) {
                slot.dependents.retain(|e| *e != effect);
            }
        }
    }

    fn flush(&mut self) {
        while let Some(id) = self.queue.pop_front() {
            self.run_effect(id);
        }
    }

    fn run_effect(&mut self, id: EffectId) {
        // The closure leaves its slot while it runs so it can borrow the graph.
        let mut run = match self.effects.get_mut(id) {
            Some(slot) if slot.queued => {
                slot.queued = false;
                std::mem::replace(&mut slot.run, Box::new(|_| {}))
            }
            _ => return,
        };

        self.recording.replace(Some(Vec::new()));
        run(self);
        let reads: SmallVec<[SignalId; 4]> =
            self.recording.take().unwrap_or_default().into_iter().collect();

        let Some(slot) = self.effects.get_mut(id) else {
            return;
        };
        slot.run = run;
        let previous = std::mem::replace(&mut slot.reads, reads.clone());

        self.unsubscribe(id, &previous);
        for &signal in &reads {
            if let Some(slot) = self.signals.get_mut(signal) {
                slot.dependents.push(id);
            }
        }
    }
}

/// A graph shared between the states and scopes that use it
pub type SharedReactiveGraph = Arc<Mutex<ReactiveGraph>>;

/// Set when a state change should rebuild the owning view
pub type DirtyFlag = Arc<AtomicBool>;

/// Lock a shared graph, recovering the guard if a previous holder panicked
pub fn lock_graph(graph: &SharedReactiveGraph) -> MutexGuard<'_, ReactiveGraph> {
    graph.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A signal bound to its graph and its scope's dirty flag
///
/// Effects registered on the graph run synchronously inside `set`, while the
/// graph is locked; they receive the graph by reference and must not call
/// back into a `State` of the same graph.
#[derive(Clone)]
pub struct State<T> {
    signal: Signal<T>,
    reactive: SharedReactiveGraph,
    dirty_flag: DirtyFlag,
}

impl<T: Clone + Send + 'static> State<T> {
    pub fn new(signal: Signal<T>, reactive: SharedReactiveGraph, dirty_flag: DirtyFlag) -> Self {
        Self {
            signal,
            reactive,
            dirty_flag,
        }
    }

    /// Current value; `T::default()` if the signal is gone
    pub fn get(&self) -> T
    where
        T: Default,
    {
        lock_graph(&self.reactive)
            .get_untracked(self.signal)
            .unwrap_or_default()
    }

    /// Write without asking for a rebuild
    pub fn set(&self, value: T) {
        lock_graph(&self.reactive).set(self.signal, value);
    }

    /// Write and raise the scope's dirty flag
    pub fn set_rebuild(&self, value: T) {
        self.set(value);
        self.dirty_flag.store(true, Ordering::SeqCst);
    }

    pub fn signal(&self) -> Signal<T> {
        self.signal
    }

    /// The graph this state lives in
    pub fn graph(&self) -> SharedReactiveGraph {
        self.reactive.clone()
    }
}
