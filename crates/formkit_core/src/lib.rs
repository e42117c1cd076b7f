//! formkit Core Runtime
//!
//! The primitives formkit's field and form layer is built on:
//!
//! - **Reactive Signals**: type-erased state cells with synchronous effects
//! - **Stable Callbacks**: shared handlers compared by identity
//! - **Hook Scopes**: keyed state and memoized callbacks per view instance
//!
//! # Example
//!
//! ```rust
//! use formkit_core::reactive::ReactiveGraph;
//! use std::sync::{Arc, Mutex};
//!
//! let mut graph = ReactiveGraph::new();
//! let value = graph.create_signal(String::new());
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let _effect = graph.create_effect(move |g| {
//!     sink.lock().unwrap().push(g.get(value).unwrap_or_default());
//! });
//!
//! graph.set(value, "hello".to_string());
//! assert_eq!(*seen.lock().unwrap(), vec![String::new(), "hello".to_string()]);
//! ```

pub mod callback;
pub mod hooks;
pub mod reactive;

pub use callback::{Callback, CallbackId};
pub use hooks::HookScope;
pub use reactive::{
    lock_graph, DirtyFlag, Effect, EffectId, ReactiveGraph, SharedReactiveGraph, Signal, SignalId,
    State,
};
