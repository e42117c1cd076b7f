//! Field controller
//!
//! Owns one input's value and touched flag. Validity is never stored: every
//! read runs the predicate against the current value, and the error state is
//! only shown once the field has been blurred.
//!
//! ```ignore
//! let scope = HookScope::new();
//! let name = FieldController::new(&scope, "name", |v: &str| v.len() >= 3);
//!
//! name.on_change("ab");
//! assert!(!name.input_is_invalid()); // not touched yet
//! name.on_blur();
//! assert!(name.input_is_invalid());
//! ```

use formkit_core::{lock_graph, Callback, Effect, HookScope, State};
use serde::Serialize;

use crate::validate::Validator;

/// Options for a field controller
#[derive(Clone, Debug, Default)]
pub struct FieldOptions {
    /// Predicate run on every read; `None` accepts everything
    pub validate: Option<Validator>,
    /// Initial value; `reset` always returns to the empty string instead
    pub default_value: String,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Validator::new(f));
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }
}

/// The accepted ways of configuring a field
///
/// A bare predicate, a full options record, or nothing at all. Normalized
/// once into [`FieldOptions`] at construction.
#[derive(Clone, Debug, Default)]
pub enum FieldInit {
    Predicate(Validator),
    Options(FieldOptions),
    #[default]
    Unset,
}

impl FieldInit {
    pub fn into_options(self) -> FieldOptions {
        match self {
            FieldInit::Predicate(validator) => FieldOptions::new().validator(validator),
            FieldInit::Options(options) => options,
            FieldInit::Unset => FieldOptions::new(),
        }
    }
}

impl<F> From<F> for FieldInit
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        FieldInit::Predicate(Validator::new(f))
    }
}

impl From<Validator> for FieldInit {
    fn from(validator: Validator) -> Self {
        FieldInit::Predicate(validator)
    }
}

impl From<FieldOptions> for FieldInit {
    fn from(options: FieldOptions) -> Self {
        FieldInit::Options(options)
    }
}

impl From<()> for FieldInit {
    fn from(_: ()) -> Self {
        FieldInit::Unset
    }
}

/// Derived view of a field at one point in time
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSnapshot {
    pub value: String,
    pub touched: bool,
    pub is_valid: bool,
    /// `touched && !is_valid`
    pub input_is_invalid: bool,
}

impl FieldSnapshot {
    fn derive(value: String, touched: bool, validator: &Validator) -> Self {
        let is_valid = validator.check(&value);
        Self {
            value,
            touched,
            is_valid,
            input_is_invalid: touched && !is_valid,
        }
    }
}

/// Value, touched flag and derived validity of one input
#[derive(Clone)]
pub struct FieldController {
    value: State<String>,
    touched: State<bool>,
    validator: Validator,
    change: Callback<String>,
    blur: Callback,
    reset: Callback,
}

impl FieldController {
    /// Create (or re-evaluate) the field stored under `key` in `scope`
    ///
    /// State and handlers are keyed, so calling this again with the same key
    /// returns the same value, touched flag and handler identities. The
    /// default value only applies the first time.
    pub fn new(scope: &HookScope, key: &str, init: impl Into<FieldInit>) -> Self {
        let options = init.into().into_options();
        let validator = options.validate.unwrap_or_else(|| {
            tracing::trace!(key, "no predicate supplied, field is always valid");
            Validator::always()
        });
        let default_value = options.default_value;

        let value = scope.use_state_keyed(&format!("{key}::value"), move || default_value);
        let touched = scope.use_state_keyed(&format!("{key}::touched"), || false);

        let change = {
            let value = value.clone();
            scope.use_callback_keyed(&format!("{key}::on_change"), &[], move |next: String| {
                value.set_rebuild(next);
            })
        };

        let blur = {
            let touched = touched.clone();
            scope.use_callback_keyed(&format!("{key}::on_blur"), &[], move |()| {
                if !touched.get() {
                    touched.set_rebuild(true);
                }
            })
        };

        // Captures the graph and flag rather than the scope: the callback lives
        // in the scope's own hook table.
        let reset = {
            let graph = scope.graph();
            let dirty = scope.dirty_flag();
            let (value, touched) = (value.signal(), touched.signal());
            let field = key.to_string();
            scope.use_callback_keyed(&format!("{key}::reset"), &[], move |()| {
                lock_graph(&graph).batch(|g| {
                    g.set(value, String::new());
                    g.set(touched, false);
                });
                dirty.store(true, std::sync::atomic::Ordering::SeqCst);
                tracing::debug!(field = %field, "field reset");
            })
        };

        Self {
            value,
            touched,
            validator,
            change,
            blur,
            reset,
        }
    }

    /// A field with a private scope
    pub fn standalone(init: impl Into<FieldInit>) -> Self {
        Self::new(&HookScope::new(), "field", init)
    }

    /// Current value, exactly as last written
    pub fn value(&self) -> String {
        self.value.get()
    }

    /// Whether the field has been blurred since creation or the last reset
    pub fn is_touched(&self) -> bool {
        self.touched.get()
    }

    /// Runs the validator against the current value
    ///
    /// Computed on every call, never cached. A field without a validator is
    /// always valid.
    pub fn is_valid(&self) -> bool {
        self.validator.check(&self.value())
    }

    /// True only after a blur while the value fails validation
    pub fn input_is_invalid(&self) -> bool {
        self.is_touched() && !self.is_valid()
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::derive(self.value(), self.is_touched(), &self.validator)
    }

    /// Replace the value unconditionally
    pub fn on_change(&self, value: impl Into<String>) {
        self.change.call(value.into());
    }

    /// Mark the field touched; repeated calls change nothing
    pub fn on_blur(&self) {
        self.blur.call(());
    }

    /// Clear the value to `""` and the touched flag
    pub fn reset(&self) {
        self.reset.call(());
    }

    pub fn change_handler(&self) -> Callback<String> {
        self.change.clone()
    }

    pub fn blur_handler(&self) -> Callback {
        self.blur.clone()
    }

    pub fn reset_handler(&self) -> Callback {
        self.reset.clone()
    }

    /// Run `f` now and after every change to the value or touched flag
    ///
    /// `f` runs while the graph is locked and must not call back into
    /// this field.
    pub fn watch<F>(&self, f: F) -> Effect
    where
        F: Fn(&FieldSnapshot) + Send + 'static,
    {
        let (value, touched) = (self.value.signal(), self.touched.signal());
        let validator = self.validator.clone();
        let shared = self.graph();
        let mut graph = lock_graph(&shared);
        graph.create_effect(move |g| {
            let snapshot = FieldSnapshot::derive(
                g.get(value).unwrap_or_default(),
                g.get(touched).unwrap_or_default(),
                &validator,
            );
            f(&snapshot);
        })
    }

    /// Stop a watcher registered with [`watch`](Self::watch)
    pub fn unwatch(&self, effect: Effect) {
        lock_graph(&self.graph()).dispose_effect(effect);
    }

    fn graph(&self) -> formkit_core::SharedReactiveGraph {
        self.value.graph()
    }
}
