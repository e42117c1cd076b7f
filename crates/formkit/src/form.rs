//! Form aggregator
//!
//! Holds no state of its own. It combines a caller-supplied validity check
//! into a single fail-closed flag and broadcasts blur/reset to the handlers
//! registered with it, in registration order.
//!
//! ```ignore
//! let scope = HookScope::new();
//! let email = FieldController::new(&scope, "email", validate::email());
//! let name = FieldController::new(&scope, "name", |v: &str| v.len() >= 3);
//!
//! let options = FormOptions::new()
//!     .register(&email)
//!     .register(&name)
//!     .validate_fields([email.clone(), name.clone()]);
//! let form = FormAggregator::new(&scope, "signup", options);
//!
//! form.execute_blur_handlers(); // shows errors on every field
//! if form.form_is_valid() { /* submit */ }
//! form.reset();
//! ```

use formkit_core::{Callback, HookScope};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::error::{FormError, Result};
use crate::field::FieldController;

/// Whole-form validity check, re-run on every read
pub type FormCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// An ordered collection of broadcast handlers
#[derive(Clone, Debug)]
pub enum HandlerSet {
    Sequence(Vec<Callback>),
    /// A collection that wasn't a list; broadcasting over it does nothing
    Malformed { reason: String },
}

impl Default for HandlerSet {
    fn default() -> Self {
        HandlerSet::Sequence(Vec::new())
    }
}

impl From<Vec<Callback>> for HandlerSet {
    fn from(handlers: Vec<Callback>) -> Self {
        HandlerSet::Sequence(handlers)
    }
}

impl HandlerSet {
    pub fn len(&self) -> usize {
        match self {
            HandlerSet::Sequence(handlers) => handlers.len(),
            HandlerSet::Malformed { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, HandlerSet::Malformed { .. })
    }

    fn push(&mut self, handler: Callback) {
        match self {
            HandlerSet::Sequence(handlers) => handlers.push(handler),
            HandlerSet::Malformed { reason } => {
                tracing::warn!(%reason, "handler added to a malformed set is ignored");
            }
        }
    }

    /// Identity of the set, for memoizing broadcasts
    fn identity(&self) -> SmallVec<[u64; 8]> {
        match self {
            HandlerSet::Sequence(handlers) => std::iter::once(0)
                .chain(handlers.iter().map(|h| h.id().to_raw()))
                .collect(),
            HandlerSet::Malformed { .. } => SmallVec::from_slice(&[1]),
        }
    }

    /// Call every handler once, in order
    pub fn broadcast(&self, event: &str) {
        match self {
            HandlerSet::Sequence(handlers) => {
                tracing::debug!(event, handlers = handlers.len(), "broadcasting");
                for handler in handlers {
                    handler.call(());
                }
            }
            HandlerSet::Malformed { reason } => {
                tracing::warn!(event, %reason, "skipping broadcast over malformed handlers");
            }
        }
    }
}

/// Configuration of a form aggregator
#[derive(Clone, Default)]
pub struct FormOptions {
    pub blur_handlers: HandlerSet,
    pub reset_handlers: HandlerSet,
    /// `None` means the form is never valid
    pub validate: Option<FormCheck>,
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blur_handler(mut self, handler: impl Into<Callback>) -> Self {
        self.blur_handlers.push(handler.into());
        self
    }

    pub fn reset_handler(mut self, handler: impl Into<Callback>) -> Self {
        self.reset_handlers.push(handler.into());
        self
    }

    /// Register a field's blur and reset handlers
    pub fn register(self, field: &FieldController) -> Self {
        self.blur_handler(field.blur_handler())
            .reset_handler(field.reset_handler())
    }

    pub fn validate_with<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(check));
        self
    }

    /// Valid when every field is valid
    pub fn validate_fields(self, fields: impl IntoIterator<Item = FieldController>) -> Self {
        let fields: Vec<FieldController> = fields.into_iter().collect();
        self.validate_with(move || fields.iter().all(FieldController::is_valid))
    }

    /// Strict inspection: report what the aggregator would silently degrade
    pub fn check(&self) -> Result<()> {
        for (name, set) in [
            ("blur_handlers", &self.blur_handlers),
            ("reset_handlers", &self.reset_handlers),
        ] {
            if let HandlerSet::Malformed { reason } = set {
                return Err(FormError::InvalidConfiguration(format!("{name}: {reason}")));
            }
        }
        if self.validate.is_none() {
            return Err(FormError::InvalidConfiguration(
                "no validity check supplied; the form can never be valid".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormOptions")
            .field("blur_handlers", &self.blur_handlers)
            .field("reset_handlers", &self.reset_handlers)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Form-level validity and lifecycle broadcasts
#[derive(Clone)]
pub struct FormAggregator {
    options: FormOptions,
    blur: Callback,
    reset: Callback,
}

impl FormAggregator {
    /// Create (or re-evaluate) the form stored under `key` in `scope`
    ///
    /// The broadcast callbacks keep their identity as long as the identities
    /// of the registered handlers don't change.
    pub fn new(scope: &HookScope, key: &str, options: FormOptions) -> Self {
        let blur = {
            let handlers = options.blur_handlers.clone();
            scope.use_callback_keyed(
                &format!("{key}::blur_all"),
                &options.blur_handlers.identity(),
                move |()| handlers.broadcast("blur"),
            )
        };
        let reset = {
            let handlers = options.reset_handlers.clone();
            scope.use_callback_keyed(
                &format!("{key}::reset_all"),
                &options.reset_handlers.identity(),
                move |()| handlers.broadcast("reset"),
            )
        };

        Self {
            options,
            blur,
            reset,
        }
    }

    /// An aggregator without memoized broadcasts
    pub fn standalone(options: FormOptions) -> Self {
        Self::new(&HookScope::new(), "form", options)
    }

    /// True only if a check was supplied and it passes
    pub fn form_is_valid(&self) -> bool {
        match &self.options.validate {
            Some(check) => check(),
            None => {
                tracing::trace!("no validity check, failing closed");
                false
            }
        }
    }

    pub fn execute_blur_handlers(&self) {
        self.blur.call(());
    }

    pub fn reset(&self) {
        self.reset.call(());
    }

    pub fn blur_broadcast(&self) -> Callback {
        self.blur.clone()
    }

    pub fn reset_broadcast(&self) -> Callback {
        self.reset.clone()
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Callback {
        let log = log.clone();
        Callback::new(move |()| log.lock().unwrap().push(name))
    }

    #[test]
    fn test_no_check_fails_closed() {
        let form = FormAggregator::standalone(FormOptions::new());
        assert!(!form.form_is_valid());
    }

    #[test]
    fn test_check_reevaluated_on_every_read() {
        let flag = Arc::new(Mutex::new(false));
        let flag_clone = flag.clone();
        let form = FormAggregator::standalone(
            FormOptions::new().validate_with(move || *flag_clone.lock().unwrap()),
        );

        assert!(!form.form_is_valid());
        *flag.lock().unwrap() = true;
        assert!(form.form_is_valid());
    }

    #[test]
    fn test_broadcast_order_scenario() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let form = FormAggregator::standalone(
            FormOptions::new()
                .blur_handler(recorder(&log, "a"))
                .blur_handler(recorder(&log, "b"))
                .validate_with(|| true),
        );

        assert!(form.form_is_valid());
        form.execute_blur_handlers();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        form.reset();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_handlers_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let options = FormOptions {
            blur_handlers: HandlerSet::Malformed {
                reason: "expected a list".into(),
            },
            reset_handlers: vec![recorder(&log, "r")].into(),
            validate: None,
        };
        assert!(matches!(
            options.check(),
            Err(FormError::InvalidConfiguration(_))
        ));

        let form = FormAggregator::standalone(options);
        form.execute_blur_handlers();
        assert!(log.lock().unwrap().is_empty());

        form.reset();
        assert_eq!(*log.lock().unwrap(), vec!["r"]);
    }

    #[test]
    fn test_check_missing_validity() {
        let options = FormOptions::new();
        assert!(options.check().is_err());
        assert!(options.validate_with(|| false).check().is_ok());
    }

    #[test]
    fn test_fields_wired_through_form() {
        let scope = HookScope::new();
        let email = FieldController::new(&scope, "email", crate::validate::email());
        let name = FieldController::new(&scope, "name", |v: &str| v.len() >= 3);
        let options = FormOptions::new()
            .register(&email)
            .register(&name)
            .validate_fields([email.clone(), name.clone()]);
        let form = FormAggregator::new(&scope, "signup", options);

        name.on_change("al");
        assert!(!form.form_is_valid());

        form.execute_blur_handlers();
        assert!(email.is_touched());
        assert!(name.input_is_invalid());

        name.on_change("alan");
        email.on_change("alan@example.com");
        assert!(form.form_is_valid());

        form.reset();
        assert_eq!(name.value(), "");
        assert!(!email.is_touched());
    }

    #[test]
    fn test_broadcast_identity_follows_handlers() {
        let scope = HookScope::new();
        let a = FieldController::new(&scope, "a", ());
        let b = FieldController::new(&scope, "b", ());

        let first = FormAggregator::new(&scope, "f", FormOptions::new().register(&a));
        let same = FormAggregator::new(&scope, "f", FormOptions::new().register(&a));
        assert!(first.blur_broadcast().ptr_eq(&same.blur_broadcast()));

        let grown = FormAggregator::new(&scope, "f", FormOptions::new().register(&a).register(&b));
        assert!(!first.blur_broadcast().ptr_eq(&grown.blur_broadcast()));
        assert!(!first.reset_broadcast().ptr_eq(&grown.reset_broadcast()));
    }

    #[test]
    fn test_reset_order_and_malformed_reset() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let form = FormAggregator::standalone(
            FormOptions::new()
                .reset_handler(recorder(&log, "a"))
                .reset_handler(recorder(&log, "b")),
        );
        form.reset();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        form.execute_blur_handlers();
        assert_eq!(log.lock().unwrap().len(), 2);

        let malformed = FormAggregator::standalone(FormOptions {
            blur_handlers: HandlerSet::default(),
            reset_handlers: HandlerSet::Malformed {
                reason: "expected a list".into(),
            },
            validate: None,
        });
        malformed.reset();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_reevaluation_uses_latest_options() {
        let scope = HookScope::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");

        let first = FormAggregator::new(&scope, "f", FormOptions::new().blur_handler(a.clone()));
        assert!(!first.form_is_valid());

        let second = FormAggregator::new(
            &scope,
            "f",
            FormOptions::new()
                .blur_handler(a.clone())
                .blur_handler(b.clone())
                .validate_with(|| true),
        );
        assert!(second.form_is_valid());
        second.execute_blur_handlers();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        log.lock().unwrap().clear();
        let reordered = FormAggregator::new(
            &scope,
            "f",
            FormOptions::new().blur_handler(b).blur_handler(a),
        );
        assert!(!reordered.blur_broadcast().ptr_eq(&second.blur_broadcast()));
        reordered.execute_blur_handlers();
        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
    }
}
