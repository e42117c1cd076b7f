//! formkit
//!
//! Form field state on top of `formkit_core` signals.
//!
//! # Architecture
//!
//! 1. **Field controllers** own one input's value and touched flag and derive
//!    validity on every read. Errors only show after the first blur.
//!
//! 2. **Form aggregators** own nothing: they fold a caller-supplied check
//!    into a fail-closed validity flag and broadcast blur/reset to registered
//!    handlers in order.
//!
//! 3. **Hook scopes** key both by name, so re-evaluating a view returns the
//!    same state and the same handler identities.
//!
//! # Example
//!
//! ```rust
//! use formkit::prelude::*;
//!
//! let scope = HookScope::new();
//! let name = scope.use_input("name", |v: &str| v.len() >= 3);
//! let form = scope.use_form(
//!     "profile",
//!     FormOptions::new()
//!         .register(&name)
//!         .validate_fields([name.clone()]),
//! );
//!
//! name.on_change("ab");
//! assert!(!name.input_is_invalid());
//!
//! form.execute_blur_handlers();
//! assert!(name.input_is_invalid());
//! assert!(!form.form_is_valid());
//!
//! name.on_change("abc");
//! assert!(form.form_is_valid());
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod form;
pub mod validate;

pub use config::{BuiltForm, FieldConfig, FormConfig, FormSection, FormSnapshot, NamedField, Validity};
pub use error::{FormError, Result};
pub use field::{FieldController, FieldInit, FieldOptions, FieldSnapshot};
pub use form::{FormAggregator, FormCheck, FormOptions, HandlerSet};
pub use validate::{Rule, Validator};

use formkit_core::HookScope;

/// Hook-style constructors on a scope
pub trait FormScopeExt {
    /// Keyed [`FieldController`]; accepts a predicate, [`FieldOptions`] or `()`
    fn use_input(&self, key: &str, init: impl Into<FieldInit>) -> FieldController;

    /// Keyed [`FormAggregator`] with memoized broadcasts
    fn use_form(&self, key: &str, options: FormOptions) -> FormAggregator;
}

impl FormScopeExt for HookScope {
    fn use_input(&self, key: &str, init: impl Into<FieldInit>) -> FieldController {
        FieldController::new(self, key, init)
    }

    fn use_form(&self, key: &str, options: FormOptions) -> FormAggregator {
        FormAggregator::new(self, key, options)
    }
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::field::{FieldController, FieldInit, FieldOptions, FieldSnapshot};
    pub use crate::form::{FormAggregator, FormOptions, HandlerSet};
    pub use crate::validate::{self, Validator};
    pub use crate::FormScopeExt;
    pub use formkit_core::{Callback, HookScope};
}
