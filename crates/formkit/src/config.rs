//! Declarative form definitions
//!
//! A form can be described in TOML and built into field controllers plus an
//! aggregator:
//!
//! ```toml
//! [form]
//! name = "signup"
//! strict = false
//! validity = "all"
//! blur_handlers = ["email", "name"]
//!
//! [[fields]]
//! name = "email"
//! rules = ["non_empty", "email"]
//!
//! [[fields]]
//! name = "name"
//! default_value = "anonymous"
//! rules = [{ min_length = 3 }]
//! ```
//!
//! Handler lists default to every field in declaration order. A list that
//! isn't an array, or that names an unknown field, is an error in strict mode
//! and is degraded with a warning otherwise.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use formkit_core::{Callback, HookScope};

use crate::error::{FormError, Result};
use crate::field::{FieldController, FieldOptions, FieldSnapshot};
use crate::form::{FormAggregator, FormOptions, HandlerSet};
use crate::validate::{Rule, Validator};

/// A parsed form definition
#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    pub form: FormSection,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormSection {
    pub name: String,
    /// Report malformed configuration instead of degrading
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub validity: Validity,
    /// Raw so that a wrongly-typed value can be detected rather than rejected
    #[serde(default)]
    pub blur_handlers: Option<toml::Value>,
    #[serde(default)]
    pub reset_handlers: Option<toml::Value>,
}

/// How field validity combines into form validity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    #[default]
    All,
    Any,
    /// No check: the form is never valid
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl FromStr for FormConfig {
    type Err = FormError;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl FormConfig {
    /// Load a definition from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| FormError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FormConfig = content.parse()?;
        tracing::debug!(
            form = %config.form.name,
            fields = config.fields.len(),
            path = %path.display(),
            "loaded form definition"
        );
        Ok(config)
    }

    /// Create the field controllers and aggregator in `scope`
    pub fn build(&self, scope: &HookScope) -> Result<BuiltForm> {
        let mut fields: IndexMap<String, FieldController> = IndexMap::new();
        for field in &self.fields {
            if fields.contains_key(&field.name) {
                return Err(FormError::DuplicateField(field.name.clone()));
            }
            let mut options = FieldOptions::new().default_value(field.default_value.clone());
            if !field.rules.is_empty() {
                options = options.validator(Validator::from_rules(&field.rules));
            }
            let key = format!("{}::{}", self.form.name, field.name);
            fields.insert(field.name.clone(), FieldController::new(scope, &key, options));
        }

        let blur_handlers = self.handler_set(
            "blur_handlers",
            self.form.blur_handlers.as_ref(),
            &fields,
            FieldController::blur_handler,
        )?;
        let reset_handlers = self.handler_set(
            "reset_handlers",
            self.form.reset_handlers.as_ref(),
            &fields,
            FieldController::reset_handler,
        )?;

        let mut options = FormOptions {
            blur_handlers,
            reset_handlers,
            validate: None,
        };
        let all: Vec<FieldController> = fields.values().cloned().collect();
        options = match self.form.validity {
            Validity::All => options.validate_fields(all),
            Validity::Any => options.validate_with(move || all.iter().any(FieldController::is_valid)),
            Validity::None => options,
        };

        let form = FormAggregator::new(scope, &self.form.name, options);
        Ok(BuiltForm {
            name: self.form.name.clone(),
            fields,
            form,
        })
    }

    fn handler_set(
        &self,
        label: &str,
        raw: Option<&toml::Value>,
        fields: &IndexMap<String, FieldController>,
        pick: fn(&FieldController) -> Callback,
    ) -> Result<HandlerSet> {
        let Some(raw) = raw else {
            return Ok(HandlerSet::Sequence(fields.values().map(pick).collect()));
        };

        let Some(entries) = raw.as_array() else {
            let reason = format!(
                "`{label}` must be an array of field names, found {}",
                raw.type_str()
            );
            if self.form.strict {
                return Err(FormError::InvalidConfiguration(reason));
            }
            tracing::warn!(form = %self.form.name, %reason, "handler list ignored");
            return Ok(HandlerSet::Malformed { reason });
        };

        let mut handlers = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.as_str() else {
                let reason = format!("`{label}` entries must be strings, found {}", entry.type_str());
                if self.form.strict {
                    return Err(FormError::InvalidConfiguration(reason));
                }
                tracing::warn!(form = %self.form.name, %reason, "handler entry skipped");
                continue;
            };
            match fields.get(name) {
                Some(field) => handlers.push(pick(field)),
                None if self.form.strict => return Err(FormError::UnknownField(name.to_string())),
                None => {
                    tracing::warn!(form = %self.form.name, field = name, "unknown field in {label} skipped");
                }
            }
        }
        Ok(HandlerSet::Sequence(handlers))
    }
}

/// Controllers and aggregator created from a [`FormConfig`]
pub struct BuiltForm {
    pub name: String,
    /// In declaration order
    pub fields: IndexMap<String, FieldController>,
    pub form: FormAggregator,
}

/// Serializable view of a built form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSnapshot {
    pub name: String,
    pub form_is_valid: bool,
    pub fields: Vec<NamedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedField {
    pub name: String,
    #[serde(flatten)]
    pub state: FieldSnapshot,
}

impl BuiltForm {
    pub fn field(&self, name: &str) -> Option<&FieldController> {
        self.fields.get(name)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            name: self.name.clone(),
            form_is_valid: self.form.form_is_valid(),
            fields: self
                .fields
                .iter()
                .map(|(name, field)| NamedField {
                    name: name.clone(),
                    state: field.snapshot(),
                })
                .collect(),
        }
    }
}
