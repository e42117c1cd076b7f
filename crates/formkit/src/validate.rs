//! Field value predicates
//!
//! A [`Validator`] is a shared `&str -> bool` predicate. Built-ins cover the
//! common input kinds; empty input only fails [`non_empty`], so optional
//! fields can combine a format check without also becoming required.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Shared validation predicate
#[derive(Clone)]
pub struct Validator(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl Validator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Accepts every value
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn check(&self, value: &str) -> bool {
        (self.0)(value)
    }

    /// Both predicates must accept the value
    pub fn and(self, other: Validator) -> Self {
        Self::new(move |value| self.check(value) && other.check(value))
    }

    /// Combine every rule; no rules accepts everything
    pub fn from_rules(rules: &[Rule]) -> Self {
        rules
            .iter()
            .map(Rule::validator)
            .reduce(Validator::and)
            .unwrap_or_else(Validator::always)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

pub fn non_empty() -> Validator {
    Validator::new(|value| !value.trim().is_empty())
}

pub fn min_length(min: usize) -> Validator {
    Validator::new(move |value| value.is_empty() || value.chars().count() >= min)
}

pub fn max_length(max: usize) -> Validator {
    Validator::new(move |value| value.chars().count() <= max)
}

/// One `@` with a non-empty local part and a dotted domain
pub fn email() -> Validator {
    Validator::new(|value| {
        if value.is_empty() {
            return true;
        }
        match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.contains('@') && domain.contains('.')
            }
            None => false,
        }
    })
}

pub fn url() -> Validator {
    Validator::new(|value| {
        value.is_empty() || value.starts_with("http://") || value.starts_with("https://")
    })
}

pub fn number() -> Validator {
    Validator::new(|value| value.is_empty() || value.parse::<f64>().is_ok())
}

pub fn integer() -> Validator {
    Validator::new(|value| value.is_empty() || value.parse::<i64>().is_ok())
}

/// Name of a built-in predicate, as written in form definitions
///
/// ```toml
/// rules = ["non_empty", { min_length = 3 }]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    NonEmpty,
    MinLength(usize),
    MaxLength(usize),
    Email,
    Url,
    Number,
    Integer,
}

impl Rule {
    pub fn validator(&self) -> Validator {
        match *self {
            Rule::NonEmpty => non_empty(),
            Rule::MinLength(n) => min_length(n),
            Rule::MaxLength(n) => max_length(n),
            Rule::Email => email(),
            Rule::Url => url(),
            Rule::Number => number(),
            Rule::Integer => integer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_rejects_blank() {
        let v = non_empty();
        assert!(!v.check(""));
        assert!(!v.check("   "));
        assert!(v.check("x"));
    }

    #[test]
    fn test_lengths_count_chars() {
        assert!(!min_length(3).check("ab"));
        assert!(min_length(3).check("abc"));
        assert!(min_length(3).check("äöü"));
        assert!(max_length(2).check("ñé"));
        assert!(!max_length(2).check("abc"));
    }

    #[test]
    fn test_format_checks_allow_empty() {
        for v in [email(), url(), number(), integer(), min_length(4)] {
            assert!(v.check(""));
        }
    }

    #[test]
    fn test_email() {
        let v = email();
        assert!(v.check("ada@example.com"));
        assert!(!v.check("ada.example.com"));
        assert!(!v.check("@example.com"));
        assert!(!v.check("ada@localhost"));
        assert!(!v.check("a@b@c.com"));
    }

    #[test]
    fn test_numbers() {
        assert!(number().check("-3.5"));
        assert!(!number().check("3,5"));
        assert!(integer().check("+42"));
        assert!(!integer().check("4.2"));
    }

    #[test]
    fn test_from_rules() {
        let v = Validator::from_rules(&[Rule::NonEmpty, Rule::MinLength(3)]);
        assert!(!v.check(""));
        assert!(!v.check("ab"));
        assert!(v.check("abc"));

        assert!(Validator::from_rules(&[]).check(""));
    }

    #[test]
    fn test_rule_deserialize() {
        #[derive(Deserialize)]
        struct Doc {
            rules: Vec<Rule>,
        }

        let doc: Doc = toml::from_str(r#"rules = ["email", { max_length = 8 }]"#).unwrap();
        assert_eq!(doc.rules, vec![Rule::Email, Rule::MaxLength(8)]);
    }
}
