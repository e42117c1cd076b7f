//! Interaction scripts
//!
//! One event per line, `#` starts a comment:
//!
//! ```text
//! change email ada@example.com
//! blur email
//! blur-all
//! reset name
//! reset-all
//! show
//! ```

use anyhow::{bail, Context, Result};
use formkit::BuiltForm;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Change { field: String, value: String },
    Blur(String),
    Reset(String),
    BlurAll,
    ResetAll,
    Show,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Change { field, value } => write!(f, "change {field} {value:?}"),
            Step::Blur(field) => write!(f, "blur {field}"),
            Step::Reset(field) => write!(f, "reset {field}"),
            Step::BlurAll => f.write_str("blur-all"),
            Step::ResetAll => f.write_str("reset-all"),
            Step::Show => f.write_str("show"),
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn parse_line(line: &str) -> Result<Option<Step>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (command, rest) = split_word(line);
    let field = || -> Result<String> {
        let (field, _) = split_word(rest);
        if field.is_empty() {
            bail!("`{command}` needs a field name");
        }
        Ok(field.to_string())
    };

    let step = match command {
        "change" => {
            let (name, value) = split_word(rest);
            if name.is_empty() {
                bail!("`change` needs a field name");
            }
            Step::Change {
                field: name.to_string(),
                value: value.to_string(),
            }
        }
        "blur" => Step::Blur(field()?),
        "reset" => Step::Reset(field()?),
        "blur-all" => Step::BlurAll,
        "reset-all" => Step::ResetAll,
        "show" => Step::Show,
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(step))
}

/// Parse a whole script
pub fn parse_script(src: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, line) in src.lines().enumerate() {
        if let Some(step) = parse_line(line).with_context(|| format!("line {}", index + 1))? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Apply one step to a built form
pub fn apply(step: &Step, built: &BuiltForm) -> Result<()> {
    let field = |name: &str| {
        built
            .field(name)
            .with_context(|| format!("form `{}` has no field `{name}`", built.name))
    };

    match step {
        Step::Change { field: name, value } => field(name.as_str())?.on_change(value.as_str()),
        Step::Blur(name) => field(name.as_str())?.on_blur(),
        Step::Reset(name) => field(name.as_str())?.reset(),
        Step::BlurAll => built.form.execute_blur_handlers(),
        Step::ResetAll => built.form.reset(),
        Step::Show => {}
    }
    Ok(())
}
