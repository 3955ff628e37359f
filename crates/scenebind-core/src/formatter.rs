#![forbid(unsafe_code)]

//! Bidirectional value transforms.
//!
//! A [`ValueFormatter`] is a pair of optional functions: `format_control`
//! maps a source value to what the control shows, `format_target` maps a
//! control value back to what the source stores. A missing direction is the
//! identity. Formatters are stateless and can be shared across bindings.

use std::fmt;
use std::sync::Arc;

use crate::value::{DisplayRecord, Value};

/// One direction of a formatter.
pub type FormatFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct ValueFormatter {
    format_control: Option<FormatFn>,
    format_target: Option<FormatFn>,
}

impl ValueFormatter {
    /// Identity in both directions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_format_control(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.format_control = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_format_target(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.format_target = Some(Arc::new(f));
        self
    }

    /// Source value to control value.
    #[must_use]
    pub fn format_control(&self, value: &Value) -> Value {
        match &self.format_control {
            Some(f) => f(value),
            None => value.clone(),
        }
    }

    /// Control value to source value.
    #[must_use]
    pub fn format_target(&self, value: &Value) -> Value {
        match &self.format_target {
            Some(f) => f(value),
            None => value.clone(),
        }
    }

    #[must_use]
    pub fn has_format_control(&self) -> bool {
        self.format_control.is_some()
    }

    #[must_use]
    pub fn has_format_target(&self) -> bool {
        self.format_target.is_some()
    }

    /// Negates booleans both ways, e.g. `Button.disabled` bound to an
    /// "enabled" flag. Non-boolean values pass through.
    #[must_use]
    pub fn invert_bool() -> Self {
        fn invert(value: &Value) -> Value {
            match value {
                Value::Bool(b) => Value::Bool(!b),
                other => other.clone(),
            }
        }
        Self::new()
            .with_format_control(invert)
            .with_format_target(invert)
    }

    /// Shows any value as text; parses text back to int, float or bool where
    /// it can, and keeps it as text otherwise.
    #[must_use]
    pub fn to_text() -> Self {
        Self::new()
            .with_format_control(|value| Value::Text(value.to_string()))
            .with_format_target(|value| match value {
                Value::Text(s) => parse_text(s),
                other => other.clone(),
            })
    }

    /// Item formatter for list bindings.
    #[must_use]
    pub fn display_records(f: impl Fn(&Value) -> DisplayRecord + Send + Sync + 'static) -> Self {
        Self::new().with_format_control(move |value| Value::Record(f(value)))
    }
}

fn parse_text(s: &str) -> Value {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(x) = trimmed.parse::<f64>() {
        Value::Float(x)
    } else if let Ok(b) = trimmed.parse::<bool>() {
        Value::Bool(b)
    } else {
        Value::Text(s.to_owned())
    }
}

impl fmt::Debug for ValueFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueFormatter")
            .field("format_control", &self.has_format_control())
            .field("format_target", &self.has_format_target())
            .finish()
    }
}
