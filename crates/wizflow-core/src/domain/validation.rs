//! Field-level form validation for wizard steps
//!
//! A step may carry a [`FormValidator`] that runs against the workflow
//! context before the step's `on_next` handler. Any error blocks the
//! transition and is reported per field so the UI can show it inline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single failed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Form field name
    pub field: String,

    /// User-visible message
    pub message: String,
}

/// Ordered collection of field errors for one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// True when no field failed
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed fields
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First message recorded for `field`
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Iterate over the recorded errors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Record `message` for `field` when `value` is `None`
    pub fn require<T>(&mut self, field: &str, value: Option<&T>, message: &str) {
        if value.is_none() {
            self.add(field, message);
        }
    }

    /// Record `message` for `field` when `value` is blank
    pub fn require_text(&mut self, field: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.add(field, message);
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// Validates a step's form against the workflow context
pub trait FormValidator<C>: Send + Sync {
    /// Return every failing field, or `Ok(())`
    fn validate(&self, ctx: &C) -> Result<(), ValidationErrors>;
}

impl<C, F> FormValidator<C> for F
where
    F: Fn(&C) -> Result<(), ValidationErrors> + Send + Sync,
{
    fn validate(&self, ctx: &C) -> Result<(), ValidationErrors> {
        self(ctx)
    }
}

/// Returns true when `value` is not an acceptable whole number in `[min, max]`.
///
/// A missing value is only invalid when `required` is set. Values with a
/// fractional part are always invalid.
pub fn number_with_fraction_or_exceed_range(
    value: Option<f64>,
    min: f64,
    max: f64,
    required: bool,
) -> bool {
    let value = match value {
        Some(v) if v.is_finite() => v,
        Some(_) => return true,
        None => return required,
    };

    value.fract() != 0.0 || value < min || value > max
}
