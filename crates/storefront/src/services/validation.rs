//! Field validation for submitted forms.
//!
//! Request bodies are deserialized into loose shapes (every field optional,
//! enums as strings) and then checked here. A [`Validator`] records every
//! violation it sees rather than stopping at the first, so the client can
//! highlight all bad fields at once.

use std::sync::LazyLock;

use nut_barn_core::Email;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Digits, spaces and `- + ( )`, 7 to 20 of them.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-\+\(\)]{7,20}$").expect("Invalid regex"));

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Wire name of the field, e.g. `deliveryAddress` or `items[0].quantity`
    pub field: String,
    pub message: String,
}

/// Every violation found in a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Record a violation.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Violations in the order they were found.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether `field` has at least one violation.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

/// Collects violations while a raw submission is converted to a typed one.
///
/// Each check returns the cleaned value when it passes and `None` when it
/// does not, so callers can keep going and report everything at the end.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation directly.
    pub fn reject(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(field, message);
    }

    /// Required text, trimmed, between `min` and `max` characters.
    pub fn text(
        &mut self,
        field: &str,
        raw: Option<&str>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required");
            return None;
        }
        self.bounded(field, value, min, max)
    }

    /// Optional text, trimmed, at most `max` characters. Blank counts as absent.
    pub fn optional_text(&mut self, field: &str, raw: Option<&str>, max: usize) -> Option<String> {
        let value = raw.map(str::trim).filter(|v| !v.is_empty())?;
        self.bounded(field, value, 0, max)
    }

    /// Required email address, trimmed.
    pub fn email(&mut self, field: &str, raw: Option<&str>) -> Option<Email> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required");
            return None;
        }
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(e) => {
                tracing::debug!(field, error = %e, "rejected email");
                self.reject(field, "must be a valid email address");
                None
            }
        }
    }

    /// Required phone number, trimmed.
    pub fn phone(&mut self, field: &str, raw: Option<&str>) -> Option<String> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required");
            return None;
        }
        if !PHONE_RE.is_match(value) {
            self.reject(
                field,
                "must be 7 to 20 characters of digits, spaces and - + ( )",
            );
            return None;
        }
        Some(value.to_string())
    }

    /// Required choice from a fixed set of wire values.
    pub fn choice<T>(
        &mut self,
        field: &str,
        raw: Option<&str>,
        allowed: &[&str],
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.reject(field, "is required");
            return None;
        }
        let parsed = parse(value);
        if parsed.is_none() {
            self.reject(field, format!("must be one of: {}", allowed.join(", ")));
        }
        parsed
    }

    /// Whole number in `min..=max`.
    pub fn integer(
        &mut self,
        field: &str,
        raw: Option<&serde_json::Number>,
        min: u32,
        max: u32,
    ) -> Option<u32> {
        let Some(number) = raw else {
            self.reject(field, "is required");
            return None;
        };
        let in_range = whole_number(number)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| (min..=max).contains(n));
        if in_range.is_none() {
            if number.as_f64().is_some_and(|f| f.fract().abs() > 0.0) {
                self.reject(field, "must be a whole number");
            } else {
                self.reject(field, format!("must be between {min} and {max}"));
            }
        }
        in_range
    }

    /// Consume the validator, failing if anything was rejected.
    ///
    /// # Errors
    ///
    /// Returns every recorded violation.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn bounded(&mut self, field: &str, value: &str, min: usize, max: usize) -> Option<String> {
        let len = value.chars().count();
        if len < min {
            self.reject(field, format!("must be at least {min} characters"));
            None
        } else if len > max {
            self.reject(field, format!("must be at most {max} characters"));
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// `2` and `2.0` are the same whole number on the wire.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_number(number: &serde_json::Number) -> Option<u64> {
    number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract().abs() <= 0.0 && (0.0..=f64::from(u32::MAX)).contains(f))
            .map(|f| f as u64)
    })
}
