use std::collections::BTreeMap;

use serde::Serialize;

/// Field name to messages, rendered as the `errors` object of a 422 response.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records a "required" failure when the value is empty. Whitespace counts
    /// as a value; passwords may legitimately be made of it.
    pub fn required(&mut self, field: &str, value: &str) -> bool {
        if value.is_empty() {
            self.add(field, format!("{field} is required."));
            return false;
        }
        true
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("{field} cannot exceed {max} characters."));
        }
    }

    /// Shorthand for a required, length-bounded string field.
    pub fn bounded(&mut self, field: &str, value: &str, max: usize) {
        if self.required(field, value) {
            self.max_chars(field, value, max);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
