use serde::Serialize;

/// One offending field inside a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Raised when input is malformed. Carries every offending field, not just
/// the first one found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", describe(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collector that accumulates field errors across a whole payload before
/// deciding success or failure.
#[derive(Debug, Default)]
pub(crate) struct ValidationReport {
    fields: Vec<FieldError>,
}

impl ValidationReport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError::new(field, message));
    }

    pub(crate) fn require(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    pub(crate) fn finish(self) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                fields: self.fields,
            })
        }
    }
}
