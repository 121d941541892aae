#![forbid(unsafe_code)]

//! Form model configuration.

/// Settings for a form model. Children created by a compound model inherit
/// their parent's settings, except for the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// Wrap property holders in buffered holders (commit/revert semantics).
    pub buffer_changes: bool,
    /// Identifier used in log fields and `Debug` output.
    pub id: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            buffer_changes: true,
            id: None,
        }
    }
}

impl FormConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_buffering(mut self, buffer_changes: bool) -> Self {
        self.buffer_changes = buffer_changes;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Settings for a child named `name`.
    pub(crate) fn for_child(&self, name: &str) -> Self {
        Self {
            buffer_changes: self.buffer_changes,
            id: Some(match &self.id {
                Some(parent) => format!("{parent}.{name}"),
                None => name.to_owned(),
            }),
        }
    }
}
