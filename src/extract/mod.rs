//! Record extraction module
//!
//! Extraction is a pure function of an item element's readable state: the
//! collection engine reads an element's fields into [`ItemFields`] and hands
//! them to [`extract_post`] or [`extract_edge`]. Optional sub-fields that are
//! absent or malformed degrade to "unknown"; only a missing or malformed
//! identity fails the element.

mod counts;
mod media;
mod post;
mod text;
mod user;

pub use counts::parse_count;
pub use media::{pick_best_image, pick_best_video};
pub use post::{extract_post, post_identity};
pub use text::{extract_hashtags, normalize_body, normalize_handle, normalize_text};
pub use user::extract_edge;

use crate::accessor::FieldRole;
use std::collections::HashMap;
use thiserror::Error;

/// Per-element extraction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("Missing identity field {field:?}")]
    MissingIdentity { field: FieldRole },

    #[error("Malformed identity field {field:?}: {value:?}")]
    MalformedIdentity { field: FieldRole, value: String },
}

/// Result type for extraction
pub type ExtractionResult<T> = Result<T, ExtractionFailure>;

/// Readable state of one rendered item element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFields {
    values: HashMap<FieldRole, Vec<String>>,
}

impl ItemFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one rendered value of a field
    pub fn push(&mut self, role: FieldRole, value: impl Into<String>) {
        self.values.entry(role).or_default().push(value.into());
    }

    /// Replaces every value of a field
    pub fn set(&mut self, role: FieldRole, values: Vec<String>) {
        if values.is_empty() {
            self.values.remove(&role);
        } else {
            self.values.insert(role, values);
        }
    }

    pub fn remove(&mut self, role: FieldRole) {
        self.values.remove(&role);
    }

    /// First rendered value of a field
    pub fn first(&self, role: FieldRole) -> Option<&str> {
        self.values
            .get(&role)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All rendered values of a field, in page order
    pub fn all(&self, role: FieldRole) -> &[String] {
        self.values.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}
