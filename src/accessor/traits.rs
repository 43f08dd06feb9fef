//! Page accessor traits and error types
//!
//! This module defines the capability set the collection engine needs from a
//! browser session, independent of how the session is implemented.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("Timed out while {0}")]
    Timeout(String),

    #[error("Element {0} is detached from the current page")]
    StaleElement(ElementHandle),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Rendering backend returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No page has been loaded")]
    NoPage,

    #[error("Replay fixture error: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AccessorError {
    /// Returns true if retrying the same action may succeed
    ///
    /// Timeouts, detached elements, navigation failures, 5xx/429 backend
    /// responses and transport errors are transient. A missing page, broken
    /// fixtures and 4xx backend responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::StaleElement(_) | Self::Navigation { .. } => true,
            Self::Backend { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::NoPage | Self::Fixture(_) | Self::Io(_) => false,
        }
    }
}

/// Result type for page accessor operations
pub type AccessorResult<T> = Result<T, AccessorError>;

/// Kind of item element to locate on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorRole {
    /// A rendered post
    Post,

    /// A user row on a following/followers listing
    UserRow,

    /// The "nothing to show" placeholder
    EmptyState,
}

/// A readable field inside an item element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Permalink,
    AuthorHandle,
    AuthorName,
    Body,
    Timestamp,
    ReplyCount,
    RetweetCount,
    LikeCount,
    BookmarkCount,
    ViewCount,
    ImageUrl,
    VideoUrl,
    VideoPoster,
    UserHandle,
}

impl FieldRole {
    /// Fields read for a post element
    pub fn post_fields() -> &'static [FieldRole] {
        &[
            Self::Permalink,
            Self::AuthorHandle,
            Self::AuthorName,
            Self::Body,
            Self::Timestamp,
            Self::ReplyCount,
            Self::RetweetCount,
            Self::LikeCount,
            Self::BookmarkCount,
            Self::ViewCount,
            Self::ImageUrl,
            Self::VideoUrl,
            Self::VideoPoster,
        ]
    }

    /// Fields read for a user row element
    pub fn user_row_fields() -> &'static [FieldRole] {
        &[Self::UserHandle]
    }

    /// Returns true if this field may legitimately render several values
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Self::ImageUrl | Self::VideoUrl)
    }
}

/// Opaque handle to a rendered item element
///
/// Handles are stamped with the generation of the DOM snapshot they were
/// found in; reading through a handle after the page re-rendered fails with
/// [`AccessorError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub generation: u64,
    pub role: SelectorRole,
    pub index: usize,
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

/// Condition to wait for after navigating or scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one element of the role is rendered
    ItemsPresent(SelectorRole),

    /// Either an element of the role or the empty-state placeholder is rendered
    ItemsOrEmpty(SelectorRole),

    /// More than the given number of elements of the role are rendered
    ItemCountExceeds(SelectorRole, usize),
}

/// Capability set of a navigable, authenticated page session
///
/// One accessor is one serialized stream of navigation actions, so every
/// method takes `&mut self`.
#[async_trait]
pub trait PageAccessor: Send {
    /// Loads a URL, replacing the current page
    async fn navigate(&mut self, url: &str) -> AccessorResult<()>;

    /// Lists the currently rendered elements of a role, in page order
    async fn find_items(&mut self, role: SelectorRole) -> AccessorResult<Vec<ElementHandle>>;

    /// Reads one field of an element; `Ok(None)` if the field is not rendered
    async fn read_field(
        &mut self,
        element: ElementHandle,
        role: FieldRole,
    ) -> AccessorResult<Option<String>>;

    /// Reads every rendered value of a field, in page order
    async fn read_all(
        &mut self,
        element: ElementHandle,
        role: FieldRole,
    ) -> AccessorResult<Vec<String>> {
        Ok(self.read_field(element, role).await?.into_iter().collect())
    }

    /// Triggers loading of more content
    async fn scroll(&mut self) -> AccessorResult<()>;

    /// Waits up to `timeout` for a condition; `Ok(false)` if it never held
    async fn wait_until(
        &mut self,
        condition: WaitCondition,
        timeout: Duration,
    ) -> AccessorResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AccessorError::Timeout("loading".to_string()).is_transient());
        assert!(AccessorError::StaleElement(ElementHandle {
            generation: 1,
            role: SelectorRole::Post,
            index: 0
        })
        .is_transient());
        assert!(AccessorError::Navigation {
            url: "https://x.com".to_string(),
            message: "reset".to_string()
        }
        .is_transient());
        assert!(AccessorError::Backend {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(AccessorError::Backend {
            status: 429,
            message: String::new()
        }
        .is_transient());

        assert!(!AccessorError::Backend {
            status: 401,
            message: String::new()
        }
        .is_transient());
        assert!(!AccessorError::NoPage.is_transient());
        assert!(!AccessorError::Fixture("missing".to_string()).is_transient());
    }

    #[test]
    fn test_field_sets() {
        assert!(FieldRole::post_fields().contains(&FieldRole::Permalink));
        assert!(!FieldRole::post_fields().contains(&FieldRole::UserHandle));
        assert_eq!(FieldRole::user_row_fields(), &[FieldRole::UserHandle]);
        assert!(FieldRole::ImageUrl.is_multi_valued());
        assert!(!FieldRole::Body.is_multi_valued());
    }
}
