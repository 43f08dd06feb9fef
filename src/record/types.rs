use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

/// Engagement counters rendered under a post
///
/// `None` means the counter was not rendered (or could not be read), which is
/// different from an explicit zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Engagement {
    pub replies: Option<u64>,
    pub retweets: Option<u64>,
    pub likes: Option<u64>,
    pub bookmarks: Option<u64>,
    pub views: Option<u64>,
}

/// A single collected post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    /// Platform-assigned post ID (primary identity)
    pub id: String,

    /// Author handle without the leading `@`
    pub author_handle: String,

    /// Author display name as rendered
    pub author_name: String,

    /// Normalized body text
    pub text: String,

    /// Publication time, if a timestamp was rendered
    pub published_at: Option<DateTime<Utc>>,

    /// Engagement counters
    pub engagement: Engagement,

    /// Hashtags in body order, case preserved
    pub hashtags: Vec<String>,

    /// Highest-resolution attached image
    pub image_url: Option<String>,

    /// Highest-resolution attached video
    pub video_url: Option<String>,

    /// Poster frame of the attached video
    pub video_preview_url: Option<String>,

    /// Canonical permalink
    pub permalink: String,

    /// Query or user label that produced this post (provenance only)
    pub target: String,
}

impl Post {
    /// Publication time as an ISO-8601 UTC string with millisecond precision
    pub fn published_at_iso(&self) -> Option<String> {
        self.published_at
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Which listing page produced an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Following,
    Followers,
    VerifiedFollowers,
}

impl RelationKind {
    /// Path segment of the listing page for this relation
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Following => "following",
            Self::Followers => "followers",
            Self::VerifiedFollowers => "verified_followers",
        }
    }

    /// Parses a relation kind from its label
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "following" => Some(Self::Following),
            "followers" => Some(Self::Followers),
            "verified_followers" | "verified-followers" => Some(Self::VerifiedFollowers),
            _ => None,
        }
    }

    /// All relation kinds, in collection order
    pub fn all() -> Vec<Self> {
        vec![Self::Following, Self::Followers, Self::VerifiedFollowers]
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// A directed relationship read from a listing page
///
/// `source` is the profile whose listing was read, `target` the handle listed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

/// One collected record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Post(Post),
    Edge(Edge),
}

impl Record {
    /// Identity used for deduplication
    pub fn identity(&self) -> RecordIdentity {
        match self {
            Self::Post(post) => RecordIdentity::Post(post.id.clone()),
            Self::Edge(edge) => RecordIdentity::Edge {
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.kind,
            },
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(post) => Some(post),
            Self::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Edge(edge) => Some(edge),
            Self::Post(_) => None,
        }
    }
}

/// Stable identity of a record within one collection run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordIdentity {
    Post(String),
    Edge {
        source: String,
        target: String,
        kind: RelationKind,
    },
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{}", id),
            Self::Edge {
                source,
                target,
                kind,
            } => write!(f, "edge:{}->{}:{}", source, target, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_post() -> Post {
        Post {
            id: "1730000000000000001".to_string(),
            author_handle: "alice".to_string(),
            author_name: "Alice".to_string(),
            text: "hello #world".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2023, 11, 30, 12, 0, 5).unwrap()),
            engagement: Engagement::default(),
            hashtags: vec!["#world".to_string()],
            image_url: None,
            video_url: None,
            video_preview_url: None,
            permalink: "https://x.com/alice/status/1730000000000000001".to_string(),
            target: "world".to_string(),
        }
    }

    #[test]
    fn test_post_identity_ignores_target() {
        let a = sample_post();
        let mut b = sample_post();
        b.target = "other".to_string();

        assert_eq!(
            Record::Post(a).identity(),
            Record::Post(b).identity()
        );
    }

    #[test]
    fn test_edge_identity_includes_kind() {
        let followers = Record::Edge(Edge {
            source: "alice".to_string(),
            target: "bob".to_string(),
            kind: RelationKind::Followers,
        });
        let following = Record::Edge(Edge {
            source: "alice".to_string(),
            target: "bob".to_string(),
            kind: RelationKind::Following,
        });

        assert_ne!(followers.identity(), following.identity());
    }

    #[test]
    fn test_published_at_iso() {
        let post = sample_post();
        assert_eq!(
            post.published_at_iso().as_deref(),
            Some("2023-11-30T12:00:05.000Z")
        );
    }

    #[test]
    fn test_relation_kind_labels() {
        for kind in RelationKind::all() {
            assert_eq!(RelationKind::from_label(kind.path_segment()), Some(kind));
        }
        assert_eq!(
            RelationKind::from_label("Verified-Followers"),
            Some(RelationKind::VerifiedFollowers)
        );
        assert_eq!(RelationKind::from_label("friends"), None);
    }

    #[test]
    fn test_identity_display() {
        let id = RecordIdentity::Edge {
            source: "alice".to_string(),
            target: "bob".to_string(),
            kind: RelationKind::VerifiedFollowers,
        };
        assert_eq!(id.to_string(), "edge:alice->bob:verified_followers");
    }
}
