//! Record types produced by the collection engine
//!
//! A collection run yields a stream of [`Record`]s: either posts read from a
//! search or timeline page, or follower/following edges read from a listing page.

mod types;

pub use types::{Edge, Engagement, Post, Record, RecordIdentity, RelationKind};
