use crate::accessor::FieldRole;
use crate::extract::counts::parse_count;
use crate::extract::media::{pick_best_image, pick_best_video};
use crate::extract::text::{extract_hashtags, normalize_body, normalize_handle, normalize_text};
use crate::extract::{ExtractionFailure, ExtractionResult, ItemFields};
use crate::record::{Engagement, Post};
use chrono::{DateTime, Utc};

/// Splits a permalink into its `(handle, id)` path segments
///
/// Accepts relative (`/alice/status/1`) and absolute links, with or without
/// trailing segments (`/photo/1`), query or fragment.
fn status_segments(permalink: &str) -> Option<(&str, &str)> {
    let path = permalink.split(['?', '#']).next()?;
    let path = match path.find("://") {
        Some(scheme_end) => {
            let rest = &path[scheme_end + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None => path,
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let status = segments.iter().position(|s| *s == "status")?;
    let handle = *segments.get(status.checked_sub(1)?)?;
    let id = *segments.get(status + 1)?;

    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((handle, id))
}

/// Extracts the post ID from a rendered permalink
///
/// The ID is the all-digit path segment following `status`.
///
/// # Example
///
/// ```
/// use timeline_trawler::extract::post_identity;
///
/// assert_eq!(post_identity("/alice/status/1730000000000000001").unwrap(), "1730000000000000001");
/// assert!(post_identity("/alice/likes").is_err());
/// ```
pub fn post_identity(permalink: &str) -> ExtractionResult<String> {
    status_segments(permalink.trim())
        .map(|(_, id)| id.to_string())
        .ok_or_else(|| ExtractionFailure::MalformedIdentity {
            field: FieldRole::Permalink,
            value: permalink.to_string(),
        })
}

/// Reads an engagement counter
///
/// An absent counter is unknown; a rendered but empty counter is zero (the
/// site renders no digits for zero).
fn read_counter(fields: &ItemFields, role: FieldRole) -> Option<u64> {
    match fields.first(role) {
        None => None,
        Some(text) if text.trim().is_empty() => Some(0),
        Some(text) => parse_count(text),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Builds a [`Post`] from the readable state of one rendered post element
///
/// # Arguments
///
/// * `fields` - Field values read from the element
/// * `target` - Provenance label of the seed that produced the element
/// * `site_base` - Site origin used to canonicalize the permalink
///
/// # Returns
///
/// * `Ok(Post)` - Extracted post; absent or malformed optional fields are `None`
/// * `Err(ExtractionFailure)` - The permalink or author handle is missing or malformed
pub fn extract_post(
    fields: &ItemFields,
    target: &str,
    site_base: &str,
) -> ExtractionResult<Post> {
    let permalink = fields
        .first(FieldRole::Permalink)
        .ok_or(ExtractionFailure::MissingIdentity {
            field: FieldRole::Permalink,
        })?;
    let (path_handle, id) =
        status_segments(permalink.trim()).ok_or_else(|| ExtractionFailure::MalformedIdentity {
            field: FieldRole::Permalink,
            value: permalink.to_string(),
        })?;

    let author_handle = fields
        .first(FieldRole::AuthorHandle)
        .and_then(normalize_handle)
        .ok_or(ExtractionFailure::MissingIdentity {
            field: FieldRole::AuthorHandle,
        })?;

    let text = fields
        .first(FieldRole::Body)
        .map(normalize_body)
        .unwrap_or_default();

    let engagement = Engagement {
        replies: read_counter(fields, FieldRole::ReplyCount),
        retweets: read_counter(fields, FieldRole::RetweetCount),
        likes: read_counter(fields, FieldRole::LikeCount),
        bookmarks: read_counter(fields, FieldRole::BookmarkCount),
        views: read_counter(fields, FieldRole::ViewCount),
    };

    Ok(Post {
        id: id.to_string(),
        author_handle,
        author_name: fields
            .first(FieldRole::AuthorName)
            .map(normalize_text)
            .unwrap_or_default(),
        hashtags: extract_hashtags(&text),
        text,
        published_at: fields.first(FieldRole::Timestamp).and_then(parse_timestamp),
        engagement,
        image_url: pick_best_image(fields.all(FieldRole::ImageUrl)),
        video_url: pick_best_video(fields.all(FieldRole::VideoUrl)),
        video_preview_url: fields
            .first(FieldRole::VideoPoster)
            .map(normalize_text)
            .filter(|url| !url.is_empty()),
        permalink: format!(
            "{}/{}/status/{}",
            site_base.trim_end_matches('/'),
            path_handle,
            id
        ),
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BASE: &str = "https://x.com";

    fn full_fields() -> ItemFields {
        let mut fields = ItemFields::new();
        fields.push(FieldRole::Permalink, "/alice/status/1730000000000000001");
        fields.push(FieldRole::AuthorHandle, "@alice");
        fields.push(FieldRole::AuthorName, " Alice & Co ");
        fields.push(FieldRole::Body, "Hello\n\n\n#World and #rust");
        fields.push(FieldRole::Timestamp, "2023-11-30T12:00:05.000Z");
        fields.push(FieldRole::ReplyCount, "12");
        fields.push(FieldRole::RetweetCount, "1.2K");
        fields.push(FieldRole::LikeCount, "3M");
        fields.push(FieldRole::BookmarkCount, "");
        fields.push(FieldRole::ViewCount, "12,345");
        fields.push(
            FieldRole::ImageUrl,
            "https://pbs.twimg.com/media/A?format=jpg&name=small",
        );
        fields.push(
            FieldRole::ImageUrl,
            "https://pbs.twimg.com/media/A?format=jpg&name=large 2x",
        );
        fields
    }

    #[test]
    fn test_extract_full_post() {
        let post = extract_post(&full_fields(), "#World", BASE).unwrap();

        assert_eq!(post.id, "1730000000000000001");
        assert_eq!(post.author_handle, "alice");
        assert_eq!(post.author_name, "Alice & Co");
        assert_eq!(post.text, "Hello\n#World and #rust");
        assert_eq!(post.hashtags, vec!["#World", "#rust"]);
        assert_eq!(
            post.published_at,
            Some(Utc.with_ymd_and_hms(2023, 11, 30, 12, 0, 5).unwrap())
        );
        assert_eq!(post.engagement.replies, Some(12));
        assert_eq!(post.engagement.retweets, Some(1200));
        assert_eq!(post.engagement.likes, Some(3_000_000));
        assert_eq!(post.engagement.bookmarks, Some(0));
        assert_eq!(post.engagement.views, Some(12345));
        assert_eq!(
            post.image_url.as_deref(),
            Some("https://pbs.twimg.com/media/A?format=jpg&name=large")
        );
        assert_eq!(post.video_url, None);
        assert_eq!(
            post.permalink,
            "https://x.com/alice/status/1730000000000000001"
        );
        assert_eq!(post.target, "#World");
    }

    #[test]
    fn test_optional_fields_degrade_to_unknown() {
        let mut fields = ItemFields::new();
        fields.push(FieldRole::Permalink, "https://x.com/bob/status/7?s=20");
        fields.push(FieldRole::AuthorHandle, "@bob");
        fields.push(FieldRole::LikeCount, "lots");
        fields.push(FieldRole::Timestamp, "yesterday");

        let post = extract_post(&fields, "bob", BASE).unwrap();
        assert_eq!(post.id, "7");
        assert_eq!(post.text, "");
        assert_eq!(post.author_name, "");
        assert_eq!(post.published_at, None);
        assert_eq!(post.engagement.likes, None);
        assert_eq!(post.engagement.replies, None);
        assert!(post.hashtags.is_empty());
        assert_eq!(post.permalink, "https://x.com/bob/status/7");
    }

    #[test]
    fn test_missing_permalink_is_hard_failure() {
        let mut fields = full_fields();
        fields.remove(FieldRole::Permalink);
        assert_eq!(
            extract_post(&fields, "t", BASE).unwrap_err(),
            ExtractionFailure::MissingIdentity {
                field: FieldRole::Permalink
            }
        );
    }

    #[test]
    fn test_missing_author_is_hard_failure() {
        let mut fields = full_fields();
        fields.remove(FieldRole::AuthorHandle);
        fields.push(FieldRole::AuthorHandle, "  ");
        assert!(matches!(
            extract_post(&fields, "t", BASE),
            Err(ExtractionFailure::MissingIdentity {
                field: FieldRole::AuthorHandle
            })
        ));
    }

    #[test]
    fn test_malformed_permalink() {
        let mut fields = full_fields();
        fields.remove(FieldRole::Permalink);
        fields.push(FieldRole::Permalink, "/alice/status/abc");
        assert!(matches!(
            extract_post(&fields, "t", BASE),
            Err(ExtractionFailure::MalformedIdentity { .. })
        ));
    }

    #[test]
    fn test_status_segments() {
        assert_eq!(
            status_segments("/alice/status/42/photo/1"),
            Some(("alice", "42"))
        );
        assert_eq!(
            status_segments("https://x.com/Alice/status/42#m"),
            Some(("Alice", "42"))
        );
        assert_eq!(status_segments("/status/42"), None);
        assert_eq!(status_segments("/alice/status/"), None);
        assert_eq!(status_segments("https://x.com"), None);
    }
}
