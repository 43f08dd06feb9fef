//! Seeds and the page legs they expand to
//!
//! A post seed (hashtag, timeline, free search) is collected from one live
//! search page. A network seed is collected from one listing page per
//! requested relation kind.

use crate::accessor::SelectorRole;
use crate::collector::constraints::{ConstraintViolation, Constraints, DateRange};
use crate::extract::normalize_handle;
use crate::record::RelationKind;
use std::fmt;
use url::Url;

/// What to collect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    /// Posts tagged with a hashtag (with or without the leading `#`)
    Hashtag { tag: String },

    /// Posts written by one account
    Timeline { handle: String },

    /// Posts matching a raw search query
    Search { query: String },

    /// Following/followers listings of one account
    Network { handle: String },
}

impl Seed {
    fn term(&self) -> Option<String> {
        match self {
            Self::Hashtag { tag } => {
                let tag = tag.trim().trim_start_matches('#').trim();
                (!tag.is_empty()).then(|| tag.to_string())
            }
            Self::Timeline { handle } | Self::Network { handle } => normalize_handle(handle),
            Self::Search { query } => {
                let query = query.trim();
                (!query.is_empty()).then(|| query.to_string())
            }
        }
    }

    /// Checks the seed has a usable query or handle
    pub fn validate(&self) -> Result<(), ConstraintViolation> {
        self.term().map(|_| ()).ok_or(ConstraintViolation::EmptySeed)
    }

    /// Returns true for seeds that produce edges
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Provenance label attached to collected posts
    pub fn target(&self) -> String {
        self.term().unwrap_or_default()
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Hashtag { .. } => "hashtag",
            Self::Timeline { .. } => "timeline",
            Self::Search { .. } => "search",
            Self::Network { .. } => "network",
        }
    }

    /// Expands the seed into the page legs to collect, in order
    ///
    /// # Arguments
    ///
    /// * `site_base` - Site origin, e.g. `https://x.com`
    /// * `constraints` - Validated constraints of the run
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Leg>)` - One leg for post seeds, one per relation kind for network seeds
    /// * `Err(ConstraintViolation)` - The seed is empty or the base URL unusable
    pub fn legs(
        &self,
        site_base: &Url,
        constraints: &Constraints,
    ) -> Result<Vec<Leg>, ConstraintViolation> {
        let term = self.term().ok_or(ConstraintViolation::EmptySeed)?;

        let query = match self {
            Self::Hashtag { .. } => format!("(#{})", term),
            Self::Timeline { .. } => format!("(from:{})", term),
            Self::Search { .. } => term.clone(),
            Self::Network { .. } => {
                return constraints
                    .relation_kinds()
                    .into_iter()
                    .map(|kind| -> Result<Leg, ConstraintViolation> {
                        let url = join(site_base, &format!("{}/{}", term, kind.path_segment()))?;
                        Ok(Leg {
                            url: url.to_string(),
                            items: LegItems::Edges {
                                source: term.clone(),
                                kind,
                            },
                        })
                    })
                    .collect();
            }
        };

        let url = search_url(site_base, &query, constraints.date_range.as_ref())?;
        Ok(vec![Leg {
            url: url.to_string(),
            items: LegItems::Posts,
        }])
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashtag { .. } => write!(f, "#{}", self.target()),
            Self::Timeline { .. } | Self::Network { .. } => write!(f, "@{}", self.target()),
            Self::Search { query } => write!(f, "\"{}\"", query.trim()),
        }
    }
}

fn join(site_base: &Url, path: &str) -> Result<Url, ConstraintViolation> {
    site_base
        .join(path)
        .map_err(|_| ConstraintViolation::InvalidSiteBase(site_base.to_string()))
}

/// Builds a live search URL, with `since:`/`until:` clauses for a date range
///
/// The site's `until:` bound is exclusive, so it is set to the day after the
/// range end.
///
/// # Example
///
/// ```
/// use timeline_trawler::collector::search_url;
/// use url::Url;
///
/// let base = Url::parse("https://x.com").unwrap();
/// let url = search_url(&base, "(#rust)", None).unwrap();
/// assert_eq!(url.as_str(), "https://x.com/search?q=%28%23rust%29&src=typed_query&f=live");
/// ```
pub fn search_url(
    site_base: &Url,
    query: &str,
    date_range: Option<&DateRange>,
) -> Result<Url, ConstraintViolation> {
    let mut q = query.to_string();
    if let Some(range) = date_range {
        let until = range.end().succ_opt().unwrap_or(range.end());
        q.push_str(&format!(
            " until:{} since:{}",
            until.format("%Y-%m-%d"),
            range.start().format("%Y-%m-%d")
        ));
    }

    let mut url = join(site_base, "search")?;
    url.query_pairs_mut()
        .append_pair("q", &q)
        .append_pair("src", "typed_query")
        .append_pair("f", "live");
    Ok(url)
}

/// One page to collect from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub url: String,
    pub items: LegItems,
}

/// What the items of a leg's page become
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegItems {
    Posts,
    Edges { source: String, kind: RelationKind },
}

impl Leg {
    /// Item elements read on this leg's page
    pub fn role(&self) -> SelectorRole {
        match self.items {
            LegItems::Posts => SelectorRole::Post,
            LegItems::Edges { .. } => SelectorRole::UserRow,
        }
    }

    /// Short label for logs and summaries
    pub fn label(&self) -> String {
        match &self.items {
            LegItems::Posts => "posts".to_string(),
            LegItems::Edges { kind, .. } => kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base() -> Url {
        Url::parse("https://x.com").unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 11, 25).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_hashtag_search_url_with_dates() {
        let seed = Seed::Hashtag {
            tag: "#hamas".to_string(),
        };
        let constraints = Constraints {
            date_range: Some(range()),
            ..Constraints::default()
        };

        let legs = seed.legs(&base(), &constraints).unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(
            legs[0].url,
            "https://x.com/search?q=%28%23hamas%29+until%3A2023-12-02+since%3A2023-11-25&src=typed_query&f=live"
        );
        assert_eq!(legs[0].role(), SelectorRole::Post);
        assert_eq!(seed.target(), "hamas");
    }

    #[test]
    fn test_timeline_search_url() {
        let seed = Seed::Timeline {
            handle: "@alice".to_string(),
        };
        let legs = seed.legs(&base(), &Constraints::default()).unwrap();
        assert_eq!(
            legs[0].url,
            "https://x.com/search?q=%28from%3Aalice%29&src=typed_query&f=live"
        );
        assert_eq!(seed.to_string(), "@alice");
    }

    #[test]
    fn test_network_legs_per_kind() {
        let seed = Seed::Network {
            handle: "alice".to_string(),
        };
        let constraints = Constraints {
            relation_kinds: Some(vec![RelationKind::Followers, RelationKind::VerifiedFollowers]),
            ..Constraints::default()
        };

        let legs = seed.legs(&base(), &constraints).unwrap();
        let urls: Vec<&str> = legs.iter().map(|leg| leg.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://x.com/alice/followers",
                "https://x.com/alice/verified_followers"
            ]
        );
        assert_eq!(legs[0].role(), SelectorRole::UserRow);
        assert_eq!(
            legs[1].items,
            LegItems::Edges {
                source: "alice".to_string(),
                kind: RelationKind::VerifiedFollowers
            }
        );
        assert_eq!(legs[1].label(), "verified_followers");
    }

    #[test]
    fn test_empty_seed() {
        let seed = Seed::Hashtag {
            tag: " # ".to_string(),
        };
        assert_eq!(seed.validate(), Err(ConstraintViolation::EmptySeed));
        assert!(seed.legs(&base(), &Constraints::default()).is_err());
    }

    #[test]
    fn test_unusable_base() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        let seed = Seed::Search {
            query: "rust".to_string(),
        };
        assert!(matches!(
            seed.legs(&base, &Constraints::default()),
            Err(ConstraintViolation::InvalidSiteBase(_))
        ));
    }
}
