//! HTML snapshot accessor
//!
//! This module implements [`PageAccessor`] over fully rendered HTML snapshots.
//! Each navigation or scroll asks an [`HtmlSource`] for a fresh rendering of
//! the page, which is parsed once into the item elements and fields the
//! collection engine reads:
//! - Posts (`article[data-testid="tweet"]`)
//! - User rows on listing pages (`[data-testid="UserCell"]`)
//! - The empty-state placeholder (`[data-testid="emptyState"]`)

use crate::accessor::traits::{
    AccessorError, AccessorResult, ElementHandle, FieldRole, PageAccessor, SelectorRole,
    WaitCondition,
};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::time::Duration;

const POST_SELECTOR: &str = r#"article[data-testid="tweet"]"#;
const USER_ROW_SELECTOR: &str = r#"[data-testid="UserCell"]"#;
const EMPTY_STATE_SELECTOR: &str = r#"[data-testid="emptyState"]"#;

const STATUS_LINK_SELECTOR: &str = r#"a[href*="/status/"]"#;
const USER_NAME_SELECTOR: &str = r#"[data-testid="User-Name"]"#;
const BODY_SELECTOR: &str = r#"[data-testid="tweetText"]"#;
const TIME_SELECTOR: &str = "time[datetime]";
const REPLY_SELECTOR: &str = r#"[data-testid="reply"]"#;
const RETWEET_SELECTOR: &str = r#"[data-testid="retweet"], [data-testid="unretweet"]"#;
const LIKE_SELECTOR: &str = r#"[data-testid="like"], [data-testid="unlike"]"#;
const BOOKMARK_SELECTOR: &str = r#"[data-testid="bookmark"], [data-testid="removeBookmark"]"#;
const VIEWS_SELECTOR: &str = r#"a[href$="/analytics"]"#;
const PHOTO_SELECTOR: &str = r#"[data-testid="tweetPhoto"] img"#;
const VIDEO_SELECTOR: &str = r#"[data-testid="videoPlayer"] video"#;
const VIDEO_SOURCE_SELECTOR: &str = r#"[data-testid="videoPlayer"] video source"#;

/// Produces rendered HTML for a page after a number of scroll actions
#[async_trait]
pub trait HtmlSource: Send {
    /// Renders `url` as it looks after `scrolls` scroll actions
    async fn render(&mut self, url: &str, scrolls: u32) -> AccessorResult<String>;
}

/// Readable state of one rendered item element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedItem {
    fields: HashMap<FieldRole, Vec<String>>,
}

impl RenderedItem {
    fn push(&mut self, role: FieldRole, value: String) {
        self.fields.entry(role).or_default().push(value);
    }

    /// First rendered value of a field
    pub fn first(&self, role: FieldRole) -> Option<&str> {
        self.fields
            .get(&role)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All rendered values of a field
    pub fn all(&self, role: FieldRole) -> &[String] {
        self.fields.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Parsed item elements of one rendered page
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub posts: Vec<RenderedItem>,
    pub user_rows: Vec<RenderedItem>,
    pub empty_state: bool,
}

impl Snapshot {
    fn count(&self, role: SelectorRole) -> usize {
        match role {
            SelectorRole::Post => self.posts.len(),
            SelectorRole::UserRow => self.user_rows.len(),
            SelectorRole::EmptyState => usize::from(self.empty_state),
        }
    }

    fn item(&self, role: SelectorRole, index: usize) -> Option<&RenderedItem> {
        match role {
            SelectorRole::Post => self.posts.get(index),
            SelectorRole::UserRow => self.user_rows.get(index),
            SelectorRole::EmptyState => None,
        }
    }

    fn holds(&self, condition: WaitCondition) -> bool {
        match condition {
            WaitCondition::ItemsPresent(role) => self.count(role) > 0,
            WaitCondition::ItemsOrEmpty(role) => self.count(role) > 0 || self.empty_state,
            WaitCondition::ItemCountExceeds(role, n) => self.count(role) > n,
        }
    }
}

/// Parses rendered HTML into a [`Snapshot`]
///
/// # Example
///
/// ```
/// use timeline_trawler::accessor::parse_snapshot;
///
/// let html = r#"<div data-testid="UserCell"><span>Bob</span><span>@bob</span></div>"#;
/// let snapshot = parse_snapshot(html);
/// assert_eq!(snapshot.user_rows.len(), 1);
/// ```
pub fn parse_snapshot(html: &str) -> Snapshot {
    let document = Html::parse_document(html);

    let posts = select_all(&document, POST_SELECTOR)
        .into_iter()
        .map(parse_post)
        .collect();

    let user_rows = select_all(&document, USER_ROW_SELECTOR)
        .into_iter()
        .map(parse_user_row)
        .collect();

    let empty_state = !select_all(&document, EMPTY_STATE_SELECTOR).is_empty();

    Snapshot {
        posts,
        user_rows,
        empty_state,
    }
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text of an element, with emoji images contributing their alt text
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "img" => {
                if let Some(alt) = e.attr("alt") {
                    text.push_str(alt);
                }
            }
            _ => {}
        }
    }
    text
}

fn first_handle_span(element: ElementRef<'_>) -> Option<String> {
    select_within(element, "span")
        .into_iter()
        .map(|span| span.text().collect::<String>().trim().to_string())
        .find(|text| text.starts_with('@'))
}

fn parse_post(element: ElementRef<'_>) -> RenderedItem {
    let mut item = RenderedItem::default();

    // The timestamp link is the post's own permalink; other status links
    // belong to quoted posts.
    let status_links = select_within(element, STATUS_LINK_SELECTOR);
    let permalink = status_links
        .iter()
        .find(|link| !select_within(**link, "time").is_empty())
        .or_else(|| status_links.first())
        .and_then(|link| link.value().attr("href"));
    if let Some(href) = permalink {
        item.push(FieldRole::Permalink, href.to_string());
    }

    let user_name = select_within(element, USER_NAME_SELECTOR).into_iter().next();
    let name_scope = user_name.unwrap_or(element);

    if let Some(handle) = first_handle_span(name_scope) {
        item.push(FieldRole::AuthorHandle, handle);
    }

    if let Some(user_name) = user_name {
        let display_name = select_within(user_name, "span")
            .into_iter()
            .map(element_text)
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty() && !text.starts_with('@'));
        if let Some(name) = display_name {
            item.push(FieldRole::AuthorName, name);
        }
    }

    if let Some(body) = select_within(element, BODY_SELECTOR).into_iter().next() {
        item.push(FieldRole::Body, element_text(body));
    }

    if let Some(time) = select_within(element, TIME_SELECTOR).into_iter().next() {
        if let Some(datetime) = time.value().attr("datetime") {
            item.push(FieldRole::Timestamp, datetime.to_string());
        }
    }

    for (role, css) in [
        (FieldRole::ReplyCount, REPLY_SELECTOR),
        (FieldRole::RetweetCount, RETWEET_SELECTOR),
        (FieldRole::LikeCount, LIKE_SELECTOR),
        (FieldRole::BookmarkCount, BOOKMARK_SELECTOR),
        (FieldRole::ViewCount, VIEWS_SELECTOR),
    ] {
        if let Some(counter) = select_within(element, css).into_iter().next() {
            item.push(role, counter.text().collect::<String>().trim().to_string());
        }
    }

    for img in select_within(element, PHOTO_SELECTOR) {
        if let Some(src) = img.value().attr("src") {
            item.push(FieldRole::ImageUrl, src.to_string());
        }
        if let Some(srcset) = img.value().attr("srcset") {
            for candidate in srcset.split(',') {
                let candidate = candidate.trim();
                if !candidate.is_empty() {
                    item.push(FieldRole::ImageUrl, candidate.to_string());
                }
            }
        }
    }

    for video in select_within(element, VIDEO_SELECTOR) {
        if let Some(src) = video.value().attr("src") {
            item.push(FieldRole::VideoUrl, src.to_string());
        }
        if let Some(poster) = video.value().attr("poster") {
            item.push(FieldRole::VideoPoster, poster.to_string());
        }
    }
    for source in select_within(element, VIDEO_SOURCE_SELECTOR) {
        if let Some(src) = source.value().attr("src") {
            item.push(FieldRole::VideoUrl, src.to_string());
        }
    }

    item
}

fn parse_user_row(element: ElementRef<'_>) -> RenderedItem {
    let mut item = RenderedItem::default();
    if let Some(handle) = first_handle_span(element) {
        item.push(FieldRole::UserHandle, handle);
    }
    item
}

/// [`PageAccessor`] backed by rendered HTML snapshots
///
/// The accessor owns its [`HtmlSource`] exclusively; every navigation or
/// scroll replaces the current snapshot and invalidates earlier handles.
pub struct HtmlPageAccessor<S: HtmlSource> {
    source: S,
    current_url: Option<String>,
    scrolls: u32,
    generation: u64,
    snapshot: Option<Snapshot>,
}

impl<S: HtmlSource> HtmlPageAccessor<S> {
    /// Creates an accessor with no page loaded
    pub fn new(source: S) -> Self {
        Self {
            source,
            current_url: None,
            scrolls: 0,
            generation: 0,
            snapshot: None,
        }
    }

    /// URL of the currently loaded page
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Number of scroll actions applied since the last navigation
    pub fn scrolls(&self) -> u32 {
        self.scrolls
    }

    /// Consumes the accessor and returns its source
    pub fn into_source(self) -> S {
        self.source
    }

    async fn load(&mut self, url: &str, scrolls: u32) -> AccessorResult<()> {
        let html = self.source.render(url, scrolls).await?;
        self.snapshot = Some(parse_snapshot(&html));
        self.generation += 1;
        Ok(())
    }

    fn snapshot(&self) -> AccessorResult<&Snapshot> {
        self.snapshot.as_ref().ok_or(AccessorError::NoPage)
    }

    fn item(&self, element: ElementHandle) -> AccessorResult<&RenderedItem> {
        if element.generation != self.generation {
            return Err(AccessorError::StaleElement(element));
        }
        self.snapshot()?
            .item(element.role, element.index)
            .ok_or(AccessorError::StaleElement(element))
    }
}

#[async_trait]
impl<S: HtmlSource> PageAccessor for HtmlPageAccessor<S> {
    async fn navigate(&mut self, url: &str) -> AccessorResult<()> {
        tracing::debug!("Navigating to {}", url);
        self.load(url, 0).await?;
        self.current_url = Some(url.to_string());
        self.scrolls = 0;
        Ok(())
    }

    async fn find_items(&mut self, role: SelectorRole) -> AccessorResult<Vec<ElementHandle>> {
        let count = self.snapshot()?.count(role);
        let generation = self.generation;
        Ok((0..count)
            .map(|index| ElementHandle {
                generation,
                role,
                index,
            })
            .collect())
    }

    async fn read_field(
        &mut self,
        element: ElementHandle,
        role: FieldRole,
    ) -> AccessorResult<Option<String>> {
        Ok(self.item(element)?.first(role).map(str::to_string))
    }

    async fn read_all(
        &mut self,
        element: ElementHandle,
        role: FieldRole,
    ) -> AccessorResult<Vec<String>> {
        Ok(self.item(element)?.all(role).to_vec())
    }

    async fn scroll(&mut self) -> AccessorResult<()> {
        let url = self.current_url.clone().ok_or(AccessorError::NoPage)?;
        let scrolls = self.scrolls + 1;
        self.load(&url, scrolls).await?;
        self.scrolls = scrolls;
        Ok(())
    }

    async fn wait_until(
        &mut self,
        condition: WaitCondition,
        timeout: Duration,
    ) -> AccessorResult<bool> {
        if self.snapshot()?.holds(condition) {
            return Ok(true);
        }

        // A snapshot never changes on its own, so the wait is a single bounded pause.
        tokio::time::sleep(timeout).await;
        Ok(self.snapshot()?.holds(condition))
    }
}
